//! Read-only query tools over the Granola desktop app's local cache.
//!
//! The cache file is re-read on every query. Single-note lookups poll the
//! file for a bounded time while the app is still filling in summaries and
//! transcripts.

pub mod accessor;
pub mod config;
pub mod driver;
pub mod error;
pub mod poll;
pub mod state;
pub mod tools;

pub use accessor::{CacheAccessor, ListNotesOptions, Note, NoteSummary, Transcript};
pub use error::{CacheError, CacheResult};
pub use poll::PollPolicy;
pub use state::{FileStateLoader, State, StateSource};
