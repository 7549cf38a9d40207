use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::error::{CacheError, CacheResult};

/// Display name used when a document has neither a title nor a calendar event summary.
pub const UNTITLED: &str = "Untitled";

/// A note document as stored by the desktop application.
#[derive(Debug, Clone, Deserialize)]
pub struct Document {
    pub id: String,
    pub title: Option<String>,
    pub created_at: String,
    pub deleted_at: Option<String>,
    pub notes_plain: Option<String>,
    pub google_calendar_event: Option<CalendarEvent>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CalendarEvent {
    pub summary: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TranscriptEntry {
    pub start_timestamp: String,
    pub text: String,
}

/// One point-in-time read of the cache file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct State {
    pub documents: BTreeMap<String, Document>,
    pub transcripts: BTreeMap<String, Vec<TranscriptEntry>>,
}

/// Outer layer of the cache file: the real payload is a JSON string.
#[derive(Deserialize)]
struct CacheFile {
    cache: String,
}

#[derive(Deserialize)]
struct CachePayload {
    state: State,
}

impl Document {
    /// Title, falling back to the calendar event summary, then to [`UNTITLED`].
    pub fn effective_title(&self) -> &str {
        let calendar = self
            .google_calendar_event
            .as_ref()
            .and_then(|event| event.summary.as_deref());

        [self.title.as_deref(), calendar]
            .into_iter()
            .flatten()
            .find(|s| !s.is_empty())
            .unwrap_or(UNTITLED)
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted_at.as_deref().is_some_and(|s| !s.is_empty())
    }
}

impl State {
    /// Decode both JSON layers of the cache file.
    pub fn parse(raw: &str) -> CacheResult<Self> {
        let file: CacheFile = serde_json::from_str(raw)
            .map_err(|source| CacheError::Parse { stage: "outer", source })?;

        let payload: CachePayload = serde_json::from_str(&file.cache)
            .map_err(|source| CacheError::Parse { stage: "inner", source })?;

        Ok(payload.state)
    }
}

/// Ordering key for ISO-8601 timestamps.
///
/// RFC 3339, zone-less date-times (read as UTC) and bare dates (midnight UTC)
/// all compare as instants, with the raw text breaking ties. Anything else
/// sorts before them and compares as plain text.
pub(crate) fn timestamp_key(raw: &str) -> (Option<DateTime<Utc>>, &str) {
    (parse_instant(raw), raw)
}

fn parse_instant(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Anything that can produce a fresh [`State`] snapshot.
#[async_trait::async_trait]
pub trait StateSource: Send + Sync {
    async fn load(&self) -> CacheResult<State>;
}

/// Reads the snapshot from the application's cache file on every call.
pub struct FileStateLoader {
    path: PathBuf,
}

impl FileStateLoader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait::async_trait]
impl StateSource for FileStateLoader {
    async fn load(&self) -> CacheResult<State> {
        let raw = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|source| CacheError::Read {
                path: self.path.clone(),
                source,
            })?;

        let state = State::parse(&raw)?;

        log::debug!(
            "StateLoader: loaded {} documents, {} transcripts from {}",
            state.documents.len(),
            state.transcripts.len(),
            self.path.display()
        );
        Ok(state)
    }
}
