use std::path::PathBuf;

/// Errors surfaced by cache queries.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// The cache file is missing or unreadable.
    #[error("failed to read cache file {}: {}", .path.display(), .source)]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// One of the two JSON layers is malformed or has an unexpected shape.
    #[error("failed to parse {stage} cache JSON: {source}")]
    Parse {
        stage: &'static str,
        #[source]
        source: serde_json::Error,
    },

    /// The requested document id is absent from the snapshot.
    #[error("Document not found: {0}")]
    NotFound(String),

    /// A poll loop was abandoned by its caller.
    #[error("request cancelled")]
    Cancelled,
}

pub type CacheResult<T> = std::result::Result<T, CacheError>;
