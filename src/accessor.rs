use serde::{Deserialize, Deserializer, Serialize};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::error::{CacheError, CacheResult};
use crate::poll::PollPolicy;
use crate::state::{timestamp_key, Document, State, StateSource};

fn default_limit() -> usize {
    50
}

fn positive_limit<'de, D: Deserializer<'de>>(deserializer: D) -> Result<usize, D::Error> {
    match usize::deserialize(deserializer)? {
        0 => Err(serde::de::Error::custom("limit must be a positive integer")),
        n => Ok(n),
    }
}

/// Filters and pagination window for [`CacheAccessor::list_notes`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ListNotesOptions {
    #[serde(default = "default_limit", deserialize_with = "positive_limit")]
    pub limit: usize,
    #[serde(default)]
    pub offset: usize,
    /// Inclusive lower bound on `created_at`, compared as text.
    #[serde(default)]
    pub start_date: Option<String>,
    /// Inclusive upper bound on `created_at`, compared as text.
    #[serde(default)]
    pub end_date: Option<String>,
}

impl Default for ListNotesOptions {
    fn default() -> Self {
        Self {
            limit: default_limit(),
            offset: 0,
            start_date: None,
            end_date: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NoteSummary {
    pub id: String,
    pub title: String,
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Note {
    pub id: String,
    pub title: String,
    pub summary: String,
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Transcript {
    pub id: String,
    pub transcript: String,
}

/// Read-only queries over the application's cache snapshot.
///
/// Every call loads a fresh [`State`]; nothing is kept between calls.
#[derive(Clone)]
pub struct CacheAccessor {
    source: Arc<dyn StateSource>,
    poll: PollPolicy,
}

impl CacheAccessor {
    pub fn new(source: Arc<dyn StateSource>, poll: PollPolicy) -> Self {
        Self { source, poll }
    }

    pub async fn list_notes(&self, options: &ListNotesOptions) -> CacheResult<Vec<NoteSummary>> {
        let state = self.source.load().await?;
        let notes = select_notes(&state, options);
        log::info!(
            "Accessor: listed {} notes (offset={}, limit={})",
            notes.len(),
            options.offset,
            options.limit
        );
        Ok(notes)
    }

    pub async fn get_note(&self, id: &str) -> CacheResult<Note> {
        self.get_note_with_cancel(id, &CancellationToken::new()).await
    }

    /// Fetch a note, waiting for its summary to be generated.
    pub async fn get_note_with_cancel(&self, id: &str, cancel: &CancellationToken) -> CacheResult<Note> {
        self.poll
            .run(cancel, |note: &Note| !note.summary.is_empty(), || async move {
                let state = self.source.load().await?;
                note_from(&state, id)
            })
            .await
    }

    pub async fn get_transcript(&self, id: &str) -> CacheResult<Transcript> {
        self.get_transcript_with_cancel(id, &CancellationToken::new()).await
    }

    /// Fetch a transcript, waiting for entries to be recorded.
    pub async fn get_transcript_with_cancel(
        &self,
        id: &str,
        cancel: &CancellationToken,
    ) -> CacheResult<Transcript> {
        self.poll
            .run(cancel, |t: &Transcript| !t.transcript.is_empty(), || async move {
                let state = self.source.load().await?;
                transcript_from(&state, id)
            })
            .await
    }
}

fn within_bounds(doc: &Document, options: &ListNotesOptions) -> bool {
    let created = doc.created_at.as_str();
    options.start_date.as_deref().map_or(true, |start| created >= start)
        && options.end_date.as_deref().map_or(true, |end| created <= end)
}

fn select_notes(state: &State, options: &ListNotesOptions) -> Vec<NoteSummary> {
    let mut docs: Vec<&Document> = state
        .documents
        .values()
        .filter(|doc| !doc.is_deleted() && within_bounds(doc, options))
        .collect();

    // Newest first; stable, so equal timestamps keep id order.
    docs.sort_by(|a, b| timestamp_key(&b.created_at).cmp(&timestamp_key(&a.created_at)));

    docs.into_iter()
        .skip(options.offset)
        .take(options.limit)
        .map(|doc| NoteSummary {
            id: doc.id.clone(),
            title: doc.effective_title().to_string(),
            created_at: doc.created_at.clone(),
        })
        .collect()
}

fn find_document<'a>(state: &'a State, id: &str) -> CacheResult<&'a Document> {
    state
        .documents
        .get(id)
        .ok_or_else(|| CacheError::NotFound(id.to_string()))
}

fn note_from(state: &State, id: &str) -> CacheResult<Note> {
    let doc = find_document(state, id)?;
    Ok(Note {
        id: doc.id.clone(),
        title: doc.effective_title().to_string(),
        summary: doc.notes_plain.clone().unwrap_or_default(),
        created_at: doc.created_at.clone(),
    })
}

fn transcript_from(state: &State, id: &str) -> CacheResult<Transcript> {
    find_document(state, id)?;

    let mut entries: Vec<_> = state
        .transcripts
        .get(id)
        .map(|entries| entries.iter().collect())
        .unwrap_or_default();
    entries.sort_by(|a, b| timestamp_key(&a.start_timestamp).cmp(&timestamp_key(&b.start_timestamp)));

    let transcript = entries
        .iter()
        .map(|entry| entry.text.as_str())
        .collect::<Vec<_>>()
        .join("\n");

    Ok(Transcript {
        id: id.to_string(),
        transcript,
    })
}
