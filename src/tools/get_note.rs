use tokio_util::sync::CancellationToken;

use super::{DocumentId, Tool};
use crate::accessor::{CacheAccessor, Note};
use crate::error::CacheResult;

/// Fetches a note's title and summary, waiting for the summary if needed.
pub struct GetNoteTool {
    accessor: CacheAccessor,
}

impl GetNoteTool {
    pub fn new(accessor: CacheAccessor) -> Self {
        Self { accessor }
    }
}

#[async_trait::async_trait]
impl Tool for GetNoteTool {
    type Input = DocumentId;
    type Output = Note;

    fn name(&self) -> &str {
        "get_note"
    }

    fn description(&self) -> &str {
        "Get note title and summary"
    }

    async fn run(&self, input: DocumentId, cancel: &CancellationToken) -> CacheResult<Note> {
        self.accessor.get_note_with_cancel(&input.id, cancel).await
    }
}
