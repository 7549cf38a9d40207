use tokio_util::sync::CancellationToken;

use super::{DocumentId, Tool};
use crate::accessor::{CacheAccessor, Transcript};
use crate::error::CacheResult;

/// Fetches the full transcript of a note in spoken order.
pub struct GetTranscriptTool {
    accessor: CacheAccessor,
}

impl GetTranscriptTool {
    pub fn new(accessor: CacheAccessor) -> Self {
        Self { accessor }
    }
}

#[async_trait::async_trait]
impl Tool for GetTranscriptTool {
    type Input = DocumentId;
    type Output = Transcript;

    fn name(&self) -> &str {
        "get_transcript"
    }

    fn description(&self) -> &str {
        "Get full transcript for a note"
    }

    async fn run(&self, input: DocumentId, cancel: &CancellationToken) -> CacheResult<Transcript> {
        log::debug!("GetTranscriptTool: fetching transcript for {}", input.id);
        self.accessor.get_transcript_with_cancel(&input.id, cancel).await
    }
}
