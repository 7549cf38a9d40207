use tokio_util::sync::CancellationToken;

use super::Tool;
use crate::accessor::{CacheAccessor, ListNotesOptions, NoteSummary};
use crate::error::CacheResult;

/// Lists live notes, newest first.
pub struct ListNotesTool {
    accessor: CacheAccessor,
}

impl ListNotesTool {
    pub fn new(accessor: CacheAccessor) -> Self {
        Self { accessor }
    }
}

#[async_trait::async_trait]
impl Tool for ListNotesTool {
    type Input = ListNotesOptions;
    type Output = Vec<NoteSummary>;

    fn name(&self) -> &str {
        "list_notes"
    }

    fn description(&self) -> &str {
        "List meeting notes with optional filters"
    }

    async fn run(&self, options: ListNotesOptions, _cancel: &CancellationToken) -> CacheResult<Vec<NoteSummary>> {
        self.accessor.list_notes(&options).await
    }
}
