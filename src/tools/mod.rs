pub mod get_note;
pub mod get_transcript;
pub mod list_notes;

pub use get_note::GetNoteTool;
pub use get_transcript::GetTranscriptTool;
pub use list_notes::ListNotesTool;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::accessor::CacheAccessor;
use crate::error::CacheResult;

/// Tool trait for agent-invoked cache queries.
///
/// Not object-safe (associated types).
/// [`ToolBox`] dispatches by name to concrete types, not `dyn Tool`.
#[async_trait::async_trait]
pub trait Tool: Send + Sync {
    type Input: DeserializeOwned + Send;
    type Output: Serialize + Send;

    fn name(&self) -> &str;
    fn description(&self) -> &str;
    async fn run(&self, input: Self::Input, cancel: &CancellationToken) -> CacheResult<Self::Output>;
}

/// Arguments shared by the single-document tools.
#[derive(Debug, Clone, Deserialize)]
pub struct DocumentId {
    pub id: String,
}

/// Text-bearing tool result, flagged when it carries an error message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToolOutput {
    pub text: String,
    pub is_error: bool,
}

impl ToolOutput {
    pub fn success(text: String) -> Self {
        Self { text, is_error: false }
    }

    pub fn error(text: String) -> Self {
        Self { text, is_error: true }
    }

    /// Render a payload as pretty-printed JSON.
    fn json<T: Serialize>(payload: &T) -> Self {
        match serde_json::to_string_pretty(payload) {
            Ok(text) => Self::success(text),
            Err(e) => Self::error(format!("Failed to serialize result: {}", e)),
        }
    }
}

/// Routes tool calls by name to the three cache tools.
pub struct ToolBox {
    list_notes: ListNotesTool,
    get_note: GetNoteTool,
    get_transcript: GetTranscriptTool,
}

impl ToolBox {
    pub fn new(accessor: CacheAccessor) -> Self {
        Self {
            list_notes: ListNotesTool::new(accessor.clone()),
            get_note: GetNoteTool::new(accessor.clone()),
            get_transcript: GetTranscriptTool::new(accessor),
        }
    }

    /// Name and description of every available tool.
    pub fn describe(&self) -> Vec<(&str, &str)> {
        vec![
            (self.list_notes.name(), self.list_notes.description()),
            (self.get_note.name(), self.get_note.description()),
            (self.get_transcript.name(), self.get_transcript.description()),
        ]
    }

    pub async fn call(&self, name: &str, arguments: Value, cancel: &CancellationToken) -> ToolOutput {
        if name == self.list_notes.name() {
            invoke(&self.list_notes, arguments, cancel).await
        } else if name == self.get_note.name() {
            invoke(&self.get_note, arguments, cancel).await
        } else if name == self.get_transcript.name() {
            invoke(&self.get_transcript, arguments, cancel).await
        } else {
            log::warn!("ToolBox: unknown tool '{}'", name);
            ToolOutput::error(format!("Unknown tool: {}", name))
        }
    }
}

async fn invoke<T: Tool>(tool: &T, arguments: Value, cancel: &CancellationToken) -> ToolOutput {
    let arguments = if arguments.is_null() {
        Value::Object(Default::default())
    } else {
        arguments
    };

    let input: T::Input = match serde_json::from_value(arguments) {
        Ok(input) => input,
        Err(e) => return ToolOutput::error(format!("Invalid arguments for {}: {}", tool.name(), e)),
    };

    log::info!("ToolBox: running {}", tool.name());
    match tool.run(input, cancel).await {
        Ok(output) => ToolOutput::json(&output),
        Err(e) => {
            log::warn!("ToolBox: {} failed: {}", tool.name(), e);
            ToolOutput::error(e.to_string())
        }
    }
}
