//! Line-delimited JSON driver for the cache tools.
//!
//! Each stdin line is a request `{"id": .., "tool": .., "arguments": {..}}`;
//! each stdout line is the matching `{"id", "content": [{"type": "text", "text"}], "isError"}`.
//! Requests run concurrently, so responses may come back out of order.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::tools::{ToolBox, ToolOutput};

#[derive(Debug, Deserialize)]
struct Request {
    #[serde(default)]
    id: Value,
    tool: String,
    #[serde(default)]
    arguments: Value,
}

#[derive(Debug, Serialize)]
struct Response {
    id: Value,
    content: Vec<Content>,
    #[serde(rename = "isError")]
    is_error: bool,
}

#[derive(Debug, Serialize)]
struct Content {
    #[serde(rename = "type")]
    kind: &'static str,
    text: String,
}

impl Response {
    fn new(id: Value, output: ToolOutput) -> Self {
        Self {
            id,
            content: vec![Content {
                kind: "text",
                text: output.text,
            }],
            is_error: output.is_error,
        }
    }
}

/// Serve requests from `reader` until it is exhausted and every pending
/// request has been answered.
///
/// Cancelling `shutdown` stops reading and cancels in-flight polls; their
/// cancellation errors are still written out before returning.
pub async fn serve<R, W>(
    toolbox: Arc<ToolBox>,
    reader: R,
    mut writer: W,
    shutdown: CancellationToken,
) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = reader.lines();
    let mut in_flight = JoinSet::new();
    let mut reading = true;

    while reading || !in_flight.is_empty() {
        tokio::select! {
            line = lines.next_line(), if reading => {
                match line.context("Failed to read request line")? {
                    Some(line) if line.trim().is_empty() => {}
                    Some(line) => {
                        let toolbox = toolbox.clone();
                        let cancel = shutdown.child_token();
                        in_flight.spawn(async move { handle_line(&toolbox, &line, &cancel).await });
                    }
                    None => {
                        log::info!("Driver: input closed, {} request(s) pending", in_flight.len());
                        reading = false;
                    }
                }
            }
            _ = shutdown.cancelled(), if reading => {
                log::info!("Driver: shutting down, cancelling {} request(s)", in_flight.len());
                reading = false;
            }
            Some(done) = in_flight.join_next(), if !in_flight.is_empty() => {
                let response = done.context("Request task failed")?;
                write_response(&mut writer, &response).await?;
            }
        }
    }

    Ok(())
}

async fn handle_line(toolbox: &ToolBox, line: &str, cancel: &CancellationToken) -> Response {
    let request: Request = match serde_json::from_str(line) {
        Ok(request) => request,
        Err(e) => {
            log::warn!("Driver: malformed request: {}", e);
            return Response::new(Value::Null, ToolOutput::error(format!("Invalid request: {}", e)));
        }
    };

    let output = toolbox.call(&request.tool, request.arguments, cancel).await;
    Response::new(request.id, output)
}

async fn write_response<W: AsyncWrite + Unpin>(writer: &mut W, response: &Response) -> Result<()> {
    let mut line = serde_json::to_vec(response).context("Failed to encode response")?;
    line.push(b'\n');
    writer.write_all(&line).await.context("Failed to write response")?;
    writer.flush().await.context("Failed to flush response")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accessor::CacheAccessor;
    use crate::poll::PollPolicy;
    use crate::state::testing::{state_from, ScriptedSource};
    use serde_json::json;
    use tokio::io::BufReader;

    fn toolbox() -> Arc<ToolBox> {
        let state = state_from(json!({
            "documents": {
                "B": { "id": "B", "title": "Planning", "created_at": "2024-02-01", "notes_plain": "Scope agreed" },
                "P": { "id": "P", "title": "Pending", "created_at": "2024-02-02" }
            },
            "transcripts": {}
        }));
        let source = Arc::new(ScriptedSource::fixed(state));
        Arc::new(ToolBox::new(CacheAccessor::new(source, PollPolicy::default())))
    }

    async fn run(input: &str, shutdown: CancellationToken) -> Vec<Value> {
        let mut output = Vec::new();
        serve(toolbox(), BufReader::new(input.as_bytes()), &mut output, shutdown)
            .await
            .unwrap();

        String::from_utf8(output)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect()
    }

    #[tokio::test]
    async fn test_answers_each_request() {
        let input = concat!(
            r#"{"id": 1, "tool": "get_note", "arguments": {"id": "B"}}"#,
            "\n\n",
            r#"{"id": "two", "tool": "list_notes"}"#,
            "\n",
        );
        let responses = run(input, CancellationToken::new()).await;
        assert_eq!(responses.len(), 2);

        let by_id = |id: Value| responses.iter().find(|r| r["id"] == id).unwrap();
        let text = |r: &Value| r["content"][0]["text"].as_str().unwrap().to_string();

        let first = by_id(json!(1));
        assert_eq!(first["isError"], json!(false));
        assert_eq!(first["content"][0]["type"], json!("text"));
        let note: Value = serde_json::from_str(&text(first)).unwrap();
        assert_eq!(note["summary"], json!("Scope agreed"));

        let second = by_id(json!("two"));
        let notes: Vec<Value> = serde_json::from_str(&text(second)).unwrap();
        assert_eq!(notes.len(), 2);
    }

    #[tokio::test]
    async fn test_malformed_request() {
        let responses = run("{not json}\n", CancellationToken::new()).await;

        assert_eq!(responses.len(), 1);
        assert_eq!(responses[0]["id"], Value::Null);
        assert_eq!(responses[0]["isError"], json!(true));
        assert!(responses[0]["content"][0]["text"]
            .as_str()
            .unwrap()
            .starts_with("Invalid request"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_input_close_waits_for_pending_polls() {
        let started = tokio::time::Instant::now();
        let input = r#"{"id": 7, "tool": "get_note", "arguments": {"id": "P"}}"#;
        let responses = run(input, CancellationToken::new()).await;

        assert_eq!(responses.len(), 1);
        assert_eq!(responses[0]["isError"], json!(false));
        assert!(started.elapsed() >= std::time::Duration::from_secs(60));
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_cancels_pending_polls() {
        let shutdown = CancellationToken::new();
        let trigger = shutdown.clone();
        tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_secs(3)).await;
            trigger.cancel();
        });

        let input = r#"{"id": 8, "tool": "get_note", "arguments": {"id": "P"}}"#;
        let responses = run(input, shutdown).await;

        assert_eq!(responses.len(), 1);
        assert_eq!(responses[0]["isError"], json!(true));
        assert_eq!(responses[0]["content"][0]["text"], json!("request cancelled"));
    }
}
