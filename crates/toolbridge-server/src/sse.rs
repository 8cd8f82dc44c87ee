//! Server-Sent Events support.
//!
//! Each [`StreamEvent`] becomes one `data: <json>\n\n` message. The stream
//! always ends with exactly one `done` message, written after the loop has
//! dropped its end of the channel.

use axum::response::sse::{Event, KeepAlive, KeepAliveStream, Sse};
use futures::stream::Stream;
use serde::Serialize;
use serde_json::Value;
use std::convert::Infallible;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedReceiver;
use toolbridge_core::StreamEvent;

/// Characters of tool output shown to the client.
pub const RESULT_PREVIEW_CHARS: usize = 200;

/// JSON shape of one event on the wire.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WireEvent {
    Text {
        chunk: String,
        done: bool,
    },
    ToolUse {
        tool: String,
        args: Value,
        done: bool,
    },
    ToolResult {
        tool: String,
        result: String,
        truncated: bool,
        done: bool,
    },
    Error {
        error: String,
        done: bool,
    },
    Done {
        chunk: String,
        done: bool,
    },
}

impl WireEvent {
    /// The terminating event.
    pub fn done() -> Self {
        Self::Done {
            chunk: String::new(),
            done: true,
        }
    }

    fn to_sse(&self) -> Option<Event> {
        match serde_json::to_string(self) {
            Ok(data) => Some(Event::default().data(data)),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to encode event");
                None
            }
        }
    }
}

impl From<StreamEvent> for WireEvent {
    fn from(event: StreamEvent) -> Self {
        match event {
            StreamEvent::Text { fragment } => Self::Text {
                chunk: fragment,
                done: false,
            },
            StreamEvent::ToolUse { name, arguments } => Self::ToolUse {
                tool: name,
                args: arguments,
                done: false,
            },
            StreamEvent::ToolResult {
                name,
                summary,
                truncated,
            } => {
                let (result, cut) = preview(&summary, RESULT_PREVIEW_CHARS);
                Self::ToolResult {
                    tool: name,
                    result,
                    truncated: truncated || cut,
                    done: false,
                }
            }
            StreamEvent::Error { message } => Self::Error {
                error: message,
                done: false,
            },
            StreamEvent::Done => Self::done(),
        }
    }
}

/// First `max_chars` characters of `text`, and whether anything was cut.
fn preview(text: &str, max_chars: usize) -> (String, bool) {
    match text.char_indices().nth(max_chars) {
        Some((end, _)) => (text[..end].to_string(), true),
        None => (text.to_string(), false),
    }
}

/// Turn a request's event channel into an SSE stream.
///
/// A `Done` received on the channel is dropped; the single `done` message is
/// appended once the channel closes.
pub fn event_stream(
    mut rx: UnboundedReceiver<StreamEvent>,
) -> impl Stream<Item = Result<Event, Infallible>> {
    async_stream::stream! {
        while let Some(event) = rx.recv().await {
            if matches!(event, StreamEvent::Done) {
                continue;
            }
            if let Some(sse) = WireEvent::from(event).to_sse() {
                yield Ok(sse);
            }
        }

        if let Some(sse) = WireEvent::done().to_sse() {
            yield Ok(sse);
        }
    }
}

/// Wrap an event stream in an SSE response with keep-alives.
pub fn sse_response<S>(stream: S) -> Sse<KeepAliveStream<S>>
where
    S: Stream<Item = Result<Event, Infallible>> + Send + 'static,
{
    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}
