//! Events streamed to the client while a request runs.

use serde_json::Value;
use tokio::sync::mpsc;

/// One client-facing event.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    /// A fragment of model text (not cumulative).
    Text { fragment: String },
    /// The model asked for a tool.
    ToolUse { name: String, arguments: Value },
    /// A tool finished. `summary` is the full tool text; the emitter shortens it.
    ToolResult {
        name: String,
        summary: String,
        truncated: bool,
    },
    /// The request failed.
    Error { message: String },
    /// End of the stream.
    Done,
}

impl StreamEvent {
    pub fn text(fragment: impl Into<String>) -> Self {
        Self::Text {
            fragment: fragment.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }
}

/// Sending half of a request's event channel.
///
/// Sends never block. Once the receiver is gone (the client disconnected)
/// every send is a no-op that reports `false`.
#[derive(Debug, Clone)]
pub struct EventSink {
    tx: mpsc::UnboundedSender<StreamEvent>,
}

impl EventSink {
    /// Create a sink and the receiver the emitter drains.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<StreamEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Send an event, returning whether anyone is still listening.
    pub fn emit(&self, event: StreamEvent) -> bool {
        self.tx.send(event).is_ok()
    }

    /// Whether the receiver has been dropped.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    /// Resolve once the receiver has been dropped.
    pub async fn closed(&self) {
        self.tx.closed().await
    }
}
