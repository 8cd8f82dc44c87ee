//! Response parts and whole-turn accumulation.

use crate::message::{ContentPart, Message, Role, ToolCall};
use crate::ProviderResult;
use futures::stream::{Stream, StreamExt};

/// One decoded piece of a model response.
#[derive(Debug, Clone, PartialEq)]
pub enum Part {
    /// A text fragment.
    Text(String),
    /// A request to run a function.
    FunctionCall(ToolCall),
}

/// One complete model response, in the order the parts arrived.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Turn {
    pub parts: Vec<Part>,
}

impl Turn {
    /// Create a turn from parts.
    pub fn new(parts: Vec<Part>) -> Self {
        Self { parts }
    }

    /// Function calls in order.
    pub fn function_calls(&self) -> impl Iterator<Item = &ToolCall> {
        self.parts.iter().filter_map(|part| match part {
            Part::FunctionCall(call) => Some(call),
            Part::Text(_) => None,
        })
    }

    /// Text fragments in order.
    pub fn texts(&self) -> impl Iterator<Item = &str> {
        self.parts.iter().filter_map(|part| match part {
            Part::Text(text) => Some(text.as_str()),
            Part::FunctionCall(_) => None,
        })
    }

    /// Whether the model said anything.
    pub fn has_text(&self) -> bool {
        self.texts().next().is_some()
    }

    /// Whether the turn carries neither text nor function calls.
    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    /// The turn as a model message for the conversation history.
    pub fn to_message(&self) -> Message {
        let content = self
            .parts
            .iter()
            .map(|part| match part {
                Part::Text(text) => ContentPart::Text { text: text.clone() },
                Part::FunctionCall(call) => ContentPart::FunctionCall { call: call.clone() },
            })
            .collect();

        Message {
            role: Role::Assistant,
            content,
        }
    }
}

/// Drain a part stream into one turn, stopping at the first error.
pub async fn collect_turn<S>(stream: S) -> ProviderResult<Turn>
where
    S: Stream<Item = ProviderResult<Part>>,
{
    futures::pin_mut!(stream);
    let mut parts = Vec::new();
    while let Some(part) = stream.next().await {
        parts.push(part?);
    }
    Ok(Turn::new(parts))
}
