//! Scripted model for tests.
//!
//! Replays a queue of responses and records every call, so tests can assert
//! both on what the loop did and on the conversation it sent.

use async_stream::try_stream;
use async_trait::async_trait;
use futures::stream::BoxStream;
use serde_json::{Map, Value};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use toolbridge_provider::{
    ContentPart, GenerateOptions, LanguageModel, Message, Part, ProviderError, ProviderResult,
    ToolCall,
};

/// A response the provider can return.
#[derive(Debug, Clone)]
pub enum ScriptedResponse {
    /// Yield these parts as one turn.
    Turn(Vec<Part>),
    /// Fail the call before any part is produced.
    Error(String),
    /// Yield these parts, then fail mid-stream.
    StreamError(Vec<Part>, String),
    /// Never answer.
    Hang,
}

impl ScriptedResponse {
    /// A turn with a single text part.
    pub fn text(text: impl Into<String>) -> Self {
        Self::Turn(vec![Part::Text(text.into())])
    }

    /// A turn with a single function call.
    pub fn function_call(name: &str, args: Value) -> Self {
        Self::Turn(vec![function_call_part(name, args)])
    }
}

impl Default for ScriptedResponse {
    fn default() -> Self {
        ScriptedResponse::text("Test response")
    }
}

/// Build a function-call part from a JSON object.
pub fn function_call_part(name: &str, args: Value) -> Part {
    let arguments = match args {
        Value::Object(map) => map,
        _ => Map::new(),
    };
    Part::FunctionCall(ToolCall::new(name, arguments))
}

/// A recorded call to the provider.
#[derive(Debug, Clone)]
pub struct RecordedCall {
    /// The messages sent to the provider.
    pub messages: Vec<Message>,
    /// The options used for generation.
    pub options: GenerateOptions,
}

/// A provider that replays queued responses and records its calls.
#[derive(Clone)]
pub struct ScriptedProvider {
    calls: Arc<Mutex<Vec<RecordedCall>>>,
    responses: Arc<Mutex<VecDeque<ScriptedResponse>>>,
    /// Returned when the queue is empty.
    default_response: Arc<Mutex<ScriptedResponse>>,
}

impl ScriptedProvider {
    /// Create a new scripted provider.
    pub fn new() -> Self {
        Self {
            calls: Arc::new(Mutex::new(Vec::new())),
            responses: Arc::new(Mutex::new(VecDeque::new())),
            default_response: Arc::new(Mutex::new(ScriptedResponse::default())),
        }
    }

    /// Queue any response.
    pub fn with_response(self, response: ScriptedResponse) -> Self {
        self.responses.lock().unwrap().push_back(response);
        self
    }

    /// Queue a text turn.
    pub fn with_text(self, text: impl Into<String>) -> Self {
        self.with_response(ScriptedResponse::text(text))
    }

    /// Queue a turn with one function call.
    pub fn with_function_call(self, name: &str, args: Value) -> Self {
        self.with_response(ScriptedResponse::function_call(name, args))
    }

    /// Queue a turn with arbitrary parts.
    pub fn with_turn(self, parts: Vec<Part>) -> Self {
        self.with_response(ScriptedResponse::Turn(parts))
    }

    /// Queue an error response.
    pub fn with_error(self, message: impl Into<String>) -> Self {
        self.with_response(ScriptedResponse::Error(message.into()))
    }

    /// Set the response used once the queue is empty.
    pub fn with_default_response(self, response: ScriptedResponse) -> Self {
        *self.default_response.lock().unwrap() = response;
        self
    }

    /// Get all recorded calls.
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Get the number of calls made.
    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// Get the last call made.
    pub fn last_call(&self) -> Option<RecordedCall> {
        self.calls.lock().unwrap().last().cloned()
    }

    /// Function responses sent in the last call, as `(name, content)`.
    pub fn last_function_responses(&self) -> Vec<(String, String)> {
        self.last_call()
            .map(|call| {
                call.messages
                    .iter()
                    .flat_map(|msg| msg.content.iter())
                    .filter_map(|part| match part {
                        ContentPart::FunctionResponse { name, content } => {
                            Some((name.clone(), content.clone()))
                        }
                        _ => None,
                    })
                    .collect()
            })
            .unwrap_or_default()
    }
}

impl Default for ScriptedProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LanguageModel for ScriptedProvider {
    async fn generate(
        &self,
        messages: Vec<Message>,
        options: GenerateOptions,
    ) -> ProviderResult<BoxStream<'static, ProviderResult<Part>>> {
        self.calls
            .lock()
            .unwrap()
            .push(RecordedCall { messages, options });

        let response = {
            let mut responses = self.responses.lock().unwrap();
            match responses.pop_front() {
                Some(response) => response,
                None => self.default_response.lock().unwrap().clone(),
            }
        };

        match response {
            ScriptedResponse::Turn(parts) => Ok(Box::pin(futures::stream::iter(
                parts.into_iter().map(Ok),
            ))),
            ScriptedResponse::Error(message) => Err(ProviderError::internal(message)),
            ScriptedResponse::StreamError(parts, message) => Ok(Box::pin(try_stream! {
                for part in parts {
                    yield part;
                }
                Err(ProviderError::stream_interrupted(message))?;
            })),
            ScriptedResponse::Hang => futures::future::pending().await,
        }
    }

    fn model_id(&self) -> &str {
        "scripted-model"
    }

    fn provider_id(&self) -> &str {
        "scripted"
    }
}
