//! The tool-calling loop.
//!
//! Each request runs a small state machine:
//!
//! ```text
//! Sending ──turn──▶ AwaitingToolResults ──▶ Emitting ──text──▶ Done
//!    ▲                                          │
//!    └──────────── no text, under cap ──────────┘
//! Sending ──provider error──▶ Failed
//! ```
//!
//! The number of provider round-trips is bounded by
//! [`LoopConfig::max_iterations`]. When the cap is hit without any text the
//! loop ends as `Done` with whatever text accrued.

use crate::error::CoreError;
use crate::event::{EventSink, StreamEvent};
use crate::system_prompt::build_system_instruction;
use futures::StreamExt;
use std::sync::Arc;
use std::time::Duration;
use toolbridge_provider::{
    BoxedLanguageModel, GenerateOptions, Message, Part, SafetySetting, ToolDefinition, Turn,
};
use toolbridge_tools::{ToolContext, ToolLimits, ToolRegistry, WorkspaceContext};
use tracing::{debug, info, warn};

/// Configuration for the loop.
#[derive(Debug, Clone)]
pub struct LoopConfig {
    /// Provider round-trips per request.
    pub max_iterations: usize,
    /// Pause between streamed words.
    pub word_delay: Duration,
    /// Offer tools to the model.
    pub enable_tools: bool,
    /// Sampling temperature.
    pub temperature: f32,
    /// Output length cap.
    pub max_output_tokens: u32,
    /// Content safety thresholds.
    pub safety_settings: Vec<SafetySetting>,
    /// Tool limits.
    pub tool_limits: ToolLimits,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            max_iterations: 3,
            word_delay: Duration::from_millis(15),
            enable_tools: true,
            temperature: 0.4,
            max_output_tokens: 2048,
            safety_settings: SafetySetting::defaults(),
            tool_limits: ToolLimits::default(),
        }
    }
}

impl From<&crate::Config> for LoopConfig {
    fn from(config: &crate::Config) -> Self {
        Self {
            max_iterations: config.max_iterations,
            word_delay: config.word_delay(),
            enable_tools: config.enable_tools,
            temperature: config.temperature,
            max_output_tokens: config.max_output_tokens,
            safety_settings: SafetySetting::defaults(),
            tool_limits: config.tool_limits(),
        }
    }
}

/// Loop states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    /// Waiting on the provider.
    Sending,
    /// Running the turn's function calls.
    AwaitingToolResults,
    /// Streaming the turn's text.
    Emitting,
    /// Finished normally.
    Done,
    /// Finished with an error, or the client went away.
    Failed,
}

/// How a run ended.
#[derive(Debug, Clone, PartialEq)]
pub struct LoopOutcome {
    pub state: LoopState,
    /// Provider calls made.
    pub iterations: usize,
    /// All text sent to the client.
    pub text: String,
}

/// Drives the provider and tools for one request at a time.
pub struct Orchestrator {
    provider: BoxedLanguageModel,
    registry: Arc<ToolRegistry>,
    config: LoopConfig,
}

impl Orchestrator {
    /// Create a new orchestrator.
    pub fn new(provider: BoxedLanguageModel, registry: Arc<ToolRegistry>, config: LoopConfig) -> Self {
        Self {
            provider,
            registry,
            config,
        }
    }

    /// The model this loop talks to.
    pub fn provider(&self) -> &BoxedLanguageModel {
        &self.provider
    }

    /// Get the loop configuration.
    pub fn config(&self) -> &LoopConfig {
        &self.config
    }

    /// Tool schema offered to the model.
    pub fn tool_definitions(&self) -> Vec<ToolDefinition> {
        self.registry
            .all()
            .into_iter()
            .map(|t| ToolDefinition {
                name: t.id().to_string(),
                description: t.description().to_string(),
                parameters: t.parameters_schema(),
            })
            .collect()
    }

    fn options(&self, workspace: &WorkspaceContext, with_tools: bool) -> GenerateOptions {
        GenerateOptions {
            temperature: Some(self.config.temperature),
            max_output_tokens: Some(self.config.max_output_tokens),
            system: Some(build_system_instruction(workspace)),
            tools: if with_tools {
                self.tool_definitions()
            } else {
                Vec::new()
            },
            safety_settings: self.config.safety_settings.clone(),
        }
    }

    /// Run the loop for one request.
    ///
    /// Events are sent to `events` as they happen. The terminating `Done` is
    /// not sent here; it belongs to whoever owns the receiving end.
    pub async fn run(
        &self,
        conversation: Vec<Message>,
        workspace: WorkspaceContext,
        events: EventSink,
    ) -> LoopOutcome {
        if !self.config.enable_tools {
            let options = self.options(&workspace, false);
            return self.run_streaming(conversation, options, &events).await;
        }

        let ctx = match ToolContext::new(&workspace, self.config.tool_limits) {
            Ok(ctx) => ctx,
            Err(e) => return fail(&events, CoreError::from(e), 0, String::new()),
        };
        let options = self.options(&workspace, true);

        let mut conversation = conversation;
        let mut state = LoopState::Sending;
        let mut iterations = 0;
        let mut text = String::new();
        let mut turn = Turn::default();

        loop {
            if events.is_closed() && !matches!(state, LoopState::Done | LoopState::Failed) {
                info!(iterations, "Client disconnected; stopping");
                state = LoopState::Failed;
            }

            match state {
                LoopState::Sending => {
                    if iterations >= self.config.max_iterations {
                        warn!(
                            max_iterations = self.config.max_iterations,
                            "Iteration cap reached without a text reply"
                        );
                        state = LoopState::Done;
                        continue;
                    }
                    iterations += 1;
                    debug!(iteration = iterations, messages = conversation.len(), "Calling provider");

                    let request = self
                        .provider
                        .generate_turn(conversation.clone(), options.clone());
                    let result = tokio::select! {
                        result = request => result,
                        _ = events.closed() => {
                            info!(iteration = iterations, "Client disconnected; abandoning provider request");
                            state = LoopState::Failed;
                            continue;
                        }
                    };

                    match result {
                        Ok(next) => {
                            debug!(
                                iteration = iterations,
                                parts = next.parts.len(),
                                "Provider turn received"
                            );
                            if !next.is_empty() {
                                conversation.push(next.to_message());
                            }
                            turn = next;
                            state = LoopState::AwaitingToolResults;
                        }
                        Err(e) => return fail(&events, CoreError::from(e), iterations, text),
                    }
                }
                LoopState::AwaitingToolResults => {
                    for call in turn.function_calls() {
                        let arguments = call.arguments_value();
                        events.emit(StreamEvent::ToolUse {
                            name: call.name.clone(),
                            arguments: arguments.clone(),
                        });

                        let output = self.registry.execute(&call.name, &arguments, &ctx);

                        events.emit(StreamEvent::ToolResult {
                            name: call.name.clone(),
                            summary: output.text.clone(),
                            truncated: output.truncated,
                        });
                        conversation.push(Message::function_response(&call.name, output.text));
                    }
                    state = LoopState::Emitting;
                }
                LoopState::Emitting => {
                    for fragment in turn.texts() {
                        self.emit_words(&events, fragment).await;
                        text.push_str(fragment);
                    }
                    state = if turn.has_text() {
                        LoopState::Done
                    } else {
                        LoopState::Sending
                    };
                }
                LoopState::Done | LoopState::Failed => break,
            }
        }

        info!(iterations, state = ?state, chars = text.len(), "Loop finished");
        LoopOutcome {
            state,
            iterations,
            text,
        }
    }

    /// Single call without tools, forwarding text as it is decoded.
    async fn run_streaming(
        &self,
        conversation: Vec<Message>,
        options: GenerateOptions,
        events: &EventSink,
    ) -> LoopOutcome {
        let mut text = String::new();

        let request = self.provider.generate(conversation, options);
        let result = tokio::select! {
            result = request => result,
            _ = events.closed() => return disconnected(1, text),
        };
        let mut stream = match result {
            Ok(stream) => stream,
            Err(e) => return fail(events, CoreError::from(e), 1, text),
        };

        loop {
            let next = tokio::select! {
                next = stream.next() => next,
                _ = events.closed() => return disconnected(1, text),
            };
            match next {
                None => break,
                Some(Ok(Part::Text(fragment))) => {
                    events.emit(StreamEvent::text(fragment.clone()));
                    text.push_str(&fragment);
                }
                Some(Ok(Part::FunctionCall(call))) => {
                    warn!(function = %call.name, "Ignoring function call while tools are disabled");
                }
                Some(Err(e)) => return fail(events, CoreError::from(e), 1, text),
            }
        }

        LoopOutcome {
            state: LoopState::Done,
            iterations: 1,
            text,
        }
    }

    /// Stream a text fragment word by word.
    async fn emit_words(&self, events: &EventSink, fragment: &str) {
        for chunk in chunk_words(fragment) {
            if !events.emit(StreamEvent::text(chunk)) {
                return;
            }
            if !self.config.word_delay.is_zero() {
                tokio::time::sleep(self.config.word_delay).await;
            }
        }
    }
}

/// Split text into words, each keeping its trailing whitespace.
pub fn chunk_words(text: &str) -> impl Iterator<Item = &str> {
    text.split_inclusive(char::is_whitespace)
}

fn fail(events: &EventSink, error: CoreError, iterations: usize, text: String) -> LoopOutcome {
    warn!(error = %error, iterations, "Request failed");
    events.emit(StreamEvent::error(error.to_string()));
    LoopOutcome {
        state: LoopState::Failed,
        iterations,
        text,
    }
}

fn disconnected(iterations: usize, text: String) -> LoopOutcome {
    info!(iterations, "Client disconnected; abandoning provider request");
    LoopOutcome {
        state: LoopState::Failed,
        iterations,
        text,
    }
}
