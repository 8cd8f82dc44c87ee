//! Upstream model client for toolbridge.
//!
//! The [`LanguageModel`] trait is the seam between the orchestration loop and
//! the model. [`google::GeminiProvider`] implements it over Gemini's
//! `streamGenerateContent` endpoint with function calling.

pub mod error;
pub mod google;
pub mod json_array;
pub mod message;
pub mod stream;

pub use error::{ProviderError, ProviderResult};
pub use google::GeminiProvider;
pub use message::{ContentPart, Message, Role, ToolCall};
pub use stream::{collect_turn, Part, Turn};

use async_trait::async_trait;
use futures::stream::BoxStream;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

/// Options for one generation request.
#[derive(Debug, Clone, Default)]
pub struct GenerateOptions {
    /// Temperature for sampling.
    pub temperature: Option<f32>,
    /// Maximum tokens to generate.
    pub max_output_tokens: Option<u32>,
    /// System instruction.
    pub system: Option<String>,
    /// Functions the model may call. Empty means no tool schema is sent.
    pub tools: Vec<ToolDefinition>,
    /// Content safety thresholds.
    pub safety_settings: Vec<SafetySetting>,
}

/// A tool definition for the AI.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolDefinition {
    /// Tool name.
    pub name: String,
    /// Tool description.
    pub description: String,
    /// JSON Schema for the tool parameters.
    pub parameters: Value,
}

/// A content safety threshold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SafetySetting {
    pub category: String,
    pub threshold: String,
}

impl SafetySetting {
    pub fn new(category: impl Into<String>, threshold: impl Into<String>) -> Self {
        Self {
            category: category.into(),
            threshold: threshold.into(),
        }
    }

    /// Block only high-probability dangerous content.
    pub fn defaults() -> Vec<Self> {
        vec![Self::new("HARM_CATEGORY_DANGEROUS_CONTENT", "BLOCK_ONLY_HIGH")]
    }
}

/// The main trait for AI language models.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Generate a streaming response.
    ///
    /// Parts are yielded as soon as they are decoded from the response.
    async fn generate(
        &self,
        messages: Vec<Message>,
        options: GenerateOptions,
    ) -> ProviderResult<BoxStream<'static, ProviderResult<Part>>>;

    /// Generate one complete turn.
    ///
    /// Waits for the whole response so that function calls and any trailing
    /// text are seen together.
    async fn generate_turn(
        &self,
        messages: Vec<Message>,
        options: GenerateOptions,
    ) -> ProviderResult<Turn> {
        let stream = self.generate(messages, options).await?;
        collect_turn(stream).await
    }

    /// Get the model ID.
    fn model_id(&self) -> &str;

    /// Get the provider ID (e.g., "google").
    fn provider_id(&self) -> &str;
}

/// A shared language model for dynamic dispatch.
pub type BoxedLanguageModel = Arc<dyn LanguageModel>;
