//! Google Gemini provider implementation.
//!
//! Calls `models/{model}:streamGenerateContent` without `alt=sse`, so the body
//! is a single JSON array streamed element by element. Elements are decoded
//! with [`JsonArrayDecoder`] and turned into [`Part`]s as they complete.

use crate::{
    error::ProviderError,
    json_array::JsonArrayDecoder,
    message::{ContentPart, Message, Role, ToolCall},
    stream::Part,
    GenerateOptions, LanguageModel, ProviderResult, ToolDefinition,
};
use async_stream::try_stream;
use async_trait::async_trait;
use futures::stream::BoxStream;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::time::Duration;
use tracing::{debug, trace, warn};
use url::Url;

/// Default Generative Language API base.
pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Default model.
pub const DEFAULT_MODEL: &str = "gemini-1.5-pro-latest";

const API_KEY_HEADER: &str = "x-goog-api-key";

/// Longest upstream error body echoed back in an error message.
const MAX_ERROR_BODY: usize = 500;

/// Google Gemini provider.
pub struct GeminiProvider {
    client: reqwest::Client,
    api_key: String,
    model: String,
    api_base: String,
}

impl GeminiProvider {
    /// Create a new Gemini provider.
    pub fn new(api_key: &str, model: &str) -> ProviderResult<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .connect_timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| ProviderError::internal(e.to_string()))?;

        Ok(Self {
            client,
            api_key: api_key.to_string(),
            model: model.to_string(),
            api_base: DEFAULT_API_BASE.to_string(),
        })
    }

    /// Use a different API base URL.
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    /// Get the streaming endpoint URL.
    fn stream_url(&self) -> ProviderResult<Url> {
        let url = format!(
            "{}/models/{}:streamGenerateContent",
            self.api_base.trim_end_matches('/'),
            self.model
        );
        Ok(Url::parse(&url)?)
    }

    fn api_key_header(&self) -> ProviderResult<HeaderValue> {
        let mut value = HeaderValue::from_str(&self.api_key)
            .map_err(|_| ProviderError::InvalidApiKey("google".to_string()))?;
        value.set_sensitive(true);
        Ok(value)
    }

    /// Build the request body.
    fn build_body(messages: &[Message], options: &GenerateOptions) -> Value {
        let mut generation_config = json!({});
        if let Some(temperature) = options.temperature {
            generation_config["temperature"] = json!(temperature);
        }
        if let Some(max_tokens) = options.max_output_tokens {
            generation_config["maxOutputTokens"] = json!(max_tokens);
        }

        let mut body = json!({
            "contents": convert_messages(messages),
            "generationConfig": generation_config,
        });

        if !options.safety_settings.is_empty() {
            body["safetySettings"] = json!(options.safety_settings);
        }

        if let Some(system) = &options.system {
            body["systemInstruction"] = json!({
                "parts": [{ "text": system }]
            });
        }

        let tools = convert_tools(&options.tools);
        if !tools.is_null() {
            body["tools"] = tools;
        }

        body
    }
}

/// Convert our messages to Gemini contents.
///
/// Adjacent messages with the same role are merged into one content entry, so
/// all function responses for one model turn travel together.
fn convert_messages(messages: &[Message]) -> Vec<Value> {
    let mut contents: Vec<(Role, Vec<Value>)> = Vec::new();

    for msg in messages {
        let parts = convert_parts(&msg.content);
        if parts.is_empty() {
            continue;
        }
        match contents.last_mut() {
            Some((role, existing)) if *role == msg.role => existing.extend(parts),
            _ => contents.push((msg.role, parts)),
        }
    }

    contents
        .into_iter()
        .map(|(role, parts)| {
            let role = match role {
                Role::User => "user",
                Role::Assistant => "model",
                Role::Function => "function",
            };
            json!({ "role": role, "parts": parts })
        })
        .collect()
}

/// Convert content parts to Gemini format.
fn convert_parts(parts: &[ContentPart]) -> Vec<Value> {
    parts
        .iter()
        .filter_map(|part| match part {
            ContentPart::Text { text } if text.is_empty() => None,
            ContentPart::Text { text } => Some(json!({ "text": text })),
            ContentPart::FunctionCall { call } => Some(json!({
                "functionCall": {
                    "name": call.name,
                    "args": call.arguments
                }
            })),
            ContentPart::FunctionResponse { name, content } => Some(json!({
                "functionResponse": {
                    "name": name,
                    "response": {
                        "name": name,
                        "content": content
                    }
                }
            })),
        })
        .collect()
}

/// Convert tools to Gemini format.
fn convert_tools(tools: &[ToolDefinition]) -> Value {
    if tools.is_empty() {
        return Value::Null;
    }

    let function_declarations: Vec<Value> = tools
        .iter()
        .map(|tool| {
            json!({
                "name": tool.name,
                "description": tool.description,
                "parameters": tool.parameters
            })
        })
        .collect();

    json!([{
        "functionDeclarations": function_declarations
    }])
}

#[async_trait]
impl LanguageModel for GeminiProvider {
    async fn generate(
        &self,
        messages: Vec<Message>,
        options: GenerateOptions,
    ) -> ProviderResult<BoxStream<'static, ProviderResult<Part>>> {
        let url = self.stream_url()?;
        let body = Self::build_body(&messages, &options);

        debug!(
            model = %self.model,
            messages = messages.len(),
            tools = options.tools.len(),
            "Sending Gemini request"
        );
        trace!(body = %body, "Gemini request body");

        let response = self
            .client
            .post(url)
            .header(API_KEY_HEADER, self.api_key_header()?)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            warn!(status = %status, "Gemini error response");
            return Err(ProviderError::api_error(
                status.as_u16(),
                error_message(&text),
            ));
        }

        let mut byte_stream = Box::pin(response.bytes_stream());

        Ok(Box::pin(try_stream! {
            use futures::StreamExt;

            let mut decoder = JsonArrayDecoder::new();

            while let Some(chunk) = byte_stream.next().await {
                let chunk = chunk?;
                trace!(bytes = chunk.len(), "Gemini chunk");
                for element in decoder.feed(&chunk)? {
                    for part in parts_from_element(element)? {
                        yield part;
                    }
                }
            }

            decoder.finish()?;
        }))
    }

    fn model_id(&self) -> &str {
        &self.model
    }

    fn provider_id(&self) -> &str {
        "google"
    }
}

/// Yield the items of an optional collection, treating absence as empty.
fn present<I: IntoIterator>(value: Option<I>) -> std::iter::Flatten<std::option::IntoIter<I>> {
    value.into_iter().flatten()
}

/// Decode each value as `T`, skipping (and logging) the ones that do not fit.
fn decode_each<T: DeserializeOwned>(
    values: Option<Vec<Value>>,
    what: &'static str,
) -> impl Iterator<Item = T> {
    present(values).filter_map(move |value| match serde_json::from_value(value) {
        Ok(decoded) => Some(decoded),
        Err(e) => {
            warn!(error = %e, kind = what, "Skipping Gemini value with unexpected shape");
            None
        }
    })
}

/// Decode one array element into parts.
///
/// Missing or mistyped fields skip the element, candidate or part they belong
/// to without dropping their siblings; only an explicit `error` object is an
/// error.
fn parts_from_element(element: Value) -> ProviderResult<Vec<Part>> {
    let response: GeminiStreamResponse = match serde_json::from_value(element) {
        Ok(response) => response,
        Err(e) => {
            warn!(error = %e, "Skipping Gemini response element with unexpected shape");
            return Ok(Vec::new());
        }
    };

    if let Some(error) = response.error {
        return Err(error.into());
    }

    let mut parts = Vec::new();
    for candidate in decode_each::<GeminiCandidate>(response.candidates, "candidate") {
        if let Some(reason) = candidate.finish_reason.as_deref() {
            if reason != "STOP" {
                debug!(reason, "Gemini candidate finished");
            }
        }
        let content = candidate.content.and_then(|c| c.parts);
        for part in decode_each::<GeminiPart>(content, "part") {
            parts.extend(part.into_parts());
        }
    }
    Ok(parts)
}

/// Pull a readable message out of an error response body.
fn error_message(body: &str) -> String {
    let parsed: Option<GeminiErrorEnvelope> = serde_json::from_str::<GeminiErrorEnvelope>(body)
        .ok()
        .or_else(|| {
            serde_json::from_str::<Vec<GeminiErrorEnvelope>>(body)
                .ok()
                .and_then(|v| v.into_iter().next())
        });

    match parsed.and_then(|e| e.error).and_then(|e| e.message) {
        Some(message) => message,
        None => body.chars().take(MAX_ERROR_BODY).collect(),
    }
}

/// Gemini streaming response element.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiStreamResponse {
    candidates: Option<Vec<Value>>,
    error: Option<GeminiError>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiCandidate {
    content: Option<GeminiContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiContent {
    parts: Option<Vec<Value>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiPart {
    text: Option<String>,
    function_call: Option<GeminiFunctionCall>,
}

impl GeminiPart {
    fn into_parts(self) -> impl Iterator<Item = Part> {
        let text = self.text.filter(|t| !t.is_empty()).map(Part::Text);
        let call = present(self.function_call.map(GeminiFunctionCall::into_tool_call))
            .map(Part::FunctionCall);
        text.into_iter().chain(call)
    }
}

#[derive(Debug, Deserialize)]
struct GeminiFunctionCall {
    name: Option<String>,
    args: Option<Value>,
}

impl GeminiFunctionCall {
    /// Convert to a tool call; a call without a name is dropped.
    fn into_tool_call(self) -> Option<ToolCall> {
        let name = self.name.filter(|n| !n.is_empty())?;
        let arguments = match self.args {
            Some(Value::Object(map)) => map,
            None | Some(Value::Null) => Map::new(),
            Some(other) => {
                warn!(function = %name, args = %other, "Ignoring non-object function arguments");
                Map::new()
            }
        };
        Some(ToolCall::new(name, arguments))
    }
}

#[derive(Debug, Deserialize)]
struct GeminiErrorEnvelope {
    error: Option<GeminiError>,
}

#[derive(Debug, Deserialize)]
struct GeminiError {
    code: Option<u16>,
    message: Option<String>,
    status: Option<String>,
}

impl From<GeminiError> for ProviderError {
    fn from(error: GeminiError) -> Self {
        let message = match (error.status, error.message) {
            (Some(status), Some(message)) => format!("{status}: {message}"),
            (None, Some(message)) => message,
            (Some(status), None) => status,
            (None, None) => "unknown error".to_string(),
        };
        ProviderError::api_error(error.code.unwrap_or(500), message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SafetySetting;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn read_file_tool() -> ToolDefinition {
        ToolDefinition {
            name: "read_file".to_string(),
            description: "Read a file".to_string(),
            parameters: json!({
                "type": "object",
                "properties": { "path": { "type": "string" } }
            }),
        }
    }

    fn call(name: &str, args: Value) -> ToolCall {
        match args {
            Value::Object(map) => ToolCall::new(name, map),
            _ => ToolCall::new(name, Map::new()),
        }
    }

    #[test]
    fn test_build_body() {
        let options = GenerateOptions {
            temperature: Some(0.4),
            max_output_tokens: Some(2048),
            system: Some("Workspace root: /ws".to_string()),
            tools: vec![read_file_tool()],
            safety_settings: SafetySetting::defaults(),
        };
        let messages = vec![Message::user("hi"), Message::assistant("hello")];

        let body = GeminiProvider::build_body(&messages, &options);

        assert_eq!(body["contents"][0]["role"], "user");
        assert_eq!(body["contents"][0]["parts"][0]["text"], "hi");
        assert_eq!(body["contents"][1]["role"], "model");
        assert_eq!(body["generationConfig"]["maxOutputTokens"], 2048);
        assert!((body["generationConfig"]["temperature"].as_f64().unwrap() - 0.4).abs() < 1e-6);
        assert_eq!(
            body["safetySettings"],
            json!([{ "category": "HARM_CATEGORY_DANGEROUS_CONTENT", "threshold": "BLOCK_ONLY_HIGH" }])
        );
        assert_eq!(body["systemInstruction"]["parts"][0]["text"], "Workspace root: /ws");
        assert_eq!(
            body["tools"][0]["functionDeclarations"][0]["name"],
            "read_file"
        );
    }

    #[test]
    fn test_build_body_without_tools() {
        let body = GeminiProvider::build_body(&[Message::user("hi")], &GenerateOptions::default());
        assert!(body.get("tools").is_none());
        assert!(body.get("systemInstruction").is_none());
        assert!(body.get("safetySettings").is_none());
    }

    #[test]
    fn test_function_turns_are_merged() {
        let model_turn = Message {
            role: Role::Assistant,
            content: vec![
                ContentPart::FunctionCall {
                    call: call("list_directory", json!({ "path": "" })),
                },
                ContentPart::FunctionCall {
                    call: call("read_file", json!({ "path": "A.java" })),
                },
            ],
        };
        let messages = vec![
            Message::user("list files"),
            model_turn,
            Message::function_response("list_directory", "[file] A.java"),
            Message::function_response("read_file", "class A {}"),
        ];

        let contents = convert_messages(&messages);
        assert_eq!(contents.len(), 3);
        assert_eq!(contents[1]["parts"][0]["functionCall"]["name"], "list_directory");
        assert_eq!(contents[1]["parts"][1]["functionCall"]["args"]["path"], "A.java");
        assert_eq!(contents[2]["role"], "function");
        assert_eq!(contents[2]["parts"].as_array().unwrap().len(), 2);
        assert_eq!(
            contents[2]["parts"][1]["functionResponse"]["response"]["content"],
            "class A {}"
        );
    }

    #[test]
    fn test_empty_text_parts_dropped() {
        let contents = convert_messages(&[Message::assistant(""), Message::user("hi")]);
        assert_eq!(contents.len(), 1);
        assert_eq!(contents[0]["role"], "user");
    }

    #[test]
    fn test_parts_from_element() {
        let element = json!({
            "candidates": [{
                "content": {
                    "role": "model",
                    "parts": [
                        { "text": "Let me look." },
                        { "functionCall": { "name": "list_directory", "args": { "path": "" } } }
                    ]
                },
                "finishReason": "STOP"
            }]
        });

        let parts = parts_from_element(element).unwrap();
        assert_eq!(
            parts,
            vec![
                Part::Text("Let me look.".to_string()),
                Part::FunctionCall(call("list_directory", json!({ "path": "" }))),
            ]
        );
    }

    #[test]
    fn test_parts_from_element_skips_missing_levels() {
        assert!(parts_from_element(json!({})).unwrap().is_empty());
        assert!(parts_from_element(json!({ "candidates": [] })).unwrap().is_empty());
        assert!(parts_from_element(json!({ "candidates": [{}] })).unwrap().is_empty());
        assert!(parts_from_element(json!({ "candidates": [{ "content": {} }] }))
            .unwrap()
            .is_empty());
        assert!(parts_from_element(json!({
            "candidates": [{ "content": { "parts": [{}, { "text": "" }, { "functionCall": {} }] } }]
        }))
        .unwrap()
        .is_empty());
        assert!(parts_from_element(json!({ "usageMetadata": { "totalTokenCount": 3 } }))
            .unwrap()
            .is_empty());
        assert!(parts_from_element(json!({ "candidates": "nonsense" }))
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_mistyped_part_keeps_siblings() {
        let parts = parts_from_element(json!({
            "candidates": [
                { "content": { "parts": [
                    { "text": 5 },
                    { "text": "Reading it." },
                    { "functionCall": { "name": 7 } },
                    { "functionCall": { "name": "read_file", "args": { "path": "A.java" } } }
                ] } },
                { "content": "not an object" },
                { "content": { "parts": [{ "text": "Done." }] } }
            ]
        }))
        .unwrap();

        assert_eq!(
            parts,
            vec![
                Part::Text("Reading it.".to_string()),
                Part::FunctionCall(call("read_file", json!({ "path": "A.java" }))),
                Part::Text("Done.".to_string()),
            ]
        );
    }

    #[test]
    fn test_function_call_without_args() {
        let parts = parts_from_element(json!({
            "candidates": [{ "content": { "parts": [{ "functionCall": { "name": "list_directory" } }] } }]
        }))
        .unwrap();
        assert_eq!(parts, vec![Part::FunctionCall(ToolCall::new("list_directory", Map::new()))]);
    }

    #[test]
    fn test_error_element() {
        let err = parts_from_element(json!({
            "error": { "code": 429, "message": "Resource exhausted", "status": "RESOURCE_EXHAUSTED" }
        }))
        .unwrap_err();
        match err {
            ProviderError::ApiError { status, message } => {
                assert_eq!(status, 429);
                assert_eq!(message, "RESOURCE_EXHAUSTED: Resource exhausted");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_error_message() {
        assert_eq!(
            error_message(r#"{"error":{"code":400,"message":"API key not valid"}}"#),
            "API key not valid"
        );
        assert_eq!(
            error_message(r#"[{"error":{"code":400,"message":"bad"}}]"#),
            "bad"
        );
        assert_eq!(error_message("upstream down"), "upstream down");
    }

    #[test]
    fn test_stream_url() {
        let provider = GeminiProvider::new("key", "gemini-test")
            .unwrap()
            .with_api_base("http://localhost:9999/v1beta/");
        assert_eq!(
            provider.stream_url().unwrap().as_str(),
            "http://localhost:9999/v1beta/models/gemini-test:streamGenerateContent"
        );
    }

    #[tokio::test]
    async fn test_generate_turn_against_server() {
        let server = MockServer::start().await;
        let body = concat!(
            "[{\"candidates\": [{\"content\": {\"role\": \"model\", \"parts\": [{\"text\": \"Hello\"}]}}]}\n",
            ",\r\n",
            "{\"candidates\": [{\"content\": {\"role\": \"model\", \"parts\": [{\"text\": \" there\"}]}, \"finishReason\": \"STOP\"}]}\n",
            "]"
        );

        Mock::given(method("POST"))
            .and(path("/v1beta/models/gemini-test:streamGenerateContent"))
            .and(header("x-goog-api-key", "test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(body, "application/json"))
            .expect(1)
            .mount(&server)
            .await;

        let provider = GeminiProvider::new("test-key", "gemini-test")
            .unwrap()
            .with_api_base(format!("{}/v1beta", server.uri()));

        let options = GenerateOptions {
            tools: vec![read_file_tool()],
            ..Default::default()
        };
        let turn = provider
            .generate_turn(vec![Message::user("hi")], options)
            .await
            .unwrap();

        assert_eq!(turn.texts().collect::<String>(), "Hello there");

        let requests = server.received_requests().await.unwrap();
        let sent: Value = serde_json::from_slice(&requests[0].body).unwrap();
        assert_eq!(sent["contents"][0]["parts"][0]["text"], "hi");
        assert_eq!(sent["tools"][0]["functionDeclarations"][0]["name"], "read_file");
        assert!(!requests[0].url.as_str().contains("test-key"));
    }

    #[tokio::test]
    async fn test_generate_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(403).set_body_raw(
                r#"{"error":{"code":403,"message":"API key not valid","status":"PERMISSION_DENIED"}}"#,
                "application/json",
            ))
            .mount(&server)
            .await;

        let provider = GeminiProvider::new("bad-key", "gemini-test")
            .unwrap()
            .with_api_base(server.uri());

        let result = provider
            .generate_turn(vec![Message::user("hi")], GenerateOptions::default())
            .await;
        match result {
            Err(ProviderError::ApiError { status, message }) => {
                assert_eq!(status, 403);
                assert_eq!(message, "API key not valid");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_generate_truncated_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(
                r#"[{"candidates": [{"content": {"parts": [{"text": "partial"#,
                "application/json",
            ))
            .mount(&server)
            .await;

        let provider = GeminiProvider::new("key", "gemini-test")
            .unwrap()
            .with_api_base(server.uri());

        let result = provider
            .generate_turn(vec![Message::user("hi")], GenerateOptions::default())
            .await;
        assert!(matches!(result, Err(ProviderError::StreamInterrupted(_))));
    }

    #[tokio::test]
    async fn test_generate_error_element_mid_stream() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(
                r#"[{"candidates":[{"content":{"parts":[{"text":"a"}]}}]},{"error":{"code":503,"message":"overloaded"}}]"#,
                "application/json",
            ))
            .mount(&server)
            .await;

        let provider = GeminiProvider::new("key", "gemini-test")
            .unwrap()
            .with_api_base(server.uri());

        let result = provider
            .generate_turn(vec![Message::user("hi")], GenerateOptions::default())
            .await;
        assert!(matches!(result, Err(ProviderError::ApiError { status: 503, .. })));
    }
}
