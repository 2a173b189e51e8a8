//! LanguageModel trait — the abstraction over LLM backends.
//!
//! The engine calls the model in three ways: a complete text response, a
//! structured response constrained to a JSON schema, and a stream of chunks
//! for the user-facing reply. Implementations (OpenAI-compatible, mocks)
//! live behind this trait; the engine never knows which one it is talking to.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use crate::error::LanguageModelError;

/// The role of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

/// A single prompt message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: ChatRole::System, content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: ChatRole::User, content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: ChatRole::Assistant, content: content.into() }
    }
}

/// A request to the language model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionRequest {
    /// The model to use (e.g., "gpt-4o").
    pub model: String,

    /// The prompt messages.
    pub messages: Vec<ChatMessage>,

    /// Temperature (0.0 = deterministic).
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Maximum tokens to generate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    /// When set, the model must return JSON conforming to this schema.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_schema: Option<serde_json::Value>,
}

fn default_temperature() -> f32 {
    0.7
}

impl CompletionRequest {
    /// A plain system + user request.
    pub fn new(model: impl Into<String>, system: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            messages: vec![ChatMessage::system(system), ChatMessage::user(user)],
            temperature: default_temperature(),
            max_tokens: None,
            response_schema: None,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_schema(mut self, schema: serde_json::Value) -> Self {
        self.response_schema = Some(schema);
        self
    }
}

/// A complete (non-streaming) model response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Completion {
    /// The generated text (JSON text when a schema was requested).
    pub content: String,

    /// Which model actually responded.
    pub model: String,
}

impl Completion {
    /// Parse the content as schema-constrained JSON into `T`.
    pub fn parse_json<T: serde::de::DeserializeOwned>(&self) -> Result<T, LanguageModelError> {
        // Some providers wrap JSON in a markdown fence even in JSON mode.
        let trimmed = self.content.trim();
        let body = trimmed
            .strip_prefix("```json")
            .or_else(|| trimmed.strip_prefix("```"))
            .map(|s| s.trim_end_matches("```").trim())
            .unwrap_or(trimmed);
        serde_json::from_str(body)
            .map_err(|e| LanguageModelError::InvalidResponse(format!("schema parse failed: {e}")))
    }
}

/// A single chunk in a streaming response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionChunk {
    /// Partial content delta.
    #[serde(default)]
    pub content: Option<String>,

    /// Whether this is the final chunk.
    #[serde(default)]
    pub done: bool,
}

/// The Language Model capability.
///
/// Every backend implements `complete()`; `stream()` and `embed()` have
/// defaults so simple implementations (and test mocks) stay small.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// A human-readable name for this backend (e.g., "openai", "mock").
    fn name(&self) -> &str;

    /// Send a request and get a complete response.
    async fn complete(&self, request: CompletionRequest) -> Result<Completion, LanguageModelError>;

    /// Send a request and get a stream of response chunks.
    ///
    /// Default implementation calls `complete()` and yields one chunk.
    async fn stream(
        &self,
        request: CompletionRequest,
    ) -> Result<
        tokio::sync::mpsc::Receiver<Result<CompletionChunk, LanguageModelError>>,
        LanguageModelError,
    > {
        let completion = self.complete(request).await?;
        let (tx, rx) = tokio::sync::mpsc::channel(1);
        let _ = tx
            .send(Ok(CompletionChunk {
                content: Some(completion.content),
                done: true,
            }))
            .await;
        Ok(rx)
    }

    /// Generate embeddings for the given texts.
    ///
    /// Default implementation reports the capability as unsupported.
    async fn embed(&self, _inputs: Vec<String>) -> Result<Vec<Vec<f32>>, LanguageModelError> {
        Err(LanguageModelError::NotConfigured(format!(
            "backend '{}' does not support embeddings",
            self.name()
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_builder_sets_messages() {
        let req = CompletionRequest::new("gpt-4o", "You are terse.", "Hello");
        assert_eq!(req.messages.len(), 2);
        assert_eq!(req.messages[0].role, ChatRole::System);
        assert_eq!(req.messages[1].role, ChatRole::User);
        assert!((req.temperature - 0.7).abs() < f32::EPSILON);
    }

    #[test]
    fn parse_json_plain() {
        let c = Completion {
            content: r#"{"selected_ids": ["a", "b"]}"#.into(),
            model: "m".into(),
        };
        #[derive(Deserialize)]
        struct Sel {
            selected_ids: Vec<String>,
        }
        let sel: Sel = c.parse_json().unwrap();
        assert_eq!(sel.selected_ids, vec!["a", "b"]);
    }

    #[test]
    fn parse_json_strips_markdown_fence() {
        let c = Completion {
            content: "```json\n{\"x\": 1}\n```".into(),
            model: "m".into(),
        };
        let v: serde_json::Value = c.parse_json().unwrap();
        assert_eq!(v["x"], 1);
    }

    #[test]
    fn parse_json_invalid_is_invalid_response() {
        let c = Completion {
            content: "not json at all".into(),
            model: "m".into(),
        };
        let err = c.parse_json::<serde_json::Value>().unwrap_err();
        assert!(matches!(err, LanguageModelError::InvalidResponse(_)));
    }

    struct Fixed;

    #[async_trait]
    impl LanguageModel for Fixed {
        fn name(&self) -> &str {
            "fixed"
        }

        async fn complete(
            &self,
            _request: CompletionRequest,
        ) -> Result<Completion, LanguageModelError> {
            Ok(Completion { content: "hi".into(), model: "fixed".into() })
        }
    }

    #[tokio::test]
    async fn default_stream_wraps_complete() {
        let model = Fixed;
        let mut rx = model
            .stream(CompletionRequest::new("fixed", "s", "u"))
            .await
            .unwrap();
        let chunk = rx.recv().await.unwrap().unwrap();
        assert_eq!(chunk.content.as_deref(), Some("hi"));
        assert!(chunk.done);
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn default_embed_is_not_configured() {
        let err = Fixed.embed(vec!["x".into()]).await.unwrap_err();
        assert!(matches!(err, LanguageModelError::NotConfigured(_)));
    }
}
