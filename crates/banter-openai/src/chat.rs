//! Chat completion calls, batch and streaming.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::session::Session;
use crate::stream::EventStream;
use crate::types::{ChatMessage, Usage};

/// Default chat completion endpoint.
pub const DEFAULT_ENDPOINT: &str = "https://api.openai.com/v1/chat/completions";

/// Streaming chat response.
pub type ChatStream = EventStream<ChatChunk>;

/// Client for the chat completion API.
#[derive(Clone)]
pub struct ChatClient {
    session: Session,
    model: Option<String>,
    endpoint: String,
}

impl ChatClient {
    /// Create a client against the default endpoint.
    pub fn new(session: Session) -> Self {
        Self {
            session,
            model: None,
            endpoint: DEFAULT_ENDPOINT.to_string(),
        }
    }

    /// Set the model used when a call does not name one.
    ///
    /// An empty string counts as unset.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        let model = model.into();
        if !model.is_empty() {
            self.model = Some(model);
        }
        self
    }

    /// Point the client at a different endpoint.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    fn resolve_model(&self, requested: Option<&str>) -> Result<String> {
        requested
            .filter(|model| !model.is_empty())
            .map(str::to_owned)
            .or_else(|| self.model.clone())
            .ok_or(Error::MissingModel)
    }

    /// Request a complete response in one round trip.
    pub async fn create(&self, mut params: ChatParams) -> Result<ChatResponse> {
        params.model = Some(self.resolve_model(params.model.as_deref())?);
        params.stream = false;
        let response = self.session.post_json(&self.endpoint, &params).await?;
        Ok(response.json().await?)
    }

    /// Open a streaming response delivered as incremental chunks.
    pub async fn create_stream(&self, mut params: ChatParams) -> Result<ChatStream> {
        params.model = Some(self.resolve_model(params.model.as_deref())?);
        params.stream = true;
        let response = self.session.post_stream(&self.endpoint, &params).await?;
        Ok(EventStream::from_response(response))
    }
}

/// Parameters for a chat completion call.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ChatParams {
    /// Model to use; falls back to the client default when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// Conversation so far, oldest first.
    pub messages: Vec<ChatMessage>,
    /// Whether the response is streamed. Set by the client methods.
    pub stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub n: Option<u32>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub stop: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub presence_penalty: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frequency_penalty: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
}

/// One chunk of a streaming chat response.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatChunk {
    #[serde(default)]
    pub choices: Vec<ChunkChoice>,
}

/// One choice within a streaming chunk.
#[derive(Debug, Clone, Deserialize)]
pub struct ChunkChoice {
    #[serde(default)]
    pub delta: ChatDelta,
    pub finish_reason: Option<String>,
}

/// Incremental delta carried by a chunk choice.
///
/// The first chunk of a stream usually announces only the role; later
/// chunks carry content.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChatDelta {
    pub role: Option<String>,
    pub content: Option<String>,
}

/// Complete response to a batch chat call.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatResponse {
    pub id: Option<String>,
    pub object: Option<String>,
    pub created: Option<u64>,
    pub model: Option<String>,
    #[serde(default)]
    pub choices: Vec<ChatChoice>,
    pub usage: Option<Usage>,
}

/// One choice within a batch response.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatChoice {
    pub index: Option<u32>,
    pub message: Option<ChatMessage>,
    pub finish_reason: Option<String>,
}
