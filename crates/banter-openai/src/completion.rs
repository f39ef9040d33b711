//! Legacy text completion calls, streaming only.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::session::Session;
use crate::stream::EventStream;

/// Default text completion endpoint.
pub const DEFAULT_ENDPOINT: &str = "https://api.openai.com/v1/completions";

/// Streaming completion response.
pub type CompletionStream = EventStream<CompletionChunk>;

/// Client for the legacy text completion API.
#[derive(Clone)]
pub struct CompletionClient {
    session: Session,
    model: Option<String>,
    endpoint: String,
}

impl CompletionClient {
    /// Create a client against the default endpoint.
    pub fn new(session: Session) -> Self {
        Self {
            session,
            model: None,
            endpoint: DEFAULT_ENDPOINT.to_string(),
        }
    }

    /// Set the model used when a call does not name one.
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

    /// Open a streaming response delivered as incremental text chunks.
    pub async fn create_stream(
        &self,
        mut params: CompletionParams,
    ) -> Result<CompletionStream> {
        let model = params
            .model
            .as_deref()
            .filter(|model| !model.is_empty())
            .map(str::to_owned)
            .or_else(|| self.model.clone())
            .ok_or(Error::MissingModel)?;
        params.model = Some(model);
        params.stream = true;
        let response = self.session.post_stream(&self.endpoint, &params).await?;
        Ok(EventStream::from_response(response))
    }
}

/// Parameters for a text completion call.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CompletionParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub prompt: Vec<String>,
    pub stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suffix: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub n: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logprobs: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub echo: Option<bool>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub stop: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub presence_penalty: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frequency_penalty: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub best_of: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
}

/// One chunk of a streaming completion response.
#[derive(Debug, Clone, Deserialize)]
pub struct CompletionChunk {
    pub id: Option<String>,
    #[serde(default)]
    pub choices: Vec<CompletionChoice>,
    pub model: Option<String>,
}

/// One choice within a completion chunk, carrying raw text.
#[derive(Debug, Clone, Deserialize)]
pub struct CompletionChoice {
    #[serde(default)]
    pub text: String,
    pub index: Option<u32>,
    pub finish_reason: Option<String>,
}
