//! Model listing.

use serde::Deserialize;

use crate::error::Result;
use crate::session::Session;

/// Default model listing endpoint.
pub const DEFAULT_ENDPOINT: &str = "https://api.openai.com/v1/models";

/// Client for the model listing API.
#[derive(Clone)]
pub struct ModelsClient {
    session: Session,
    endpoint: String,
}

impl ModelsClient {
    /// Create a client against the default endpoint.
    pub fn new(session: Session) -> Self {
        Self {
            session,
            endpoint: DEFAULT_ENDPOINT.to_string(),
        }
    }

    /// Point the client at a different endpoint.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// List the models available to the account.
    pub async fn list(&self) -> Result<ModelList> {
        let response = self.session.get(&self.endpoint).await?;
        Ok(response.json().await?)
    }
}

/// Response to a model listing call.
#[derive(Debug, Clone, Deserialize)]
pub struct ModelList {
    pub object: Option<String>,
    #[serde(default)]
    pub data: Vec<ModelInfo>,
}

/// One available model.
#[derive(Debug, Clone, Deserialize)]
pub struct ModelInfo {
    pub id: String,
    pub object: Option<String>,
    pub owned_by: Option<String>,
    pub root: Option<String>,
}
