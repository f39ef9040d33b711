//! Error types for banter-openai

use thiserror::Error;

/// Result type alias using banter-openai Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur when talking to the completion API
#[derive(Error, Debug)]
pub enum Error {
    /// Neither the call nor the client named a model
    #[error("model cannot be empty")]
    MissingModel,

    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned a non-success status
    #[error("API error: status {status}: {message}")]
    Api { status: u16, message: String },

    /// Reading the response stream failed
    #[error("stream read error: {0}")]
    Read(#[from] std::io::Error),

    /// A `data:` payload failed to parse
    #[error("malformed event payload: {0}")]
    Decode(#[from] serde_json::Error),
}

impl Error {
    /// Create an API error from a status code and response body
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_model_message_is_stable() {
        assert_eq!(Error::MissingModel.to_string(), "model cannot be empty");
    }

    #[test]
    fn api_error_carries_status_and_body() {
        let e = Error::api(401, "invalid key");
        assert_eq!(e.to_string(), "API error: status 401: invalid key");
    }
}
