//! JSON envelopes exchanged with the client.

use serde::{Deserialize, Serialize};

/// Answer text of the envelope that closes a turn.
pub const DONE_MARKER: &str = "Done";

/// A question sent by the client.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientRequest {
    pub index: i64,
    pub question: String,
}

/// An envelope sent back to the client.
///
/// Fragment envelopes echo the index and question of the request they
/// answer; the closing envelope carries only the done marker, which is how
/// the client tells the two apart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reply {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub question: Option<String>,
    pub answer: String,
}

impl Reply {
    /// A fragment envelope echoing the request it answers.
    pub fn fragment(request: &ClientRequest, answer: impl Into<String>) -> Self {
        Self {
            index: Some(request.index),
            question: Some(request.question.clone()),
            answer: answer.into(),
        }
    }

    /// The envelope that marks a turn as complete.
    pub fn done() -> Self {
        Self {
            index: None,
            question: None,
            answer: DONE_MARKER.to_string(),
        }
    }
}
