//! banter-openai: OpenAI-compatible completion API client
//!
//! This crate wraps the chat completion, text completion, and model listing
//! endpoints, with streaming responses decoded line by line from their
//! `data:`-framed bodies.

pub mod chat;
pub mod completion;
pub mod error;
pub mod models;
pub mod session;
pub mod sse;
pub mod stream;
pub mod types;

pub use chat::{ChatChunk, ChatClient, ChatParams, ChatResponse, ChatStream};
pub use completion::{CompletionChunk, CompletionClient, CompletionParams, CompletionStream};
pub use error::{Error, Result};
pub use models::ModelsClient;
pub use session::Session;
pub use sse::Frame;
pub use stream::EventStream;
pub use types::*;
