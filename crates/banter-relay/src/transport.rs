//! Upstream transport opening one completion stream per turn.

use async_trait::async_trait;
use banter_openai::{ChatClient, ChatMessage, ChatParams, ChatStream};

/// Opens a streaming completion for the given conversation.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn open_stream(
        &self,
        turns: &[ChatMessage],
        max_tokens: u32,
    ) -> banter_openai::Result<ChatStream>;
}

/// Production transport backed by the chat completion API.
#[derive(Clone)]
pub struct ChatTransport {
    client: ChatClient,
}

impl ChatTransport {
    pub fn new(client: ChatClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for ChatTransport {
    async fn open_stream(
        &self,
        turns: &[ChatMessage],
        max_tokens: u32,
    ) -> banter_openai::Result<ChatStream> {
        let params = ChatParams {
            messages: turns.to_vec(),
            max_tokens: Some(max_tokens),
            ..Default::default()
        };
        self.client.create_stream(params).await
    }
}
