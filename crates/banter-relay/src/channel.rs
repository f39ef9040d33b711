//! Message channel between a relay and its client.

use async_trait::async_trait;
use thiserror::Error;

use crate::envelope::{ClientRequest, Reply};

/// The outbound side of the channel is gone.
#[derive(Debug, Error)]
#[error("client channel closed")]
pub struct ChannelClosed;

/// Bidirectional channel carrying envelopes for one client.
///
/// `recv` returning `None` means the client is done, whether by an orderly
/// close or a dropped connection. A failed `send` means nothing further can
/// reach the client.
#[async_trait]
pub trait Channel: Send {
    /// Wait for the next question from the client.
    async fn recv(&mut self) -> Option<ClientRequest>;

    /// Deliver a reply envelope to the client.
    async fn send(&mut self, reply: Reply) -> Result<(), ChannelClosed>;
}
