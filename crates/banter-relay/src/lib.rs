//! banter-relay: the conversation relay loop
//!
//! This crate bridges a persistent client channel to an OpenAI-style
//! streaming completion API: each client question becomes one streaming
//! completion whose content fragments are forwarded as they decode.

pub mod channel;
pub mod conversation;
pub mod envelope;
pub mod error;
pub mod relay;
pub mod transport;

pub use channel::{Channel, ChannelClosed};
pub use conversation::{Conversation, GrowthPolicy, KeepRecent, Unbounded};
pub use envelope::{ClientRequest, Reply, DONE_MARKER};
pub use error::{Error, Result};
pub use relay::{Relay, RelayConfig};
pub use transport::{ChatTransport, Transport};
