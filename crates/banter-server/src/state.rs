//! Shared application state

use banter_relay::{ChatTransport, RelayConfig};

/// State handed to every connection handler.
#[derive(Clone)]
pub struct AppState {
    /// Transport each relay opens its streams through.
    pub transport: ChatTransport,
    /// Relay tunables from the config file.
    pub relay: RelayConfig,
    /// Recent-turn window per connection, when bounded.
    pub history_limit: Option<usize>,
}
