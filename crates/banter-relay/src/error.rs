//! Error types for banter-relay

use thiserror::Error;

/// Result type alias using banter-relay Error
pub type Result<T> = std::result::Result<T, Error>;

/// Reasons a relay stops serving its client.
#[derive(Error, Debug)]
pub enum Error {
    /// The client went away mid-delivery.
    #[error("client connection closed")]
    ConnectionClosed,

    /// Opening the upstream stream failed before any fragment arrived.
    #[error(transparent)]
    Upstream(#[from] banter_openai::Error),
}
