//! Buffered line reading over streaming response bodies.

use std::io;
use std::marker::PhantomData;

use futures::TryStreamExt;
use serde::de::DeserializeOwned;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader, Lines};
use tokio_util::io::StreamReader;

use crate::error::Result;
use crate::sse::{decode_frame, Frame};

/// Boxed response body reader.
pub type BodyReader = Box<dyn AsyncRead + Send + Unpin>;

/// A streaming response, read line by line and decoded into frames.
///
/// Owns the underlying body reader; dropping the stream releases the
/// connection whether or not the sentinel was ever seen.
pub struct EventStream<T> {
    lines: Lines<BufReader<BodyReader>>,
    _event: PhantomData<T>,
}

impl<T: DeserializeOwned> EventStream<T> {
    /// Wrap an async reader producing `data:`-framed lines.
    pub fn new(reader: impl AsyncRead + Send + Unpin + 'static) -> Self {
        let body: BodyReader = Box::new(reader);
        Self {
            lines: BufReader::new(body).lines(),
            _event: PhantomData,
        }
    }

    pub(crate) fn from_response(response: reqwest::Response) -> Self {
        let body = response.bytes_stream().map_err(io::Error::other);
        Self::new(StreamReader::new(body))
    }

    /// Decode the next line of the body.
    ///
    /// `Ok(None)` means the body ended. Callers see [`Frame::Skip`] for
    /// non-data lines and decide for themselves when to stop reading after
    /// [`Frame::Done`].
    pub async fn next_frame(&mut self) -> Result<Option<Frame<T>>> {
        match self.lines.next_line().await? {
            Some(line) => Ok(Some(decode_frame(&line)?)),
            None => Ok(None),
        }
    }
}
