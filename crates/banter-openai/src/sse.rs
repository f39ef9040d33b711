//! Line-level decoding of `data:`-framed event streams.
//!
//! Streaming completion responses arrive as server-sent-event style lines:
//! `data: <json>` payload lines, a closing `data: [DONE]` sentinel, and
//! whatever comments, keep-alives, and blank separator lines the upstream
//! interleaves. [`decode_frame`] classifies one line at a time and performs
//! no I/O of its own.

use serde::de::DeserializeOwned;

use crate::error::Result;

/// Literal prefix of every payload-carrying line.
pub const DATA_PREFIX: &str = "data: ";

/// Payload of the sentinel line that closes a stream.
pub const DONE_SENTINEL: &str = "[DONE]";

/// Outcome of decoding one line of an event stream.
#[derive(Debug, Clone, PartialEq)]
pub enum Frame<T> {
    /// A decoded event payload.
    Event(T),
    /// A non-data line (comment, keep-alive, blank). Read the next line.
    Skip,
    /// The end-of-stream sentinel.
    Done,
}

/// Decode one line of an event stream.
///
/// Lines without the `data: ` prefix are skipped rather than rejected, so
/// interleaved noise never terminates a stream. A payload that is not the
/// sentinel must parse as `T`; a parse failure is the only error case.
pub fn decode_frame<T: DeserializeOwned>(line: &str) -> Result<Frame<T>> {
    let line = line.trim();
    let Some(payload) = line.strip_prefix(DATA_PREFIX) else {
        return Ok(Frame::Skip);
    };
    if payload == DONE_SENTINEL {
        return Ok(Frame::Done);
    }
    Ok(Frame::Event(serde_json::from_str(payload)?))
}
