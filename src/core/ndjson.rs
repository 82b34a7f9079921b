//! Incremental NDJSON decoding for the chat event stream.
//!
//! Network chunks arrive at arbitrary boundaries: a single JSON line may be
//! split across several chunks, a chunk may carry several lines, and a
//! multi-byte UTF-8 character may straddle two chunks. The decoder buffers raw
//! bytes and only decodes a line once its terminating `\n` has arrived.

use std::error::Error as StdError;
use std::fmt;

use memchr::memchr;

use crate::api::ChatEvent;

/// A complete line that could not be turned into a [`ChatEvent`].
#[derive(Debug)]
pub enum DecodeError {
    Utf8(std::str::Utf8Error),
    Json {
        line: String,
        source: serde_json::Error,
    },
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeError::Utf8(err) => write!(f, "invalid UTF-8 in stream: {err}"),
            DecodeError::Json { source, .. } => write!(f, "invalid stream event: {source}"),
        }
    }
}

impl StdError for DecodeError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            DecodeError::Utf8(err) => Some(err),
            DecodeError::Json { source, .. } => Some(source),
        }
    }
}

#[derive(Debug, Default)]
pub struct NdjsonDecoder {
    buffer: Vec<u8>,
    bytes_seen: usize,
}

impl NdjsonDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds one network chunk and returns every event completed by it, in
    /// order. Blank lines are skipped.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<Result<ChatEvent, DecodeError>> {
        self.bytes_seen += chunk.len();
        self.buffer.extend_from_slice(chunk);

        let mut events = Vec::new();
        let mut consumed = 0;
        while let Some(offset) = memchr(b'\n', &self.buffer[consumed..]) {
            let line_end = consumed + offset;
            if let Some(event) = decode_line(&self.buffer[consumed..line_end]) {
                events.push(event);
            }
            consumed = line_end + 1;
        }
        self.buffer.drain(..consumed);
        events
    }

    /// Decodes whatever is left once the body has ended. A final line without
    /// a trailing newline still counts as a line.
    pub fn finish(&mut self) -> Option<Result<ChatEvent, DecodeError>> {
        let rest = std::mem::take(&mut self.buffer);
        decode_line(&rest)
    }

    /// Bytes still waiting for their terminating newline.
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }

    /// Total bytes fed so far, including blank lines.
    pub fn bytes_seen(&self) -> usize {
        self.bytes_seen
    }
}

fn decode_line(raw: &[u8]) -> Option<Result<ChatEvent, DecodeError>> {
    let line = match std::str::from_utf8(raw) {
        Ok(line) => line.trim(),
        Err(err) => return Some(Err(DecodeError::Utf8(err))),
    };
    if line.is_empty() {
        return None;
    }
    Some(
        serde_json::from_str::<ChatEvent>(line).map_err(|source| DecodeError::Json {
            line: line.to_string(),
            source,
        }),
    )
}
