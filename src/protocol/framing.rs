//
// Copyright 2026 Hans W. Uhlig. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//

//! Message framing for the Kodi socket stream.
//!
//! Kodi's persistent TCP channel carries no length prefix and no delimiter:
//! the stream is a raw concatenation of JSON objects, split across TCP
//! segments at arbitrary byte boundaries. [`JsonStreamDecoder`] reassembles
//! that stream into complete top-level objects by tracking brace depth and
//! JSON string/escape state.
//!
//! # Stream format
//!
//! ```text
//! {"jsonrpc":"2.0","id":1,"result":[]}{"jsonrpc":"2.0","method":"Player.OnPlay",...}
//! ```
//!
//! A single `feed` may yield zero messages (partial object), one, or many
//! (coalesced objects). Bytes outside any object that are not whitespace
//! are discarded with a diagnostic.

use thiserror::Error;
use tracing::warn;

/// Maximum size of a single message (16 MB).
///
/// A buffer growing past this limit without completing an object means the
/// peer is not speaking the protocol; the connection should be torn down
/// rather than accumulating unbounded garbage.
pub const MAX_MESSAGE_SIZE: usize = 16 * 1024 * 1024;

/// Errors produced while reassembling the message stream.
#[derive(Debug, Error)]
pub enum FrameError {
    /// The in-progress message exceeded [`MAX_MESSAGE_SIZE`] without
    /// completing.
    #[error("message of at least {size} bytes exceeds the {limit} byte limit")]
    Oversized {
        /// Bytes buffered so far.
        size: usize,
        /// The configured limit.
        limit: usize,
    },
}

/// Incremental splitter for an unframed JSON object stream.
///
/// Feed it raw chunks as they arrive from the transport; it returns each
/// complete top-level JSON object as its own byte vector, in stream order.
/// Partial objects are buffered across calls.
///
/// # Example
///
/// ```rust
/// use kodi_control::protocol::JsonStreamDecoder;
///
/// let mut decoder = JsonStreamDecoder::new();
/// let messages = decoder.feed(br#"{"id":1,"result":[]}{"id":"#).unwrap();
/// assert_eq!(messages.len(), 1);
/// assert_eq!(messages[0], br#"{"id":1,"result":[]}"#);
///
/// let messages = decoder.feed(br#"2,"result":true}"#).unwrap();
/// assert_eq!(messages.len(), 1);
/// ```
#[derive(Debug, Default)]
pub struct JsonStreamDecoder {
    buf: Vec<u8>,
    /// Next unscanned index into `buf`.
    pos: usize,
    /// Start index of the object currently being assembled.
    start: Option<usize>,
    depth: u32,
    in_string: bool,
    escaped: bool,
}

impl JsonStreamDecoder {
    /// Creates an empty decoder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of bytes buffered for a not-yet-complete message.
    #[must_use]
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }

    /// Discards all buffered state.
    ///
    /// Used when a stream is abandoned mid-message, e.g. before reusing a
    /// decoder on a fresh connection.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Appends a chunk and returns every message it completed.
    ///
    /// # Errors
    ///
    /// Returns [`FrameError::Oversized`] once the buffered partial message
    /// exceeds [`MAX_MESSAGE_SIZE`]. The decoder is left in its reset state
    /// so the caller can decide whether to resynchronize or disconnect.
    pub fn feed(&mut self, chunk: &[u8]) -> Result<Vec<Vec<u8>>, FrameError> {
        self.buf.extend_from_slice(chunk);

        let mut complete = Vec::new();
        let mut consumed = 0usize;
        let mut noise = 0usize;

        while self.pos < self.buf.len() {
            let byte = self.buf[self.pos];

            if self.start.is_none() {
                if byte == b'{' {
                    self.start = Some(self.pos);
                    self.depth = 1;
                } else {
                    if !byte.is_ascii_whitespace() {
                        noise += 1;
                    }
                    consumed = self.pos + 1;
                }
            } else if self.in_string {
                if self.escaped {
                    self.escaped = false;
                } else if byte == b'\\' {
                    self.escaped = true;
                } else if byte == b'"' {
                    self.in_string = false;
                }
            } else {
                match byte {
                    b'"' => self.in_string = true,
                    b'{' => self.depth += 1,
                    b'}' => {
                        self.depth -= 1;
                        if self.depth == 0 {
                            if let Some(start) = self.start.take() {
                                complete.push(self.buf[start..=self.pos].to_vec());
                                consumed = self.pos + 1;
                            }
                        }
                    }
                    _ => {}
                }
            }

            self.pos += 1;
        }

        if noise > 0 {
            warn!(bytes = noise, "discarded non-JSON bytes from message stream");
        }

        if consumed > 0 {
            self.buf.drain(..consumed);
            self.pos -= consumed;
            if let Some(start) = self.start.as_mut() {
                *start -= consumed;
            }
        }

        if self.buf.len() > MAX_MESSAGE_SIZE {
            let size = self.buf.len();
            self.reset();
            return Err(FrameError::Oversized {
                size,
                limit: MAX_MESSAGE_SIZE,
            });
        }

        Ok(complete)
    }
}
