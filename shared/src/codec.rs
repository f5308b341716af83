//! Newline-delimited JSON codec for response envelopes
//!
//! Devices report results as JSON lines:
//! ```text
//! debug: entering rr handler        <- not JSON, skipped
//! {"cmd": "rr 0 3", "data": [0, 1, 2]}
//! {"result": "Success"}             <- end key seen, response complete
//! ```
//!
//! JSON object lines are merged until the end key (`result` by default)
//! arrives. Anything that is not a JSON object is treated as device noise.

use bytes::{BufMut, Bytes, BytesMut};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, warn};

use crate::ResponseEnvelope;

/// Default maximum line length (64 KiB) to prevent memory exhaustion
pub const DEFAULT_MAX_LINE_LEN: usize = 64 * 1024;

/// Default key whose arrival completes a response
pub const DEFAULT_END_KEY: &str = "result";

/// Errors that can occur during encoding/decoding
#[derive(Error, Debug)]
pub enum CodecError {
    #[error("Line too long: {0} bytes without newline (max: {1})")]
    LineTooLong(usize, usize),

    #[error("Oversized line: {0} bytes (max: {1})")]
    OversizedLine(usize, usize),

    #[error("Stream ended with an incomplete response (fields: {0:?})")]
    Incomplete(Vec<String>),

    #[error("JSON encode error: {0}")]
    EncodeError(#[from] serde_json::Error),
}

/// Assembler configuration
#[derive(Debug, Clone)]
pub struct AssemblerConfig {
    /// Key that marks a response as complete
    pub end_key: String,
    /// Longest line accepted before the buffer is discarded
    pub max_line_len: usize,
}

impl Default for AssemblerConfig {
    fn default() -> Self {
        Self {
            end_key: DEFAULT_END_KEY.into(),
            max_line_len: DEFAULT_MAX_LINE_LEN,
        }
    }
}

/// Streaming decoder that reassembles responses from raw bytes
#[derive(Debug)]
pub struct ResponseAssembler {
    config: AssemblerConfig,
    /// Bytes of the line currently being received
    buffer: BytesMut,
    /// Fields merged from the lines of the current response
    pending: Map<String, Value>,
    /// Dropping the tail of an over-long line until its newline arrives
    discarding: bool,
}

impl Default for ResponseAssembler {
    fn default() -> Self {
        Self::new(AssemblerConfig::default())
    }
}

impl ResponseAssembler {
    /// Create a new assembler
    pub fn new(config: AssemblerConfig) -> Self {
        Self {
            config,
            buffer: BytesMut::with_capacity(4096),
            pending: Map::new(),
            discarding: false,
        }
    }

    /// Add data to the decoder buffer
    pub fn extend(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    /// Try to assemble the next complete response from the buffer
    ///
    /// Call this repeatedly until it returns `Ok(None)` to drain all
    /// complete responses. On `LineTooLong` or `OversizedLine` the whole
    /// line and any partially merged response are dropped; the rest of a
    /// line still in flight is skipped up to its newline.
    pub fn next_response(&mut self) -> Result<Option<Value>, CodecError> {
        loop {
            let newline = self.buffer.iter().position(|b| *b == b'\n');

            if self.discarding {
                match newline {
                    Some(pos) => {
                        let _ = self.buffer.split_to(pos + 1);
                        self.discarding = false;
                        continue;
                    }
                    None => {
                        self.buffer.clear();
                        return Ok(None);
                    }
                }
            }

            let Some(pos) = newline else {
                if self.buffer.len() > self.config.max_line_len {
                    let len = self.buffer.len();
                    self.reset();
                    self.discarding = true;
                    return Err(CodecError::LineTooLong(len, self.config.max_line_len));
                }
                return Ok(None);
            };

            if pos > self.config.max_line_len {
                let _ = self.buffer.split_to(pos + 1);
                self.pending.clear();
                return Err(CodecError::OversizedLine(pos, self.config.max_line_len));
            }

            let line = self.buffer.split_to(pos + 1);
            if let Some(response) = self.push_line(&line) {
                return Ok(Some(response));
            }
        }
    }

    /// Signal end of stream
    ///
    /// Fails if fields of an unfinished response are still pending. A
    /// final line without a trailing newline is processed first.
    pub fn finish(&mut self) -> Result<Option<Value>, CodecError> {
        if self.discarding {
            self.buffer.clear();
            self.discarding = false;
        }
        if !self.buffer.is_empty() {
            let line = self.buffer.split();
            if let Some(response) = self.push_line(&line) {
                return Ok(Some(response));
            }
        }
        if self.pending.is_empty() {
            return Ok(None);
        }
        let fields = self.pending.keys().cloned().collect();
        self.pending.clear();
        Err(CodecError::Incomplete(fields))
    }

    /// Merge one line; returns a response once the end key is present
    fn push_line(&mut self, raw: &[u8]) -> Option<Value> {
        let text = String::from_utf8_lossy(raw);
        let line = text.trim();
        if line.is_empty() {
            return None;
        }

        match serde_json::from_str::<Value>(line) {
            Ok(Value::Object(fields)) => {
                self.pending.extend(fields);
            }
            Ok(_) => {
                warn!("Skipping non-object JSON line: {}", line);
                return None;
            }
            Err(_) => {
                warn!("JSON parse error: line={:?}", line);
                return None;
            }
        }

        if self.pending.contains_key(&self.config.end_key) {
            let response = std::mem::take(&mut self.pending);
            debug!("Assembled response with {} fields", response.len());
            return Some(Value::Object(response));
        }
        None
    }

    fn reset(&mut self) {
        self.buffer.clear();
        self.pending.clear();
    }

    /// Get the current buffer length (for debugging)
    pub fn buffer_len(&self) -> usize {
        self.buffer.len()
    }

    /// Names of fields merged so far for the unfinished response
    pub fn pending_fields(&self) -> Vec<&str> {
        self.pending.keys().map(String::as_str).collect()
    }
}

/// Encode an envelope as a newline-terminated JSON line
pub fn encode(envelope: &ResponseEnvelope) -> Result<Bytes, CodecError> {
    let mut buf = BytesMut::new();
    encode_into(envelope, &mut buf)?;
    Ok(buf.freeze())
}

/// Encode an envelope directly into a provided buffer
pub fn encode_into(envelope: &ResponseEnvelope, buf: &mut BytesMut) -> Result<(), CodecError> {
    let line = serde_json::to_vec(envelope)?;
    buf.reserve(line.len() + 1);
    buf.put_slice(&line);
    buf.put_u8(b'\n');
    Ok(())
}

/// Encoder for building batches of envelope lines
#[derive(Debug, Default)]
pub struct EnvelopeEncoder {
    /// Output buffer
    buffer: BytesMut,
}

impl EnvelopeEncoder {
    /// Create a new envelope encoder
    pub fn new() -> Self {
        Self {
            buffer: BytesMut::with_capacity(4096),
        }
    }

    /// Encode an envelope and add to the output buffer
    pub fn encode(&mut self, envelope: &ResponseEnvelope) -> Result<(), CodecError> {
        encode_into(envelope, &mut self.buffer)
    }

    /// Take the encoded bytes, leaving an empty buffer
    pub fn take(&mut self) -> Bytes {
        self.buffer.split().freeze()
    }

    /// Check if the encoder has any pending data
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }
}
