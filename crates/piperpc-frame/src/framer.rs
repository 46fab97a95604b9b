use bytes::{BufMut, Bytes, BytesMut};

use crate::codec::{
    declared_content_length, parse_header_block, FramerConfig, Message, HEADER_TERMINATOR,
};
use crate::error::{FrameError, Result};

/// Where the framer is in the current message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FramerState {
    /// Collecting header bytes until the block terminator arrives.
    AccumulatingHeaders,
    /// Collecting exactly `remaining` more body bytes.
    AccumulatingBody { remaining: usize },
}

/// Incremental splitter turning a byte stream into framed [`Message`]s.
///
/// The framer is push-driven and single-owner: feed it bytes as they arrive,
/// in whatever chunking the pipe produced, and collect complete messages.
/// Chunk boundaries never affect the result.
///
/// After an error the internal state is unspecified; call [`reset`] before
/// reusing the framer, or discard it along with the stream.
///
/// [`reset`]: MessageFramer::reset
#[derive(Debug)]
pub struct MessageFramer {
    state: FramerState,
    header_buf: BytesMut,
    headers: Vec<String>,
    body_buf: BytesMut,
    config: FramerConfig,
}

impl MessageFramer {
    /// Create a framer with default configuration.
    pub fn new() -> Self {
        Self::with_config(FramerConfig::default())
    }

    /// Create a framer with explicit configuration.
    pub fn with_config(config: FramerConfig) -> Self {
        Self {
            state: FramerState::AccumulatingHeaders,
            header_buf: BytesMut::new(),
            headers: Vec::new(),
            body_buf: BytesMut::new(),
            config,
        }
    }

    /// Feed one byte. Returns a complete message when this byte finishes one.
    pub fn push(&mut self, byte: u8) -> Result<Option<Message>> {
        match self.state {
            FramerState::AccumulatingHeaders => {
                self.header_buf.put_u8(byte);
                if !self.header_buf.ends_with(HEADER_TERMINATOR) {
                    return Ok(None);
                }

                let block_len = self.header_buf.len() - HEADER_TERMINATOR.len();
                let headers = parse_header_block(&self.header_buf[..block_len])?;
                let declared = declared_content_length(&headers)?;
                if declared > self.config.max_body_size {
                    return Err(FrameError::BodyTooLarge {
                        size: declared,
                        max: self.config.max_body_size,
                    });
                }

                self.header_buf.clear();
                if declared == 0 {
                    return Ok(Some(Message {
                        headers,
                        body: Bytes::new(),
                    }));
                }

                self.headers = headers;
                self.body_buf.reserve(declared);
                self.state = FramerState::AccumulatingBody {
                    remaining: declared,
                };
                Ok(None)
            }
            FramerState::AccumulatingBody { remaining } => {
                self.body_buf.put_u8(byte);
                let remaining = remaining - 1;
                if remaining > 0 {
                    self.state = FramerState::AccumulatingBody { remaining };
                    return Ok(None);
                }

                self.state = FramerState::AccumulatingHeaders;
                Ok(Some(Message {
                    headers: std::mem::take(&mut self.headers),
                    body: self.body_buf.split().freeze(),
                }))
            }
        }
    }

    /// Feed a whole chunk, byte by byte, appending every completed message
    /// to `out`.
    ///
    /// Messages framed before a failing byte are already in `out` when an
    /// error returns, so a stream fed in chunks yields the same message
    /// sequence as one fed through [`push`] alone.
    ///
    /// [`push`]: MessageFramer::push
    pub fn push_chunk(&mut self, chunk: &[u8], out: &mut Vec<Message>) -> Result<()> {
        for &byte in chunk {
            if let Some(msg) = self.push(byte)? {
                out.push(msg);
            }
        }
        Ok(())
    }

    /// Discard any partial message and return to the initial state.
    pub fn reset(&mut self) {
        self.state = FramerState::AccumulatingHeaders;
        self.header_buf.clear();
        self.headers.clear();
        self.body_buf.clear();
    }

    /// True when no partial message is buffered. Clean streams end idle.
    pub fn is_idle(&self) -> bool {
        self.state == FramerState::AccumulatingHeaders && self.header_buf.is_empty()
    }

    /// Current position in the framing state machine.
    pub fn state(&self) -> FramerState {
        self.state
    }

    /// Current framer configuration.
    pub fn config(&self) -> &FramerConfig {
        &self.config
    }
}

impl Default for MessageFramer {
    fn default() -> Self {
        Self::new()
    }
}
