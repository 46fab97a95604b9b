//! Content-Length framed message streams over byte pipes.
//!
//! This is the core value-add layer of piperpc. Every message is framed with:
//! - A header block of `Name: Value` lines, each terminated by `\r\n`
//! - A blank line (`\r\n`) ending the block, so the first `\r\n\r\n` on the
//!   wire always separates headers from body
//! - A mandatory `Content-Length` header giving the exact body byte count
//!
//! No partial reads, no buffer management in user code.

pub mod codec;
pub mod error;
pub mod framer;
pub mod reader;
pub mod writer;

pub use codec::{
    encode_message, FramerConfig, Message, CONTENT_LENGTH, DEFAULT_MAX_BODY, HEADER_TERMINATOR,
    UTF8_BOM,
};
pub use error::{FrameError, Result};
pub use framer::{FramerState, MessageFramer};
pub use reader::MessageReader;
pub use writer::MessageWriter;
