use bytes::{BufMut, Bytes, BytesMut};

use crate::error::{FrameError, Result};

/// Header block terminator: the first occurrence on the wire ends the block.
pub const HEADER_TERMINATOR: &[u8] = b"\r\n\r\n";

/// The one mandatory header. Matched case-insensitively on read.
pub const CONTENT_LENGTH: &str = "Content-Length";

/// UTF-8 byte order mark, tolerated once at the very start of an inbound stream.
pub const UTF8_BOM: [u8; 3] = [0xEF, 0xBB, 0xBF];

/// Default maximum body size: 16 MiB.
pub const DEFAULT_MAX_BODY: usize = 16 * 1024 * 1024;

/// A complete framed message: the raw header lines plus the body bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// Header lines exactly as received, order preserved, terminators stripped.
    pub headers: Vec<String>,
    /// The message body. Its length always equals the declared `Content-Length`.
    pub body: Bytes,
}

impl Message {
    /// Create a new message.
    pub fn new(headers: Vec<String>, body: impl Into<Bytes>) -> Self {
        Self {
            headers,
            body: body.into(),
        }
    }

    /// Look up a header value by name (ASCII case-insensitive, first match wins).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.iter().find_map(|line| {
            let (key, value) = line.split_once(':')?;
            key.trim().eq_ignore_ascii_case(name).then(|| value.trim())
        })
    }

    /// The declared `Content-Length`, if present and numeric.
    pub fn content_length(&self) -> Option<usize> {
        self.header(CONTENT_LENGTH)?.parse().ok()
    }
}

/// Encode a message into the wire format.
///
/// Wire format:
/// ```text
/// Content-Length: <body length in bytes>\r\n
/// \r\n
/// <body bytes>
/// ```
///
/// The length is always the byte count of the body, never a character count.
pub fn encode_message(body: &[u8], dst: &mut BytesMut) {
    let len = body.len().to_string();
    dst.reserve(CONTENT_LENGTH.len() + 2 + len.len() + HEADER_TERMINATOR.len() + body.len());
    dst.put_slice(CONTENT_LENGTH.as_bytes());
    dst.put_slice(b": ");
    dst.put_slice(len.as_bytes());
    dst.put_slice(HEADER_TERMINATOR);
    dst.put_slice(body);
}

/// Split a header block (terminator already removed) into raw lines.
///
/// Lines are kept verbatim; only UTF-8 validity is enforced here.
pub(crate) fn parse_header_block(block: &[u8]) -> Result<Vec<String>> {
    let text = std::str::from_utf8(block)
        .map_err(|err| FrameError::MalformedHeader(format!("header block is not UTF-8: {err}")))?;
    Ok(text.split("\r\n").map(str::to_owned).collect())
}

/// Extract the declared body length from parsed header lines.
///
/// The first `Content-Length` occurrence wins; later duplicates are ignored.
pub(crate) fn declared_content_length(headers: &[String]) -> Result<usize> {
    for line in headers {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        if !key.trim().eq_ignore_ascii_case(CONTENT_LENGTH) {
            continue;
        }
        let value = value.trim();
        return value
            .parse()
            .map_err(|_| FrameError::InvalidContentLength {
                value: value.to_owned(),
            });
    }
    Err(FrameError::MissingContentLength)
}

/// Configuration for the message framer.
#[derive(Debug, Clone)]
pub struct FramerConfig {
    /// Maximum body size in bytes. Default: 16 MiB.
    pub max_body_size: usize,
}

impl Default for FramerConfig {
    fn default() -> Self {
        Self {
            max_body_size: DEFAULT_MAX_BODY,
        }
    }
}
