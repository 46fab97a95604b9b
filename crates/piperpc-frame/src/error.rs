/// Errors that can occur while framing or deframing messages.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// A header block ended without any `Content-Length` header.
    #[error("header block missing Content-Length")]
    MissingContentLength,

    /// The `Content-Length` value is not a non-negative decimal integer.
    #[error("invalid Content-Length value {value:?}")]
    InvalidContentLength { value: String },

    /// The header block is not valid header text.
    #[error("malformed header block: {0}")]
    MalformedHeader(String),

    /// The declared body size exceeds the configured maximum.
    #[error("body too large ({size} bytes, max {max})")]
    BodyTooLarge { size: usize, max: usize },

    /// The stream ended in the middle of a message.
    #[error("stream ended mid-message")]
    UnexpectedEof,

    /// The stream stopped accepting bytes before a complete message was written.
    #[error("stream closed (write returned zero)")]
    StreamClosed,

    /// An I/O error occurred while reading or writing messages.
    #[error("frame I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, FrameError>;
