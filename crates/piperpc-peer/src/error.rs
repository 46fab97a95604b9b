/// Errors that can occur in channel and dispatch operations.
#[derive(Debug, thiserror::Error)]
pub enum PeerError {
    /// Transport-level error.
    #[error("transport error: {0}")]
    Transport(#[from] piperpc_transport::TransportError),

    /// Frame-level error.
    #[error("frame error: {0}")]
    Frame(#[from] piperpc_frame::FrameError),

    /// Body encode/decode error.
    #[error("codec error: {0}")]
    Codec(#[from] piperpc_rpc::CodecError),

    /// A method name was registered twice.
    #[error("method {0:?} already registered")]
    DuplicateMethod(String),

    /// The stream endpoint was already claimed by a drain or closed.
    #[error("{0} stream already taken")]
    StreamTaken(&'static str),

    /// The channel's write side has been closed.
    #[error("channel closed")]
    ChannelClosed,
}

pub type Result<T> = std::result::Result<T, PeerError>;
