/// Errors from decoding or encoding JSON-RPC bodies.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// The body is not valid JSON.
    #[error("invalid JSON body: {0}")]
    Json(#[from] serde_json::Error),

    /// The `jsonrpc` version tag is missing or not `"2.0"`.
    #[error("unsupported jsonrpc version: {found}")]
    Version { found: String },

    /// The body parsed as JSON but fits none of the four message shapes.
    #[error("malformed message: {0}")]
    Malformed(String),
}

pub type Result<T> = std::result::Result<T, CodecError>;
