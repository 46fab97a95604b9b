/// Errors that can occur while managing a pipe-connected child process.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Failed to spawn the command.
    #[error("failed to spawn {command}: {source}")]
    Spawn {
        command: String,
        source: std::io::Error,
    },

    /// A pipe endpoint was requested after it had already been taken.
    #[error("{stream} endpoint already taken")]
    StreamUnavailable { stream: &'static str },

    /// Failed to wait on the child process.
    #[error("failed to wait for child: {0}")]
    Wait(std::io::Error),

    /// Failed to kill the child process.
    #[error("failed to kill child: {0}")]
    Kill(std::io::Error),

    /// An I/O error occurred on one of the pipes.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, TransportError>;
