//! Length-framed JSON-RPC over child process pipes.
//!
//! piperpc speaks JSON-RPC 2.0 over raw byte pipes, each message carried in a
//! `Content-Length` framed envelope. The usual arrangement is a parent that
//! spawns a child process and drives its stdin/stdout/stderr, but any pair of
//! byte streams works, including a process's own stdio.
//!
//! # Crate Structure
//!
//! - [`transport`] — Child process spawning and pipe lifecycle
//! - [`frame`] — `Content-Length` message framing over byte streams
//! - [`rpc`] — JSON-RPC 2.0 message types and codec
//! - [`peer`] — Caller channels and serving dispatch (behind `peer` feature)

/// Re-export transport types.
pub mod transport {
    pub use piperpc_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use piperpc_frame::*;
}

/// Re-export rpc types.
pub mod rpc {
    pub use piperpc_rpc::*;
}

/// Re-export peer types (requires `peer` feature).
#[cfg(feature = "peer")]
pub mod peer {
    pub use piperpc_peer::*;
}
