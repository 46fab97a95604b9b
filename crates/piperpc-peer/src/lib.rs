//! JSON-RPC channels and dispatch over child process pipes.
//!
//! Two roles live here:
//! - [`PipeChannel`] is the caller side: spawn a command, write framed
//!   requests and notifications to its stdin, and drain its stdout and
//!   stderr on independent threads.
//! - [`RpcDispatcher`] is the serving side: read framed requests from an
//!   input stream, route them through a [`HandlerRegistry`], and write
//!   framed responses.
//!
//! A process can play either role over its own stdio or a child's.

pub mod channel;
pub mod dispatcher;
pub mod error;
pub mod registry;

pub use channel::PipeChannel;
pub use dispatcher::RpcDispatcher;
pub use error::{PeerError, Result};
pub use registry::{HandlerRegistry, ParamsStyle};
