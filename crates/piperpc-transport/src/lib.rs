//! Pipe-connected child process transport.
//!
//! Spawns a command with stdin, stdout, and stderr all connected to pipes
//! and hands each endpoint out exactly once. The three streams are fully
//! independent: writing requests, draining output, and draining diagnostics
//! never contend with each other at this layer.
//!
//! This is the lowest layer of piperpc. Everything else builds on the
//! [`ChildProcess`] type provided here.

pub mod error;
pub mod proc;

pub use error::{Result, TransportError};
pub use proc::ChildProcess;
