//! JSON-RPC 2.0 message types and codec for pipe transports.
//!
//! The message model is a closed union: every valid body is exactly one of
//! [`Request`], [`Notification`], [`Response`], or [`ErrorMessage`], decided
//! structurally by key presence. [`codec::decode`] returns a concrete variant
//! or an explicit error; there is no silent fallthrough.
//!
//! Framing is not this crate's concern — bodies arrive and leave as byte
//! slices, already separated from their `Content-Length` headers.

pub mod codec;
pub mod error;
pub mod message;

pub use codec::{
    decode, encode_error, encode_notify, encode_request, encode_response, VERSION,
};
pub use error::{CodecError, Result};
pub use message::{
    ErrorMessage, ErrorObject, Notification, Params, Request, RequestId, Response, RpcMessage,
    INTERNAL_ERROR, INVALID_PARAMS, INVALID_REQUEST, METHOD_NOT_FOUND, PARSE_ERROR,
};
