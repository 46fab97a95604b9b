use std::io::{Read, Write};

use piperpc_frame::{FramerConfig, Message, MessageReader, MessageWriter};
use piperpc_rpc::{decode, encode_error, encode_response, ErrorObject, Request, RpcMessage};
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::Result;
use crate::registry::HandlerRegistry;

/// Serves framed requests from an input stream, writing framed replies.
///
/// The registry moves in at construction, so the method set is fixed for
/// the dispatcher's whole life. Per message, the loop decodes and routes:
/// requests run their handler and get exactly one reply; every fault that
/// can be attributed to a single request (unknown method, params shape
/// mismatch, handler fault) becomes an error reply with that request's id
/// rather than ending the stream. Messages that cannot be decoded at all,
/// and inbound kinds this endpoint does not serve, are logged and skipped.
/// Only framing errors and output write errors are fatal.
pub struct RpcDispatcher {
    registry: HandlerRegistry,
    config: FramerConfig,
}

impl RpcDispatcher {
    /// Create a dispatcher over a fully populated registry.
    pub fn new(registry: HandlerRegistry) -> Self {
        Self::with_config(registry, FramerConfig::default())
    }

    /// Create a dispatcher with explicit framing configuration.
    pub fn with_config(registry: HandlerRegistry, config: FramerConfig) -> Self {
        Self { registry, config }
    }

    /// The method table this dispatcher serves.
    pub fn registry(&self) -> &HandlerRegistry {
        &self.registry
    }

    /// Run the serve loop until `input` reaches end-of-stream.
    ///
    /// A UTF-8 byte order mark is tolerated once at the very start of
    /// `input`. Returns `Ok(())` on clean end-of-stream.
    pub fn run<R: Read, W: Write>(&self, input: R, output: W) -> Result<()> {
        let mut reader =
            MessageReader::with_config(input, self.config.clone()).strip_leading_bom();
        let mut writer = MessageWriter::with_config(output, self.config.clone());

        debug!(methods = self.registry.len(), "dispatcher serving");
        while let Some(message) = reader.read_message()? {
            self.dispatch(&message, &mut writer)?;
        }
        debug!("input ended; dispatcher done");
        Ok(())
    }

    fn dispatch<W: Write>(&self, message: &Message, writer: &mut MessageWriter<W>) -> Result<()> {
        let rpc = match decode(&message.body) {
            Ok(rpc) => rpc,
            Err(err) => {
                warn!(%err, "skipping undecodable message");
                return Ok(());
            }
        };

        match rpc {
            RpcMessage::Request(request) => {
                let body = match self.invoke(&request) {
                    Ok(result) => encode_response(&request.id, &result)?,
                    Err(error) => {
                        debug!(
                            method = %request.method,
                            id = %request.id,
                            code = error.code,
                            "replying with error"
                        );
                        encode_error(&request.id, &error)?
                    }
                };
                writer.write_message(&body)?;
            }
            other => {
                warn!(kind = other.kind(), "ignoring inbound message kind");
            }
        }
        Ok(())
    }

    fn invoke(&self, request: &Request) -> std::result::Result<Value, ErrorObject> {
        let Some(entry) = self.registry.lookup(&request.method) else {
            return Err(ErrorObject::method_not_found(&request.method));
        };
        if !entry.style.accepts(&request.params) {
            let got = if request.params.is_list() {
                "positional"
            } else {
                "named"
            };
            return Err(ErrorObject::invalid_params(&format!(
                "method {} takes {} params, got {}",
                request.method,
                entry.style.label(),
                got
            )));
        }
        (entry.func)(request.params.clone())
    }
}

impl std::fmt::Debug for RpcDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RpcDispatcher")
            .field("registry", &self.registry)
            .finish()
    }
}
