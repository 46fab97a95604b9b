//! Minimal stdio server — answers `reverse` requests on this process's own
//! stdin/stdout.
//!
//! Run with:
//!   cargo run --example stdio-server
//!
//! Drive it with the CLI from another terminal:
//!   cargo run --features cli -- call --method reverse --params '["abc"]' -- \
//!     cargo run --example stdio-server

use piperpc::peer::{HandlerRegistry, ParamsStyle, RpcDispatcher};
use piperpc::rpc::ErrorObject;
use serde_json::Value;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut registry = HandlerRegistry::new();
    registry.register("reverse", ParamsStyle::Positional, |params| {
        let text = params
            .as_list()
            .and_then(|list| list.first())
            .and_then(Value::as_str)
            .ok_or_else(|| ErrorObject::invalid_params("reverse takes one string"))?;
        Ok(Value::String(text.chars().rev().collect()))
    })?;

    eprintln!("Serving `reverse` on stdin/stdout");
    let dispatcher = RpcDispatcher::new(registry);
    dispatcher.run(std::io::stdin().lock(), std::io::stdout().lock())?;
    eprintln!("stdin closed, bye");
    Ok(())
}
