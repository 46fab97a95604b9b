use piperpc_peer::{HandlerRegistry, ParamsStyle, RpcDispatcher};
use piperpc_rpc::{ErrorObject, Params};
use serde_json::{json, Value};

use crate::cmd::{MethodSet, ServeArgs};
use crate::exit::{peer_error, CliError, CliResult, INTERNAL, SUCCESS};
use crate::output::OutputFormat;

pub fn run(args: ServeArgs, _format: OutputFormat) -> CliResult<i32> {
    let registry = match args.methods {
        MethodSet::Demo => demo_registry()?,
    };
    let dispatcher = RpcDispatcher::new(registry);

    tracing::info!(methods = dispatcher.registry().len(), "serving on stdio");
    let stdin = std::io::stdin().lock();
    let stdout = std::io::stdout().lock();
    dispatcher
        .run(stdin, stdout)
        .map_err(|err| peer_error("serve failed", err))?;
    tracing::info!("stdin closed, exiting");

    Ok(SUCCESS)
}

fn demo_registry() -> CliResult<HandlerRegistry> {
    let mut registry = HandlerRegistry::new();
    bind(&mut registry, "hello", ParamsStyle::Positional, hello)?;
    bind(&mut registry, "add", ParamsStyle::Positional, add)?;
    bind(&mut registry, "echo", ParamsStyle::Any, echo)?;
    bind(&mut registry, "ping", ParamsStyle::Any, ping)?;
    Ok(registry)
}

fn bind<F>(
    registry: &mut HandlerRegistry,
    method: &str,
    style: ParamsStyle,
    handler: F,
) -> CliResult<()>
where
    F: Fn(Params) -> Result<Value, ErrorObject> + Send + Sync + 'static,
{
    registry
        .register(method, style, handler)
        .map_err(|err| CliError::new(INTERNAL, format!("registering {method}: {err}")))
}

fn hello(params: Params) -> Result<Value, ErrorObject> {
    let target = params
        .as_list()
        .and_then(|list| list.first())
        .and_then(Value::as_str)
        .ok_or_else(|| ErrorObject::invalid_params("hello takes one string"))?;
    Ok(Value::String(format!("hello {target}")))
}

fn add(params: Params) -> Result<Value, ErrorObject> {
    let list = params.as_list().unwrap_or_default();
    let (Some(a), Some(b)) = (
        list.first().and_then(Value::as_i64),
        list.get(1).and_then(Value::as_i64),
    ) else {
        return Err(ErrorObject::invalid_params("add takes two integers"));
    };
    Ok(json!(a + b))
}

fn echo(params: Params) -> Result<Value, ErrorObject> {
    serde_json::to_value(&params)
        .map_err(|err| ErrorObject::internal_error(&format!("echo failed: {err}")))
}

fn ping(_params: Params) -> Result<Value, ErrorObject> {
    Ok(json!("pong"))
}
