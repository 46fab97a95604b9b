use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::{CodecError, Result};
use crate::message::{
    ErrorMessage, ErrorObject, Notification, Params, Request, RequestId, Response, RpcMessage,
};

/// The only protocol version this codec speaks.
pub const VERSION: &str = "2.0";

/// Decode one body into its message variant.
///
/// Classification is structural, checked in order:
/// `method` plus `id` is a request, `method` alone is a notification,
/// `result` is a response, `error` is an error message. Anything else,
/// and any body whose `jsonrpc` tag is not `"2.0"`, is rejected.
pub fn decode(body: &[u8]) -> Result<RpcMessage> {
    let value: Value = serde_json::from_slice(body)?;
    let Value::Object(obj) = value else {
        return Err(CodecError::Malformed("body is not a JSON object".into()));
    };

    let version = obj.get("jsonrpc").and_then(Value::as_str);
    if version != Some(VERSION) {
        return Err(CodecError::Version {
            found: obj
                .get("jsonrpc")
                .map(|v| v.to_string())
                .unwrap_or_else(|| "<missing>".into()),
        });
    }

    if obj.contains_key("method") {
        let method = decode_method(&obj)?;
        let params = decode_params(&obj)?;
        if obj.contains_key("id") {
            let id = decode_id(&obj)?;
            return Ok(RpcMessage::Request(Request { method, params, id }));
        }
        return Ok(RpcMessage::Notification(Notification { method, params }));
    }

    if let Some(result) = obj.get("result") {
        let id = decode_id(&obj)?;
        return Ok(RpcMessage::Response(Response {
            id,
            result: result.clone(),
        }));
    }

    if let Some(error) = obj.get("error") {
        let id = decode_id(&obj)?;
        let error: ErrorObject = serde_json::from_value(error.clone())
            .map_err(|err| CodecError::Malformed(format!("bad error object: {err}")))?;
        return Ok(RpcMessage::ErrorMessage(ErrorMessage { id, error }));
    }

    Err(CodecError::Malformed(
        "no method, result, or error key".into(),
    ))
}

fn decode_method(obj: &Map<String, Value>) -> Result<String> {
    match obj.get("method") {
        Some(Value::String(method)) => Ok(method.clone()),
        Some(other) => Err(CodecError::Malformed(format!(
            "method must be a string, got {other}"
        ))),
        None => Err(CodecError::Malformed("missing method".into())),
    }
}

fn decode_params(obj: &Map<String, Value>) -> Result<Params> {
    match obj.get("params") {
        Some(Value::Array(items)) => Ok(Params::List(items.clone())),
        Some(Value::Object(map)) => Ok(Params::Map(map.clone())),
        Some(other) => Err(CodecError::Malformed(format!(
            "params must be an array or object, got {other}"
        ))),
        None => Err(CodecError::Malformed("missing params".into())),
    }
}

fn decode_id(obj: &Map<String, Value>) -> Result<RequestId> {
    let value = obj
        .get("id")
        .ok_or_else(|| CodecError::Malformed("missing id".into()))?;
    serde_json::from_value(value.clone()).map_err(|_| {
        CodecError::Malformed(format!("id must be an integer or string, got {value}"))
    })
}

// Wire shapes fix the serialized field order, so encoded bodies always lead
// with the version tag.

#[derive(Serialize)]
struct WireRequest<'a> {
    jsonrpc: &'static str,
    method: &'a str,
    params: &'a Params,
    id: &'a RequestId,
}

#[derive(Serialize)]
struct WireNotification<'a> {
    jsonrpc: &'static str,
    method: &'a str,
    params: &'a Params,
}

#[derive(Serialize)]
struct WireResponse<'a> {
    jsonrpc: &'static str,
    id: &'a RequestId,
    result: &'a Value,
}

#[derive(Serialize)]
struct WireError<'a> {
    jsonrpc: &'static str,
    id: &'a RequestId,
    error: &'a ErrorObject,
}

/// Encode a request body.
pub fn encode_request(request: &Request) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec(&WireRequest {
        jsonrpc: VERSION,
        method: &request.method,
        params: &request.params,
        id: &request.id,
    })?)
}

/// Encode a notification body.
pub fn encode_notify(notification: &Notification) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec(&WireNotification {
        jsonrpc: VERSION,
        method: &notification.method,
        params: &notification.params,
    })?)
}

/// Encode a success response body for the given request id.
pub fn encode_response(id: &RequestId, result: &Value) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec(&WireResponse {
        jsonrpc: VERSION,
        id,
        result,
    })?)
}

/// Encode an error response body for the given request id.
pub fn encode_error(id: &RequestId, error: &ErrorObject) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec(&WireError {
        jsonrpc: VERSION,
        id,
        error,
    })?)
}
