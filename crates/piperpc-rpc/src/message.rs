use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One decoded protocol message. A valid body is exactly one of these.
#[derive(Debug, Clone, PartialEq)]
pub enum RpcMessage {
    /// A call expecting a response: `method` plus `id`.
    Request(Request),
    /// A call expecting nothing back: `method` without `id`.
    Notification(Notification),
    /// A successful reply carrying `result`.
    Response(Response),
    /// A failed reply carrying an `error` object.
    ErrorMessage(ErrorMessage),
}

impl RpcMessage {
    /// Message kind for log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Request(_) => "request",
            Self::Notification(_) => "notification",
            Self::Response(_) => "response",
            Self::ErrorMessage(_) => "error",
        }
    }
}

/// A method call that expects a response with the same id.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    /// Name of the method to invoke.
    pub method: String,
    /// Call arguments, positional or named.
    pub params: Params,
    /// Identifier echoed back in the response.
    pub id: RequestId,
}

impl Request {
    /// Create a new request.
    pub fn new(
        method: impl Into<String>,
        params: impl Into<Params>,
        id: impl Into<RequestId>,
    ) -> Self {
        Self {
            method: method.into(),
            params: params.into(),
            id: id.into(),
        }
    }
}

/// A method call with no reply expected.
#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    /// Name of the method to invoke.
    pub method: String,
    /// Call arguments, positional or named.
    pub params: Params,
}

impl Notification {
    /// Create a new notification.
    pub fn new(method: impl Into<String>, params: impl Into<Params>) -> Self {
        Self {
            method: method.into(),
            params: params.into(),
        }
    }
}

/// A successful reply to a request.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    /// Identifier of the request being answered.
    pub id: RequestId,
    /// The call's result value.
    pub result: Value,
}

/// A failed reply to a request.
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorMessage {
    /// Identifier of the request being answered.
    pub id: RequestId,
    /// What went wrong.
    pub error: ErrorObject,
}

/// Call arguments: a JSON array (positional) or object (named).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Params {
    /// Positional arguments, applied in order.
    List(Vec<Value>),
    /// Named arguments, applied by key.
    Map(Map<String, Value>),
}

impl Params {
    /// Empty positional arguments.
    pub fn none() -> Self {
        Self::List(Vec::new())
    }

    /// True for positional arguments.
    pub fn is_list(&self) -> bool {
        matches!(self, Self::List(_))
    }

    /// True for named arguments.
    pub fn is_map(&self) -> bool {
        matches!(self, Self::Map(_))
    }

    /// Positional view, if these are positional arguments.
    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Self::List(items) => Some(items),
            Self::Map(_) => None,
        }
    }

    /// Named view, if these are named arguments.
    pub fn as_map(&self) -> Option<&Map<String, Value>> {
        match self {
            Self::List(_) => None,
            Self::Map(map) => Some(map),
        }
    }

    /// Number of arguments.
    pub fn len(&self) -> usize {
        match self {
            Self::List(items) => items.len(),
            Self::Map(map) => map.len(),
        }
    }

    /// True when no arguments were passed.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl From<Vec<Value>> for Params {
    fn from(items: Vec<Value>) -> Self {
        Self::List(items)
    }
}

impl From<Map<String, Value>> for Params {
    fn from(map: Map<String, Value>) -> Self {
        Self::Map(map)
    }
}

/// Request identifier: an integer or a string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequestId {
    Number(i64),
    Text(String),
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => write!(f, "{s}"),
        }
    }
}

impl From<i64> for RequestId {
    fn from(n: i64) -> Self {
        Self::Number(n)
    }
}

impl From<&str> for RequestId {
    fn from(s: &str) -> Self {
        Self::Text(s.to_owned())
    }
}

impl From<String> for RequestId {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

// Standard JSON-RPC 2.0 error codes
/// Invalid JSON was received.
pub const PARSE_ERROR: i64 = -32700;
/// The body is not a valid request object.
pub const INVALID_REQUEST: i64 = -32600;
/// The method does not exist.
pub const METHOD_NOT_FOUND: i64 = -32601;
/// Invalid method parameter(s).
pub const INVALID_PARAMS: i64 = -32602;
/// Internal JSON-RPC error.
pub const INTERNAL_ERROR: i64 = -32603;

/// JSON-RPC 2.0 error object: code, message, optional data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorObject {
    /// Error code (standard codes are negative integers).
    pub code: i64,
    /// Short description of the error.
    pub message: String,
    /// Additional data, omitted from the wire when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl ErrorObject {
    /// Create an error with an application-defined code.
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }

    /// Attach additional data.
    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    /// Parse error (-32700): invalid JSON was received.
    pub fn parse_error() -> Self {
        Self::new(PARSE_ERROR, "Parse error")
    }

    /// Invalid request (-32600): the body is not a valid request object.
    pub fn invalid_request(msg: &str) -> Self {
        Self::new(INVALID_REQUEST, msg)
    }

    /// Method not found (-32601).
    pub fn method_not_found(method: &str) -> Self {
        Self::new(METHOD_NOT_FOUND, format!("method not found: {method}"))
    }

    /// Invalid params (-32602).
    pub fn invalid_params(msg: &str) -> Self {
        Self::new(INVALID_PARAMS, msg)
    }

    /// Internal error (-32603).
    pub fn internal_error(msg: &str) -> Self {
        Self::new(INTERNAL_ERROR, msg)
    }
}

impl std::fmt::Display for ErrorObject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} (code {})", self.message, self.code)
    }
}
