//! JSON-RPC 2.0 framing types for the bridge.
//!
//! Requests carry a positional `params` array. A call that decodes answers
//! with an [`Envelope`] as `result`; anything that cannot be decoded answers
//! with an `error` object instead. Messages without an `id` are
//! notifications and get no reply.
//!
//! [`Envelope`]: crate::bridge::Envelope

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::CallError;

/// Server name reported in logs and the CLI.
pub const SERVER_NAME: &str = "cad-bridge-mcp";

const JSONRPC_VERSION: &str = "2.0";

/// Request identifier: an integer or a string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequestId {
    /// Integer id, as issued by [`RpcClient`](crate::rpc::RpcClient).
    Number(i64),
    /// String id.
    String(String),
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::String(s) => f.write_str(s),
        }
    }
}

/// A call that expects a reply.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    /// Protocol version, always `"2.0"`.
    pub jsonrpc: String,
    /// Echoed back in the reply.
    pub id: RequestId,
    /// Bridge method name.
    pub method: String,
    /// Positional arguments. Absent means no arguments.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl JsonRpcRequest {
    /// Builds a request for `method` with positional arguments.
    #[must_use]
    pub fn new(id: RequestId, method: impl Into<String>, params: Vec<Value>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            method: method.into(),
            params: Some(Value::Array(params)),
        }
    }
}

/// A one-way message. Only the method name is kept, for logging.
#[derive(Debug, Clone, Deserialize)]
pub struct JsonRpcNotification {
    /// Method the sender asked for.
    pub method: String,
}

/// Reply to a request whose call was decoded.
#[derive(Debug, Clone, Serialize)]
pub struct JsonRpcResponse {
    /// Always `"2.0"`.
    pub jsonrpc: &'static str,
    /// Id of the request being answered.
    pub id: RequestId,
    /// Serialised envelope.
    pub result: Value,
}

impl JsonRpcResponse {
    /// Wraps a result value for the request `id`.
    #[must_use]
    #[allow(clippy::missing_const_for_fn)] // Value is not const-compatible
    pub fn success(id: RequestId, result: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            id,
            result,
        }
    }
}

/// Fault codes the bridge emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// The line was not JSON (or not UTF-8, or too long).
    ParseError,
    /// JSON, but not a JSON-RPC 2.0 message.
    InvalidRequest,
    /// Name outside the bridge method table.
    MethodNotFound,
    /// Arguments of the wrong count or type.
    InvalidParams,
    /// The executor could not run the call.
    InternalError,
}

impl ErrorCode {
    /// Numeric wire code.
    #[must_use]
    pub const fn code(self) -> i32 {
        match self {
            Self::ParseError => -32700,
            Self::InvalidRequest => -32600,
            Self::MethodNotFound => -32601,
            Self::InvalidParams => -32602,
            Self::InternalError => -32603,
        }
    }

    const fn message(self) -> &'static str {
        match self {
            Self::ParseError => "Parse error",
            Self::InvalidRequest => "Invalid Request",
            Self::MethodNotFound => "Method not found",
            Self::InvalidParams => "Invalid params",
            Self::InternalError => "Internal error",
        }
    }
}

/// The `error` member of a fault reply.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcErrorData {
    /// Numeric fault code.
    pub code: i32,
    /// Fault text.
    pub message: String,
}

/// A fault reply.
#[derive(Debug, Clone, Serialize)]
pub struct JsonRpcError {
    /// Always `"2.0"`.
    pub jsonrpc: &'static str,
    /// Id of the request, when one could be read.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<RequestId>,
    /// Code and text.
    pub error: JsonRpcErrorData,
}

impl JsonRpcError {
    fn fault(id: Option<RequestId>, code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            id,
            error: JsonRpcErrorData {
                code: code.code(),
                message: message.into(),
            },
        }
    }

    /// Fault for a line that could not be read as JSON. Carries no id.
    #[must_use]
    pub fn parse_error() -> Self {
        let code = ErrorCode::ParseError;
        Self::fault(None, code, code.message())
    }

    /// Fault for JSON that is not a usable request.
    #[must_use]
    pub fn invalid_request(id: Option<RequestId>) -> Self {
        let code = ErrorCode::InvalidRequest;
        Self::fault(id, code, code.message())
    }

    /// Fault for a decoded call the executor never ran.
    #[must_use]
    pub fn internal_error(id: RequestId, message: impl Into<String>) -> Self {
        Self::fault(Some(id), ErrorCode::InternalError, message)
    }

    /// Fault for a call that could not be decoded.
    #[must_use]
    pub fn from_call_error(id: RequestId, error: &CallError) -> Self {
        let code = match error {
            CallError::UnknownMethod(_) => ErrorCode::MethodNotFound,
            CallError::InvalidParams { .. } => ErrorCode::InvalidParams,
        };
        Self::fault(Some(id), code, error.to_string())
    }
}

/// A parsed line from a client.
#[derive(Debug, Clone)]
pub enum IncomingMessage {
    /// Has an `id`; gets exactly one reply.
    Request(JsonRpcRequest),
    /// No `id`; never answered.
    Notification(JsonRpcNotification),
}

/// Parses one line into a request or notification.
///
/// # Errors
///
/// Returns a parse-error fault when the line is not a JSON object and an
/// invalid-request fault when the version is wrong, a member has the wrong
/// type or the method is empty.
pub fn parse_message(line: &str) -> Result<IncomingMessage, JsonRpcError> {
    let value: Value = serde_json::from_str(line).map_err(|_| JsonRpcError::parse_error())?;
    let Some(members) = value.as_object() else {
        return Err(JsonRpcError::parse_error());
    };

    if members.get("jsonrpc").and_then(Value::as_str) != Some(JSONRPC_VERSION) {
        return Err(JsonRpcError::invalid_request(None));
    }

    if !members.contains_key("id") {
        return serde_json::from_value(value)
            .map(IncomingMessage::Notification)
            .map_err(|_| JsonRpcError::invalid_request(None));
    }

    let request: JsonRpcRequest =
        serde_json::from_value(value).map_err(|_| JsonRpcError::invalid_request(None))?;
    if request.method.is_empty() {
        return Err(JsonRpcError::invalid_request(Some(request.id)));
    }
    Ok(IncomingMessage::Request(request))
}

/// A reply as the client reads it. Exactly one of `result` and `error` is
/// expected.
#[derive(Debug, Clone, Deserialize)]
pub struct JsonRpcReply {
    /// Echoed request id. Absent on parse errors.
    #[serde(default)]
    pub id: Option<RequestId>,
    /// Envelope value on success.
    #[serde(default)]
    pub result: Option<Value>,
    /// Fault on failure.
    #[serde(default)]
    pub error: Option<JsonRpcErrorData>,
}
