use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::JsonRpcException;

/// The `error` member of a failed response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub code: i64,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub data: Option<Value>,
}

impl ErrorResponse {
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }
}

impl From<JsonRpcException> for ErrorResponse {
    fn from(exception: JsonRpcException) -> Self {
        Self {
            code: exception.code,
            message: exception.message,
            data: exception.data,
        }
    }
}

/// A JSON-RPC response envelope.
///
/// Exactly one of `result` / `error` is set. A successful call returning nothing
/// carries `Some(Value::Null)` so `"result": null` is still written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub jsonrpc: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub error: Option<ErrorResponse>,
}

impl Response {
    pub fn success(jsonrpc: impl Into<String>, id: Option<String>, result: Value) -> Self {
        Self {
            jsonrpc: jsonrpc.into(),
            id,
            result: Some(result),
            error: None,
        }
    }

    pub fn failure(jsonrpc: impl Into<String>, id: Option<String>, error: ErrorResponse) -> Self {
        Self {
            jsonrpc: jsonrpc.into(),
            id,
            result: None,
            error: Some(error),
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    /// Error code, if this is an error response
    pub fn error_code(&self) -> Option<i64> {
        self.error.as_ref().map(|error| error.code)
    }
}

/// What the engine writes back for one incoming JSON value: a single response,
/// or an array of responses in request order for a batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ResponseBody {
    Single(Response),
    Batch(Vec<Response>),
}

impl ResponseBody {
    pub fn is_batch(&self) -> bool {
        matches!(self, ResponseBody::Batch(_))
    }

    pub fn as_single(&self) -> Option<&Response> {
        match self {
            ResponseBody::Single(response) => Some(response),
            ResponseBody::Batch(_) => None,
        }
    }

    pub fn as_batch(&self) -> Option<&[Response]> {
        match self {
            ResponseBody::Single(_) => None,
            ResponseBody::Batch(responses) => Some(responses),
        }
    }

    pub fn to_json_string(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

impl From<Response> for ResponseBody {
    fn from(response: Response) -> Self {
        ResponseBody::Single(response)
    }
}

impl From<Vec<Response>> for ResponseBody {
    fn from(responses: Vec<Response>) -> Self {
        ResponseBody::Batch(responses)
    }
}
