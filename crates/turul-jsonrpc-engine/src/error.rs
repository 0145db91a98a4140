use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use thiserror::Error;

use crate::error_codes;
use crate::kind::{self, ErrorKind};

/// JSON-RPC error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JsonRpcErrorCode {
    ParseError,
    InvalidRequest,
    MethodNotFound,
    InvalidParams,
    InternalError,
    ServerError(i64), // -32099 to -32000
    Application(i64),
}

impl JsonRpcErrorCode {
    pub fn code(&self) -> i64 {
        match self {
            JsonRpcErrorCode::ParseError => error_codes::PARSE_ERROR,
            JsonRpcErrorCode::InvalidRequest => error_codes::INVALID_REQUEST,
            JsonRpcErrorCode::MethodNotFound => error_codes::METHOD_NOT_FOUND,
            JsonRpcErrorCode::InvalidParams => error_codes::INVALID_PARAMS,
            JsonRpcErrorCode::InternalError => error_codes::INTERNAL_ERROR,
            JsonRpcErrorCode::ServerError(code) => *code,
            JsonRpcErrorCode::Application(code) => *code,
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            JsonRpcErrorCode::ParseError => "Parse error",
            JsonRpcErrorCode::InvalidRequest => "Invalid Request",
            JsonRpcErrorCode::MethodNotFound => "Method not found",
            JsonRpcErrorCode::InvalidParams => "Invalid params",
            JsonRpcErrorCode::InternalError => "Internal error",
            JsonRpcErrorCode::ServerError(_) => "Server error",
            JsonRpcErrorCode::Application(_) => "Application error",
        }
    }

    /// Classify a raw wire code
    pub fn from_code(code: i64) -> Self {
        match code {
            error_codes::PARSE_ERROR => JsonRpcErrorCode::ParseError,
            error_codes::INVALID_REQUEST => JsonRpcErrorCode::InvalidRequest,
            error_codes::METHOD_NOT_FOUND => JsonRpcErrorCode::MethodNotFound,
            error_codes::INVALID_PARAMS => JsonRpcErrorCode::InvalidParams,
            error_codes::INTERNAL_ERROR => JsonRpcErrorCode::InternalError,
            error_codes::SERVER_ERROR_START..=error_codes::SERVER_ERROR_END => {
                JsonRpcErrorCode::ServerError(code)
            }
            other => JsonRpcErrorCode::Application(other),
        }
    }
}

impl fmt::Display for JsonRpcErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code(), self.message())
    }
}

/// An application-level protocol error: already carries the code, message and
/// optional data that end up in the response's `error` member.
///
/// Handlers return it (through [`HandlerError::Rpc`]) to bypass the declared
/// exception mappings entirely.
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
#[error("{message}")]
pub struct JsonRpcException {
    pub code: i64,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub data: Option<Value>,
}

impl JsonRpcException {
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    pub fn parse_error(message: impl Into<String>) -> Self {
        Self::new(error_codes::PARSE_ERROR, message)
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(error_codes::INVALID_REQUEST, message)
    }

    /// Also used for missing required parameters and unsupported `params` shapes
    pub fn method_not_found(message: impl Into<String>) -> Self {
        Self::new(error_codes::METHOD_NOT_FOUND, message)
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::new(error_codes::INTERNAL_ERROR, message)
    }

    pub fn error_code(&self) -> JsonRpcErrorCode {
        JsonRpcErrorCode::from_code(self.code)
    }
}

/// Failure produced while binding arguments for, or running, a handler
#[derive(Debug, Error)]
pub enum HandlerError {
    /// Already a protocol error; passed through unchanged
    #[error(transparent)]
    Rpc(#[from] JsonRpcException),

    /// A failure tagged with an [`ErrorKind`], resolved through the declared exception mappings
    #[error("{message}")]
    Raised {
        kind: &'static ErrorKind,
        message: String,
    },

    /// JSON encoding/decoding failure
    #[error("{0}")]
    Json(#[from] serde_json::Error),

    /// An asynchronous completion failure wrapping its cause
    #[error("{0}")]
    Wrapped(Box<HandlerError>),
}

impl HandlerError {
    pub fn raised(kind: &'static ErrorKind, message: impl Into<String>) -> Self {
        HandlerError::Raised {
            kind,
            message: message.into(),
        }
    }

    pub fn runtime(message: impl Into<String>) -> Self {
        Self::raised(&kind::RUNTIME, message)
    }

    pub fn illegal_argument(message: impl Into<String>) -> Self {
        Self::raised(&kind::ILLEGAL_ARGUMENT, message)
    }

    pub fn illegal_state(message: impl Into<String>) -> Self {
        Self::raised(&kind::ILLEGAL_STATE, message)
    }

    /// Wrap this failure the way an async executor would
    pub fn wrap(self) -> Self {
        HandlerError::Wrapped(Box::new(self))
    }

    /// Strip exactly one level of [`HandlerError::Wrapped`]
    pub fn unwrap_once(self) -> Self {
        match self {
            HandlerError::Wrapped(cause) => *cause,
            other => other,
        }
    }

    /// Kind used to match exception mappings; `None` for protocol errors
    pub fn kind(&self) -> Option<&'static ErrorKind> {
        match self {
            HandlerError::Rpc(_) => None,
            HandlerError::Raised { kind, .. } => Some(*kind),
            HandlerError::Json(_) => Some(&kind::JSON),
            HandlerError::Wrapped(_) => Some(&kind::COMPLETION),
        }
    }
}

/// Errors reported to the wiring layer at registration time; never written to the wire
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("Ambiguous method: '{0}'")]
    DuplicateMethod(String),

    #[error("Invalid registration: {0}")]
    InvalidRegistration(String),
}
