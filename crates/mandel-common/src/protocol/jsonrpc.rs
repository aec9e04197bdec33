//! JSON-RPC 2.0 envelopes
//!
//! The worker exposes `compute_block` and `health_check` as JSON-RPC 2.0
//! methods over HTTP POST. Payloads live in [`super::compute`] and
//! [`super::health`]; this module only wraps them.
//!
//! ```
//! use mandel_common::protocol::jsonrpc::{JsonRpcError, JsonRpcRequest, JsonRpcResponse};
//! use serde_json::json;
//!
//! let request = JsonRpcRequest::new("health_check", json!({"service": ""}), json!(1));
//! let reply = JsonRpcResponse::success(request.id.clone(), json!({"status": "SERVING"}));
//! assert_eq!(reply.into_result().unwrap()["status"], "SERVING");
//!
//! let reply = JsonRpcResponse::error(json!(2), JsonRpcError::method_not_found());
//! assert!(reply.into_result().is_err());
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::error::{MandelError, Result};

pub const JSONRPC_VERSION: &str = "2.0";

pub const PARSE_ERROR: i32 = -32700;
pub const INVALID_REQUEST: i32 = -32600;
pub const METHOD_NOT_FOUND: i32 = -32601;
/// The worker rejected the block request itself.
pub const INVALID_PARAMS: i32 = -32602;
/// The worker accepted the request but failed to answer it.
pub const SERVER_ERROR: i32 = -32000;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    pub method: String,
    /// `null` when the caller sent none
    #[serde(default)]
    pub params: Value,
    pub id: Value,
}

impl JsonRpcRequest {
    pub fn new(method: impl Into<String>, params: Value, id: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.into(),
            method: method.into(),
            params,
            id,
        }
    }
}

/// Exactly one of `result` and `error` is set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
    pub id: Value,
}

impl JsonRpcResponse {
    pub fn success(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.into(),
            result: Some(result),
            error: None,
            id,
        }
    }

    pub fn error(id: Value, error: JsonRpcError) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.into(),
            result: None,
            error: Some(error),
            id,
        }
    }

    /// The result value, or the error the worker answered with.
    pub fn into_result(self) -> Result<Value> {
        if let Some(error) = self.error {
            return Err(error.into());
        }
        self.result
            .ok_or_else(|| MandelError::InvalidResponse("Response missing result".to_string()))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JsonRpcError {
    pub code: i32,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl JsonRpcError {
    fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }

    pub fn parse_error() -> Self {
        Self::new(PARSE_ERROR, "Parse error")
    }

    pub fn invalid_request() -> Self {
        Self::new(INVALID_REQUEST, "Invalid Request")
    }

    pub fn method_not_found() -> Self {
        Self::new(METHOD_NOT_FOUND, "Method not found")
    }

    pub fn invalid_params(msg: &str) -> Self {
        Self::new(INVALID_PARAMS, msg)
    }

    pub fn server_error(msg: &str) -> Self {
        Self::new(SERVER_ERROR, msg)
    }
}

impl From<JsonRpcError> for MandelError {
    fn from(err: JsonRpcError) -> Self {
        match err.code {
            INVALID_PARAMS | INVALID_REQUEST => MandelError::InvalidRequest(err.message),
            _ => MandelError::Remote(err.message),
        }
    }
}
