//! HTTP Transport Utilities
//!
//! Conversion between HTTP messages and JSON-RPC envelopes, shared by the
//! worker's server and the frontend's worker client.
//!
//! # Components
//!
//! - **[`HttpTransport`]**: Utility functions for HTTP/JSON-RPC conversion
//! - **[`HyperRequest`]**: Type alias for Hyper incoming requests
//! - **[`HyperResponse`]**: Type alias for Hyper responses
//!
//! # Example
//!
//! ```
//! use mandel_common::transport::http::HttpTransport;
//! use mandel_common::protocol::JsonRpcResponse;
//! use serde_json::json;
//!
//! let jsonrpc_response = JsonRpcResponse::success(json!(1), json!({"status": "SERVING"}));
//! let http_response = HttpTransport::to_http_response(jsonrpc_response);
//! assert_eq!(http_response.status(), 200);
//! ```

use http_body_util::Full;
use hyper::body::{Bytes, Incoming};
use hyper::header::{HeaderValue, CONTENT_TYPE};
use hyper::{Method, Request, Response, StatusCode};

use crate::protocol::error::MandelError;
use crate::protocol::{JsonRpcError, JsonRpcRequest, JsonRpcResponse};

/// Type alias for Hyper incoming requests
pub type HyperRequest = Request<Incoming>;

/// Type alias for Hyper responses with full body
pub type HyperResponse = Response<Full<Bytes>>;

/// HTTP transport utility functions
pub struct HttpTransport;

impl HttpTransport {
    /// Parse a JSON-RPC request from an HTTP body
    ///
    /// # Example
    ///
    /// ```
    /// use mandel_common::transport::http::HttpTransport;
    /// use hyper::body::Bytes;
    ///
    /// let body = Bytes::from(r#"{"jsonrpc":"2.0","method":"health_check","params":{},"id":1}"#);
    /// let request = HttpTransport::parse_jsonrpc(body).unwrap();
    /// assert_eq!(request.method, "health_check");
    /// ```
    pub fn parse_jsonrpc(body: Bytes) -> Result<JsonRpcRequest, MandelError> {
        serde_json::from_slice(&body).map_err(MandelError::JsonSerialization)
    }

    /// Parse a JSON-RPC response from an HTTP body
    pub fn parse_jsonrpc_response(body: &[u8]) -> Result<JsonRpcResponse, MandelError> {
        serde_json::from_slice(body).map_err(MandelError::JsonSerialization)
    }

    /// Create an HTTP response from a JSON-RPC response
    pub fn to_http_response(jsonrpc: JsonRpcResponse) -> HyperResponse {
        Self::to_http_response_with_status(jsonrpc, StatusCode::OK)
    }

    /// Create an HTTP response with a custom status code
    pub fn to_http_response_with_status(
        jsonrpc: JsonRpcResponse,
        status: StatusCode,
    ) -> HyperResponse {
        let body = serde_json::to_vec(&jsonrpc).unwrap_or_default();

        let mut response = Response::new(Full::new(Bytes::from(body)));
        *response.status_mut() = status;
        response
            .headers_mut()
            .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        response
    }

    /// Create an HTTP error response from a JSON-RPC error
    pub fn to_http_error(id: serde_json::Value, error: JsonRpcError) -> HyperResponse {
        Self::to_http_response(JsonRpcResponse::error(id, error))
    }

    /// Build the HTTP POST carrying `req` to the worker at `addr` (`host:port`)
    pub fn build_post(addr: &str, req: &JsonRpcRequest) -> Result<Request<Full<Bytes>>, MandelError> {
        let body = serde_json::to_vec(req)?;

        Request::builder()
            .method(Method::POST)
            .uri(format!("http://{}/", addr))
            .header(CONTENT_TYPE, "application/json")
            .body(Full::new(Bytes::from(body)))
            .map_err(|e| MandelError::Transport(format!("Failed to build request: {}", e)))
    }
}
