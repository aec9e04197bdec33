//! Compute backend client
//!
//! [`ComputeBackend`] is the frontend's view of a worker. [`HttpBackend`]
//! implements it with JSON-RPC over HTTP/1.1, reusing one hyper client (and
//! its connection pool) for every call.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use futures::future::BoxFuture;
use http_body_util::{BodyExt, Full};
use hyper::body::Bytes;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;
use mandel_common::protocol::error::{MandelError, Result};
use mandel_common::transport::HttpTransport;
use mandel_common::{
    BlockReply, BlockRequest, HealthCheckRequest, HealthCheckResponse, JsonRpcRequest,
    ServingStatus, COMPUTE_BLOCK_METHOD, HEALTH_CHECK_METHOD, WORKER_SERVICE,
};
use serde_json::{json, Value};

/// A worker able to compute blocks.
pub trait ComputeBackend: Send + Sync {
    /// Iteration counts of the block described by `req`.
    fn compute_block(&self, req: BlockRequest) -> BoxFuture<'_, Result<BlockReply>>;

    /// Serving status of the worker's compute service.
    fn check_health(&self) -> BoxFuture<'_, Result<ServingStatus>>;
}

/// JSON-RPC client for one worker endpoint.
pub struct HttpBackend {
    addr: String,
    client: Client<HttpConnector, Full<Bytes>>,
    timeout: Duration,
    next_id: AtomicU64,
}

impl HttpBackend {
    /// Creates a client for the worker at `addr` (`host:port`).
    ///
    /// No connection is made until the first call. Every call, including
    /// connection setup, is bounded by `timeout`.
    pub fn new(addr: impl Into<String>, timeout: Duration) -> Self {
        let mut connector = HttpConnector::new();
        connector.set_connect_timeout(Some(timeout));
        connector.set_nodelay(true);

        Self {
            addr: addr.into(),
            client: Client::builder(TokioExecutor::new()).build(connector),
            timeout,
            next_id: AtomicU64::new(1),
        }
    }

    pub fn addr(&self) -> &str {
        &self.addr
    }

    /// Sends one JSON-RPC call and returns its result value.
    pub async fn call(&self, method: &str, params: Value) -> Result<Value> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let request = JsonRpcRequest::new(method, params, json!(id));
        let http_request = HttpTransport::build_post(&self.addr, &request)?;

        let exchange = async {
            let response = self
                .client
                .request(http_request)
                .await
                .map_err(|e| MandelError::Transport(format!("HTTP request to {} failed: {}", self.addr, e)))?;

            let body = response
                .into_body()
                .collect()
                .await
                .map_err(|e| MandelError::Transport(format!("Failed to read response: {}", e)))?
                .to_bytes();
            Ok::<_, MandelError>(body)
        };

        let body = tokio::time::timeout(self.timeout, exchange)
            .await
            .map_err(|_| MandelError::Timeout(self.timeout.as_millis() as u64))??;

        HttpTransport::parse_jsonrpc_response(&body)?.into_result()
    }
}

impl ComputeBackend for HttpBackend {
    fn compute_block(&self, req: BlockRequest) -> BoxFuture<'_, Result<BlockReply>> {
        Box::pin(async move {
            let expected = (req.block_size as usize).pow(2);
            let params = serde_json::to_value(&req)?;
            let reply: BlockReply = serde_json::from_value(self.call(COMPUTE_BLOCK_METHOD, params).await?)?;

            if reply.results.len() != expected {
                return Err(MandelError::InvalidResponse(format!(
                    "worker returned {} results for block ({}, {}), expected {}",
                    reply.results.len(),
                    req.block_x,
                    req.block_y,
                    expected
                )));
            }
            Ok(reply)
        })
    }

    fn check_health(&self) -> BoxFuture<'_, Result<ServingStatus>> {
        Box::pin(async move {
            let params = serde_json::to_value(HealthCheckRequest::new(WORKER_SERVICE))?;
            let response: HealthCheckResponse =
                serde_json::from_value(self.call(HEALTH_CHECK_METHOD, params).await?)?;
            Ok(response.status)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_creation_is_lazy() {
        let backend = HttpBackend::new("localhost:28000", Duration::from_secs(1));
        assert_eq!(backend.addr(), "localhost:28000");
    }

    #[tokio::test]
    async fn test_call_to_closed_port_fails() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let backend = HttpBackend::new(addr.to_string(), Duration::from_secs(2));
        let err = backend.check_health().await.unwrap_err();
        assert!(err.is_connectivity(), "unexpected error: {}", err);
    }

    #[tokio::test]
    async fn test_call_times_out() {
        // accepts connections but never answers
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((stream, _)) = listener.accept().await {
                held.push(stream);
            }
        });

        let backend = HttpBackend::new(addr.to_string(), Duration::from_millis(200));
        let err = backend.check_health().await.unwrap_err();
        assert!(matches!(err, MandelError::Timeout(200)));
    }
}
