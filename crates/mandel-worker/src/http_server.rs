//! HTTP Server for the Worker
//!
//! Accepts JSON-RPC requests as HTTP/1.1 POSTs and hands them to the
//! [`WorkerRouter`]. Each connection is served on its own tokio task.
//!
//! # Example
//!
//! ```no_run
//! use mandel_worker::http_server::HttpServer;
//! use mandel_worker::Worker;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() {
//!     let server = HttpServer::new(Arc::new(Worker::new()));
//!     server.run("0.0.0.0:28000".parse().unwrap()).await.unwrap();
//! }
//! ```

use std::net::SocketAddr;
use std::sync::Arc;

use http_body_util::BodyExt;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::Method;
use hyper_util::rt::TokioIo;
use mandel_common::protocol::error::MandelError;
use mandel_common::protocol::JsonRpcError;
use mandel_common::transport::{HttpTransport, HyperRequest, HyperResponse};
use serde_json::json;
use tokio::net::TcpListener;

use crate::http_router::WorkerRouter;
use crate::worker::Worker;

/// HTTP front of one [`Worker`].
pub struct HttpServer {
    router: Arc<WorkerRouter>,
}

impl HttpServer {
    pub fn new(worker: Arc<Worker>) -> Self {
        Self {
            router: Arc::new(WorkerRouter::new(worker)),
        }
    }

    /// Binds `addr` and serves until the accept loop fails.
    pub async fn run(self, addr: SocketAddr) -> Result<(), MandelError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| MandelError::Transport(format!("Failed to bind to {}: {}", addr, e)))?;
        self.serve(listener).await
    }

    /// Serves connections from an already bound listener.
    pub async fn serve(self, listener: TcpListener) -> Result<(), MandelError> {
        let local = listener
            .local_addr()
            .map_err(|e| MandelError::Transport(format!("Failed to get local address: {}", e)))?;
        tracing::info!("Worker listening on {}", local);

        loop {
            let (stream, peer) = listener
                .accept()
                .await
                .map_err(|e| MandelError::Transport(format!("Failed to accept connection: {}", e)))?;

            let io = TokioIo::new(stream);
            let router = self.router.clone();

            tokio::task::spawn(async move {
                let service = service_fn(move |req| {
                    let router = router.clone();
                    async move { Self::handle_request(router, req).await }
                });

                if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                    tracing::error!("Error serving connection from {}: {}", peer, err);
                }
            });
        }
    }

    async fn handle_request(
        router: Arc<WorkerRouter>,
        req: HyperRequest,
    ) -> Result<HyperResponse, MandelError> {
        if req.method() != Method::POST {
            return Ok(HttpTransport::to_http_error(
                json!(null),
                JsonRpcError::invalid_request(),
            ));
        }

        let body = req
            .into_body()
            .collect()
            .await
            .map_err(|e| MandelError::Transport(format!("Failed to read request body: {}", e)))?
            .to_bytes();

        let jsonrpc_req = match HttpTransport::parse_jsonrpc(body) {
            Ok(req) => req,
            Err(e) => {
                tracing::warn!("Failed to parse JSON-RPC request: {}", e);
                return Ok(HttpTransport::to_http_error(
                    json!(null),
                    JsonRpcError::parse_error(),
                ));
            }
        };

        Ok(HttpTransport::to_http_response(
            router.handle_request(jsonrpc_req).await,
        ))
    }
}
