//! JSON-RPC Router for the Worker
//!
//! Dispatches the two worker methods:
//! - **`compute_block`**: iteration counts of one block
//! - **`health_check`**: liveness, answered without touching the compute path
//!
//! # Example
//!
//! ```
//! use mandel_worker::http_router::WorkerRouter;
//! use mandel_worker::Worker;
//! use std::sync::Arc;
//!
//! let router = WorkerRouter::new(Arc::new(Worker::new()));
//! ```

use std::sync::Arc;

use mandel_common::protocol::error::MandelError;
use mandel_common::protocol::{JsonRpcError, JsonRpcRequest, JsonRpcResponse};
use mandel_common::{
    BlockRequest, HealthCheckRequest, HealthCheckResponse, COMPUTE_BLOCK_METHOD,
    HEALTH_CHECK_METHOD,
};
use serde_json::Value;

use crate::worker::Worker;

/// Routes JSON-RPC requests to a [`Worker`].
pub struct WorkerRouter {
    worker: Arc<Worker>,
}

impl WorkerRouter {
    pub fn new(worker: Arc<Worker>) -> Self {
        Self { worker }
    }

    pub fn worker(&self) -> &Arc<Worker> {
        &self.worker
    }

    /// Handles a JSON-RPC request.
    ///
    /// Failures are reported inside the returned response; request errors map
    /// to `invalid_params`, everything else to a server error.
    pub async fn handle_request(&self, req: JsonRpcRequest) -> JsonRpcResponse {
        let id = req.id.clone();

        let result = match req.method.as_str() {
            COMPUTE_BLOCK_METHOD => self.compute_block(req.params).await,
            HEALTH_CHECK_METHOD => self.health_check(req.params),
            other => {
                tracing::debug!("Unknown method: {}", other);
                return JsonRpcResponse::error(id, JsonRpcError::method_not_found());
            }
        };

        match result {
            Ok(value) => JsonRpcResponse::success(id, value),
            Err(MandelError::InvalidRequest(msg)) => {
                JsonRpcResponse::error(id, JsonRpcError::invalid_params(&msg))
            }
            Err(e) => {
                tracing::warn!("{} failed: {}", req.method, e);
                JsonRpcResponse::error(id, JsonRpcError::server_error(&e.to_string()))
            }
        }
    }

    async fn compute_block(&self, params: Value) -> Result<Value, MandelError> {
        let block: BlockRequest = serde_json::from_value(params)
            .map_err(|e| MandelError::InvalidRequest(format!("bad compute_block params: {}", e)))?;
        let reply = self.worker.compute(block).await?;
        Ok(serde_json::to_value(reply)?)
    }

    fn health_check(&self, params: Value) -> Result<Value, MandelError> {
        // a bare probe without params asks about the whole server
        let probe: HealthCheckRequest = if params.is_null() {
            HealthCheckRequest::new("")
        } else {
            serde_json::from_value(params)
                .map_err(|e| MandelError::InvalidRequest(format!("bad health_check params: {}", e)))?
        };
        let status = self.worker.health(&probe.service);
        Ok(serde_json::to_value(HealthCheckResponse { status })?)
    }
}
