use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use mandel_common::protocol::error::{MandelError, Result};
use mandel_common::{BlockReply, BlockRequest, ServingStatus, WORKER_SERVICE};

use crate::compute::compute_block;

/// Block compute worker.
///
/// Computation is CPU-bound, so each block runs on tokio's blocking pool and
/// the async threads stay free to answer health probes.
pub struct Worker {
    /// Whether the worker advertises itself as serving
    serving: AtomicBool,
    /// Blocks computed since startup
    blocks_computed: AtomicU64,
}

impl Default for Worker {
    fn default() -> Self {
        Self::new()
    }
}

impl Worker {
    pub fn new() -> Self {
        Self {
            serving: AtomicBool::new(true),
            blocks_computed: AtomicU64::new(0),
        }
    }

    /// Computes one block off the async runtime.
    pub async fn compute(&self, req: BlockRequest) -> Result<BlockReply> {
        let coord = (req.block_x, req.block_y);
        let reply = tokio::task::spawn_blocking(move || compute_block(&req))
            .await
            .map_err(|e| MandelError::Remote(format!("compute task failed: {}", e)))??;

        self.blocks_computed.fetch_add(1, Ordering::Relaxed);
        tracing::debug!("Computed block ({}, {})", coord.0, coord.1);
        Ok(reply)
    }

    /// Liveness of `service`. The empty name stands for the whole server.
    pub fn health(&self, service: &str) -> ServingStatus {
        if !service.is_empty() && service != WORKER_SERVICE {
            return ServingStatus::Unknown;
        }
        if self.serving.load(Ordering::Relaxed) {
            ServingStatus::Serving
        } else {
            ServingStatus::NotServing
        }
    }

    /// Flips the advertised serving state. The `mandel worker` binary never
    /// calls this; it is a hook for embedders and tests.
    pub fn set_serving(&self, serving: bool) {
        self.serving.store(serving, Ordering::Relaxed);
        tracing::info!("Worker serving state set to {}", serving);
    }

    pub fn blocks_computed(&self) -> u64 {
        self.blocks_computed.load(Ordering::Relaxed)
    }
}
