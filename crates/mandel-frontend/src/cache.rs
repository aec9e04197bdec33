//! Cache-aside access to computed blocks
//!
//! Every failure here is soft. Reads that fail are misses, writes that fail
//! are dropped, and an I/O error takes the cache link offline so later calls
//! skip the store until the probe loop brings it back.

use std::sync::Arc;
use std::time::Duration;

use mandel_common::protocol::error::{MandelError, Result};
use mandel_common::{BlockCoord, BlockMatrix, BLOCK_SIZE};
use tracing::{debug, warn};

use crate::connectivity::ConnectivityManager;

pub struct CacheAdapter {
    connectivity: Arc<ConnectivityManager>,
    timeout: Duration,
}

impl CacheAdapter {
    pub fn new(connectivity: Arc<ConnectivityManager>, timeout: Duration) -> Self {
        Self {
            connectivity,
            timeout,
        }
    }

    /// Cached matrix of the block at `coord`, or `None` on a miss, a corrupt
    /// entry, an unreachable cache or a timeout.
    pub async fn get(&self, coord: BlockCoord) -> Option<BlockMatrix> {
        let store = self.connectivity.cache().handle().await?;
        let key = coord.key();

        let raw = match self.bounded(store.get(&key)).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                warn!("Cache read of block {} failed: {}", coord, e);
                self.connectivity.cache().mark_offline(&e.to_string()).await;
                return None;
            }
        };

        match BlockMatrix::from_json(&raw, BLOCK_SIZE) {
            Ok(matrix) => {
                debug!("Cache hit for block {}", coord);
                Some(matrix)
            }
            Err(e) => {
                warn!("Ignoring corrupt cache entry {}: {}", key, e);
                None
            }
        }
    }

    /// Writes the matrix of the block at `coord`. Failures are logged only.
    pub async fn set(&self, coord: BlockCoord, matrix: &BlockMatrix) {
        let Some(store) = self.connectivity.cache().handle().await else {
            return;
        };

        let value = match matrix.to_json() {
            Ok(value) => value,
            Err(e) => {
                warn!("Failed to serialize block {}: {}", coord, e);
                return;
            }
        };

        let key = coord.key();
        if let Err(e) = self.bounded(store.set(&key, value)).await {
            warn!("Cache write of block {} failed: {}", coord, e);
            self.connectivity.cache().mark_offline(&e.to_string()).await;
        }
    }

    async fn bounded<T>(&self, fut: impl std::future::Future<Output = Result<T>>) -> Result<T> {
        tokio::time::timeout(self.timeout, fut)
            .await
            .map_err(|_| MandelError::Timeout(self.timeout.as_millis() as u64))?
    }
}
