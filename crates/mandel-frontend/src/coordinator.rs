use std::sync::Arc;
use std::time::{Duration, Instant};

use mandel_common::protocol::error::{MandelError, Result};
use mandel_common::{BlockCoord, BlockMatrix, BlockRequest, Config, PlaneWindow, BLOCK_SIZE};
use tokio::sync::{mpsc, Semaphore};
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, info, warn};

use crate::cache::CacheAdapter;
use crate::canvas::Canvas;
use crate::connectivity::ConnectivityManager;

/// Tuning of block dispatch.
#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    /// Bound on one compute call
    ///
    /// Default: 30s
    pub rpc_timeout: Duration,
    /// Bound on one cache read or write
    ///
    /// Default: 1s
    pub cache_timeout: Duration,
    /// Blocks being fetched or computed at the same time
    ///
    /// Default: 64
    pub max_in_flight: usize,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            rpc_timeout: Duration::from_secs(30),
            cache_timeout: Duration::from_secs(1),
            max_in_flight: 64,
        }
    }
}

/// Where the matrix of a block came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockSource {
    Cache,
    Backend,
    /// Neither dependency could provide it; every pixel is in-set.
    Fallback,
}

/// Report of one finished block unit.
#[derive(Debug)]
struct BlockResult {
    coord: BlockCoord,
    matrix: BlockMatrix,
    source: BlockSource,
}

/// How the blocks of one render were obtained.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderStats {
    pub cached: usize,
    pub computed: usize,
    pub fallback: usize,
}

impl RenderStats {
    fn record(&mut self, source: BlockSource) {
        match source {
            BlockSource::Cache => self.cached += 1,
            BlockSource::Backend => self.computed += 1,
            BlockSource::Fallback => self.fallback += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.cached + self.computed + self.fallback
    }
}

/// A finished render.
#[derive(Debug, Clone)]
pub struct Render {
    pub canvas: Canvas,
    pub stats: RenderStats,
}

/// Everything a block unit needs, shared by all units of one render.
struct BlockJob {
    connectivity: Arc<ConnectivityManager>,
    cache: Arc<CacheAdapter>,
    plane: PlaneWindow,
    points: u32,
    max_iterations: u32,
    rpc_timeout: Duration,
}

impl BlockJob {
    /// Cache first, then the backend, then the in-set fallback.
    async fn run(&self, coord: BlockCoord) -> BlockResult {
        if let Some(matrix) = self.cache.get(coord).await {
            return BlockResult {
                coord,
                matrix,
                source: BlockSource::Cache,
            };
        }

        if let Some(matrix) = self.compute(coord).await {
            self.cache.set(coord, &matrix).await;
            return BlockResult {
                coord,
                matrix,
                source: BlockSource::Backend,
            };
        }

        BlockResult {
            coord,
            matrix: BlockMatrix::in_set(BLOCK_SIZE),
            source: BlockSource::Fallback,
        }
    }

    async fn compute(&self, coord: BlockCoord) -> Option<BlockMatrix> {
        let backend = self.connectivity.backend().handle().await?;
        let req = BlockRequest::new(&self.plane, self.points, self.max_iterations, coord);

        let outcome = tokio::time::timeout(self.rpc_timeout, backend.compute_block(req))
            .await
            .map_err(|_| MandelError::Timeout(self.rpc_timeout.as_millis() as u64))
            .and_then(|reply| reply)
            .and_then(|reply| BlockMatrix::from_results(&reply.results, BLOCK_SIZE));

        match outcome {
            Ok(matrix) => Some(matrix),
            Err(e) => {
                warn!("Compute of block {} failed: {}", coord, e);
                self.connectivity
                    .backend()
                    .mark_offline(&format!("compute_block failed: {}", e))
                    .await;
                None
            }
        }
    }
}

/// Aborts the dispatch task of a render when the render is dropped.
struct Dispatcher(JoinHandle<()>);

impl Drop for Dispatcher {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// Splits a render into blocks, fans them out and assembles the canvas.
///
/// Units run concurrently up to `max_in_flight`. Each sends its result to a
/// single collector, which alone writes the canvas, so the outcome does not
/// depend on completion order.
pub struct Coordinator {
    connectivity: Arc<ConnectivityManager>,
    cache: Arc<CacheAdapter>,
    plane: PlaneWindow,
    config: CoordinatorConfig,
}

impl Coordinator {
    pub fn new(connectivity: Arc<ConnectivityManager>, config: CoordinatorConfig) -> Self {
        let cache = Arc::new(CacheAdapter::new(connectivity.clone(), config.cache_timeout));
        Self {
            connectivity,
            cache,
            plane: PlaneWindow::default(),
            config,
        }
    }

    /// Renders a different window of the plane.
    pub fn with_plane(mut self, plane: PlaneWindow) -> Self {
        self.plane = plane;
        self
    }

    pub fn connectivity(&self) -> &Arc<ConnectivityManager> {
        &self.connectivity
    }

    pub fn cache(&self) -> &Arc<CacheAdapter> {
        &self.cache
    }

    /// Renders the grid described by `config`.
    ///
    /// Fails with [`MandelError::AllDependenciesOffline`] when neither the
    /// cache nor the backend can be reached at the start of the render. Once
    /// started, a render always completes; blocks that can be neither read
    /// nor computed are filled with the in-set value.
    pub async fn render(&self, config: &Config) -> Result<Render> {
        let grid = config.validate()?;
        let started = Instant::now();

        let status = self.connectivity.ensure_reachable().await;
        if !status.cache_connection && !status.backend_connection {
            return Err(MandelError::AllDependenciesOffline);
        }

        let expected = grid.block_count();
        let max_in_flight = self.config.max_in_flight.max(1);
        let (tx, mut rx) = mpsc::channel::<BlockResult>(max_in_flight);
        let job = Arc::new(BlockJob {
            connectivity: self.connectivity.clone(),
            cache: self.cache.clone(),
            plane: self.plane,
            points: grid.points(),
            max_iterations: config.max_iterations,
            rpc_timeout: self.config.rpc_timeout,
        });

        debug!(
            "Dispatching {} blocks, at most {} in flight",
            expected, max_in_flight
        );

        // the dispatcher owns the only original sender, so the channel closes
        // once it and every unit are done. Dropping the guard aborts it, and
        // with it every unit it spawned.
        let mut dispatcher = Dispatcher(tokio::spawn(async move {
            let permits = Arc::new(Semaphore::new(max_in_flight));
            let mut units = JoinSet::new();
            for coord in grid.blocks() {
                let Ok(permit) = permits.clone().acquire_owned().await else {
                    break;
                };
                if tx.is_closed() {
                    debug!("Render abandoned, stopping dispatch");
                    break;
                }
                let tx = tx.clone();
                let job = job.clone();
                units.spawn(async move {
                    let result = job.run(coord).await;
                    if tx.send(result).await.is_err() {
                        debug!("Render abandoned, dropping block {}", coord);
                    }
                    drop(permit);
                });
            }
            while units.join_next().await.is_some() {}
        }));

        let mut canvas = Canvas::new(grid);
        let mut stats = RenderStats::default();
        while stats.total() < expected {
            let Some(result) = rx.recv().await else {
                break;
            };
            canvas.write_block(result.coord, &result.matrix);
            stats.record(result.source);
        }

        if (&mut dispatcher.0).await.is_err() {
            warn!("Block dispatcher terminated abnormally");
        }

        if stats.total() < expected {
            return Err(MandelError::IncompleteRender {
                received: stats.total(),
                expected,
            });
        }

        info!(
            "Rendered {}x{} in {:?}: {} cached, {} computed, {} fallback",
            grid.points(),
            grid.points(),
            started.elapsed(),
            stats.cached,
            stats.computed,
            stats.fallback
        );
        Ok(Render { canvas, stats })
    }
}
