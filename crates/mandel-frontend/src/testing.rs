//! In-process stand-ins for the frontend's dependencies.

use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::future::BoxFuture;
use mandel_client::{BlockStore, ComputeBackend, Connector, MemoryStore};
use mandel_common::protocol::error::{MandelError, Result};
use mandel_common::{BlockKey, BlockReply, BlockRequest, ServingStatus};

/// Connector whose connects and probes succeed only while healthy.
pub struct FlakyConnector<H = u32> {
    healthy: AtomicBool,
    connects: AtomicU32,
    probes: AtomicU32,
    last_addr: Mutex<Option<String>>,
    make: Box<dyn Fn(u32) -> H + Send + Sync>,
}

impl FlakyConnector<u32> {
    /// Handles are the number of the connect that produced them.
    pub fn new(healthy: bool) -> Self {
        Self::build(healthy, Box::new(|n| n))
    }
}

impl<H: Clone + Send + Sync + 'static> FlakyConnector<H> {
    /// Every connect hands out a clone of `handle`.
    pub fn serving(healthy: bool, handle: H) -> Self {
        Self::build(healthy, Box::new(move |_| handle.clone()))
    }

    fn build(healthy: bool, make: Box<dyn Fn(u32) -> H + Send + Sync>) -> Self {
        Self {
            healthy: AtomicBool::new(healthy),
            connects: AtomicU32::new(0),
            probes: AtomicU32::new(0),
            last_addr: Mutex::new(None),
            make,
        }
    }

    pub fn set_healthy(&self, healthy: bool) {
        self.healthy.store(healthy, Ordering::SeqCst);
    }

    pub fn connects(&self) -> u32 {
        self.connects.load(Ordering::SeqCst)
    }

    pub fn probes(&self) -> u32 {
        self.probes.load(Ordering::SeqCst)
    }

    pub fn last_addr(&self) -> Option<String> {
        self.last_addr.lock().unwrap().clone()
    }
}

impl<H: Clone + Send + Sync + 'static> Connector for FlakyConnector<H> {
    type Handle = H;

    fn connect<'a>(&'a self, addr: &'a str, _timeout: Duration) -> BoxFuture<'a, Result<H>> {
        Box::pin(async move {
            let n = self.connects.fetch_add(1, Ordering::SeqCst) + 1;
            *self.last_addr.lock().unwrap() = Some(addr.to_string());
            if self.healthy.load(Ordering::SeqCst) {
                Ok((self.make)(n))
            } else {
                Err(MandelError::Transport(format!("connection to {} refused", addr)))
            }
        })
    }

    fn probe<'a>(&'a self, _handle: &'a H, _timeout: Duration) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            self.probes.fetch_add(1, Ordering::SeqCst);
            if self.healthy.load(Ordering::SeqCst) {
                Ok(())
            } else {
                Err(MandelError::BackendUnavailable("probe refused".to_string()))
            }
        })
    }
}

/// Computes blocks in-process and counts the calls.
#[derive(Default)]
pub struct CountingBackend {
    calls: AtomicUsize,
    failing: AtomicBool,
    delay: Duration,
}

impl CountingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every call sleeps for `delay` before answering.
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Makes every following compute call fail.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

impl ComputeBackend for CountingBackend {
    fn compute_block(&self, req: BlockRequest) -> BoxFuture<'_, Result<BlockReply>> {
        Box::pin(async move {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            if self.failing.load(Ordering::SeqCst) {
                return Err(MandelError::Transport("worker went away".to_string()));
            }
            mandel_worker::compute_block(&req)
        })
    }

    fn check_health(&self) -> BoxFuture<'_, Result<ServingStatus>> {
        Box::pin(async { Ok(ServingStatus::Serving) })
    }
}

/// Store whose every operation fails with an I/O error.
pub struct BrokenStore;

impl BlockStore for BrokenStore {
    fn get<'a>(&'a self, _key: &'a BlockKey) -> BoxFuture<'a, Result<Option<Vec<u8>>>> {
        Box::pin(async { Err(MandelError::CacheUnavailable("connection reset".to_string())) })
    }

    fn set<'a>(&'a self, _key: &'a BlockKey, _value: Vec<u8>) -> BoxFuture<'a, Result<()>> {
        Box::pin(async { Err(MandelError::CacheUnavailable("connection reset".to_string())) })
    }

    fn ping(&self) -> BoxFuture<'_, Result<()>> {
        Box::pin(async { Ok(()) })
    }
}

/// Store that answers every read and write only after `delay`.
pub struct SlowStore {
    pub delay: Duration,
}

impl BlockStore for SlowStore {
    fn get<'a>(&'a self, _key: &'a BlockKey) -> BoxFuture<'a, Result<Option<Vec<u8>>>> {
        Box::pin(async move {
            tokio::time::sleep(self.delay).await;
            Ok(None)
        })
    }

    fn set<'a>(&'a self, _key: &'a BlockKey, _value: Vec<u8>) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            tokio::time::sleep(self.delay).await;
            Ok(())
        })
    }

    fn ping(&self) -> BoxFuture<'_, Result<()>> {
        Box::pin(async { Ok(()) })
    }
}

pub fn store_connector(healthy: bool, store: Arc<MemoryStore>) -> Arc<FlakyConnector<Arc<dyn BlockStore>>> {
    Arc::new(FlakyConnector::serving(healthy, store as Arc<dyn BlockStore>))
}

pub fn backend_connector(
    healthy: bool,
    backend: Arc<CountingBackend>,
) -> Arc<FlakyConnector<Arc<dyn ComputeBackend>>> {
    Arc::new(FlakyConnector::serving(healthy, backend as Arc<dyn ComputeBackend>))
}
