//! Dependency connectors
//!
//! A [`Connector`] knows how to open a client handle for one kind of
//! dependency and how to check that an open handle still works. The
//! frontend's connectivity manager drives them; it never talks to Redis or a
//! worker directly.

use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use mandel_common::protocol::error::{MandelError, Result};
use mandel_common::ServingStatus;

use crate::backend::{ComputeBackend, HttpBackend};
use crate::store::{BlockStore, RedisStore, CACHE_NAMESPACE};

/// Opens and probes client handles of one dependency kind.
pub trait Connector: Send + Sync + 'static {
    type Handle: Clone + Send + Sync + 'static;

    /// Opens a handle to `addr` and proves it usable. Bounded by `timeout`.
    fn connect<'a>(&'a self, addr: &'a str, timeout: Duration) -> BoxFuture<'a, Result<Self::Handle>>;

    /// Liveness check of an open handle. Bounded by `timeout`.
    fn probe<'a>(&'a self, handle: &'a Self::Handle, timeout: Duration) -> BoxFuture<'a, Result<()>>;
}

async fn bounded<T>(timeout: Duration, fut: impl std::future::Future<Output = Result<T>>) -> Result<T> {
    tokio::time::timeout(timeout, fut)
        .await
        .map_err(|_| MandelError::Timeout(timeout.as_millis() as u64))?
}

/// Connects to compute workers over HTTP.
#[derive(Debug, Clone)]
pub struct HttpBackendConnector {
    /// Bound on each compute call made through the opened handle
    rpc_timeout: Duration,
}

impl HttpBackendConnector {
    pub fn new(rpc_timeout: Duration) -> Self {
        Self { rpc_timeout }
    }

    async fn require_serving(backend: &dyn ComputeBackend) -> Result<()> {
        match backend.check_health().await? {
            ServingStatus::Serving => Ok(()),
            status => Err(MandelError::BackendUnavailable(format!(
                "worker reports {:?}",
                status
            ))),
        }
    }
}

impl Connector for HttpBackendConnector {
    type Handle = Arc<dyn ComputeBackend>;

    fn connect<'a>(&'a self, addr: &'a str, timeout: Duration) -> BoxFuture<'a, Result<Self::Handle>> {
        Box::pin(async move {
            let backend: Arc<dyn ComputeBackend> = Arc::new(HttpBackend::new(addr, self.rpc_timeout));
            bounded(timeout, Self::require_serving(backend.as_ref())).await?;
            Ok(backend)
        })
    }

    fn probe<'a>(&'a self, handle: &'a Self::Handle, timeout: Duration) -> BoxFuture<'a, Result<()>> {
        Box::pin(bounded(timeout, Self::require_serving(handle.as_ref())))
    }
}

/// Connects to the Redis block cache.
#[derive(Debug, Clone)]
pub struct RedisConnector {
    namespace: String,
}

impl Default for RedisConnector {
    fn default() -> Self {
        Self::new(CACHE_NAMESPACE)
    }
}

impl RedisConnector {
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
        }
    }
}

impl Connector for RedisConnector {
    type Handle = Arc<dyn BlockStore>;

    fn connect<'a>(&'a self, addr: &'a str, timeout: Duration) -> BoxFuture<'a, Result<Self::Handle>> {
        Box::pin(async move {
            let store = RedisStore::connect(addr, self.namespace.clone(), timeout).await?;
            bounded(timeout, store.ping()).await?;
            Ok(Arc::new(store) as Arc<dyn BlockStore>)
        })
    }

    fn probe<'a>(&'a self, handle: &'a Self::Handle, timeout: Duration) -> BoxFuture<'a, Result<()>> {
        Box::pin(bounded(timeout, handle.ping()))
    }
}
