use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use mandel_client::Connector;
use serde::Serialize;
use tokio::sync::{Mutex, RwLock};
use tracing::{info, warn};

/// The two dependencies a frontend talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dependency {
    Cache,
    Backend,
}

impl fmt::Display for Dependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dependency::Cache => f.write_str("cache"),
            Dependency::Backend => f.write_str("backend"),
        }
    }
}

/// Connectivity state of one dependency.
///
/// The dependency is online exactly when a handle is present.
#[derive(Debug, Clone)]
struct LinkState<H> {
    addr: String,
    handle: Option<H>,
    consecutive_failures: u32,
    last_error: Option<String>,
    last_change: Option<Instant>,
}

/// Point-in-time view of a [`Link`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkStatus {
    pub addr: String,
    pub online: bool,
    pub consecutive_failures: u32,
    pub last_error: Option<String>,
}

/// Connection to one dependency, starting Offline.
///
/// State sits behind an async `RwLock` so render tasks can read the handle
/// concurrently. Connect attempts are serialized by a separate mutex so a
/// burst of callers finding the link offline produces one attempt, not many.
pub struct Link<H> {
    dependency: Dependency,
    connector: Arc<dyn Connector<Handle = H>>,
    timeout: Duration,
    state: RwLock<LinkState<H>>,
    connect_gate: Mutex<()>,
}

impl<H: Clone + Send + Sync + 'static> Link<H> {
    pub fn new(
        dependency: Dependency,
        connector: Arc<dyn Connector<Handle = H>>,
        addr: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            dependency,
            connector,
            timeout,
            state: RwLock::new(LinkState {
                addr: addr.into(),
                handle: None,
                consecutive_failures: 0,
                last_error: None,
                last_change: None,
            }),
            connect_gate: Mutex::new(()),
        }
    }

    pub fn dependency(&self) -> Dependency {
        self.dependency
    }

    pub async fn is_online(&self) -> bool {
        self.state.read().await.handle.is_some()
    }

    /// The live client handle, if the dependency is online.
    pub async fn handle(&self) -> Option<H> {
        self.state.read().await.handle.clone()
    }

    pub async fn addr(&self) -> String {
        self.state.read().await.addr.clone()
    }

    /// How long ago the link last went online or offline.
    pub async fn since_last_change(&self) -> Option<Duration> {
        self.state.read().await.last_change.map(|t| t.elapsed())
    }

    pub async fn status(&self) -> LinkStatus {
        let state = self.state.read().await;
        LinkStatus {
            addr: state.addr.clone(),
            online: state.handle.is_some(),
            consecutive_failures: state.consecutive_failures,
            last_error: state.last_error.clone(),
        }
    }

    /// Makes one connect attempt if the link is offline. Returns whether the
    /// link is online afterwards.
    pub async fn ensure_reachable(&self) -> bool {
        if self.is_online().await {
            return true;
        }

        let _gate = self.connect_gate.lock().await;
        // someone else may have connected while we waited
        if self.is_online().await {
            return true;
        }
        let addr = self.addr().await;
        self.connect(&addr).await
    }

    /// Liveness check: probes an online link, reconnects an offline one.
    pub async fn probe(&self) -> bool {
        let Some(handle) = self.handle().await else {
            return self.ensure_reachable().await;
        };

        match self.connector.probe(&handle, self.timeout).await {
            Ok(()) => {
                let mut state = self.state.write().await;
                state.consecutive_failures = 0;
                true
            }
            Err(e) => {
                self.mark_offline(&format!("probe failed: {}", e)).await;
                false
            }
        }
    }

    /// Drops the current handle and connects to `addr`, whatever the state.
    pub async fn force_reconnect(&self, addr: &str) -> bool {
        let _gate = self.connect_gate.lock().await;
        {
            let mut state = self.state.write().await;
            if state.addr != addr {
                info!("{} endpoint changed from {} to {}", self.dependency, state.addr, addr);
                state.addr = addr.to_string();
            }
            if state.handle.take().is_some() {
                state.last_change = Some(Instant::now());
            }
        }
        self.connect(addr).await
    }

    /// Records an observed failure and takes the link offline.
    pub async fn mark_offline(&self, reason: &str) {
        let mut state = self.state.write().await;
        state.consecutive_failures = state.consecutive_failures.saturating_add(1);
        state.last_error = Some(reason.to_string());
        if state.handle.take().is_some() {
            state.last_change = Some(Instant::now());
            warn!("{} at {} is offline: {}", self.dependency, state.addr, reason);
        }
    }

    /// Must be called with the connect gate held.
    async fn connect(&self, addr: &str) -> bool {
        match self.connector.connect(addr, self.timeout).await {
            Ok(handle) => {
                let mut state = self.state.write().await;
                state.handle = Some(handle);
                state.consecutive_failures = 0;
                state.last_error = None;
                state.last_change = Some(Instant::now());
                info!("{} at {} is online", self.dependency, addr);
                true
            }
            Err(e) => {
                let mut state = self.state.write().await;
                state.consecutive_failures = state.consecutive_failures.saturating_add(1);
                state.last_error = Some(e.to_string());
                // a failed attempt is only worth a warning the first time
                if state.consecutive_failures == 1 {
                    warn!("Failed to connect to {} at {}: {}", self.dependency, addr, e);
                } else {
                    tracing::debug!("Failed to connect to {} at {}: {}", self.dependency, addr, e);
                }
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FlakyConnector;

    fn link(connector: Arc<FlakyConnector>) -> Link<u32> {
        Link::new(Dependency::Backend, connector, "worker:28000", Duration::from_millis(100))
    }

    #[tokio::test]
    async fn test_starts_offline() {
        let link = link(Arc::new(FlakyConnector::new(true)));
        assert!(!link.is_online().await);
        assert!(link.handle().await.is_none());
        assert!(link.since_last_change().await.is_none());
    }

    #[tokio::test]
    async fn test_ensure_reachable_connects_once() {
        let connector = Arc::new(FlakyConnector::new(true));
        let link = link(connector.clone());

        assert!(link.ensure_reachable().await);
        assert!(link.ensure_reachable().await);
        assert_eq!(connector.connects(), 1);
        assert_eq!(link.handle().await, Some(1));
    }

    #[tokio::test]
    async fn test_failed_connect_stays_offline() {
        let connector = Arc::new(FlakyConnector::new(false));
        let link = link(connector.clone());

        assert!(!link.ensure_reachable().await);
        assert!(!link.ensure_reachable().await);
        let status = link.status().await;
        assert!(!status.online);
        assert_eq!(status.consecutive_failures, 2);
        assert!(status.last_error.is_some());
    }

    #[tokio::test]
    async fn test_probe_failure_takes_link_offline() {
        let connector = Arc::new(FlakyConnector::new(true));
        let link = link(connector.clone());
        assert!(link.ensure_reachable().await);

        connector.set_healthy(false);
        assert!(!link.probe().await);
        assert!(!link.is_online().await);

        connector.set_healthy(true);
        assert!(link.probe().await);
        assert!(link.is_online().await);
        assert_eq!(connector.connects(), 2);
    }

    #[tokio::test]
    async fn test_force_reconnect_switches_endpoint() {
        let connector = Arc::new(FlakyConnector::new(true));
        let link = link(connector.clone());
        assert!(link.ensure_reachable().await);

        assert!(link.force_reconnect("other:28000").await);
        assert_eq!(link.addr().await, "other:28000");
        assert_eq!(connector.connects(), 2);
        assert_eq!(connector.last_addr().as_deref(), Some("other:28000"));
        assert_eq!(link.handle().await, Some(2));
    }

    #[tokio::test]
    async fn test_mark_offline() {
        let link = link(Arc::new(FlakyConnector::new(true)));
        assert!(link.ensure_reachable().await);

        link.mark_offline("rpc failed").await;
        let status = link.status().await;
        assert!(!status.online);
        assert_eq!(status.last_error.as_deref(), Some("rpc failed"));
    }
}
