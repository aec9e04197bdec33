use std::sync::Arc;
use std::time::Duration;

use mandel_client::{BlockStore, ComputeBackend, Connector};
use mandel_common::Config;
use serde::Serialize;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

use crate::link::{Dependency, Link};

pub type CacheConnector = Arc<dyn Connector<Handle = Arc<dyn BlockStore>>>;
pub type BackendConnector = Arc<dyn Connector<Handle = Arc<dyn ComputeBackend>>>;

/// Health check configuration.
#[derive(Debug, Clone)]
pub struct HealthCheckConfig {
    /// Time between two probe rounds
    pub interval: Duration,
    /// Bound on every connect and probe
    pub timeout: Duration,
}

impl Default for HealthCheckConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(10),
            timeout: Duration::from_millis(2000),
        }
    }
}

/// Body of `GET /status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectivityStatus {
    pub cache_connection: bool,
    pub backend_connection: bool,
}

/// Owns the cache and backend links and keeps them current.
///
/// Nothing here is fatal: a dependency that cannot be reached is simply
/// offline until a later probe or reconnect succeeds.
pub struct ConnectivityManager {
    cache: Link<Arc<dyn BlockStore>>,
    backend: Link<Arc<dyn ComputeBackend>>,
    config: HealthCheckConfig,
}

impl ConnectivityManager {
    /// Both links start offline against the endpoints in `config`.
    pub fn new(
        config: &Config,
        cache_connector: CacheConnector,
        backend_connector: BackendConnector,
        health: HealthCheckConfig,
    ) -> Self {
        Self {
            cache: Link::new(Dependency::Cache, cache_connector, config.cache_server.clone(), health.timeout),
            backend: Link::new(
                Dependency::Backend,
                backend_connector,
                config.backend_server.clone(),
                health.timeout,
            ),
            config: health,
        }
    }

    pub fn cache(&self) -> &Link<Arc<dyn BlockStore>> {
        &self.cache
    }

    pub fn backend(&self) -> &Link<Arc<dyn ComputeBackend>> {
        &self.backend
    }

    pub fn health_config(&self) -> &HealthCheckConfig {
        &self.config
    }

    pub async fn status(&self) -> ConnectivityStatus {
        let (cache_connection, backend_connection) =
            tokio::join!(self.cache.is_online(), self.backend.is_online());
        ConnectivityStatus {
            cache_connection,
            backend_connection,
        }
    }

    /// One connect attempt for each offline link.
    pub async fn ensure_reachable(&self) -> ConnectivityStatus {
        let (cache_connection, backend_connection) =
            tokio::join!(self.cache.ensure_reachable(), self.backend.ensure_reachable());
        ConnectivityStatus {
            cache_connection,
            backend_connection,
        }
    }

    /// One probe round over both links.
    pub async fn probe_all(&self) -> ConnectivityStatus {
        let (cache_connection, backend_connection) =
            tokio::join!(self.cache.probe(), self.backend.probe());
        debug!(
            "Probe round: cache {}, backend {}",
            online_word(cache_connection),
            online_word(backend_connection)
        );
        ConnectivityStatus {
            cache_connection,
            backend_connection,
        }
    }

    /// Reconnects both links to the endpoints of `config`, online or not.
    pub async fn reconnect_all(&self, config: &Config) -> ConnectivityStatus {
        let (cache_connection, backend_connection) = tokio::join!(
            self.cache.force_reconnect(&config.cache_server),
            self.backend.force_reconnect(&config.backend_server)
        );
        info!(
            "Reconnected after configuration change: cache {}, backend {}",
            online_word(cache_connection),
            online_word(backend_connection)
        );
        ConnectivityStatus {
            cache_connection,
            backend_connection,
        }
    }

    /// Starts the probe loop.
    ///
    /// Probes every `interval` (the first round runs immediately) and
    /// reconnects everything whenever `config_rx` publishes a new
    /// configuration.
    pub fn spawn(self: Arc<Self>, mut config_rx: watch::Receiver<Arc<Config>>) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(self.config.interval);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let mut watching = true;

            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        self.probe_all().await;
                    }
                    changed = config_rx.changed(), if watching => match changed {
                        Ok(()) => {
                            let config = config_rx.borrow_and_update().clone();
                            self.reconnect_all(&config).await;
                        }
                        Err(_) => {
                            debug!("Configuration channel closed, probing only");
                            watching = false;
                        }
                    },
                }
            }
        })
    }
}

fn online_word(online: bool) -> &'static str {
    if online {
        "online"
    } else {
        "offline"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{backend_connector, store_connector, CountingBackend};
    use mandel_client::MemoryStore;

    fn manager(cache_up: bool, backend_up: bool) -> ConnectivityManager {
        ConnectivityManager::new(
            &Config::default(),
            store_connector(cache_up, Arc::new(MemoryStore::new())),
            backend_connector(backend_up, Arc::new(CountingBackend::new())),
            HealthCheckConfig::default(),
        )
    }

    #[test]
    fn test_health_check_config_default() {
        let config = HealthCheckConfig::default();
        assert_eq!(config.interval, Duration::from_secs(10));
        assert_eq!(config.timeout, Duration::from_millis(2000));
    }

    #[tokio::test]
    async fn test_initial_state_offline() {
        let manager = manager(true, true);
        assert_eq!(
            manager.status().await,
            ConnectivityStatus {
                cache_connection: false,
                backend_connection: false
            }
        );
    }

    #[tokio::test]
    async fn test_probe_all_connects_offline_links() {
        let manager = manager(true, false);
        let status = manager.probe_all().await;
        assert!(status.cache_connection);
        assert!(!status.backend_connection);
        assert_eq!(manager.status().await, status);
    }

    #[test]
    fn test_status_json_shape() {
        let status = ConnectivityStatus {
            cache_connection: true,
            backend_connection: false,
        };
        assert_eq!(
            serde_json::to_value(status).unwrap(),
            serde_json::json!({"cacheConnection": true, "backendConnection": false})
        );
    }

    #[tokio::test]
    async fn test_reconnect_all_uses_new_endpoints() {
        let store = Arc::new(MemoryStore::new());
        let cache = store_connector(true, store);
        let manager = ConnectivityManager::new(
            &Config::default(),
            cache.clone(),
            backend_connector(true, Arc::new(CountingBackend::new())),
            HealthCheckConfig::default(),
        );
        manager.ensure_reachable().await;

        let config = Config {
            cache_server: "redis-2:6379".to_string(),
            backend_server: "worker-2:28000".to_string(),
            ..Default::default()
        };
        let status = manager.reconnect_all(&config).await;

        assert!(status.cache_connection && status.backend_connection);
        assert_eq!(cache.connects(), 2);
        assert_eq!(cache.last_addr().as_deref(), Some("redis-2:6379"));
        assert_eq!(manager.backend().addr().await, "worker-2:28000");
    }

    #[tokio::test]
    async fn test_spawned_loop_reacts_to_config_change() {
        let cache = store_connector(true, Arc::new(MemoryStore::new()));
        let manager = Arc::new(ConnectivityManager::new(
            &Config::default(),
            cache.clone(),
            backend_connector(true, Arc::new(CountingBackend::new())),
            HealthCheckConfig {
                interval: Duration::from_secs(3600),
                timeout: Duration::from_millis(100),
            },
        ));
        let (tx, rx) = watch::channel(Arc::new(Config::default()));
        let handle = manager.clone().spawn(rx);

        // first tick connects both links
        for _ in 0..50 {
            let status = manager.status().await;
            if status.cache_connection && status.backend_connection {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(manager.status().await.backend_connection);

        let new_config = Config {
            cache_server: "redis-2:6379".to_string(),
            ..Default::default()
        };
        tx.send(Arc::new(new_config)).unwrap();

        for _ in 0..50 {
            if cache.last_addr().as_deref() == Some("redis-2:6379") {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(cache.last_addr().as_deref(), Some("redis-2:6379"));
        handle.abort();
    }
}
