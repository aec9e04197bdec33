//! Configuration hot reload
//!
//! [`ConfigWatcher`] polls the config file and publishes the configuration
//! on a `watch` channel after every valid write, even one that leaves the
//! values unchanged. Subscribers see the latest value with
//! `borrow()` and are woken by `changed()`. An invalid file is logged and
//! the previous configuration stays in force.

use std::sync::Arc;
use std::time::{Duration, SystemTime};

use mandel_common::{Config, ConfigSource};
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Default time between two looks at the config file.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

pub struct ConfigWatcher {
    source: ConfigSource,
    interval: Duration,
    tx: watch::Sender<Arc<Config>>,
    /// Modification time and length of the file at the last look
    last_seen: Option<(SystemTime, u64)>,
}

impl ConfigWatcher {
    /// `initial` must be the configuration `source` currently yields.
    pub fn new(source: ConfigSource, initial: Config, interval: Duration) -> Self {
        let (tx, _rx) = watch::channel(Arc::new(initial));
        let last_seen = file_stamp(&source);
        Self {
            source,
            interval,
            tx,
            last_seen,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<Config>> {
        self.tx.subscribe()
    }

    pub fn current(&self) -> Arc<Config> {
        self.tx.borrow().clone()
    }

    /// Looks at the file once. Returns the configuration if the file was
    /// rewritten with valid content and an event was published.
    pub fn check(&mut self) -> Option<Arc<Config>> {
        let stamp = file_stamp(&self.source);
        if stamp == self.last_seen {
            return None;
        }
        self.last_seen = stamp;

        let path = self.source.path()?.display().to_string();
        let config = match self.source.load() {
            Ok(config) => config,
            Err(e) => {
                warn!("Ignoring configuration change in {}: {}", path, e);
                return None;
            }
        };

        // every valid rewrite is an event, identical content included
        let previous = self.tx.send_replace(Arc::new(config));
        let config = self.current();
        if *previous == *config {
            info!("{} rewritten without changes, reconnecting dependencies", path);
        } else {
            info!(
                "Configuration reloaded from {}: points={}, maxIterations={}, cache={}, backend={}",
                path, config.points, config.max_iterations, config.cache_server, config.backend_server
            );
        }
        Some(config)
    }

    /// Polls until every subscriber is gone. Without a config file there is
    /// nothing to watch and the task ends at once.
    pub fn spawn(mut self) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let Some(path) = self.source.path().map(|p| p.display().to_string()) else {
                info!("No configuration file, hot reload disabled");
                return;
            };
            info!("Watching {} for configuration changes", path);

            let mut interval = tokio::time::interval(self.interval);
            loop {
                interval.tick().await;
                if self.tx.is_closed() {
                    debug!("No configuration subscribers left, stopping watcher");
                    break;
                }
                self.check();
            }
        })
    }
}

fn file_stamp(source: &ConfigSource) -> Option<(SystemTime, u64)> {
    let metadata = std::fs::metadata(source.path()?).ok()?;
    Some((metadata.modified().ok()?, metadata.len()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connectivity::{ConnectivityManager, HealthCheckConfig};
    use crate::testing::{backend_connector, store_connector, CountingBackend};
    use mandel_client::MemoryStore;
    use std::path::Path;

    fn write(path: &Path, contents: &str) {
        std::fs::write(path, contents).unwrap();
    }

    fn watcher(path: &Path) -> ConfigWatcher {
        let source = ConfigSource::new(Some(path.to_path_buf()));
        let initial = source.load().unwrap();
        ConfigWatcher::new(source, initial, Duration::from_millis(10))
    }

    #[test]
    fn test_unchanged_file_publishes_nothing() {
        let file = tempfile::NamedTempFile::new().unwrap();
        write(file.path(), r#"{"points": 64}"#);

        let mut watcher = watcher(file.path());
        assert!(watcher.check().is_none());
        assert_eq!(watcher.current().points, 64);
    }

    #[test]
    fn test_change_is_published() {
        let file = tempfile::NamedTempFile::new().unwrap();
        write(file.path(), r#"{"points": 64}"#);
        let mut watcher = watcher(file.path());
        let mut rx = watcher.subscribe();

        write(file.path(), r#"{"points": 128, "backendServer": "worker-2:28000"}"#);
        let config = watcher.check().unwrap();

        assert_eq!(config.points, 128);
        assert_eq!(config.backend_server, "worker-2:28000");
        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow_and_update().points, 128);
    }

    #[test]
    fn test_invalid_change_keeps_old_config() {
        let file = tempfile::NamedTempFile::new().unwrap();
        write(file.path(), r#"{"points": 64}"#);
        let mut watcher = watcher(file.path());
        let rx = watcher.subscribe();

        write(file.path(), r#"{"points": 100, "maxIterations": 8}"#);
        assert!(watcher.check().is_none());
        assert_eq!(watcher.current().points, 64);
        assert!(!rx.has_changed().unwrap());

        write(file.path(), "{ not json at all");
        assert!(watcher.check().is_none());
        assert_eq!(watcher.current().points, 64);
    }

    #[test]
    fn test_identical_rewrite_is_published() {
        let file = tempfile::NamedTempFile::new().unwrap();
        write(file.path(), r#"{"points": 64}"#);
        let mut watcher = watcher(file.path());
        let mut rx = watcher.subscribe();

        write(file.path(), r#"{"points":  64}"#);
        let config = watcher.check().unwrap();

        assert_eq!(config.points, 64);
        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow_and_update().points, 64);
        assert!(watcher.check().is_none());
    }

    #[tokio::test]
    async fn test_identical_rewrite_reconnects_dependencies() {
        let file = tempfile::NamedTempFile::new().unwrap();
        write(file.path(), r#"{"points": 64}"#);
        let mut watcher = watcher(file.path());

        let cache = store_connector(true, Arc::new(MemoryStore::new()));
        let backend = backend_connector(true, Arc::new(CountingBackend::new()));
        let manager = Arc::new(ConnectivityManager::new(
            &watcher.current(),
            cache.clone(),
            backend.clone(),
            HealthCheckConfig {
                interval: Duration::from_secs(3600),
                timeout: Duration::from_millis(100),
            },
        ));
        let handle = manager.clone().spawn(watcher.subscribe());

        // the first tick connects both links
        for _ in 0..50 {
            if cache.connects() == 1 && backend.connects() == 1 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(cache.connects(), 1);
        assert_eq!(backend.connects(), 1);

        write(file.path(), r#"{"points":  64}"#);
        assert!(watcher.check().is_some());

        for _ in 0..50 {
            if cache.connects() == 2 && backend.connects() == 2 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(cache.connects(), 2);
        assert_eq!(backend.connects(), 2);
        handle.abort();
    }

    #[tokio::test]
    async fn test_spawned_watcher_publishes() {
        let file = tempfile::NamedTempFile::new().unwrap();
        write(file.path(), r#"{"points": 64}"#);
        let watcher = watcher(file.path());
        let mut rx = watcher.subscribe();
        let handle = watcher.spawn();

        write(file.path(), r#"{"points": 256, "maxIterations": 128}"#);
        tokio::time::timeout(Duration::from_secs(5), rx.changed())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(rx.borrow().points, 256);
        handle.abort();
    }
}
