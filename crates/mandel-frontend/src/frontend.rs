use std::sync::Arc;

use mandel_common::protocol::error::Result;
use mandel_common::Config;
use serde::Serialize;
use tokio::sync::watch;

use crate::connectivity::ConnectivityStatus;
use crate::coordinator::{Coordinator, Render};

/// Body of `GET /version`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VersionInfo {
    pub version: String,
    pub build: String,
}

impl VersionInfo {
    /// Crate version plus the `MANDEL_BUILD` value baked in at compile time.
    pub fn current() -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            build: option_env!("MANDEL_BUILD").unwrap_or("dev").to_string(),
        }
    }
}

/// State shared by the HTTP handlers.
#[derive(Clone)]
pub struct Frontend {
    coordinator: Arc<Coordinator>,
    config_rx: watch::Receiver<Arc<Config>>,
}

impl Frontend {
    pub fn new(coordinator: Arc<Coordinator>, config_rx: watch::Receiver<Arc<Config>>) -> Self {
        Self {
            coordinator,
            config_rx,
        }
    }

    /// The configuration in force right now.
    pub fn config(&self) -> Arc<Config> {
        self.config_rx.borrow().clone()
    }

    pub async fn status(&self) -> ConnectivityStatus {
        self.coordinator.connectivity().status().await
    }

    /// Renders with the current configuration.
    pub async fn render(&self) -> Result<Render> {
        let config = self.config();
        self.coordinator.render(&config).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_info() {
        let info = VersionInfo::current();
        assert_eq!(info.version, env!("CARGO_PKG_VERSION"));
        assert!(!info.build.is_empty());
        let value = serde_json::to_value(&info).unwrap();
        assert!(value["version"].is_string());
        assert!(value["build"].is_string());
    }
}
