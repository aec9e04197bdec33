//! Mandel Frontend
//!
//! Renders Mandelbrot images by fanning blocks out to a compute worker,
//! reading and writing them through a Redis cache on the way. Both
//! dependencies are optional at any moment: the [`ConnectivityManager`]
//! tracks which ones are reachable and the [`Coordinator`] uses whatever is
//! available.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use mandel_client::{HttpBackendConnector, RedisConnector};
//! use mandel_common::Config;
//! use mandel_frontend::{ConnectivityManager, Coordinator, CoordinatorConfig, HealthCheckConfig};
//!
//! # async fn render() -> mandel_common::Result<()> {
//! let config = Config::default();
//! let connectivity = Arc::new(ConnectivityManager::new(
//!     &config,
//!     Arc::new(RedisConnector::default()),
//!     Arc::new(HttpBackendConnector::new(Duration::from_secs(30))),
//!     HealthCheckConfig::default(),
//! ));
//! let coordinator = Coordinator::new(connectivity, CoordinatorConfig::default());
//! let png = coordinator.render(&config).await?.canvas.to_png()?;
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod canvas;
pub mod connectivity;
pub mod coordinator;
pub mod frontend;
pub mod http_server;
pub mod link;
pub mod reload;

#[cfg(test)]
mod testing;

pub use cache::CacheAdapter;
pub use canvas::Canvas;
pub use connectivity::{ConnectivityManager, ConnectivityStatus, HealthCheckConfig};
pub use coordinator::{BlockSource, Coordinator, CoordinatorConfig, Render, RenderStats};
pub use frontend::{Frontend, VersionInfo};
pub use http_server::HttpServer;
pub use link::{Dependency, Link, LinkStatus};
pub use reload::ConfigWatcher;
