// Copyright 2025 mandel Authors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! # mandel CLI
//!
//! Entry points behind the `mandel` binary:
//!
//! - **frontend**: HTTP server rendering PNGs through the worker and cache
//! - **worker**: JSON-RPC block compute server
//! - **render**: one-shot render written to a PNG file
//!
//! The binary only parses flags; everything else lives here so it can be
//! driven from tests.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use mandel_client::{HttpBackendConnector, RedisConnector};
use mandel_common::{Config, ConfigSource};
use mandel_frontend::{
    ConfigWatcher, ConnectivityManager, Coordinator, CoordinatorConfig, Frontend,
    HealthCheckConfig, HttpServer, RenderStats,
};
use mandel_worker::Worker;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Runtime tuning shared by `frontend` and `render`.
#[derive(Debug, Clone, Default)]
pub struct Tuning {
    pub health: HealthCheckConfig,
    pub coordinator: CoordinatorConfig,
}

/// Loads the configuration, failing on anything invalid.
pub fn load_config(config_path: Option<PathBuf>) -> Result<(ConfigSource, Config)> {
    let source = ConfigSource::new(config_path);
    match source.path() {
        Some(path) => tracing::info!("Using configuration file {}", path.display()),
        None => tracing::info!("No configuration file found, using defaults and environment"),
    }
    let config = source.load().context("Invalid configuration")?;
    Ok((source, config))
}

/// Connectivity manager wired to Redis and the HTTP worker.
pub fn connectivity(config: &Config, tuning: &Tuning) -> Arc<ConnectivityManager> {
    Arc::new(ConnectivityManager::new(
        config,
        Arc::new(RedisConnector::default()),
        Arc::new(HttpBackendConnector::new(tuning.coordinator.rpc_timeout)),
        tuning.health.clone(),
    ))
}

/// Serves the frontend until the HTTP server fails.
pub async fn run_frontend(
    bind: SocketAddr,
    config_path: Option<PathBuf>,
    reload_interval: Duration,
    tuning: Tuning,
) -> Result<()> {
    let (source, config) = load_config(config_path)?;
    tracing::info!(
        "Rendering {}x{} at {} iterations, cache {}, backend {}",
        config.points,
        config.points,
        config.max_iterations,
        config.cache_server,
        config.backend_server
    );

    let connectivity = connectivity(&config, &tuning);
    let watcher = ConfigWatcher::new(source, config, reload_interval);

    let _probe_loop = connectivity.clone().spawn(watcher.subscribe());
    let coordinator = Arc::new(Coordinator::new(connectivity, tuning.coordinator));
    let frontend = Frontend::new(coordinator, watcher.subscribe());
    let _watcher = watcher.spawn();

    HttpServer::new(frontend).run(bind).await?;
    Ok(())
}

/// Serves the block compute worker until the accept loop fails.
pub async fn run_worker(bind: SocketAddr) -> Result<()> {
    tracing::info!("Starting mandel worker {}", VERSION);
    mandel_worker::HttpServer::new(Arc::new(Worker::new()))
        .run(bind)
        .await?;
    Ok(())
}

/// Renders once and writes the PNG to `output`.
pub async fn run_render(config_path: Option<PathBuf>, output: &Path, tuning: Tuning) -> Result<RenderStats> {
    let (_, config) = load_config(config_path)?;
    let coordinator = Coordinator::new(connectivity(&config, &tuning), tuning.coordinator);

    let render = coordinator.render(&config).await.context("Render failed")?;
    let png = render.canvas.to_png()?;
    tokio::fs::write(output, &png)
        .await
        .with_context(|| format!("Failed to write {}", output.display()))?;

    tracing::info!("Wrote {} ({} bytes)", output.display(), png.len());
    Ok(render.stats)
}
