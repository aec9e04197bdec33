//! Process configuration
//!
//! Values are resolved in three layers: built-in defaults, then the first
//! config file found (JSON), then `MANDELBROT_*` environment variables.
//!
//! | field | env var | default |
//! |---|---|---|
//! | `points` | `MANDELBROT_POINTS` | `2048` |
//! | `maxIterations` | `MANDELBROT_MAXITERATIONS` | `256` (at most 256) |
//! | `cacheServer` | `MANDELBROT_CACHESERVER` | `localhost:6379` |
//! | `backendServer` | `MANDELBROT_BACKENDSERVER` | `localhost:28000` |

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::block::Grid;
use crate::protocol::error::{MandelError, Result};

pub const ENV_PREFIX: &str = "MANDELBROT_";
pub const CONFIG_FILE_NAME: &str = "config.json";

/// Largest iteration cap. Escape counts stay below it, so they fit in a `u8`.
pub const MAX_ITERATIONS: u32 = 256;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    /// Pixels per canvas side
    pub points: u32,
    /// Iteration cap of the escape-time loop
    pub max_iterations: u32,
    /// Redis endpoint of the block cache (`host:port`)
    pub cache_server: String,
    /// Compute worker endpoint (`host:port`)
    pub backend_server: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            points: 2048,
            max_iterations: 256,
            cache_server: "localhost:6379".to_string(),
            backend_server: "localhost:28000".to_string(),
        }
    }
}

impl Config {
    /// Checks every render precondition and returns the grid it describes.
    pub fn validate(&self) -> Result<Grid> {
        if self.max_iterations == 0 {
            return Err(MandelError::InvalidConfig(
                "maxIterations must be at least 1".to_string(),
            ));
        }
        if self.max_iterations > MAX_ITERATIONS {
            return Err(MandelError::InvalidConfig(format!(
                "maxIterations ({}) must be at most {} so every count fits a pixel",
                self.max_iterations, MAX_ITERATIONS
            )));
        }
        if self.cache_server.trim().is_empty() {
            return Err(MandelError::InvalidConfig("cacheServer is empty".to_string()));
        }
        if self.backend_server.trim().is_empty() {
            return Err(MandelError::InvalidConfig("backendServer is empty".to_string()));
        }
        Grid::new(self.points)
    }

    /// Reads a JSON config file. Fields it omits keep their defaults.
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read(path)?;
        serde_json::from_slice(&contents).map_err(|e| {
            MandelError::InvalidConfig(format!("failed to parse {}: {}", path.display(), e))
        })
    }

    /// Applies overrides from `lookup`, which maps a full variable name to
    /// its value.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(&format!("{}{}", ENV_PREFIX, name));

        if let Some(value) = var("POINTS") {
            self.points = parse_number("POINTS", &value)?;
        }
        if let Some(value) = var("MAXITERATIONS") {
            self.max_iterations = parse_number("MAXITERATIONS", &value)?;
        }
        if let Some(value) = var("CACHESERVER") {
            self.cache_server = value;
        }
        if let Some(value) = var("BACKENDSERVER") {
            self.backend_server = value;
        }
        Ok(())
    }
}

fn parse_number(name: &str, value: &str) -> Result<u32> {
    value.trim().parse().map_err(|_| {
        MandelError::InvalidConfig(format!("{}{}={} is not a number", ENV_PREFIX, name, value))
    })
}

/// Where configuration comes from: an optional file plus the environment.
#[derive(Debug, Clone)]
pub struct ConfigSource {
    path: Option<PathBuf>,
    required: bool,
}

impl ConfigSource {
    /// An explicit path must exist; without one the default search paths
    /// are tried and a missing file means defaults.
    pub fn new(explicit: Option<PathBuf>) -> Self {
        match explicit {
            Some(path) => Self {
                path: Some(path),
                required: true,
            },
            None => Self {
                path: default_search_paths().into_iter().find(|p| p.is_file()),
                required: false,
            },
        }
    }

    /// The file this source reads, if any.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Resolves and validates the configuration.
    pub fn load(&self) -> Result<Config> {
        let mut config = match &self.path {
            Some(path) if path.is_file() || self.required => {
                tracing::debug!("Reading configuration from {}", path.display());
                Config::from_file(path)?
            }
            _ => Config::default(),
        };
        config.apply_env(|name| std::env::var(name).ok())?;
        config.validate()?;
        Ok(config)
    }
}

/// `/etc/mandelbrot-frontend/`, `$HOME/.mandelbrot-frontend/`, then the
/// working directory.
pub fn default_search_paths() -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from("/etc/mandelbrot-frontend").join(CONFIG_FILE_NAME)];
    if let Some(home) = std::env::var_os("HOME") {
        paths.push(PathBuf::from(home).join(".mandelbrot-frontend").join(CONFIG_FILE_NAME));
    }
    paths.push(PathBuf::from(CONFIG_FILE_NAME));
    paths
}
