//! Liveness probe payloads
//!
//! The worker answers `health_check` independently of the compute path, so a
//! probe never queues behind block computations.

use serde::{Deserialize, Serialize};

/// Name of the liveness method on the worker.
pub const HEALTH_CHECK_METHOD: &str = "health_check";

/// Service name the frontend asks about when probing a worker.
pub const WORKER_SERVICE: &str = "mandel.MandelService";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HealthCheckRequest {
    pub service: String,
}

impl HealthCheckRequest {
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ServingStatus {
    Unknown,
    Serving,
    NotServing,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HealthCheckResponse {
    pub status: ServingStatus,
}
