//! HTTP Server for the Frontend
//!
//! Serves the rendered image and a few read-only views over axum:
//! - `GET /` - PNG of the current configuration
//! - `GET /config` - the configuration in force
//! - `GET /status` - connectivity of cache and backend
//! - `GET /version` - version and build id

use std::net::SocketAddr;

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use mandel_common::protocol::error::MandelError;
use serde_json::json;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::frontend::{Frontend, VersionInfo};

pub struct HttpServer {
    frontend: Frontend,
}

impl HttpServer {
    pub fn new(frontend: Frontend) -> Self {
        Self { frontend }
    }

    /// The routes, ready to be served.
    pub fn router(&self) -> Router {
        Router::new()
            .route("/", get(render_image))
            .route("/config", get(current_config))
            .route("/status", get(connection_status))
            .route("/version", get(version))
            .layer(TraceLayer::new_for_http())
            .with_state(self.frontend.clone())
    }

    /// Binds `addr` and serves until the server fails.
    pub async fn run(self, addr: SocketAddr) -> Result<(), MandelError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| MandelError::Transport(format!("Failed to bind to {}: {}", addr, e)))?;
        self.serve(listener).await
    }

    pub async fn serve(self, listener: TcpListener) -> Result<(), MandelError> {
        info!(
            "Frontend HTTP server listening on {}",
            listener
                .local_addr()
                .map_err(|e| MandelError::Transport(format!("Failed to get local addr: {}", e)))?
        );

        axum::serve(listener, self.router())
            .await
            .map_err(|e| MandelError::Transport(format!("Server error: {}", e)))
    }
}

async fn render_image(State(frontend): State<Frontend>) -> Response {
    let png = match frontend.render().await {
        Ok(render) => render.canvas.to_png(),
        Err(e) => Err(e),
    };

    match png {
        Ok(png) => (
            StatusCode::OK,
            [
                (header::CONTENT_TYPE, "image/png".to_string()),
                (header::CONTENT_LENGTH, png.len().to_string()),
            ],
            png,
        )
            .into_response(),
        Err(e @ MandelError::AllDependenciesOffline) => {
            warn!("Refusing render: {}", e);
            error_response(StatusCode::SERVICE_UNAVAILABLE, &e)
        }
        Err(e) => {
            error!("Render failed: {}", e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, &e)
        }
    }
}

fn error_response(status: StatusCode, err: &MandelError) -> Response {
    (status, Json(json!({ "error": err.to_string() }))).into_response()
}

async fn current_config(State(frontend): State<Frontend>) -> impl IntoResponse {
    Json(frontend.config().as_ref().clone())
}

async fn connection_status(State(frontend): State<Frontend>) -> impl IntoResponse {
    Json(frontend.status().await)
}

async fn version() -> impl IntoResponse {
    Json(VersionInfo::current())
}
