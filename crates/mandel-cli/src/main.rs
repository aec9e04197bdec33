//! # mandel CLI Entry Point
//!
//! ## Usage
//!
//! ```bash
//! # Start a worker
//! mandel worker -b 0.0.0.0:28000
//!
//! # Start the frontend
//! mandel frontend -b 0.0.0.0:8080 -c /etc/mandelbrot-frontend/config.json
//!
//! # Render once to a file
//! mandel render -o mandelbrot.png
//! ```
//!
//! Logging goes to stderr at `info` unless `RUST_LOG` says otherwise.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use argh::FromArgs;
use mandel_cli::Tuning;
use mandel_frontend::{CoordinatorConfig, HealthCheckConfig};

#[derive(FromArgs)]
/// mandel - distributed Mandelbrot renderer
struct Cli {
    #[argh(subcommand)]
    command: Commands,
}

#[derive(FromArgs)]
#[argh(subcommand)]
enum Commands {
    Frontend(FrontendArgs),
    Worker(WorkerArgs),
    Render(RenderArgs),
}

#[derive(FromArgs)]
#[argh(subcommand, name = "frontend")]
/// start the rendering HTTP frontend
struct FrontendArgs {
    /// address to bind the HTTP server to
    #[argh(option, short = 'b', default = "\"0.0.0.0:8080\".into()")]
    bind: String,

    /// path to a JSON configuration file (default: first of the standard locations)
    #[argh(option, short = 'c')]
    config: Option<PathBuf>,

    /// seconds between dependency health probes
    #[argh(option, long = "health-check-interval", default = "10")]
    health_check_interval_secs: u64,

    /// timeout of each probe and connect attempt in milliseconds
    #[argh(option, long = "health-check-timeout", default = "2000")]
    health_check_timeout_ms: u64,

    /// timeout of each compute call in milliseconds
    #[argh(option, long = "rpc-timeout", default = "30000")]
    rpc_timeout_ms: u64,

    /// timeout of each cache read or write in milliseconds
    #[argh(option, long = "cache-timeout", default = "1000")]
    cache_timeout_ms: u64,

    /// blocks fetched or computed concurrently
    #[argh(option, long = "max-in-flight", default = "64")]
    max_in_flight: usize,

    /// milliseconds between checks of the configuration file
    #[argh(option, long = "reload-interval", default = "2000")]
    reload_interval_ms: u64,
}

#[derive(FromArgs)]
#[argh(subcommand, name = "worker")]
/// start a block compute worker
struct WorkerArgs {
    /// address to bind the JSON-RPC server to
    #[argh(option, short = 'b', default = "\"0.0.0.0:28000\".into()")]
    bind: String,
}

#[derive(FromArgs)]
#[argh(subcommand, name = "render")]
/// render once and write a PNG file
struct RenderArgs {
    /// file to write
    #[argh(option, short = 'o', default = "PathBuf::from(\"mandelbrot.png\")")]
    output: PathBuf,

    /// path to a JSON configuration file
    #[argh(option, short = 'c')]
    config: Option<PathBuf>,

    /// timeout of each connect attempt in milliseconds
    #[argh(option, long = "connect-timeout", default = "2000")]
    connect_timeout_ms: u64,

    /// timeout of each compute call in milliseconds
    #[argh(option, long = "rpc-timeout", default = "30000")]
    rpc_timeout_ms: u64,

    /// blocks fetched or computed concurrently
    #[argh(option, long = "max-in-flight", default = "64")]
    max_in_flight: usize,
}

impl FrontendArgs {
    fn tuning(&self) -> Tuning {
        Tuning {
            health: HealthCheckConfig {
                interval: Duration::from_secs(self.health_check_interval_secs),
                timeout: Duration::from_millis(self.health_check_timeout_ms),
            },
            coordinator: CoordinatorConfig {
                rpc_timeout: Duration::from_millis(self.rpc_timeout_ms),
                cache_timeout: Duration::from_millis(self.cache_timeout_ms),
                max_in_flight: self.max_in_flight,
            },
        }
    }
}

impl RenderArgs {
    fn tuning(&self) -> Tuning {
        Tuning {
            health: HealthCheckConfig {
                timeout: Duration::from_millis(self.connect_timeout_ms),
                ..Default::default()
            },
            coordinator: CoordinatorConfig {
                rpc_timeout: Duration::from_millis(self.rpc_timeout_ms),
                max_in_flight: self.max_in_flight,
                ..Default::default()
            },
        }
    }
}

fn parse_bind(bind: &str) -> Result<SocketAddr> {
    bind.parse()
        .map_err(|e| anyhow::anyhow!("Invalid bind address {}: {}", bind, e))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli: Cli = argh::from_env();

    // Set default log level to INFO, but allow RUST_LOG env var to override
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Frontend(args) => {
            tracing::info!("Starting mandel frontend {}", mandel_cli::VERSION);
            let addr = parse_bind(&args.bind)?;
            let tuning = args.tuning();
            mandel_cli::run_frontend(
                addr,
                args.config,
                Duration::from_millis(args.reload_interval_ms),
                tuning,
            )
            .await
        }
        Commands::Worker(args) => {
            let addr = parse_bind(&args.bind)?;
            mandel_cli::run_worker(addr).await
        }
        Commands::Render(args) => {
            let tuning = args.tuning();
            mandel_cli::run_render(args.config, &args.output, tuning)
                .await
                .map(|_| ())
        }
    }
}
