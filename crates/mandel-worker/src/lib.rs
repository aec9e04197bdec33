//! Mandel Worker
//!
//! Computes escape-time iteration counts for one block at a time and serves
//! them over JSON-RPC. The worker is stateless apart from its serving flag, so
//! any number of them can sit behind one endpoint.

pub mod compute;
pub mod escape;
pub mod http_router;
pub mod http_server;
pub mod worker;

pub use compute::compute_block;
pub use escape::escape_time;
pub use http_server::HttpServer;
pub use worker::Worker;
