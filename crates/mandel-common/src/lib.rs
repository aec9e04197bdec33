//! Mandel Common Types and Transport
//!
//! Shared building blocks of the mandel renderer: a frontend that splits a
//! Mandelbrot canvas into blocks and a pool of workers that compute them.
//!
//! # Components
//!
//! - [`protocol`] - Error type, JSON-RPC envelopes, compute and health payloads
//! - [`transport`] - HTTP/JSON-RPC conversion helpers
//! - [`block`] - Block coordinates, cache keys, grid partitioning, block matrices
//! - [`plane`] - The complex-plane window sampled by the grid
//! - [`config`] - Hot-reloadable process configuration
//!
//! # Example
//!
//! ```
//! use mandel_common::{BlockRequest, Grid, PlaneWindow};
//!
//! let grid = Grid::new(64).unwrap();
//! let requests: Vec<BlockRequest> = grid
//!     .blocks()
//!     .map(|coord| BlockRequest::new(&PlaneWindow::default(), grid.points(), 256, coord))
//!     .collect();
//! assert_eq!(requests.len(), 4);
//! ```

pub mod block;
pub mod config;
pub mod plane;
pub mod protocol;
pub mod transport;

pub use block::{BlockCoord, BlockKey, BlockMatrix, Grid, BLOCK_SIZE, IN_SET};
pub use config::{Config, ConfigSource};
pub use plane::PlaneWindow;
pub use protocol::*;
