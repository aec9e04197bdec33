//! Mandel Client
//!
//! Clients for the two dependencies of the render frontend: the compute
//! worker ([`ComputeBackend`]) and the block cache ([`BlockStore`]), plus the
//! [`Connector`]s that open and probe them.

pub mod backend;
pub mod connector;
pub mod store;

pub use backend::{ComputeBackend, HttpBackend};
pub use connector::{Connector, HttpBackendConnector, RedisConnector};
pub use store::{BlockStore, MemoryStore, RedisStore, CACHE_NAMESPACE};
