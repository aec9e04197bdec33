//! Transport Layer
//!
//! The worker is reached with JSON-RPC 2.0 over plain HTTP/1.1 POST requests.
//! This module holds the conversions between the two.

pub mod http;

pub use http::{HttpTransport, HyperRequest, HyperResponse};
