pub mod compute;
pub mod error;
pub mod health;
pub mod jsonrpc;

pub use compute::{BlockReply, BlockRequest, ComplexPoint, COMPUTE_BLOCK_METHOD};
pub use error::{MandelError, Result};
pub use health::{
    HealthCheckRequest, HealthCheckResponse, ServingStatus, HEALTH_CHECK_METHOD, WORKER_SERVICE,
};
pub use jsonrpc::{JsonRpcError, JsonRpcRequest, JsonRpcResponse};
