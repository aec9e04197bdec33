//! Block compute payloads
//!
//! Params and result of the worker's `compute_block` method. Field names are
//! camelCase on the wire:
//!
//! ```json
//! {"planeStart":{"x":-2.0,"y":-1.5},"planeEnd":{"x":0.6,"y":1.5},
//!  "points":2048,"maxIterations":256,"blockSize":32,"blockX":2,"blockY":3}
//! ```

use serde::{Deserialize, Serialize};

use crate::block::{BlockCoord, BLOCK_SIZE};
use crate::plane::PlaneWindow;

/// Name of the compute method on the worker.
pub const COMPUTE_BLOCK_METHOD: &str = "compute_block";

/// A point of the complex plane as it travels on the wire.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ComplexPoint {
    pub x: f64,
    pub y: f64,
}

/// Request for the iteration counts of one block.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BlockRequest {
    pub plane_start: ComplexPoint,
    pub plane_end: ComplexPoint,
    pub points: i32,
    pub max_iterations: i32,
    pub block_size: i32,
    pub block_x: i32,
    pub block_y: i32,
}

impl BlockRequest {
    /// Builds the request for `coord` of a `points × points` render.
    pub fn new(plane: &PlaneWindow, points: u32, max_iterations: u32, coord: BlockCoord) -> Self {
        Self {
            plane_start: plane.start_point(),
            plane_end: plane.end_point(),
            points: points as i32,
            max_iterations: max_iterations as i32,
            block_size: BLOCK_SIZE as i32,
            block_x: coord.bx as i32,
            block_y: coord.by as i32,
        }
    }

    pub fn coord(&self) -> BlockCoord {
        BlockCoord::new(self.block_x as u32, self.block_y as u32)
    }
}

/// Iteration counts of one block, row-major with index `x * blockSize + y`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct BlockReply {
    pub results: Vec<i32>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_block_request_wire_shape() {
        let req = BlockRequest::new(&PlaneWindow::default(), 2048, 256, BlockCoord::new(2, 3));
        let value = serde_json::to_value(&req).unwrap();
        assert_eq!(
            value,
            json!({
                "planeStart": {"x": -2.0, "y": -1.5},
                "planeEnd": {"x": 0.6, "y": 1.5},
                "points": 2048,
                "maxIterations": 256,
                "blockSize": 32,
                "blockX": 2,
                "blockY": 3
            })
        );
    }

    #[test]
    fn test_block_request_coord() {
        let req = BlockRequest::new(&PlaneWindow::default(), 64, 16, BlockCoord::new(1, 0));
        assert_eq!(req.coord(), BlockCoord::new(1, 0));
    }

    #[test]
    fn test_block_reply_deserialization() {
        let reply: BlockReply = serde_json::from_str(r#"{"results":[1,2,3]}"#).unwrap();
        assert_eq!(reply.results, vec![1, 2, 3]);
    }
}
