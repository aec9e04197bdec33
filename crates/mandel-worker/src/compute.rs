//! Block computation
//!
//! Turns a [`BlockRequest`] into the iteration counts of every pixel of the
//! block. Pure and stateless, so it can run on any blocking thread.

use mandel_common::protocol::error::{MandelError, Result};
use mandel_common::{BlockReply, BlockRequest, PlaneWindow};
use num_complex::Complex64;

use crate::escape::escape_time;

/// Largest block side a worker accepts. Bounds the reply allocation.
pub const MAX_BLOCK_SIZE: i32 = 1024;

/// Computes the iteration counts of the block named by `req`.
///
/// Pixel `(x, y)` of block `(bx, by)` samples
/// `start + (x + bs·bx)·xStep + i·(y + bs·by)·yStep`. Results are stored at
/// index `x * bs + y`.
pub fn compute_block(req: &BlockRequest) -> Result<BlockReply> {
    validate(req)?;

    let plane = PlaneWindow::from_points(req.plane_start, req.plane_end);
    let (x_step, y_step) = plane.steps(req.points as u32);
    let bs = req.block_size as usize;
    let max_iterations = req.max_iterations as u32;
    let x_origin = req.block_x as i64 * req.block_size as i64;
    let y_origin = req.block_y as i64 * req.block_size as i64;

    let mut results = Vec::with_capacity(bs * bs);
    for x in 0..bs as i64 {
        let re = plane.start.re + (x + x_origin) as f64 * x_step;
        for y in 0..bs as i64 {
            let im = plane.start.im + (y + y_origin) as f64 * y_step;
            results.push(escape_time(Complex64::new(re, im), max_iterations) as i32);
        }
    }

    Ok(BlockReply { results })
}

fn validate(req: &BlockRequest) -> Result<()> {
    if req.points <= 0 {
        return Err(MandelError::InvalidRequest(format!(
            "points must be positive, got {}",
            req.points
        )));
    }
    if req.block_size <= 0 || req.block_size > MAX_BLOCK_SIZE {
        return Err(MandelError::InvalidRequest(format!(
            "blockSize must be in 1..={}, got {}",
            MAX_BLOCK_SIZE, req.block_size
        )));
    }
    if req.max_iterations < 1 {
        return Err(MandelError::InvalidRequest(format!(
            "maxIterations must be at least 1, got {}",
            req.max_iterations
        )));
    }
    if req.block_x < 0 || req.block_y < 0 {
        return Err(MandelError::InvalidRequest(format!(
            "block ({}, {}) has a negative coordinate",
            req.block_x, req.block_y
        )));
    }

    let points = req.points as i64;
    let bs = req.block_size as i64;
    if req.block_x as i64 * bs >= points || req.block_y as i64 * bs >= points {
        return Err(MandelError::InvalidRequest(format!(
            "block ({}, {}) lies outside a {}x{} grid",
            req.block_x, req.block_y, req.points, req.points
        )));
    }
    Ok(())
}
