//! Block decomposition of the pixel grid.
//!
//! A render is split into square blocks of [`BLOCK_SIZE`] pixels per side.
//! Blocks are the unit of dispatch to the worker and the unit of caching.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::protocol::error::{MandelError, Result};

/// Pixels per block side.
pub const BLOCK_SIZE: usize = 32;

/// Iteration count of a point that never escaped. Also the value of every
/// pixel of a block that could be neither fetched nor computed.
pub const IN_SET: u8 = 0;

/// Largest block-grid side for which [`BlockKey`] stays collision-free.
pub const MAX_BLOCKS_PER_SIDE: u32 = 999;

/// Block position in block-grid space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockCoord {
    pub bx: u32,
    pub by: u32,
}

impl BlockCoord {
    pub fn new(bx: u32, by: u32) -> Self {
        Self { bx, by }
    }

    pub fn key(&self) -> BlockKey {
        BlockKey::new(*self)
    }

    /// Pixel of the canvas where the block's `(0, 0)` lands.
    pub fn pixel_offset(&self) -> (usize, usize) {
        (self.bx as usize * BLOCK_SIZE, self.by as usize * BLOCK_SIZE)
    }
}

impl fmt::Display for BlockCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.bx, self.by)
    }
}

/// Cache field name of a block: zero-padded `bx` followed by zero-padded `by`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BlockKey(String);

impl BlockKey {
    pub fn new(coord: BlockCoord) -> Self {
        Self(format!("{:03}{:03}", coord.bx, coord.by))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BlockKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The `points × points` pixel grid of one render.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Grid {
    points: u32,
}

impl Grid {
    /// Fails unless `points` is a positive multiple of [`BLOCK_SIZE`] with at
    /// most [`MAX_BLOCKS_PER_SIDE`] blocks per side.
    pub fn new(points: u32) -> Result<Self> {
        if points == 0 || points as usize % BLOCK_SIZE != 0 {
            return Err(MandelError::InvalidConfig(format!(
                "points ({}) must be a positive multiple of the block size ({})",
                points, BLOCK_SIZE
            )));
        }
        let per_side = points / BLOCK_SIZE as u32;
        if per_side > MAX_BLOCKS_PER_SIDE {
            return Err(MandelError::InvalidConfig(format!(
                "points ({}) yields {} blocks per side, at most {} are supported",
                points, per_side, MAX_BLOCKS_PER_SIDE
            )));
        }
        Ok(Self { points })
    }

    pub fn points(&self) -> u32 {
        self.points
    }

    pub fn blocks_per_side(&self) -> u32 {
        self.points / BLOCK_SIZE as u32
    }

    pub fn block_count(&self) -> usize {
        let per_side = self.blocks_per_side() as usize;
        per_side * per_side
    }

    /// Every block coordinate of the grid, column by column.
    pub fn blocks(&self) -> impl Iterator<Item = BlockCoord> {
        let per_side = self.blocks_per_side();
        (0..per_side).flat_map(move |bx| (0..per_side).map(move |by| BlockCoord::new(bx, by)))
    }
}

/// Iteration counts of one block, stored row-major with index `x * size + y`.
///
/// Serializes as a nested JSON array indexed `[x][y]`, which is the value
/// format of the block cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Vec<u8>>", into = "Vec<Vec<u8>>")]
pub struct BlockMatrix {
    size: usize,
    cells: Vec<u8>,
}

impl BlockMatrix {
    pub fn filled(size: usize, value: u8) -> Self {
        Self {
            size,
            cells: vec![value; size * size],
        }
    }

    /// Block whose every pixel is [`IN_SET`].
    pub fn in_set(size: usize) -> Self {
        Self::filled(size, IN_SET)
    }

    /// Converts worker results to pixel intensities, saturating at 255.
    pub fn from_results(results: &[i32], size: usize) -> Result<Self> {
        if results.len() != size * size {
            return Err(MandelError::InvalidResponse(format!(
                "expected {} results for a {}x{} block, got {}",
                size * size,
                size,
                size,
                results.len()
            )));
        }
        let cells = results
            .iter()
            .map(|&count| count.clamp(0, u8::MAX as i32) as u8)
            .collect();
        Ok(Self { size, cells })
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn get(&self, x: usize, y: usize) -> u8 {
        self.cells[x * self.size + y]
    }

    pub fn set(&mut self, x: usize, y: usize, value: u8) {
        self.cells[x * self.size + y] = value;
    }

    pub fn cells(&self) -> &[u8] {
        &self.cells
    }

    pub fn to_json(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Parses a cached value, rejecting anything that is not a
    /// `size × size` matrix.
    pub fn from_json(bytes: &[u8], size: usize) -> Result<Self> {
        let matrix: BlockMatrix = serde_json::from_slice(bytes)?;
        if matrix.size != size {
            return Err(MandelError::InvalidResponse(format!(
                "cached block is {}x{}, expected {}x{}",
                matrix.size, matrix.size, size, size
            )));
        }
        Ok(matrix)
    }
}

impl TryFrom<Vec<Vec<u8>>> for BlockMatrix {
    type Error = MandelError;

    fn try_from(rows: Vec<Vec<u8>>) -> Result<Self> {
        let size = rows.len();
        let mut cells = Vec::with_capacity(size * size);
        for (x, row) in rows.into_iter().enumerate() {
            if row.len() != size {
                return Err(MandelError::InvalidResponse(format!(
                    "row {} has {} entries, expected {}",
                    x,
                    row.len(),
                    size
                )));
            }
            cells.extend(row);
        }
        Ok(Self { size, cells })
    }
}

impl From<BlockMatrix> for Vec<Vec<u8>> {
    fn from(matrix: BlockMatrix) -> Self {
        if matrix.size == 0 {
            return Vec::new();
        }
        matrix.cells.chunks(matrix.size).map(<[u8]>::to_vec).collect()
    }
}
