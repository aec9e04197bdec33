use std::io::Cursor;

use image::{GrayImage, ImageFormat};
use mandel_common::protocol::error::{MandelError, Result};
use mandel_common::{BlockCoord, BlockMatrix, Grid, IN_SET};

/// Iteration counts of a whole render, one byte per pixel.
///
/// Stored with index `y * points + x`, which is the row layout of an 8-bit
/// grayscale image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Canvas {
    points: usize,
    pixels: Vec<u8>,
}

impl Canvas {
    pub fn new(grid: Grid) -> Self {
        let points = grid.points() as usize;
        Self {
            points,
            pixels: vec![IN_SET; points * points],
        }
    }

    pub fn points(&self) -> usize {
        self.points
    }

    /// Copies `matrix` to the pixels owned by the block at `coord`.
    pub fn write_block(&mut self, coord: BlockCoord, matrix: &BlockMatrix) {
        let (ox, oy) = coord.pixel_offset();
        let size = matrix.size();
        for x in 0..size {
            for y in 0..size {
                self.pixels[(oy + y) * self.points + ox + x] = matrix.get(x, y);
            }
        }
    }

    pub fn get(&self, x: usize, y: usize) -> u8 {
        self.pixels[y * self.points + x]
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Encodes the canvas as an 8-bit grayscale PNG.
    pub fn to_png(&self) -> Result<Vec<u8>> {
        let side = self.points as u32;
        let image = GrayImage::from_raw(side, side, self.pixels.clone())
            .ok_or_else(|| MandelError::Encoding("pixel buffer does not match canvas size".to_string()))?;

        let mut png = Vec::new();
        image
            .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
            .map_err(|e| MandelError::Encoding(e.to_string()))?;
        Ok(png)
    }
}
