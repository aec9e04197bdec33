use num_complex::Complex64;

use crate::protocol::ComplexPoint;

/// Rectangle of the complex plane mapped onto the pixel grid.
///
/// Pixel `(x, y)` of a `points × points` grid maps to
/// `start + x·xStep + i·y·yStep`, where each step is the window extent divided
/// by `points`. The end point itself is never sampled.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaneWindow {
    pub start: Complex64,
    pub end: Complex64,
}

impl Default for PlaneWindow {
    fn default() -> Self {
        Self {
            start: Complex64::new(-2.0, -1.5),
            end: Complex64::new(0.6, 1.5),
        }
    }
}

impl PlaneWindow {
    pub fn new(start: Complex64, end: Complex64) -> Self {
        Self { start, end }
    }

    pub fn from_points(start: ComplexPoint, end: ComplexPoint) -> Self {
        Self {
            start: Complex64::new(start.x, start.y),
            end: Complex64::new(end.x, end.y),
        }
    }

    pub fn start_point(&self) -> ComplexPoint {
        ComplexPoint {
            x: self.start.re,
            y: self.start.im,
        }
    }

    pub fn end_point(&self) -> ComplexPoint {
        ComplexPoint {
            x: self.end.re,
            y: self.end.im,
        }
    }

    /// Plane distance between neighbouring pixels along each axis.
    pub fn steps(&self, points: u32) -> (f64, f64) {
        let points = points as f64;
        (
            (self.end.re - self.start.re) / points,
            (self.end.im - self.start.im) / points,
        )
    }

    /// Plane point sampled by the global pixel `(px, py)`.
    pub fn point_at(&self, px: u32, py: u32, points: u32) -> Complex64 {
        let (x_step, y_step) = self.steps(points);
        Complex64::new(
            self.start.re + px as f64 * x_step,
            self.start.im + py as f64 * y_step,
        )
    }
}
