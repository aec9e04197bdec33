use mandel_common::IN_SET;
use num_complex::Complex64;

/// Divergence bound on `re(z) + im(z)`.
///
/// This is a sum of the parts, not a modulus test. Renders cached by older
/// workers were produced with this exact threshold, so it must not change.
pub const ESCAPE_THRESHOLD: f64 = 4.0;

/// Escape-time iteration count of `c`.
///
/// Iterates `z ← z² + c` from `z = 0` and returns the 1-based index of the
/// first iterate with `re(z) + im(z) > 4`. Points that stay bounded for
/// `max_iterations - 1` iterations return [`IN_SET`].
pub fn escape_time(c: Complex64, max_iterations: u32) -> u32 {
    let mut z = Complex64::new(0.0, 0.0);
    for i in 1..max_iterations {
        z = z * z + c;
        if z.re + z.im > ESCAPE_THRESHOLD {
            return i;
        }
    }
    IN_SET as u32
}
