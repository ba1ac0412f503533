//! Color transforms
//!
//! A `ColorTransform` is a 4x5 matrix over (R, G, B, A) in 0..=255 space:
//! a 4x4 linear part plus a 4x1 offset added after the linear combination.
//!
//! - `builder.rs` - elementary transforms (brightness, contrast, ...)
//! - `compose.rs` - ordered composition of transforms

use cgmath::{Matrix4, SquareMatrix, Vector4};

pub mod builder;
pub mod compose;

pub use compose::compose;

/// The alpha row every filter in this crate carries
pub const ALPHA_ROW: [f32; 5] = [0.0, 0.0, 0.0, 1.0, 0.0];

/// Tolerance used by the identity and alpha-row checks
const EPSILON: f32 = 0.001;

/// Linear color transform with additive offset
///
/// Stored as a cgmath `Matrix4` (column-major) plus an offset vector.
/// Values are immutable; combining transforms always yields a new one.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorTransform {
    linear: Matrix4<f32>,
    offset: Vector4<f32>,
}

impl ColorTransform {
    /// The no-op transform
    pub fn identity() -> Self {
        Self {
            linear: Matrix4::identity(),
            offset: Vector4::new(0.0, 0.0, 0.0, 0.0),
        }
    }

    /// Build from row-major 4x5 coefficients.
    ///
    /// `rows[i][j]` (j < 4) weights input channel j into output channel i,
    /// `rows[i][4]` is the offset for output channel i.
    pub fn from_rows(rows: [[f32; 5]; 4]) -> Self {
        let column = |j: usize| Vector4::new(rows[0][j], rows[1][j], rows[2][j], rows[3][j]);
        Self {
            linear: Matrix4::from_cols(column(0), column(1), column(2), column(3)),
            offset: column(4),
        }
    }

    /// Row-major 4x5 coefficients
    pub fn rows(&self) -> [[f32; 5]; 4] {
        let mut rows = [[0.0; 5]; 4];
        for (i, row) in rows.iter_mut().enumerate() {
            for (j, value) in row.iter_mut().take(4).enumerate() {
                // cgmath indexes [column][row]
                *value = self.linear[j][i];
            }
            row[4] = self.offset[i];
        }
        rows
    }

    /// Coefficient at `row`, `col` (col 4 is the offset)
    pub fn coefficient(&self, row: usize, col: usize) -> f32 {
        if col == 4 {
            self.offset[row]
        } else {
            self.linear[col][row]
        }
    }

    /// Transform that applies `self` first and then `next`.
    ///
    /// For affine maps: `next(self(p)) = N(S p + s) + n = (N S) p + (N s + n)`
    pub fn then(&self, next: &ColorTransform) -> ColorTransform {
        ColorTransform {
            linear: next.linear * self.linear,
            offset: next.linear * self.offset + next.offset,
        }
    }

    /// Map one RGBA pixel. RGB are rounded and clamped to 0..=255,
    /// alpha is passed through untouched.
    pub fn apply_to_pixel(&self, pixel: [u8; 4]) -> [u8; 4] {
        let input = Vector4::new(
            pixel[0] as f32,
            pixel[1] as f32,
            pixel[2] as f32,
            pixel[3] as f32,
        );
        let out = self.linear * input + self.offset;
        [quantize(out.x), quantize(out.y), quantize(out.z), pixel[3]]
    }

    /// Check whether this transform is (numerically) the identity
    pub fn is_identity(&self) -> bool {
        self.approx_eq(&Self::identity(), EPSILON)
    }

    /// Check the alpha row is `[0, 0, 0, 1, 0]`
    pub fn preserves_alpha(&self) -> bool {
        self.rows()[3]
            .iter()
            .zip(ALPHA_ROW.iter())
            .all(|(a, b)| (a - b).abs() < EPSILON)
    }

    /// All coefficients are finite numbers
    pub fn is_finite(&self) -> bool {
        self.rows().iter().flatten().all(|v| v.is_finite())
    }

    /// Element-wise comparison with an absolute tolerance
    pub fn approx_eq(&self, other: &ColorTransform, epsilon: f32) -> bool {
        self.rows()
            .iter()
            .flatten()
            .zip(other.rows().iter().flatten())
            .all(|(a, b)| (a - b).abs() <= epsilon)
    }
}

impl Default for ColorTransform {
    fn default() -> Self {
        Self::identity()
    }
}

/// Round to the nearest integer and clamp to the channel range
fn quantize(value: f32) -> u8 {
    value.round().clamp(0.0, 255.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rows_round_trip_layout() {
        let rows = [
            [1.0, 2.0, 3.0, 4.0, 5.0],
            [6.0, 7.0, 8.0, 9.0, 10.0],
            [11.0, 12.0, 13.0, 14.0, 15.0],
            ALPHA_ROW,
        ];
        let t = ColorTransform::from_rows(rows);
        assert_eq!(t.rows(), rows);
        assert_eq!(t.coefficient(0, 1), 2.0);
        assert_eq!(t.coefficient(2, 4), 15.0);
    }

    #[test]
    fn test_identity_detection() {
        assert!(ColorTransform::identity().is_identity());
        let mut rows = ColorTransform::identity().rows();
        rows[0][0] = 1.5;
        assert!(!ColorTransform::from_rows(rows).is_identity());
    }

    #[test]
    fn test_apply_clamps_and_keeps_alpha() {
        let t = ColorTransform::from_rows([
            [2.0, 0.0, 0.0, 0.0, 0.0],
            [0.0, 1.0, 0.0, 0.0, -300.0],
            [0.0, 0.0, 1.0, 0.0, 0.4],
            ALPHA_ROW,
        ]);
        assert_eq!(t.apply_to_pixel([200, 100, 10, 77]), [255, 0, 10, 77]);
    }

    #[test]
    fn test_non_finite_detected() {
        let mut rows = ColorTransform::identity().rows();
        rows[1][4] = f32::NAN;
        assert!(!ColorTransform::from_rows(rows).is_finite());
        assert!(ColorTransform::identity().is_finite());
    }
}
