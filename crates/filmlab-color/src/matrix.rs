//! Row-major 3x3 matrix helpers on top of [`glam::Mat3`].
//!
//! glam stores matrices column-major; calibration data (separation matrices,
//! RGB to XYZ) is always written row by row, so these helpers do the
//! transposition in one place.
//!
//! ```text
//! | m00 m01 m02 |   | r |
//! | m10 m11 m12 | * | g |
//! | m20 m21 m22 |   | b |
//! ```

use glam::{Mat3, Vec3};

/// Builds a matrix from rows.
#[inline]
pub fn from_rows(rows: [[f32; 3]; 3]) -> Mat3 {
    Mat3::from_cols_array_2d(&rows).transpose()
}

/// Builds a matrix from a flat row-major array of nine values.
#[inline]
pub fn from_row_major(m: &[f32; 9]) -> Mat3 {
    from_rows([[m[0], m[1], m[2]], [m[3], m[4], m[5]], [m[6], m[7], m[8]]])
}

/// Rows of a matrix.
#[inline]
pub fn to_rows(m: &Mat3) -> [[f32; 3]; 3] {
    m.transpose().to_cols_array_2d()
}

/// Multiplies an RGB triple by the matrix.
#[inline]
pub fn apply(m: &Mat3, rgb: [f32; 3]) -> [f32; 3] {
    (*m * Vec3::from_array(rgb)).to_array()
}

/// Linear blend `identity * (1 - s) + m * s` with every row rescaled so it
/// sums to one (rows summing to zero or less are divided by a small epsilon
/// instead).
///
/// ```rust
/// use filmlab_color::matrix;
///
/// let m = matrix::from_rows([[2.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]]);
/// let blended = matrix::blend_with_identity(&m, 1.0);
/// assert_eq!(matrix::apply(&blended, [1.0, 1.0, 1.0]), [1.0, 1.0, 1.0]);
/// ```
pub fn blend_with_identity(m: &Mat3, strength: f32) -> Mat3 {
    let mixed = Mat3::IDENTITY * (1.0 - strength) + *m * strength;
    let mut rows = to_rows(&mixed);
    for row in rows.iter_mut() {
        let sum = (row[0] + row[1] + row[2]).max(1e-6);
        for v in row.iter_mut() {
            *v /= sum;
        }
    }
    from_rows(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_major_apply() {
        let m = from_rows([[1.0, 2.0, 3.0], [0.0, 1.0, 0.0], [0.0, 0.0, 2.0]]);
        assert_eq!(apply(&m, [1.0, 1.0, 1.0]), [6.0, 1.0, 2.0]);
        assert_eq!(to_rows(&m)[0], [1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_blend_zero_strength_is_identity() {
        let m = from_row_major(&[1.0, -0.05, -0.02, -0.04, 1.0, -0.08, -0.01, -0.1, 1.0]);
        let b = blend_with_identity(&m, 0.0);
        assert!(b.abs_diff_eq(Mat3::IDENTITY, 1e-6));
    }

    #[test]
    fn test_blend_rows_sum_to_one() {
        let m = from_row_major(&[1.1, -0.06, -0.04, -0.04, 1.1, -0.06, -0.04, -0.06, 1.1]);
        let b = blend_with_identity(&m, 0.7);
        for row in to_rows(&b) {
            assert!((row.iter().sum::<f32>() - 1.0).abs() < 1e-5);
        }
    }
}
