//! CIELAB conversions (D65 reference white).
//!
//! Linear RGB with Rec.709/sRGB primaries goes through CIE XYZ to L*a*b*.
//! L is in `[0, 100]`, a and b are roughly `[-128, 127]`.
//!
//! # Example
//!
//! ```rust
//! use filmlab_color::lab::{linear_to_lab, lab_to_linear};
//!
//! let lab = linear_to_lab([1.0, 1.0, 1.0]);
//! assert!((lab[0] - 100.0).abs() < 0.01);
//! assert!(lab[1].abs() < 0.01 && lab[2].abs() < 0.01);
//!
//! let back = lab_to_linear(lab);
//! assert!((back[0] - 1.0).abs() < 1e-4);
//! ```

use std::sync::LazyLock;

use glam::{Mat3, Vec3};

use crate::matrix;

/// D65 reference white in XYZ (Y = 1).
pub const D65_WHITE: [f32; 3] = [0.950_47, 1.0, 1.088_83];

const DELTA: f32 = 6.0 / 29.0;

static RGB_TO_XYZ: LazyLock<Mat3> = LazyLock::new(|| {
    matrix::from_rows([
        [0.412_456_4, 0.357_576_1, 0.180_437_5],
        [0.212_672_9, 0.715_152_2, 0.072_175_0],
        [0.019_333_9, 0.119_192_0, 0.950_304_1],
    ])
});

static XYZ_TO_RGB: LazyLock<Mat3> = LazyLock::new(|| RGB_TO_XYZ.inverse());

/// Linear RGB to CIE XYZ.
#[inline]
pub fn linear_to_xyz(rgb: [f32; 3]) -> [f32; 3] {
    matrix::apply(&RGB_TO_XYZ, rgb)
}

/// CIE XYZ to linear RGB.
#[inline]
pub fn xyz_to_linear(xyz: [f32; 3]) -> [f32; 3] {
    matrix::apply(&XYZ_TO_RGB, xyz)
}

#[inline]
fn f(t: f32) -> f32 {
    if t > DELTA * DELTA * DELTA {
        t.cbrt()
    } else {
        t / (3.0 * DELTA * DELTA) + 4.0 / 29.0
    }
}

#[inline]
fn f_inv(t: f32) -> f32 {
    if t > DELTA {
        t * t * t
    } else {
        3.0 * DELTA * DELTA * (t - 4.0 / 29.0)
    }
}

/// CIE XYZ to L*a*b*.
#[inline]
pub fn xyz_to_lab(xyz: [f32; 3]) -> [f32; 3] {
    let fx = f(xyz[0] / D65_WHITE[0]);
    let fy = f(xyz[1] / D65_WHITE[1]);
    let fz = f(xyz[2] / D65_WHITE[2]);
    [116.0 * fy - 16.0, 500.0 * (fx - fy), 200.0 * (fy - fz)]
}

/// L*a*b* to CIE XYZ.
#[inline]
pub fn lab_to_xyz(lab: [f32; 3]) -> [f32; 3] {
    let fy = (lab[0] + 16.0) / 116.0;
    let fx = fy + lab[1] / 500.0;
    let fz = fy - lab[2] / 200.0;
    [
        D65_WHITE[0] * f_inv(fx),
        D65_WHITE[1] * f_inv(fy),
        D65_WHITE[2] * f_inv(fz),
    ]
}

/// Linear RGB to L*a*b*.
#[inline]
pub fn linear_to_lab(rgb: [f32; 3]) -> [f32; 3] {
    xyz_to_lab(linear_to_xyz(rgb))
}

/// L*a*b* to linear RGB (not clamped).
#[inline]
pub fn lab_to_linear(lab: [f32; 3]) -> [f32; 3] {
    xyz_to_linear(lab_to_xyz(lab))
}

/// L* of a linear RGB value, without computing a* and b*.
#[inline]
pub fn lightness(rgb: [f32; 3]) -> f32 {
    let y = RGB_TO_XYZ.row(1).dot(Vec3::from_array(rgb));
    116.0 * f(y / D65_WHITE[1]) - 16.0
}

/// Relative luminance Y of an L* value.
#[inline]
pub fn lightness_to_luminance(l: f32) -> f32 {
    D65_WHITE[1] * f_inv((l + 16.0) / 116.0)
}

/// Chroma `sqrt(a^2 + b^2)`.
#[inline]
pub fn chroma(lab: [f32; 3]) -> f32 {
    (lab[1] * lab[1] + lab[2] * lab[2]).sqrt()
}
