//! sRGB transfer function.
//!
//! Piecewise: a linear segment near black and a 2.4 power curve above it.
//!
//! # Range
//!
//! - Input/Output: [0, 1]
//!
//! # Reference
//!
//! IEC 61966-2-1:1999

/// sRGB EOTF: decodes sRGB encoded values to linear light.
///
/// ```text
/// if V <= 0.04045:  L = V / 12.92
/// else:             L = ((V + 0.055) / 1.055)^2.4
/// ```
///
/// ```rust
/// use filmlab_color::srgb::eotf;
///
/// let linear = eotf(0.5);
/// assert!((linear - 0.214).abs() < 0.01);
/// ```
#[inline]
pub fn eotf(v: f32) -> f32 {
    if v <= 0.04045 {
        v / 12.92
    } else {
        ((v + 0.055) / 1.055).powf(2.4)
    }
}

/// sRGB OETF: encodes linear light to sRGB.
///
/// ```text
/// if L <= 0.0031308:  V = L * 12.92
/// else:               V = 1.055 * L^(1/2.4) - 0.055
/// ```
#[inline]
pub fn oetf(l: f32) -> f32 {
    if l <= 0.0031308 {
        l * 12.92
    } else {
        1.055 * l.powf(1.0 / 2.4) - 0.055
    }
}

/// Applies sRGB EOTF to an RGB triplet.
#[inline]
pub fn eotf_rgb(rgb: [f32; 3]) -> [f32; 3] {
    [eotf(rgb[0]), eotf(rgb[1]), eotf(rgb[2])]
}

/// Applies sRGB OETF to an RGB triplet.
#[inline]
pub fn oetf_rgb(rgb: [f32; 3]) -> [f32; 3] {
    [oetf(rgb[0]), oetf(rgb[1]), oetf(rgb[2])]
}
