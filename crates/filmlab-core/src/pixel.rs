//! Per-pixel helpers shared by every stage.

/// Rec.709 luminance coefficient for red channel.
pub const REC709_LUMA_R: f32 = 0.2126;

/// Rec.709 luminance coefficient for green channel.
pub const REC709_LUMA_G: f32 = 0.7152;

/// Rec.709 luminance coefficient for blue channel.
pub const REC709_LUMA_B: f32 = 0.0722;

/// Rec.709 luminance coefficients as an array [R, G, B].
pub const REC709_LUMA: [f32; 3] = [REC709_LUMA_R, REC709_LUMA_G, REC709_LUMA_B];

/// Calculate Rec.709 luminance from RGB values.
///
/// `Y = 0.2126*R + 0.7152*G + 0.0722*B`
///
/// ```
/// use filmlab_core::luminance_rec709;
/// let luma = luminance_rec709([0.5, 0.3, 0.2]);
/// assert!((luma - 0.3353).abs() < 0.0001);
/// ```
#[inline]
pub fn luminance_rec709(rgb: [f32; 3]) -> f32 {
    REC709_LUMA_R * rgb[0] + REC709_LUMA_G * rgb[1] + REC709_LUMA_B * rgb[2]
}

/// Unweighted channel mean, the "density" proxy used on normalized buffers.
#[inline]
pub fn channel_mean(rgb: [f32; 3]) -> f32 {
    (rgb[0] + rgb[1] + rgb[2]) / 3.0
}

/// Clamps each channel to `[0, 1]`.
#[inline]
pub fn clamp01(rgb: [f32; 3]) -> [f32; 3] {
    [rgb[0].clamp(0.0, 1.0), rgb[1].clamp(0.0, 1.0), rgb[2].clamp(0.0, 1.0)]
}

/// Hermite smoothstep between `edge0` and `edge1`.
#[inline]
pub fn smoothstep(edge0: f32, edge1: f32, x: f32) -> f32 {
    let t = ((x - edge0) / (edge1 - edge0)).clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}
