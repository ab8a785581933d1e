//! Geometric correction: quadrant rotation, fine rotation, flips.
//!
//! The transform is evaluated by inverse mapping. For every output pixel the
//! source position is found by undoing the flips, then the fine rotation
//! about the frame center, then the 90 degree step; the source is then
//! bilinearly sampled with edge-clamped reads.
//!
//! All math is done in pixel units relative to the frame center, so pure
//! quadrant rotations land exactly on source pixel centers and are lossless.
//!
//! # Example
//!
//! ```rust
//! use filmlab_core::{ColorDomain, ImageBuffer};
//! use filmlab_ops::geometry::GeometryTransform;
//!
//! let src = ImageBuffer::from_fn(4, 2, ColorDomain::LinearTransmittance, |x, y| {
//!     [x as f32, y as f32, 0.0]
//! });
//! let t = GeometryTransform::new(1, 0.0, false, false, 4, 2);
//! let rotated = t.apply(&src).unwrap();
//! assert_eq!(rotated.dimensions(), (2, 4));
//! ```

use tracing::trace;

use filmlab_core::{ImageBuffer, Rect};

use crate::autocrop::{self, AutocropParams};
use crate::settings::GeometrySettings;
use crate::{OpsError, OpsResult};

/// Resolved geometry for one source frame size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeometryTransform {
    quadrants: u8,
    fine_degrees: f32,
    cos: f32,
    sin: f32,
    flip_h: bool,
    flip_v: bool,
    src_w: usize,
    src_h: usize,
}

impl GeometryTransform {
    /// Builds a transform. `quadrants` counts counter-clockwise 90 degree
    /// steps and is taken modulo 4; positive `fine_degrees` also rotates
    /// counter-clockwise.
    pub fn new(quadrants: i32, fine_degrees: f32, flip_h: bool, flip_v: bool, src_w: usize, src_h: usize) -> Self {
        let rad = fine_degrees.to_radians();
        Self {
            quadrants: quadrants.rem_euclid(4) as u8,
            fine_degrees,
            cos: rad.cos(),
            sin: rad.sin(),
            flip_h,
            flip_v,
            src_w,
            src_h,
        }
    }

    /// Transform described by `settings` for a `src_w x src_h` frame.
    pub fn from_settings(settings: &GeometrySettings, src_w: usize, src_h: usize) -> Self {
        Self::new(
            settings.rotation,
            settings.fine_rotation,
            settings.flip_horizontal,
            settings.flip_vertical,
            src_w,
            src_h,
        )
    }

    /// Quadrant count in `0..4`.
    pub fn quadrants(&self) -> u8 {
        self.quadrants
    }

    /// `true` when the transform leaves every pixel in place.
    pub fn is_identity(&self) -> bool {
        self.quadrants == 0 && self.fine_degrees == 0.0 && !self.flip_h && !self.flip_v
    }

    /// Source frame size.
    pub fn source_size(&self) -> (usize, usize) {
        (self.src_w, self.src_h)
    }

    /// Output frame size; odd quadrant counts swap the axes.
    pub fn output_size(&self) -> (usize, usize) {
        if self.quadrants % 2 == 1 {
            (self.src_h, self.src_w)
        } else {
            (self.src_w, self.src_h)
        }
    }

    /// Output-space position (pixel units, pixel centers at `i + 0.5`) to
    /// source-space position.
    pub fn inverse(&self, u: f32, v: f32) -> (f32, f32) {
        let (ow, oh) = self.output_size();
        let mut x = u - ow as f32 * 0.5;
        let mut y = v - oh as f32 * 0.5;

        if self.flip_h {
            x = -x;
        }
        if self.flip_v {
            y = -y;
        }
        if self.fine_degrees != 0.0 {
            let (c, s) = (self.cos, self.sin);
            (x, y) = (c * x - s * y, s * x + c * y);
        }
        let (sx, sy) = match self.quadrants {
            1 => (-y, x),
            2 => (-x, -y),
            3 => (y, -x),
            _ => (x, y),
        };
        (sx + self.src_w as f32 * 0.5, sy + self.src_h as f32 * 0.5)
    }

    /// Source-space position to output-space position (pixel units).
    pub fn forward(&self, u: f32, v: f32) -> (f32, f32) {
        let sx = u - self.src_w as f32 * 0.5;
        let sy = v - self.src_h as f32 * 0.5;

        let (mut x, mut y) = match self.quadrants {
            1 => (sy, -sx),
            2 => (-sx, -sy),
            3 => (-sy, sx),
            _ => (sx, sy),
        };
        if self.fine_degrees != 0.0 {
            let (c, s) = (self.cos, self.sin);
            (x, y) = (c * x + s * y, -s * x + c * y);
        }
        if self.flip_h {
            x = -x;
        }
        if self.flip_v {
            y = -y;
        }
        let (ow, oh) = self.output_size();
        (x + ow as f32 * 0.5, y + oh as f32 * 0.5)
    }

    /// Normalized source coordinates to normalized output coordinates.
    ///
    /// Points rotated off the frame by fine rotation fall outside `[0, 1]`;
    /// callers clamp when they need an on-frame position.
    pub fn forward_point(&self, nx: f32, ny: f32) -> (f32, f32) {
        let (u, v) = self.forward(nx * self.src_w as f32, ny * self.src_h as f32);
        let (ow, oh) = self.output_size();
        (u / ow.max(1) as f32, v / oh.max(1) as f32)
    }

    /// Normalized output coordinates to normalized source coordinates.
    pub fn inverse_point(&self, nx: f32, ny: f32) -> (f32, f32) {
        let (ow, oh) = self.output_size();
        let (u, v) = self.inverse(nx * ow as f32, ny * oh as f32);
        (u / self.src_w.max(1) as f32, v / self.src_h.max(1) as f32)
    }

    /// Resamples `src` into output space.
    pub fn apply(&self, src: &ImageBuffer) -> OpsResult<ImageBuffer> {
        if src.dimensions() != (self.src_w, self.src_h) {
            return Err(OpsError::SizeMismatch(format!(
                "transform built for {}x{}, got {}x{}",
                self.src_w,
                self.src_h,
                src.width(),
                src.height()
            )));
        }
        trace!(
            width = src.width(),
            height = src.height(),
            quadrants = self.quadrants,
            fine = self.fine_degrees,
            flip_h = self.flip_h,
            flip_v = self.flip_v,
            "geometry"
        );
        if self.is_identity() {
            return Ok(src.clone());
        }

        let (ow, oh) = self.output_size();
        Ok(ImageBuffer::from_fn(ow, oh, src.domain(), |x, y| {
            let (su, sv) = self.inverse(x as f32 + 0.5, y as f32 + 0.5);
            sample_bilinear(src, su - 0.5, sv - 0.5)
        }))
    }
}

/// Bilinear sample at continuous pixel-index coordinates, edge clamped.
pub fn sample_bilinear(src: &ImageBuffer, fx: f32, fy: f32) -> [f32; 3] {
    let x0 = fx.floor();
    let y0 = fy.floor();
    let tx = fx - x0;
    let ty = fy - y0;
    let (ix, iy) = (x0 as isize, y0 as isize);

    let p00 = src.pixel_clamped(ix, iy);
    if tx == 0.0 && ty == 0.0 {
        return p00;
    }
    let p10 = src.pixel_clamped(ix + 1, iy);
    let p01 = src.pixel_clamped(ix, iy + 1);
    let p11 = src.pixel_clamped(ix + 1, iy + 1);
    std::array::from_fn(|c| {
        let top = p00[c] + (p10[c] - p00[c]) * tx;
        let bottom = p01[c] + (p11[c] - p01[c]) * tx;
        top + (bottom - top) * ty
    })
}

/// Crop rectangle for a geometry-corrected frame.
///
/// Precedence: `keep_full_frame`, then a manual crop (normalized, output
/// space), then autocrop, then the full frame. `scale` converts the
/// pixel-sized offset to this resolution.
pub fn resolve_crop(transformed: &ImageBuffer, settings: &GeometrySettings, scale: f32) -> OpsResult<Rect> {
    let (w, h) = transformed.dimensions();
    let full = transformed.bounds();
    if settings.keep_full_frame {
        return Ok(full);
    }
    if let Some(norm) = settings.manual_crop {
        let rect = Rect::from_normalized(norm, w, h);
        let margin = settings.autocrop_offset * scale;
        return Ok(rect.inset(margin, w, h).unwrap_or(full));
    }
    if settings.autocrop {
        let params = AutocropParams {
            offset: settings.autocrop_offset,
            scale,
            ratio: settings.autocrop_ratio.parse()?,
            assist_luma: settings.autocrop_assist_luma,
        };
        return Ok(autocrop::detect_crop(transformed, &params));
    }
    Ok(full)
}

#[cfg(test)]
mod tests {
    use super::*;
    use filmlab_core::ColorDomain;

    fn ramp(w: usize, h: usize) -> ImageBuffer {
        ImageBuffer::from_fn(w, h, ColorDomain::LinearTransmittance, |x, y| {
            [x as f32 / w as f32, y as f32 / h as f32, ((x * 31 + y * 17) % 11) as f32 / 11.0]
        })
    }

    #[test]
    fn test_identity_is_exact() {
        let src = ramp(7, 5);
        let t = GeometryTransform::new(0, 0.0, false, false, 7, 5);
        assert!(t.is_identity());
        assert_eq!(t.apply(&src).unwrap(), src);
    }

    #[test]
    fn test_quadrant_round_trip() {
        let src = ramp(6, 4);
        for k in 1..4 {
            let t = GeometryTransform::new(k, 0.0, false, false, 6, 4);
            let rotated = t.apply(&src).unwrap();
            let (rw, rh) = rotated.dimensions();
            let back = GeometryTransform::new(4 - k, 0.0, false, false, rw, rh)
                .apply(&rotated)
                .unwrap();
            assert_eq!(back, src, "k = {k}");
        }
    }

    #[test]
    fn test_quarter_turn_is_counter_clockwise() {
        let src = ramp(4, 2);
        let t = GeometryTransform::new(1, 0.0, false, false, 4, 2);
        let out = t.apply(&src).unwrap();
        assert_eq!(out.dimensions(), (2, 4));
        // top-right source pixel ends up top-left
        assert_eq!(out.pixel(0, 0), src.pixel(3, 0));
        assert_eq!(out.pixel(1, 3), src.pixel(0, 1));
    }

    #[test]
    fn test_flips() {
        let src = ramp(5, 3);
        let h = GeometryTransform::new(0, 0.0, true, false, 5, 3).apply(&src).unwrap();
        assert_eq!(h.pixel(0, 1), src.pixel(4, 1));
        let v = GeometryTransform::new(0, 0.0, false, true, 5, 3).apply(&src).unwrap();
        assert_eq!(v.pixel(2, 0), src.pixel(2, 2));
    }

    #[test]
    fn test_point_mapping_round_trip() {
        let t = GeometryTransform::new(3, 2.5, true, false, 300, 200);
        for &(nx, ny) in &[(0.5, 0.5), (0.1, 0.9), (0.75, 0.2)] {
            let (ox, oy) = t.forward_point(nx, ny);
            let (bx, by) = t.inverse_point(ox, oy);
            assert!((bx - nx).abs() < 1e-4 && (by - ny).abs() < 1e-4);
        }
        // center is fixed
        let (cx, cy) = t.forward_point(0.5, 0.5);
        assert!((cx - 0.5).abs() < 1e-5 && (cy - 0.5).abs() < 1e-5);
    }

    #[test]
    fn test_fine_rotation_edge_clamped() {
        let src = ImageBuffer::filled(16, 16, ColorDomain::LinearTransmittance, [0.4, 0.5, 0.6]);
        let out = GeometryTransform::new(0, 10.0, false, false, 16, 16).apply(&src).unwrap();
        // no transparency or black corners on a flat frame
        for p in out.pixels() {
            assert!((p[0] - 0.4).abs() < 1e-5 && (p[2] - 0.6).abs() < 1e-5);
        }
    }

    #[test]
    fn test_size_mismatch() {
        let t = GeometryTransform::new(1, 0.0, false, false, 4, 4);
        assert!(t.apply(&ramp(5, 4)).is_err());
    }

    #[test]
    fn test_resolve_crop_precedence() {
        let img = ImageBuffer::filled(100, 80, ColorDomain::LinearTransmittance, [0.3; 3]);
        let mut s = GeometrySettings {
            keep_full_frame: true,
            manual_crop: Some([0.1, 0.1, 0.9, 0.9]),
            ..GeometrySettings::default()
        };
        assert_eq!(resolve_crop(&img, &s, 1.0).unwrap(), img.bounds());

        s.keep_full_frame = false;
        s.autocrop_offset = 0.0;
        assert_eq!(resolve_crop(&img, &s, 1.0).unwrap(), Rect::new(10, 8, 80, 64));
    }
}
