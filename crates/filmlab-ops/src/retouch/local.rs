//! Local dodge and burn.
//!
//! A stroke is a polyline of normalized points swept by a round brush.
//! Its mask is 1 inside the brush, falls off smoothly across the feather
//! band and can be limited to a luminance range of the unadjusted image.
//! All strokes are summed in stops and applied as a single exposure
//! multiplier per pixel.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::trace;

use filmlab_core::{ColorDomain, ImageBuffer, Rect, smoothstep};

use crate::OpsResult;
use crate::geometry::GeometryTransform;

use super::map_to_frame;

/// One dodge (positive) or burn (negative) stroke.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocalAdjustment {
    /// Normalized `[x, y]` stroke points.
    pub points: Vec<[f32; 2]>,
    /// Brush radius in reference pixels.
    pub radius: f32,
    /// Feather width as a fraction of the radius.
    pub feather: f32,
    /// Exposure change in stops.
    pub strength: f32,
    /// Luminance range `(low, high)` the stroke affects.
    pub luma_range: (f32, f32),
    /// Soft edge of the luminance range; 0 makes it hard.
    pub luma_softness: f32,
}

impl Default for LocalAdjustment {
    fn default() -> Self {
        Self {
            points: Vec::new(),
            radius: 50.0,
            feather: 0.5,
            strength: 0.0,
            luma_range: (0.0, 1.0),
            luma_softness: 0.0,
        }
    }
}

impl LocalAdjustment {
    /// Re-expresses a source-frame stroke in the cropped output frame.
    pub fn to_frame(&self, transform: &GeometryTransform, crop: Rect) -> Self {
        Self {
            points: self.points.iter().map(|p| map_to_frame(transform, crop, *p)).collect(),
            ..self.clone()
        }
    }

    /// Brush mask at pixel distance `d` from the stroke.
    #[inline]
    pub fn brush(&self, d: f32, radius_px: f32) -> f32 {
        let f = self.feather.clamp(0.0, 1.0);
        if f <= 0.0 {
            return if d <= radius_px { 1.0 } else { 0.0 };
        }
        1.0 - smoothstep(radius_px * (1.0 - f / 2.0), radius_px * (1.0 + f / 2.0), d)
    }

    /// Luminance mask for a pixel of luminance `lum`.
    #[inline]
    pub fn luma_mask(&self, lum: f32) -> f32 {
        let (low, high) = self.luma_range;
        let soft = self.luma_softness;
        if soft <= 0.0 {
            return if lum >= low && lum <= high { 1.0 } else { 0.0 };
        }
        let rise = ((lum - (low - soft)) / (soft + 1e-6)).clamp(0.0, 1.0);
        let fall = (((high + soft) - lum) / (soft + 1e-6)).clamp(0.0, 1.0);
        rise * fall
    }

    /// Combined mask at pixel `(px, py)` for a `width x height` frame.
    pub fn mask_at(&self, px: f32, py: f32, lum: f32, width: usize, height: usize, scale: f32) -> f32 {
        if self.points.is_empty() {
            return 0.0;
        }
        let r = (self.radius * scale).max(1.0);
        let pts = self.points.iter().map(|p| (p[0] * width as f32, p[1] * height as f32));
        let d = polyline_distance(pts, px, py);
        let m = self.brush(d, r);
        if m <= 0.0 { 0.0 } else { m * self.luma_mask(lum) }
    }
}

/// Distance from `(px, py)` to the nearest segment of the polyline.
pub fn polyline_distance(points: impl Iterator<Item = (f32, f32)>, px: f32, py: f32) -> f32 {
    let mut best = f32::MAX;
    let mut prev: Option<(f32, f32)> = None;
    for p in points {
        let a = prev.unwrap_or(p);
        best = best.min(segment_distance(a, p, px, py));
        prev = Some(p);
    }
    best
}

fn segment_distance(a: (f32, f32), b: (f32, f32), px: f32, py: f32) -> f32 {
    let (dx, dy) = (b.0 - a.0, b.1 - a.1);
    let len2 = dx * dx + dy * dy;
    let t = if len2 > 0.0 {
        (((px - a.0) * dx + (py - a.1) * dy) / len2).clamp(0.0, 1.0)
    } else {
        0.0
    };
    let (cx, cy) = (a.0 + t * dx, a.1 + t * dy);
    ((px - cx).powi(2) + (py - cy).powi(2)).sqrt()
}

/// Applies all strokes to linear print transmittance.
pub fn apply_local_adjustments(
    buffer: &ImageBuffer,
    adjustments: &[LocalAdjustment],
    scale: f32,
) -> OpsResult<ImageBuffer> {
    buffer.require_domain(ColorDomain::LinearTransmittance)?;
    let active: Vec<&LocalAdjustment> = adjustments
        .iter()
        .filter(|a| a.strength != 0.0 && !a.points.is_empty())
        .collect();
    if active.is_empty() {
        return Ok(buffer.clone());
    }
    let (w, h) = buffer.dimensions();
    trace!(width = w, height = h, strokes = active.len(), "local adjustments");

    let lum = buffer.luminance();
    let mut out = buffer.clone();
    out.data_mut()
        .par_chunks_mut(w * 3)
        .enumerate()
        .for_each(|(y, row)| {
            for x in 0..w {
                let l = lum[y * w + x];
                let stops: f32 = active
                    .iter()
                    .map(|a| a.mask_at(x as f32 + 0.5, y as f32 + 0.5, l, w, h, scale) * a.strength)
                    .sum();
                if stops == 0.0 {
                    continue;
                }
                let gain = stops.exp2();
                for v in &mut row[x * 3..x * 3 + 3] {
                    *v = (*v * gain).clamp(0.0, 1.0);
                }
            }
        });
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stroke(points: Vec<[f32; 2]>, strength: f32) -> LocalAdjustment {
        LocalAdjustment {
            points,
            radius: 4.0,
            feather: 0.0,
            strength,
            ..LocalAdjustment::default()
        }
    }

    #[test]
    fn test_dodge_one_stop() {
        let img = ImageBuffer::filled(40, 40, ColorDomain::LinearTransmittance, [0.2; 3]);
        let out = apply_local_adjustments(&img, &[stroke(vec![[0.5, 0.5]], 1.0)], 1.0).unwrap();
        assert!((out.pixel(20, 20)[0] - 0.4).abs() < 1e-6);
        assert_eq!(out.pixel(0, 0), [0.2; 3]);
    }

    #[test]
    fn test_strokes_accumulate() {
        let img = ImageBuffer::filled(40, 40, ColorDomain::LinearTransmittance, [0.4; 3]);
        let a = stroke(vec![[0.5, 0.5]], -1.0);
        let out = apply_local_adjustments(&img, &[a.clone(), a], 1.0).unwrap();
        assert!((out.pixel(20, 20)[1] - 0.1).abs() < 1e-6);
    }

    #[test]
    fn test_polyline_covers_segment() {
        let img = ImageBuffer::filled(40, 40, ColorDomain::LinearTransmittance, [0.2; 3]);
        let s = stroke(vec![[0.1, 0.5], [0.9, 0.5]], 1.0);
        let out = apply_local_adjustments(&img, &[s], 1.0).unwrap();
        assert!(out.pixel(20, 20)[0] > 0.39);
        assert!(out.pixel(20, 5)[0] < 0.21);
    }

    #[test]
    fn test_feather_is_smooth() {
        let a = LocalAdjustment {
            feather: 0.5,
            ..LocalAdjustment::default()
        };
        assert_eq!(a.brush(0.0, 10.0), 1.0);
        assert_eq!(a.brush(20.0, 10.0), 0.0);
        assert!((a.brush(10.0, 10.0) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_luma_range() {
        let hard = LocalAdjustment {
            luma_range: (0.2, 0.6),
            ..LocalAdjustment::default()
        };
        assert_eq!(hard.luma_mask(0.1), 0.0);
        assert_eq!(hard.luma_mask(0.4), 1.0);
        let soft = LocalAdjustment {
            luma_softness: 0.1,
            ..hard
        };
        assert!(soft.luma_mask(0.15) > 0.0 && soft.luma_mask(0.15) < 1.0);
        assert_eq!(soft.luma_mask(0.9), 0.0);
    }

    #[test]
    fn test_zero_strength_is_identity() {
        let img = ImageBuffer::filled(8, 8, ColorDomain::LinearTransmittance, [0.3; 3]);
        let out = apply_local_adjustments(&img, &[stroke(vec![[0.5, 0.5]], 0.0)], 1.0).unwrap();
        assert_eq!(out, img);
    }

    #[test]
    fn test_yaml_defaults() {
        let a: LocalAdjustment = serde_yaml::from_str("points: [[0.1, 0.2]]\nstrength: -0.5\n").unwrap();
        assert_eq!(a.luma_range, (0.0, 1.0));
        assert_eq!(a.radius, 50.0);
    }
}
