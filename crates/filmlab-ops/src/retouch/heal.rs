//! Manual spot healing.
//!
//! Each pixel inside the spot is rebuilt from the spot's boundary in the
//! direction it lies in, so gradients across the spot survive. A pixel is
//! only replaced where it is brighter than the reconstruction, keyed
//! softly by the luminance difference and faded out near the edge.
//! Uniform regions come back untouched.

use tracing::trace;

use filmlab_core::{ImageBuffer, luminance_rec709, smoothstep};

use super::grain::SpotRng;
use super::{disc_bounds, min_luma_sample};

/// Boundary samples used to estimate the clean background.
pub const BOUNDARY_SAMPLES: usize = 32;

/// Directional samples per healed pixel.
const PIXEL_SAMPLES: usize = 3;

/// Angular jitter of the per-pixel samples, radians.
const ANGLE_JITTER: f32 = 0.15;

/// Luminance excess where keying starts and where it saturates.
const KEY_LOW: f32 = 0.02;
const KEY_HIGH: f32 = 0.08;

/// Background statistics measured on the spot's boundary.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Boundary {
    /// Luminance below which a sample is considered contaminated.
    pub safe_floor: f32,
    /// Mean color of the uncontaminated samples.
    pub safe_mean: [f32; 3],
}

/// Samples the ring just outside `radius`.
pub fn measure_boundary(img: &ImageBuffer, cx: f32, cy: f32, radius: f32) -> Boundary {
    let ring = radius + 1.0;
    let samples: Vec<[f32; 3]> = (0..BOUNDARY_SAMPLES)
        .map(|i| {
            let theta = i as f32 / BOUNDARY_SAMPLES as f32 * std::f32::consts::TAU;
            let sx = (cx + ring * theta.cos()).floor() as isize;
            let sy = (cy + ring * theta.sin()).floor() as isize;
            min_luma_sample(img, sx, sy)
        })
        .collect();

    let mut lumas: Vec<f32> = samples.iter().map(|s| luminance_rec709(*s)).collect();
    lumas.sort_unstable_by(f32::total_cmp);
    let safe_floor = crate::bounds::percentile_sorted(&lumas, 75.0) - 0.05;

    let mut sum = [0.0f32; 3];
    let mut n = 0usize;
    for s in samples.iter().filter(|s| luminance_rec709(**s) >= safe_floor) {
        for c in 0..3 {
            sum[c] += s[c];
        }
        n += 1;
    }
    // the 75th percentile sample always passes its own floor
    let safe_mean = sum.map(|v| v / n.max(1) as f32);
    Boundary { safe_floor, safe_mean }
}

/// Heals one manual spot of pixel `radius` centered at `(cx, cy)`.
pub fn heal_manual(mut img: ImageBuffer, cx: f32, cy: f32, radius: f32, rng: &mut SpotRng) -> ImageBuffer {
    let (w, h) = img.dimensions();
    let Some(area) = disc_bounds(cx, cy, radius, w, h) else {
        return img;
    };
    trace!(cx, cy, radius, "heal_manual");

    let boundary = measure_boundary(&img, cx, cy, radius);
    let ring = radius + 1.0;

    let mut patch = Vec::new();
    for y in area.y..area.bottom() {
        for x in area.x..area.right() {
            let px = x as f32 + 0.5 - cx;
            let py = y as f32 + 0.5 - cy;
            let d = (px * px + py * py).sqrt();
            if d >= radius {
                continue;
            }
            let theta = py.atan2(px);

            let mut rec = [0.0f32; 3];
            for _ in 0..PIXEL_SAMPLES {
                let t = theta + rng.jitter(ANGLE_JITTER);
                let sx = (cx + ring * t.cos()).floor() as isize;
                let sy = (cy + ring * t.sin()).floor() as isize;
                let mut s = min_luma_sample(&img, sx, sy);
                if luminance_rec709(s) < boundary.safe_floor {
                    s = boundary.safe_mean;
                }
                for c in 0..3 {
                    rec[c] += s[c];
                }
            }
            let rec = rec.map(|v| v / PIXEL_SAMPLES as f32);

            let cur = img.pixel(x, y);
            let excess = luminance_rec709(cur) - luminance_rec709(rec);
            let key = smoothstep(KEY_LOW, KEY_HIGH, excess) * (1.0 - smoothstep(0.8 * radius, radius, d));
            if key <= 0.0 {
                continue;
            }
            let out: [f32; 3] = std::array::from_fn(|c| cur[c] + (rec[c] - cur[c]) * key);
            patch.push((x, y, out));
        }
    }
    for (x, y, rgb) in patch {
        img.set_pixel(x, y, rgb);
    }
    img
}

#[cfg(test)]
mod tests {
    use super::*;
    use filmlab_core::ColorDomain;

    #[test]
    fn test_uniform_is_noop() {
        let img = ImageBuffer::filled(32, 32, ColorDomain::LinearTransmittance, [0.3, 0.4, 0.5]);
        let mut rng = SpotRng::for_spot(0, 0.5, 0.5);
        let out = heal_manual(img.clone(), 16.0, 16.0, 5.0, &mut rng);
        assert_eq!(out, img);
    }

    #[test]
    fn test_bright_spot_replaced() {
        let mut img = ImageBuffer::filled(32, 32, ColorDomain::LinearTransmittance, [0.3; 3]);
        for y in 15..17 {
            for x in 15..17 {
                img.set_pixel(x, y, [0.9; 3]);
            }
        }
        let mut rng = SpotRng::for_spot(7, 0.5, 0.5);
        let out = heal_manual(img, 16.0, 16.0, 5.0, &mut rng);
        for y in 15..17 {
            for x in 15..17 {
                assert!((out.pixel(x, y)[0] - 0.3).abs() < 1e-5);
            }
        }
    }

    #[test]
    fn test_dark_pixels_kept() {
        // only brighter-than-background defects are healed
        let mut img = ImageBuffer::filled(32, 32, ColorDomain::LinearTransmittance, [0.5; 3]);
        img.set_pixel(16, 16, [0.1; 3]);
        let mut rng = SpotRng::for_spot(0, 0.5, 0.5);
        let out = heal_manual(img, 16.5, 16.5, 4.0, &mut rng);
        assert_eq!(out.pixel(16, 16), [0.1; 3]);
    }

    #[test]
    fn test_boundary_rejects_contamination() {
        // a dark patch on part of the ring is excluded from the safe mean
        let img = ImageBuffer::from_fn(40, 40, ColorDomain::LinearTransmittance, |x, _| {
            if x < 12 { [0.05; 3] } else { [0.6; 3] }
        });
        let b = measure_boundary(&img, 20.0, 20.0, 8.0);
        assert!((b.safe_mean[0] - 0.6).abs() < 1e-5);
        assert!(b.safe_floor > 0.5);
    }

    #[test]
    fn test_off_frame_spot() {
        let img = ImageBuffer::filled(8, 8, ColorDomain::LinearTransmittance, [0.5; 3]);
        let mut rng = SpotRng::for_spot(0, 2.0, 2.0);
        let out = heal_manual(img.clone(), 40.0, 40.0, 3.0, &mut rng);
        assert_eq!(out, img);
    }
}
