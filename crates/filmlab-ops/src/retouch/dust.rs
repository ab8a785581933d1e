//! Automatic dust detection and healing.
//!
//! Detection is a statistical gate on luminance. For each pixel:
//!
//! - a narrow window (about 1.5x the dust footprint) gives the local mean
//!   and deviation used for the z-score;
//! - a wide ring (out to about 4x the footprint, narrow window excluded)
//!   measures surrounding texture, and its `std^3` raises the threshold so
//!   grain and fine detail are not mistaken for dust;
//! - a candidate must be a strict 3x3 maximum of absolute deviation, unless
//!   the deviation is so large it is accepted outright (flat-topped hairs
//!   and scratches fail the strict-maximum test).
//!
//! Neighboring candidates are merged greedily, strongest first.
//!
//! Healing replaces the footprint with the mean of 3x3-minimum samples
//! taken at random angles outside the spot, blended with a cubic falloff
//! and re-grained to the measured local noise.

use rayon::prelude::*;
use tracing::{debug, trace};

use filmlab_core::{EPSILON, ImageBuffer, luminance_rec709};

use super::grain::SpotRng;
use super::{RetouchSpot, disc_bounds, min_luma_sample};
use crate::filter::IntegralImage;
use crate::settings::DEFAULT_RENDER_SIZE_REF;

/// Angles sampled around an automatic spot.
pub const PERIMETER_ANGLES: usize = 8;

/// Dust detector configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DustConfig {
    /// Higher finds fainter dust.
    pub sensitivity: f32,
    /// Typical dust diameter in reference pixels.
    pub dust_size: f32,
    /// Resolution scale (`long_edge / render_size_ref`).
    pub scale: f32,
    /// Base z-score threshold at sensitivity 1.
    pub z_threshold: f32,
    /// Gain applied to `std_wide^3` when raising the threshold.
    pub texture_gain: f32,
    /// Absolute deviation accepted without the local-maximum test.
    pub strong_signal: f32,
}

impl Default for DustConfig {
    fn default() -> Self {
        Self {
            sensitivity: 1.0,
            dust_size: 3.0,
            scale: 1.0,
            z_threshold: 3.0,
            texture_gain: 2.0e4,
            strong_signal: 0.25,
        }
    }
}

impl DustConfig {
    /// Defaults with the given sensitivity and resolution scale.
    pub fn new(sensitivity: f32, scale: f32) -> Self {
        Self {
            sensitivity,
            scale,
            ..Self::default()
        }
    }

    /// Dust footprint radius in pixels at this resolution.
    pub fn footprint(&self) -> f32 {
        (self.dust_size * self.scale).max(1.0)
    }

    /// Half-size of the spike-statistics window.
    pub fn narrow_radius(&self) -> usize {
        ((1.5 * self.footprint()).ceil() as usize).max(2)
    }

    /// Outer radius of the texture ring.
    pub fn wide_radius(&self) -> usize {
        ((4.0 * self.footprint()).ceil() as usize).max(self.narrow_radius() + 2)
    }

    /// z-score a pixel must exceed given the ring's texture.
    pub fn threshold(&self, wide_std: f32) -> f32 {
        self.z_threshold / self.sensitivity.max(EPSILON) + wide_std.powi(3) * self.texture_gain
    }
}

/// One detected dust spot. Lives only for one detection pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DustCandidate {
    /// Pixel of strongest deviation.
    pub location: (usize, usize),
    /// Radius covering the merged cluster, in pixels.
    pub footprint: f32,
    /// Narrow-window mean luminance.
    pub local_mean: f32,
    /// Narrow-window luminance deviation.
    pub local_std: f32,
    pub z_score: f32,
}

impl DustCandidate {
    /// Heal radius in pixels: the footprint plus an equal feather ring.
    pub fn heal_radius(&self) -> f32 {
        2.0 * self.footprint + 1.0
    }

    /// Canonical automatic spot for a `width x height` frame.
    pub fn to_spot(&self, width: usize, height: usize) -> RetouchSpot {
        let (x, y) = self.location;
        RetouchSpot::automatic(
            [(x as f32 + 0.5) / width as f32, (y as f32 + 0.5) / height as f32],
            self.heal_radius() / width.max(height) as f32,
        )
    }
}

/// Detects dust with default settings at the buffer's own scale.
pub fn detect_dust(buffer: &ImageBuffer, sensitivity: f32) -> Vec<DustCandidate> {
    let scale = buffer.long_edge() as f32 / DEFAULT_RENDER_SIZE_REF;
    detect_dust_with(buffer, &DustConfig::new(sensitivity, scale))
}

/// Detects dust with explicit settings.
pub fn detect_dust_with(buffer: &ImageBuffer, config: &DustConfig) -> Vec<DustCandidate> {
    let (w, h) = buffer.dimensions();
    let rn = config.narrow_radius();
    let rw = config.wide_radius();
    trace!(width = w, height = h, narrow = rn, wide = rw, sensitivity = config.sensitivity, "detect_dust");

    let lum = buffer.luminance();
    let integral = IntegralImage::new(&lum, w, h);

    let mut dev = vec![0.0f32; w * h];
    dev.par_chunks_mut(w).enumerate().for_each(|(y, row)| {
        for (x, d) in row.iter_mut().enumerate() {
            let (mean, _) = integral.mean_std(x, y, rn);
            *d = (lum[y * w + x] - mean).abs();
        }
    });

    let mut raw: Vec<DustCandidate> = (0..h)
        .into_par_iter()
        .flat_map_iter(|y| {
            let dev = &dev;
            let integral = &integral;
            (0..w).filter_map(move |x| {
                let d = dev[y * w + x];
                if d < EPSILON {
                    return None;
                }
                let (mean, std) = integral.mean_std(x, y, rn);
                let z = d / std.max(1e-3);
                let (_, wide_std) = integral.annulus_mean_std(x, y, rn, rw);
                if z <= config.threshold(wide_std) {
                    return None;
                }
                if d <= config.strong_signal && !is_strict_peak(dev, w, h, x, y) {
                    return None;
                }
                Some(DustCandidate {
                    location: (x, y),
                    footprint: config.footprint(),
                    local_mean: mean,
                    local_std: std,
                    z_score: z,
                })
            })
        })
        .collect();

    raw.sort_by(|a, b| b.z_score.total_cmp(&a.z_score).then(a.location.cmp(&b.location)));
    let merged = merge_candidates(raw, config.footprint());
    debug!(candidates = merged.len(), "dust");
    merged
}

fn is_strict_peak(dev: &[f32], w: usize, h: usize, x: usize, y: usize) -> bool {
    let center = dev[y * w + x];
    for dy in -1isize..=1 {
        for dx in -1isize..=1 {
            if dx == 0 && dy == 0 {
                continue;
            }
            let nx = x as isize + dx;
            let ny = y as isize + dy;
            if nx < 0 || ny < 0 || nx >= w as isize || ny >= h as isize {
                continue;
            }
            if dev[ny as usize * w + nx as usize] >= center {
                return false;
            }
        }
    }
    true
}

/// Greedy clustering: a candidate within reach of an existing cluster grows
/// that cluster, otherwise it starts a new one.
fn merge_candidates(sorted: Vec<DustCandidate>, footprint: f32) -> Vec<DustCandidate> {
    let mut clusters: Vec<DustCandidate> = Vec::new();
    for cand in sorted {
        let (x, y) = cand.location;
        let hit = clusters.iter_mut().find(|c| {
            let dx = c.location.0 as f32 - x as f32;
            let dy = c.location.1 as f32 - y as f32;
            (dx * dx + dy * dy).sqrt() <= c.footprint + footprint
        });
        match hit {
            Some(c) => {
                let dx = c.location.0 as f32 - x as f32;
                let dy = c.location.1 as f32 - y as f32;
                c.footprint = c.footprint.max((dx * dx + dy * dy).sqrt() + footprint);
            }
            None => clusters.push(cand),
        }
    }
    clusters
}

/// Heals one automatic spot of pixel `radius` centered at `(cx, cy)`.
pub fn heal_spot(mut img: ImageBuffer, cx: f32, cy: f32, radius: f32, rng: &mut SpotRng) -> ImageBuffer {
    let (w, h) = img.dimensions();
    let Some(area) = disc_bounds(cx, cy, radius, w, h) else {
        return img;
    };

    // background from outside the spot only
    let mut rec = [0.0f32; 3];
    let mut ring_luma = [0.0f32; PERIMETER_ANGLES];
    for l in ring_luma.iter_mut() {
        let theta = rng.angle();
        let dist = radius + 1.0 + rng.unit() * radius * 0.5;
        let sx = (cx + dist * theta.cos()).floor() as isize;
        let sy = (cy + dist * theta.sin()).floor() as isize;
        let s = min_luma_sample(&img, sx, sy);
        for c in 0..3 {
            rec[c] += s[c];
        }
        *l = luminance_rec709(img.pixel_clamped(sx, sy));
    }
    let rec = rec.map(|v| v / PERIMETER_ANGLES as f32);
    let ring_mean = ring_luma.iter().sum::<f32>() / PERIMETER_ANGLES as f32;
    let noise = (ring_luma.iter().map(|l| (l - ring_mean).powi(2)).sum::<f32>() / PERIMETER_ANGLES as f32).sqrt();

    let core = radius * 0.5;
    let mut patch = Vec::with_capacity(area.area());
    for y in area.y..area.bottom() {
        for x in area.x..area.right() {
            let d = ((x as f32 + 0.5 - cx).powi(2) + (y as f32 + 0.5 - cy).powi(2)).sqrt();
            if d >= radius {
                continue;
            }
            let alpha = if d <= core {
                1.0
            } else {
                (1.0 - (d - core) / (radius - core)).powi(3)
            };
            let grain = if noise > 0.0 { rng.gaussian() * noise } else { 0.0 };
            let cur = img.pixel(x, y);
            let out: [f32; 3] = std::array::from_fn(|c| {
                let target = (rec[c] + grain).clamp(0.0, 1.0);
                cur[c] + (target - cur[c]) * alpha
            });
            patch.push((x, y, out));
        }
    }
    for (x, y, rgb) in patch {
        img.set_pixel(x, y, rgb);
    }
    img
}
