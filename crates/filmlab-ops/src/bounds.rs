//! Per-channel log-domain bounds.
//!
//! The film base and the densest image area set the usable density range
//! of each channel. Analysis takes two percentiles of `log10(transmittance)`
//! per channel, ignoring an outer margin of the frame. Which percentile
//! becomes the floor depends on polarity: negatives use `(0.5, 99.5)`,
//! slides use `(99.9, 0.01)`, so in both cases the scene highlight maps to
//! 0 after normalization.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use filmlab_core::{EPSILON, ImageBuffer, Polarity, ProcessMode, Rect};

use crate::OpsResult;

/// Fixed density range used for slides when `e6_normalize` is off.
pub const E6_FIXED_RANGE: f32 = 3.0;

/// Largest analysis margin fraction.
pub const MAX_MARGIN: f32 = 0.3;

/// Per-channel normalization floor and ceiling in `log10` units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChannelBounds {
    /// Values mapped to 0.
    pub floors: [f32; 3],
    /// Values mapped to 1.
    pub ceils: [f32; 3],
}

impl Default for ChannelBounds {
    /// Full 0..-3 density range for every channel.
    fn default() -> Self {
        Self {
            floors: [0.0; 3],
            ceils: [-E6_FIXED_RANGE; 3],
        }
    }
}

impl ChannelBounds {
    /// Bounds from floors and ceilings.
    pub fn new(floors: [f32; 3], ceils: [f32; 3]) -> Self {
        Self { floors, ceils }
    }

    /// `ceil - floor` for channel `c`, never closer to zero than epsilon.
    /// A near-zero spread keeps the sign of the raw difference (zero counts
    /// as positive).
    #[inline]
    pub fn spread(&self, c: usize) -> f32 {
        let delta = self.ceils[c] - self.floors[c];
        if delta.abs() < EPSILON {
            if delta >= 0.0 { EPSILON } else { -EPSILON }
        } else {
            delta
        }
    }

    /// Adds the white point offset to every floor and the black point offset
    /// to every ceiling.
    pub fn with_offsets(mut self, white_point: f32, black_point: f32) -> Self {
        for c in 0..3 {
            self.floors[c] += white_point;
            self.ceils[c] += black_point;
        }
        self
    }

    /// `true` when every value is finite.
    pub fn is_finite(&self) -> bool {
        self.floors.iter().chain(self.ceils.iter()).all(|v| v.is_finite())
    }
}

/// Bounds analysis options.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundsConfig {
    /// Film process; selects the percentile direction.
    pub mode: ProcessMode,
    /// Fraction of each edge excluded from statistics, clamped to `[0, 0.3]`.
    pub margin: f32,
    /// Percentiles for negatives as `(floor, ceil)`.
    pub negative_percentiles: (f32, f32),
    /// Percentiles for slides as `(floor, ceil)`.
    pub positive_percentiles: (f32, f32),
    /// When false, slide ceilings sit a fixed range below the floor.
    pub e6_normalize: bool,
    /// Restricts analysis to a region before the margin is applied.
    pub region: Option<Rect>,
}

impl BoundsConfig {
    /// Defaults for `mode` with the given margin.
    pub fn new(mode: ProcessMode, margin: f32) -> Self {
        Self {
            mode,
            margin,
            negative_percentiles: (0.5, 99.5),
            positive_percentiles: (99.9, 0.01),
            e6_normalize: true,
            region: None,
        }
    }

    /// Percentile pair in effect for the configured mode.
    pub fn percentiles(&self) -> (f32, f32) {
        match self.mode.polarity() {
            Polarity::Negative => self.negative_percentiles,
            Polarity::Positive => self.positive_percentiles,
        }
    }
}

/// Analyzes `buffer` (linear transmittance) with default percentiles.
pub fn analyze_bounds(buffer: &ImageBuffer, mode: ProcessMode, margin: f32) -> OpsResult<ChannelBounds> {
    analyze_bounds_with(buffer, &BoundsConfig::new(mode, margin))
}

/// Analyzes `buffer` (linear transmittance) with explicit options.
pub fn analyze_bounds_with(buffer: &ImageBuffer, config: &BoundsConfig) -> OpsResult<ChannelBounds> {
    let region = match config.region {
        Some(r) => r.clamp_to(buffer.width(), buffer.height()).unwrap_or(buffer.bounds()),
        None => buffer.bounds(),
    };
    let region = analysis_region(region, config.margin);
    trace!(
        width = buffer.width(),
        height = buffer.height(),
        mode = %config.mode,
        %region,
        "analyze_bounds"
    );

    let (p_floor, p_ceil) = config.percentiles();
    let mut floors = [0.0f32; 3];
    let mut ceils = [0.0f32; 3];
    for c in 0..3 {
        let mut samples = log_channel(buffer, region, c);
        samples.par_sort_unstable_by(f32::total_cmp);
        floors[c] = percentile_sorted(&samples, p_floor);
        ceils[c] = if config.mode.polarity() == Polarity::Positive && !config.e6_normalize {
            floors[c] - E6_FIXED_RANGE
        } else {
            percentile_sorted(&samples, p_ceil)
        };
    }

    let bounds = ChannelBounds { floors, ceils };
    debug!(floors = ?bounds.floors, ceils = ?bounds.ceils, "bounds");
    Ok(bounds)
}

/// `region` minus `margin` of its height and width on each side. Falls back
/// to the whole region when the margin leaves nothing.
pub fn analysis_region(region: Rect, margin: f32) -> Rect {
    let m = margin.clamp(0.0, MAX_MARGIN);
    let my = (region.height as f32 * m) as usize;
    let mx = (region.width as f32 * m) as usize;
    if region.height <= 2 * my || region.width <= 2 * mx {
        return region;
    }
    Rect::new(region.x + mx, region.y + my, region.width - 2 * mx, region.height - 2 * my)
}

fn log_channel(buffer: &ImageBuffer, region: Rect, c: usize) -> Vec<f32> {
    (region.y..region.bottom())
        .into_par_iter()
        .flat_map_iter(|y| {
            let row = buffer.row(y);
            (region.x..region.right()).map(move |x| row[x * 3 + c].clamp(EPSILON, 1.0).log10())
        })
        .collect()
}

/// Percentile `p` (0..100) of sorted samples with linear interpolation
/// between closest ranks.
pub fn percentile_sorted(sorted: &[f32], p: f32) -> f32 {
    match sorted.len() {
        0 => 0.0,
        1 => sorted[0],
        n => {
            let rank = (p.clamp(0.0, 100.0) / 100.0) * (n - 1) as f32;
            let lo = rank.floor() as usize;
            let hi = (lo + 1).min(n - 1);
            let t = rank - lo as f32;
            sorted[lo] + (sorted[hi] - sorted[lo]) * t
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use filmlab_core::ColorDomain;

    fn gradient(w: usize, h: usize) -> ImageBuffer {
        ImageBuffer::from_fn(w, h, ColorDomain::LinearTransmittance, |x, _| {
            let t = 0.05 + 0.9 * x as f32 / (w - 1) as f32;
            [t, t * 0.8, t * 0.5]
        })
    }

    #[test]
    fn test_percentile_linear() {
        let s = [1.0, 2.0, 3.0, 4.0, 5.0];
        assert_eq!(percentile_sorted(&s, 0.0), 1.0);
        assert_eq!(percentile_sorted(&s, 100.0), 5.0);
        assert!((percentile_sorted(&s, 50.0) - 3.0).abs() < 1e-6);
        assert!((percentile_sorted(&s, 12.5) - 1.5).abs() < 1e-6);
        assert_eq!(percentile_sorted(&[], 50.0), 0.0);
    }

    #[test]
    fn test_spread_epsilon_keeps_sign() {
        let b = ChannelBounds::new([-0.5, 0.0, -1.0], [-0.5, 0.0, -1.0 - 1e-8]);
        assert_eq!(b.spread(0), EPSILON);
        assert_eq!(b.spread(1), EPSILON);
        let neg = ChannelBounds::new([0.0; 3], [-5e-7; 3]);
        assert_eq!(neg.spread(0), -EPSILON);
        assert!((ChannelBounds::default().spread(2) + 3.0).abs() < 1e-6);
    }

    #[test]
    fn test_negative_floor_below_ceil() {
        let b = analyze_bounds(&gradient(64, 8), ProcessMode::C41, 0.0).unwrap();
        for c in 0..3 {
            assert!(b.floors[c] < b.ceils[c]);
        }
        assert!(b.is_finite());
    }

    #[test]
    fn test_positive_direction_reversed() {
        let b = analyze_bounds(&gradient(64, 8), ProcessMode::E6, 0.0).unwrap();
        for c in 0..3 {
            assert!(b.floors[c] > b.ceils[c]);
        }
    }

    #[test]
    fn test_e6_fixed_range() {
        let mut cfg = BoundsConfig::new(ProcessMode::E6, 0.05);
        cfg.e6_normalize = false;
        let b = analyze_bounds_with(&gradient(64, 8), &cfg).unwrap();
        for c in 0..3 {
            assert!((b.floors[c] - b.ceils[c] - 3.0).abs() < 1e-5);
        }
    }

    #[test]
    fn test_margin_excludes_border() {
        // dark border, flat interior
        let img = ImageBuffer::from_fn(100, 100, ColorDomain::LinearTransmittance, |x, y| {
            if x < 10 || y < 10 || x >= 90 || y >= 90 { [0.001; 3] } else { [0.5; 3] }
        });
        let b = analyze_bounds(&img, ProcessMode::C41, 0.1).unwrap();
        assert!((b.floors[0] - 0.5f32.log10()).abs() < 1e-5);
        assert!((b.ceils[0] - 0.5f32.log10()).abs() < 1e-5);
        // margin is capped at 0.3
        assert_eq!(analysis_region(Rect::from_size(100, 100), 0.9), Rect::new(30, 30, 40, 40));
    }

    #[test]
    fn test_offsets() {
        let b = ChannelBounds::new([-0.8; 3], [-0.2; 3]).with_offsets(0.1, -0.05);
        assert!((b.floors[1] + 0.7).abs() < 1e-6);
        assert!((b.ceils[1] + 0.25).abs() < 1e-6);
    }

    #[test]
    fn test_zero_input_is_finite() {
        let img = ImageBuffer::filled(8, 8, ColorDomain::LinearTransmittance, [0.0; 3]);
        let b = analyze_bounds(&img, ProcessMode::Bw, 0.0).unwrap();
        assert!(b.is_finite());
        assert!((b.floors[0] + 6.0).abs() < 1e-4);
    }
}
