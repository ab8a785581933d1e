//! Shadow color cast correction.
//!
//! After normalization, scene shadows of a negative sit near 1. Any color
//! bias among the densest-normalized pixels shows up as a cast in the
//! print's shadows; the correction pulls those pixels toward neutral,
//! weighted by `mean(v)^1.5` so highlights are left alone.

use tracing::{debug, trace};

use filmlab_compute::Executor;
use filmlab_core::{ColorDomain, ImageBuffer, channel_mean};

use crate::OpsResult;

/// Default channel-mean threshold selecting shadow pixels.
pub const DEFAULT_THRESHOLD: f32 = 0.75;

/// Per-channel correction that neutralizes the average shadow pixel.
///
/// Returns zero when no pixel exceeds `threshold`.
pub fn analyze_shadow_cast(normalized: &ImageBuffer, threshold: f32) -> [f32; 3] {
    trace!(width = normalized.width(), height = normalized.height(), threshold, "analyze_shadow_cast");
    let mut sum = [0.0f64; 3];
    let mut count = 0usize;
    for p in normalized.pixels() {
        if channel_mean(p) > threshold {
            for c in 0..3 {
                sum[c] += p[c] as f64;
            }
            count += 1;
        }
    }
    if count == 0 {
        return [0.0; 3];
    }
    let avg = sum.map(|s| (s / count as f64) as f32);
    let neutral = channel_mean(avg);
    let cast = avg.map(|v| neutral - v);
    debug!(count, ?cast, "shadow cast");
    cast
}

/// Applies `cast` with the given strength.
pub fn apply_shadow_cast(exec: &Executor, src: &ImageBuffer, cast: [f32; 3], strength: f32) -> OpsResult<ImageBuffer> {
    src.require_domain(ColorDomain::LogDensity)?;
    if strength == 0.0 || cast == [0.0; 3] {
        return Ok(src.clone());
    }
    trace!(width = src.width(), height = src.height(), strength, "apply_shadow_cast");
    Ok(exec.map(src, "shadow_cast", ColorDomain::LogDensity, |p| {
        let w = channel_mean(p).max(0.0).powf(1.5) * strength;
        std::array::from_fn(|c| (p[c] + cast[c] * w).clamp(0.0, 1.0))
    })?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tinted() -> ImageBuffer {
        ImageBuffer::from_fn(10, 10, ColorDomain::LogDensity, |x, _| {
            if x < 5 { [0.9, 0.8, 0.85] } else { [0.2, 0.2, 0.2] }
        })
    }

    #[test]
    fn test_analyze_cast() {
        let cast = analyze_shadow_cast(&tinted(), DEFAULT_THRESHOLD);
        assert!((cast[0] + 0.05).abs() < 1e-5);
        assert!((cast[1] - 0.05).abs() < 1e-5);
        assert!(cast[2].abs() < 1e-5);
    }

    #[test]
    fn test_no_shadows_no_cast() {
        let img = ImageBuffer::filled(4, 4, ColorDomain::LogDensity, [0.1, 0.3, 0.2]);
        assert_eq!(analyze_shadow_cast(&img, DEFAULT_THRESHOLD), [0.0; 3]);
    }

    #[test]
    fn test_apply_neutralizes_shadows() {
        let exec = Executor::cpu();
        let img = tinted();
        let cast = analyze_shadow_cast(&img, DEFAULT_THRESHOLD);
        let out = apply_shadow_cast(&exec, &img, cast, 1.0).unwrap();
        let before = img.pixel(0, 0);
        let after = out.pixel(0, 0);
        let spread = |p: [f32; 3]| p.iter().cloned().fold(f32::MIN, f32::max) - p.iter().cloned().fold(f32::MAX, f32::min);
        assert!(spread(after) < spread(before));
        // highlights barely move
        assert!((out.pixel(9, 0)[0] - 0.2).abs() < 0.005);
    }
}
