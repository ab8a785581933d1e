//! Log-domain normalization.
//!
//! Maps linear transmittance to `[0, 1]` per channel:
//!
//! ```text
//! out = clamp((log10(max(v, eps)) - floor) / (ceil - floor), 0, 1)
//! ```
//!
//! Each channel uses its own bounds, which is what neutralizes the orange
//! mask of color negatives. Polarity is carried entirely by the bounds.

use tracing::trace;

use filmlab_compute::{Executor, Neighborhood, PixelKernel};
use filmlab_core::{ColorDomain, EPSILON, ImageBuffer};

use crate::OpsResult;
use crate::bounds::ChannelBounds;

/// Per-pixel normalization kernel.
pub struct NormalizeKernel {
    floors: [f32; 3],
    spreads: [f32; 3],
}

impl NormalizeKernel {
    pub fn new(bounds: &ChannelBounds) -> Self {
        Self {
            floors: bounds.floors,
            spreads: [bounds.spread(0), bounds.spread(1), bounds.spread(2)],
        }
    }

    /// Normalizes one pixel.
    #[inline]
    pub fn eval(&self, rgb: [f32; 3]) -> [f32; 3] {
        std::array::from_fn(|c| {
            let log = rgb[c].clamp(EPSILON, 1.0).log10();
            ((log - self.floors[c]) / self.spreads[c]).clamp(0.0, 1.0)
        })
    }
}

impl PixelKernel for NormalizeKernel {
    fn name(&self) -> &'static str {
        "normalize"
    }

    fn output_domain(&self, _input: ColorDomain) -> ColorDomain {
        ColorDomain::LogDensity
    }

    fn apply(&self, n: &Neighborhood<'_>) -> [f32; 3] {
        self.eval(n.center())
    }
}

/// Normalizes a linear transmittance buffer into log density.
pub fn normalize(exec: &Executor, src: &ImageBuffer, bounds: &ChannelBounds) -> OpsResult<ImageBuffer> {
    src.require_domain(ColorDomain::LinearTransmittance)?;
    trace!(width = src.width(), height = src.height(), "normalize");
    Ok(exec.run(src, &NormalizeKernel::new(bounds))?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_floor_and_ceil_hit_endpoints() {
        for bounds in [
            ChannelBounds::new([-1.2, -0.9, -0.6], [-0.1, -0.05, -0.02]),
            ChannelBounds::new([-0.1, -0.05, -0.02], [-1.2, -0.9, -0.6]),
        ] {
            let k = NormalizeKernel::new(&bounds);
            let at_floor = k.eval(bounds.floors.map(|f| 10f32.powf(f)));
            let at_ceil = k.eval(bounds.ceils.map(|f| 10f32.powf(f)));
            for c in 0..3 {
                assert!(at_floor[c].abs() < 1e-4, "{at_floor:?}");
                assert!((at_ceil[c] - 1.0).abs() < 1e-4, "{at_ceil:?}");
            }
        }
    }

    #[test]
    fn test_midpoint() {
        let k = NormalizeKernel::new(&ChannelBounds::new([-0.5; 3], [-0.1; 3]));
        let out = k.eval([10f32.powf(-0.3); 3]);
        assert!((out[0] - 0.5).abs() < 1e-4);
    }

    #[test]
    fn test_offsets_shift_result() {
        let base = ChannelBounds::new([-0.8; 3], [-0.2; 3]);
        let px = [10f32.powf(-0.5); 3];
        let plain = NormalizeKernel::new(&base).eval(px);
        assert!((plain[0] - 0.5).abs() < 1e-4);
        let shifted = NormalizeKernel::new(&base.with_offsets(0.1, 0.0)).eval(px);
        assert!(shifted[0] < plain[0]);
    }

    #[test]
    fn test_degenerate_bounds_finite() {
        let k = NormalizeKernel::new(&ChannelBounds::new([-0.5; 3], [-0.5; 3]));
        for v in [0.0, 1e-9, 0.3, 1.0, 2.0] {
            let out = k.eval([v; 3]);
            assert!(out.iter().all(|x| x.is_finite() && (0.0..=1.0).contains(x)));
        }
    }

    #[test]
    fn test_domain_checked() {
        let exec = Executor::cpu();
        let img = ImageBuffer::filled(2, 2, ColorDomain::LogDensity, [0.5; 3]);
        assert!(normalize(&exec, &img, &ChannelBounds::default()).is_err());
        let lin = img.with_domain(ColorDomain::LinearTransmittance);
        let out = normalize(&exec, &lin, &ChannelBounds::default()).unwrap();
        assert_eq!(out.domain(), ColorDomain::LogDensity);
    }
}
