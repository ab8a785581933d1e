//! Virtual darkroom: color timing and the H&D print curve.
//!
//! Normalized log density goes through enlarger filtration, local
//! shadow/highlight shifts and toe/shoulder slope modulation before a
//! logistic characteristic curve produces print density:
//!
//! ```text
//! val      = x + cmy[c]
//! diff     = val - pivot[c]
//! diff_adj = diff + color(s, h) - 0.3 * (shadows * s + highlights * h)
//! density  = d_max * sigmoid(slope[c] * diff_adj * k_mod)
//! out      = clamp(10^-density, 0, 1)
//! ```
//!
//! where `s` and `h` are Gaussian masks around the shadow and highlight
//! anchors and `k_mod` comes from the toe and shoulder windows. The output
//! is linear print transmittance; display gamma is applied once, by toning.

use serde::{Deserialize, Serialize};
use tracing::trace;

use filmlab_compute::{Executor, Neighborhood, PixelKernel};
use filmlab_core::{ColorDomain, EPSILON, ImageBuffer, Polarity, ProcessMode};

use crate::OpsResult;
use crate::settings::ExposureSettings;

/// Density of a full-strength CMY filter.
pub const MAX_CMY_DENSITY: f32 = 0.2;

/// Variance of the shadow/highlight masks.
const MASK_VARIANCE: f32 = 0.15;

/// Anchor distance of the masks as a fraction of the pivot span.
const ANCHOR_SCALE: f32 = 0.9;

/// Density shift of a full shadow/highlight adjustment.
const REGION_DENSITY: f32 = 0.3;

/// Resolved curve parameters for one print.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExposureParams {
    pub pivot: [f32; 3],
    pub slope: [f32; 3],
    /// Global filtration in density units.
    pub cmy_offsets: [f32; 3],
    pub shadow_cmy: [f32; 3],
    pub highlight_cmy: [f32; 3],
    pub shadows: f32,
    pub highlights: f32,
    pub toe: f32,
    pub toe_width: f32,
    pub toe_hardness: f32,
    pub shoulder: f32,
    pub shoulder_width: f32,
    pub shoulder_hardness: f32,
    pub d_max: f32,
    /// Display gamma consumed by toning.
    pub output_gamma: f32,
    pub polarity: Polarity,
}

impl Default for ExposureParams {
    fn default() -> Self {
        Self::from_settings(&ExposureSettings::default(), ProcessMode::C41)
    }
}

impl ExposureParams {
    /// Maps user-facing settings to curve parameters.
    ///
    /// `pivot = 1 - (0.1 + density * 0.2)`, `slope = 1 + grade * 2`, and
    /// filtration is scaled by [`MAX_CMY_DENSITY`].
    pub fn from_settings(s: &ExposureSettings, mode: ProcessMode) -> Self {
        let pivot = 1.0 - (0.1 + s.density * 0.2);
        let slope = 1.0 + s.grade * 2.0;
        let scale = |v: [f32; 3]| v.map(|c| c * MAX_CMY_DENSITY);
        Self {
            pivot: [pivot; 3],
            slope: [slope; 3],
            cmy_offsets: scale([s.cyan, s.magenta, s.yellow]),
            shadow_cmy: scale(s.shadow_cmy),
            highlight_cmy: scale(s.highlight_cmy),
            shadows: s.shadows,
            highlights: s.highlights,
            toe: s.toe,
            toe_width: s.toe_width,
            toe_hardness: s.toe_hardness,
            shoulder: s.shoulder,
            shoulder_width: s.shoulder_width,
            shoulder_hardness: s.shoulder_hardness,
            d_max: s.d_max,
            output_gamma: s.output_gamma,
            polarity: mode.polarity(),
        }
    }

    /// Print transmittance of one channel.
    #[inline]
    pub fn eval_channel(&self, x: f32, c: usize) -> f32 {
        let pivot = self.pivot[c];
        let diff = x + self.cmy_offsets[c] - pivot;

        let s_center = (1.0 - pivot) * ANCHOR_SCALE;
        let h_center = -pivot * ANCHOR_SCALE;
        let s_mask = (-(diff - s_center).powi(2) / MASK_VARIANCE).exp();
        let h_mask = (-(diff - h_center).powi(2) / MASK_VARIANCE).exp();

        let diff_adj = diff + self.shadow_cmy[c] * s_mask + self.highlight_cmy[c] * h_mask
            - self.shadows * s_mask * REGION_DENSITY
            - self.highlights * h_mask * REGION_DENSITY;

        let w_s = sigmoid(self.shoulder_width * diff_adj / pivot.max(EPSILON));
        let prot_s = (4.0 * (w_s - 0.5).powi(2)).powf(self.shoulder_hardness);
        let damp_shoulder = self.shoulder * (1.0 - w_s) * prot_s;

        let w_t = sigmoid(self.toe_width * diff_adj / (1.0 - pivot).max(EPSILON));
        let prot_t = (4.0 * (w_t - 0.5).powi(2)).powf(self.toe_hardness);
        let damp_toe = self.toe * w_t * prot_t;

        let k_mod = (1.0 - damp_toe - damp_shoulder).clamp(0.1, 2.0);
        let density = self.d_max * sigmoid(self.slope[c] * diff_adj * k_mod);
        10f32.powf(-density).clamp(0.0, 1.0)
    }

    /// Print transmittance of one pixel.
    #[inline]
    pub fn eval(&self, rgb: [f32; 3]) -> [f32; 3] {
        std::array::from_fn(|c| self.eval_channel(rgb[c], c))
    }
}

/// Logistic sigmoid that never overflows `exp`.
#[inline]
pub fn sigmoid(x: f32) -> f32 {
    if x >= 0.0 {
        1.0 / (1.0 + (-x).exp())
    } else {
        let z = x.exp();
        z / (1.0 + z)
    }
}

/// Filter value to density relative to a channel's log range.
#[inline]
pub fn cmy_to_density(value: f32, log_range: f32) -> f32 {
    value * MAX_CMY_DENSITY / log_range.max(EPSILON)
}

/// Inverse of [`cmy_to_density`].
#[inline]
pub fn density_to_cmy(density: f32, log_range: f32) -> f32 {
    density * log_range.max(EPSILON) / MAX_CMY_DENSITY
}

/// Magenta and yellow filter values that make a picked normalized sample
/// neutral, in the same units as [`ExposureSettings::magenta`].
#[inline]
pub fn neutral_point_shift(r: f32, g: f32, b: f32) -> (f32, f32) {
    (density_to_cmy(r - g, 1.0), density_to_cmy(r - b, 1.0))
}

/// Curve kernel: log density in, linear print transmittance out.
pub struct ExposureKernel {
    params: ExposureParams,
}

impl ExposureKernel {
    pub fn new(params: ExposureParams) -> Self {
        Self { params }
    }
}

impl PixelKernel for ExposureKernel {
    fn name(&self) -> &'static str {
        "exposure"
    }

    fn output_domain(&self, _input: ColorDomain) -> ColorDomain {
        ColorDomain::LinearTransmittance
    }

    fn apply(&self, n: &Neighborhood<'_>) -> [f32; 3] {
        self.params.eval(n.center())
    }
}

/// Prints a normalized buffer.
pub fn apply_exposure(exec: &Executor, src: &ImageBuffer, params: &ExposureParams) -> OpsResult<ImageBuffer> {
    src.require_domain(ColorDomain::LogDensity)?;
    trace!(
        width = src.width(),
        height = src.height(),
        pivot = params.pivot[0],
        slope = params.slope[0],
        "exposure"
    );
    Ok(exec.run(src, &ExposureKernel::new(*params))?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sigmoid_stable() {
        assert_eq!(sigmoid(0.0), 0.5);
        assert!(sigmoid(200.0) <= 1.0 && sigmoid(200.0) > 0.999);
        assert!(sigmoid(-200.0) >= 0.0 && sigmoid(-200.0) < 1e-3);
        assert!(sigmoid(-1e6).is_finite() && sigmoid(1e6).is_finite());
    }

    #[test]
    fn test_settings_mapping() {
        let p = ExposureParams::from_settings(
            &ExposureSettings {
                density: 1.0,
                grade: 2.0,
                cyan: 0.5,
                ..ExposureSettings::default()
            },
            ProcessMode::E6,
        );
        assert!((p.pivot[0] - 0.7).abs() < 1e-6);
        assert!((p.slope[1] - 5.0).abs() < 1e-6);
        assert!((p.cmy_offsets[0] - 0.1).abs() < 1e-6);
        assert_eq!(p.polarity, Polarity::Positive);
    }

    #[test]
    fn test_output_in_unit_range() {
        let mut p = ExposureParams::default();
        p.toe = 0.8;
        p.shoulder = 0.8;
        p.shadows = 1.0;
        p.highlights = -1.0;
        p.cmy_offsets = [0.2, -0.2, 0.1];
        for pivot in [1e-4, 0.3, 0.7, 0.9999] {
            p.pivot = [pivot; 3];
            for i in 0..=20 {
                let x = i as f32 / 20.0;
                for v in p.eval([x; 3]) {
                    assert!(v.is_finite() && (0.0..=1.0).contains(&v), "pivot {pivot} x {x} -> {v}");
                }
            }
        }
    }

    #[test]
    fn test_thin_negative_prints_dark() {
        let p = ExposureParams::default();
        let highlight = p.eval_channel(0.0, 0);
        let shadow = p.eval_channel(1.0, 0);
        assert!(highlight > shadow);
        // monotonic
        let mut last = f32::MAX;
        for i in 0..=10 {
            let v = p.eval_channel(i as f32 / 10.0, 0);
            assert!(v <= last);
            last = v;
        }
    }

    #[test]
    fn test_pivot_midpoint() {
        let p = ExposureParams::default();
        // at the pivot the curve sits at half of d_max
        let v = p.eval_channel(p.pivot[0], 0);
        assert!((v - 10f32.powf(-2.0)).abs() < 1e-3);
    }

    #[test]
    fn test_shadows_lighten() {
        let base = ExposureParams::default();
        let mut lifted = base;
        lifted.shadows = 1.0;
        assert!(lifted.eval_channel(0.95, 1) > base.eval_channel(0.95, 1));
    }

    #[test]
    fn test_cmy_helpers() {
        let d = cmy_to_density(0.5, 2.0);
        assert!((d - 0.05).abs() < 1e-6);
        assert!((density_to_cmy(d, 2.0) - 0.5).abs() < 1e-6);
        assert!(cmy_to_density(1.0, 0.0).is_finite());
        let (m, y) = neutral_point_shift(0.6, 0.5, 0.4);
        assert!((m - 0.5).abs() < 1e-6 && (y - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_neutral_point_shift_neutralizes_sample() {
        let sample = [0.62, 0.55, 0.47];
        let (magenta, yellow) = neutral_point_shift(sample[0], sample[1], sample[2]);
        let p = ExposureParams::from_settings(
            &ExposureSettings {
                magenta,
                yellow,
                ..ExposureSettings::default()
            },
            ProcessMode::C41,
        );
        // filtered sample lands on one value in every channel
        let filtered: Vec<f32> = (0..3).map(|c| sample[c] + p.cmy_offsets[c]).collect();
        assert!((filtered[0] - filtered[1]).abs() < 1e-6);
        assert!((filtered[0] - filtered[2]).abs() < 1e-6);
        let out = p.eval(sample);
        assert!((out[0] - out[1]).abs() < 1e-5 && (out[0] - out[2]).abs() < 1e-5);
    }

    #[test]
    fn test_domain() {
        let exec = Executor::cpu();
        let img = ImageBuffer::filled(3, 3, ColorDomain::LogDensity, [0.5; 3]);
        let out = apply_exposure(&exec, &img, &ExposureParams::default()).unwrap();
        assert_eq!(out.domain(), ColorDomain::LinearTransmittance);
        assert!(apply_exposure(&exec, &out, &ExposureParams::default()).is_err());
    }
}
