//! Paper simulation, chemical toning and the display transfer.
//!
//! ```text
//! v = (v * tint) ^ d_max_boost
//! v = lerp(v, v * SELENIUM, selenium * (1 - Y)^2)
//! v = lerp(v, v * SEPIA, sepia * bell(Y, 0.6, 0.2))
//! v = clamp(v) ^ (1 / gamma)
//! ```
//!
//! This is the only stage that encodes for display. Exposure hands over
//! linear print transmittance and the gamma recorded in
//! [`ExposureParams::output_gamma`](crate::exposure::ExposureParams) is
//! applied here, exactly once.

use serde::{Deserialize, Serialize};
use tracing::trace;

use filmlab_compute::Executor;
use filmlab_core::{ColorDomain, EPSILON, ImageBuffer, luminance_rec709};

use crate::OpsResult;
use crate::settings::ToningSettings;

/// Color a print takes on in selenium-toned shadows.
pub const SELENIUM_COLOR: [f32; 3] = [0.92, 0.85, 0.95];

/// Color a print takes on in sepia-toned midtones.
pub const SEPIA_COLOR: [f32; 3] = [1.1, 0.95, 0.75];

/// Luminance where sepia toning peaks.
pub const SEPIA_CENTER: f32 = 0.6;

/// Width of the sepia bell.
pub const SEPIA_WIDTH: f32 = 0.2;

/// Printing paper base.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PaperProfile {
    #[default]
    None,
    #[serde(rename = "Neutral RC")]
    NeutralRc,
    #[serde(rename = "Warm Fiber")]
    WarmFiber,
    #[serde(rename = "Cool Glossy")]
    CoolGlossy,
}

impl PaperProfile {
    /// Base tint of the paper.
    pub fn tint(&self) -> [f32; 3] {
        match self {
            Self::None => [1.0, 1.0, 1.0],
            Self::NeutralRc => [0.99, 0.99, 0.99],
            Self::WarmFiber => [1.0, 0.97, 0.92],
            Self::CoolGlossy => [0.96, 0.98, 1.0],
        }
    }

    /// Exponent deepening the paper's maximum black.
    pub fn d_max_boost(&self) -> f32 {
        match self {
            Self::None | Self::NeutralRc => 1.0,
            Self::WarmFiber => 1.1,
            Self::CoolGlossy => 1.05,
        }
    }
}

/// Selenium weight at luminance `y`: `strength * (1 - y)^2`.
#[inline]
pub fn selenium_mask(y: f32, strength: f32) -> f32 {
    strength * (1.0 - y.clamp(0.0, 1.0)).powi(2)
}

/// Sepia weight at luminance `y`: a bell around [`SEPIA_CENTER`].
#[inline]
pub fn sepia_mask(y: f32, strength: f32) -> f32 {
    let d = y.clamp(0.0, 1.0) - SEPIA_CENTER;
    strength * (-(d * d) / (2.0 * SEPIA_WIDTH * SEPIA_WIDTH)).exp()
}

/// Resolved toning parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ToningParams {
    pub tint: [f32; 3],
    pub d_max_boost: f32,
    pub selenium: f32,
    pub sepia: f32,
    pub gamma: f32,
}

impl ToningParams {
    pub fn from_settings(settings: &ToningSettings, gamma: f32) -> Self {
        Self {
            tint: settings.paper_profile.tint(),
            d_max_boost: settings.paper_profile.d_max_boost(),
            selenium: settings.selenium_strength.clamp(0.0, 1.0),
            sepia: settings.sepia_strength.clamp(0.0, 1.0),
            gamma,
        }
    }

    /// Tones and encodes one pixel.
    #[inline]
    pub fn eval(&self, rgb: [f32; 3]) -> [f32; 3] {
        let mut v: [f32; 3] = std::array::from_fn(|c| (rgb[c] * self.tint[c]).max(0.0).powf(self.d_max_boost));
        if self.selenium > 0.0 {
            let m = selenium_mask(luminance_rec709(v), self.selenium);
            v = std::array::from_fn(|c| v[c] + (v[c] * SELENIUM_COLOR[c] - v[c]) * m);
        }
        if self.sepia > 0.0 {
            let m = sepia_mask(luminance_rec709(v), self.sepia);
            v = std::array::from_fn(|c| v[c] + (v[c] * SEPIA_COLOR[c] - v[c]) * m);
        }
        let inv = 1.0 / self.gamma.max(EPSILON);
        v.map(|x| x.clamp(0.0, 1.0).powf(inv))
    }
}

/// Tones a print and applies display gamma.
pub fn apply_toning(exec: &Executor, src: &ImageBuffer, params: &ToningParams) -> OpsResult<ImageBuffer> {
    src.require_domain(ColorDomain::LinearTransmittance)?;
    trace!(
        width = src.width(),
        height = src.height(),
        selenium = params.selenium,
        sepia = params.sepia,
        gamma = params.gamma,
        "toning"
    );
    let p = *params;
    Ok(exec.map(src, "toning", ColorDomain::DisplayEncoded, move |rgb| p.eval(rgb))?)
}
