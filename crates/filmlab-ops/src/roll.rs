//! Roll analysis: one shared profile for a batch of frames.
//!
//! Frames from one roll share film stock, processing and scanner settings,
//! so printing them from the same bounds keeps color and density
//! consistent across the roll. Each frame is analyzed independently (in
//! parallel); the results meet at a single aggregation step where every
//! channel value farther than `sigma` standard deviations from the median
//! is dropped before averaging.
//!
//! # Example
//!
//! ```rust
//! use filmlab_core::{ColorDomain, ImageBuffer, ProcessMode};
//! use filmlab_ops::roll::analyze_roll;
//!
//! let frames: Vec<_> = [0.2, 0.22, 0.21]
//!     .iter()
//!     .map(|&v| ImageBuffer::filled(16, 16, ColorDomain::LinearTransmittance, [v, v * 0.8, v * 0.5]))
//!     .collect();
//! let bounds = analyze_roll(&frames, ProcessMode::C41).unwrap();
//! assert!(bounds.is_finite());
//! ```

use std::path::Path;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use filmlab_compute::Executor;
use filmlab_core::{ImageBuffer, ProcessMode};

use crate::bounds::{ChannelBounds, analyze_bounds_with};
use crate::normalize::normalize;
use crate::settings::{DevelopSettings, ExposureSettings, ProcessSettings};
use crate::shadows::analyze_shadow_cast;
use crate::{OpsError, OpsResult};

/// Default outlier rejection distance in standard deviations.
pub const DEFAULT_SIGMA: f32 = 2.0;

/// Shared development profile of a roll.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Roll {
    pub name: String,
    pub mode: ProcessMode,
    /// Number of frames the profile was built from.
    pub frames: usize,
    pub bounds: ChannelBounds,
    /// Exposure the roll was analyzed with. Frames start from it but
    /// develop with their own exposure settings.
    #[serde(default)]
    pub exposure: ExposureSettings,
    /// Outlier-trimmed shadow cast correction.
    pub shadow_cast: [f32; 3],
}

impl Roll {
    /// Analyzes `buffers` with the process settings in `settings`.
    pub fn analyze(name: impl Into<String>, buffers: &[ImageBuffer], settings: &DevelopSettings) -> OpsResult<Self> {
        Self::analyze_with(name, buffers, settings, DEFAULT_SIGMA)
    }

    /// Like [`Roll::analyze`] with an explicit rejection distance.
    pub fn analyze_with(
        name: impl Into<String>,
        buffers: &[ImageBuffer],
        settings: &DevelopSettings,
        sigma: f32,
    ) -> OpsResult<Self> {
        let name = name.into();
        let mode = settings.process.mode;
        trace!(roll = %name, frames = buffers.len(), %mode, sigma, "roll");

        let per_frame = frame_bounds(buffers, &settings.process, mode)?;
        let bounds = aggregate_bounds(&per_frame, sigma)?;

        let exec = Executor::default();
        let casts = buffers
            .par_iter()
            .zip(per_frame.par_iter())
            .map(|(buf, b)| -> OpsResult<[f32; 3]> {
                let norm = normalize(&exec, buf, b)?;
                Ok(analyze_shadow_cast(&norm, settings.process.shadow_cast_threshold))
            })
            .collect::<OpsResult<Vec<_>>>()?;
        let shadow_cast = std::array::from_fn(|c| {
            let channel: Vec<f32> = casts.iter().map(|v| v[c]).collect();
            trimmed_mean(&channel, sigma)
        });

        debug!(roll = %name, floors = ?bounds.floors, ceils = ?bounds.ceils, "roll profile");
        Ok(Self {
            name,
            mode,
            frames: buffers.len(),
            bounds,
            exposure: settings.exposure.clone(),
            shadow_cast,
        })
    }

    /// Settings a frame of this roll starts from: the roll's mode and
    /// exposure with the roll bounds enabled.
    pub fn starting_settings(&self) -> DevelopSettings {
        let mut s = DevelopSettings::default();
        s.process.mode = self.mode;
        s.process.use_roll_average = true;
        s.exposure = self.exposure.clone();
        s
    }

    pub fn from_yaml(text: &str) -> OpsResult<Self> {
        Ok(serde_yaml::from_str(text)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> OpsResult<Self> {
        Self::from_yaml(&std::fs::read_to_string(path)?)
    }

    pub fn to_yaml(&self) -> OpsResult<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Writes the profile as YAML.
    pub fn save(&self, path: impl AsRef<Path>) -> OpsResult<()> {
        std::fs::write(path, self.to_yaml()?)?;
        Ok(())
    }
}

/// Averaged bounds of `buffers` with default analysis settings.
pub fn analyze_roll(buffers: &[ImageBuffer], mode: ProcessMode) -> OpsResult<ChannelBounds> {
    let per_frame = frame_bounds(buffers, &ProcessSettings::default(), mode)?;
    aggregate_bounds(&per_frame, DEFAULT_SIGMA)
}

fn frame_bounds(buffers: &[ImageBuffer], process: &ProcessSettings, mode: ProcessMode) -> OpsResult<Vec<ChannelBounds>> {
    if buffers.is_empty() {
        return Err(OpsError::EmptyRoll);
    }
    let config = process.bounds_config(mode, None);
    buffers.par_iter().map(|b| analyze_bounds_with(b, &config)).collect()
}

/// Outlier-trimmed average of per-frame bounds, channel by channel.
pub fn aggregate_bounds(per_frame: &[ChannelBounds], sigma: f32) -> OpsResult<ChannelBounds> {
    if per_frame.is_empty() {
        return Err(OpsError::EmptyRoll);
    }
    let mut out = ChannelBounds::default();
    for c in 0..3 {
        let floors: Vec<f32> = per_frame.iter().map(|b| b.floors[c]).collect();
        let ceils: Vec<f32> = per_frame.iter().map(|b| b.ceils[c]).collect();
        out.floors[c] = trimmed_mean(&floors, sigma);
        out.ceils[c] = trimmed_mean(&ceils, sigma);
    }
    Ok(out)
}

/// Mean of the values within `sigma` population standard deviations of the
/// median. Falls back to the plain mean when fewer than two values remain.
pub fn trimmed_mean(values: &[f32], sigma: f32) -> f32 {
    if values.is_empty() {
        return 0.0;
    }
    let mean = |v: &[f32]| v.iter().sum::<f32>() / v.len() as f32;
    let all = mean(values);

    let mut sorted = values.to_vec();
    sorted.sort_unstable_by(f32::total_cmp);
    let n = sorted.len();
    let median = if n % 2 == 1 {
        sorted[n / 2]
    } else {
        (sorted[n / 2 - 1] + sorted[n / 2]) * 0.5
    };
    let std = (values.iter().map(|v| (v - all).powi(2)).sum::<f32>() / n as f32).sqrt();

    let kept: Vec<f32> = values
        .iter()
        .copied()
        .filter(|v| (v - median).abs() <= sigma * std)
        .collect();
    if kept.len() < 2 { all } else { mean(&kept) }
}
