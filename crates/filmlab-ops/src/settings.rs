//! Development settings.
//!
//! One explicit value threads every user choice through a pipeline run;
//! nothing is read from ambient state. Every section defaults field by
//! field, so a YAML document only needs the values it changes:
//!
//! ```rust
//! use filmlab_ops::settings::DevelopSettings;
//!
//! let s = DevelopSettings::from_yaml("exposure:\n  grade: 3.0\n").unwrap();
//! assert_eq!(s.exposure.grade, 3.0);
//! assert_eq!(s.exposure.density, 1.0);
//! assert_eq!(s.geometry.autocrop_ratio, "3:2");
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use filmlab_core::{ProcessMode, Rect};

use crate::OpsResult;
use crate::bounds::{BoundsConfig, ChannelBounds};
use crate::retouch::{LocalAdjustment, RetouchSpot};
use crate::shadows;
use crate::toning::PaperProfile;

/// Preview long edge that pixel-sized settings are expressed against.
pub const DEFAULT_RENDER_SIZE_REF: f32 = 1000.0;

/// All settings for developing one frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DevelopSettings {
    /// Long edge (px) that pixel-sized values refer to.
    pub render_size_ref: f32,
    pub process: ProcessSettings,
    pub geometry: GeometrySettings,
    pub exposure: ExposureSettings,
    pub retouch: RetouchSettings,
    pub lab: LabSettings,
    pub toning: ToningSettings,
}

impl Default for DevelopSettings {
    fn default() -> Self {
        Self {
            render_size_ref: DEFAULT_RENDER_SIZE_REF,
            process: ProcessSettings::default(),
            geometry: GeometrySettings::default(),
            exposure: ExposureSettings::default(),
            retouch: RetouchSettings::default(),
            lab: LabSettings::default(),
            toning: ToningSettings::default(),
        }
    }
}

impl DevelopSettings {
    /// Parses a YAML document.
    pub fn from_yaml(text: &str) -> OpsResult<Self> {
        Ok(serde_yaml::from_str(text)?)
    }

    /// Reads and parses a YAML file.
    pub fn from_file(path: impl AsRef<Path>) -> OpsResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_yaml(&text)
    }

    /// Serializes to YAML.
    pub fn to_yaml(&self) -> OpsResult<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Resolution factor for a frame with the given long edge.
    pub fn scale_for(&self, long_edge: usize) -> f32 {
        long_edge as f32 / self.render_size_ref.max(1.0)
    }
}

/// Process and bounds analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessSettings {
    pub mode: ProcessMode,
    /// Fraction of each edge ignored by analysis, clamped to `[0, 0.3]`.
    pub analysis_margin: f32,
    /// Slide ceilings from the second percentile; otherwise fixed 3.0 range.
    pub e6_normalize: bool,
    pub negative_percentiles: (f32, f32),
    pub positive_percentiles: (f32, f32),
    /// Added to every floor.
    pub white_point: f32,
    /// Added to every ceiling.
    pub black_point: f32,
    pub shadow_cast_strength: f32,
    pub shadow_cast_threshold: f32,
    /// Bounds pinned by the user; skips analysis.
    pub locked_bounds: Option<ChannelBounds>,
    /// Use the roll's averaged bounds when a roll is supplied.
    pub use_roll_average: bool,
}

impl Default for ProcessSettings {
    fn default() -> Self {
        Self {
            mode: ProcessMode::C41,
            analysis_margin: 0.07,
            e6_normalize: true,
            negative_percentiles: (0.5, 99.5),
            positive_percentiles: (99.9, 0.01),
            white_point: 0.0,
            black_point: 0.0,
            shadow_cast_strength: 0.0,
            shadow_cast_threshold: shadows::DEFAULT_THRESHOLD,
            locked_bounds: None,
            use_roll_average: false,
        }
    }
}

impl ProcessSettings {
    /// Analysis options for `mode`, optionally restricted to `region`.
    pub fn bounds_config(&self, mode: ProcessMode, region: Option<Rect>) -> BoundsConfig {
        BoundsConfig {
            mode,
            margin: self.analysis_margin,
            negative_percentiles: self.negative_percentiles,
            positive_percentiles: self.positive_percentiles,
            e6_normalize: self.e6_normalize,
            region,
        }
    }
}

/// Rotation, flips and crop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeometrySettings {
    /// Counter-clockwise quarter turns.
    pub rotation: i32,
    /// Degrees, counter-clockwise.
    pub fine_rotation: f32,
    pub flip_horizontal: bool,
    pub flip_vertical: bool,
    pub autocrop: bool,
    /// Extra crop inset in reference pixels.
    pub autocrop_offset: f32,
    pub autocrop_ratio: String,
    pub autocrop_assist_luma: Option<f32>,
    /// Normalized `[x1, y1, x2, y2]` in output space.
    pub manual_crop: Option<[f32; 4]>,
    pub keep_full_frame: bool,
}

impl Default for GeometrySettings {
    fn default() -> Self {
        Self {
            rotation: 0,
            fine_rotation: 0.0,
            flip_horizontal: false,
            flip_vertical: false,
            autocrop: true,
            autocrop_offset: 2.0,
            autocrop_ratio: "3:2".to_string(),
            autocrop_assist_luma: None,
            manual_crop: None,
            keep_full_frame: false,
        }
    }
}

/// Virtual darkroom controls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExposureSettings {
    /// Print exposure; higher is darker.
    pub density: f32,
    /// Paper grade (contrast).
    pub grade: f32,
    pub cyan: f32,
    pub magenta: f32,
    pub yellow: f32,
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
    pub output_gamma: f32,
}

impl Default for ExposureSettings {
    fn default() -> Self {
        Self {
            density: 1.0,
            grade: 2.0,
            cyan: 0.0,
            magenta: 0.0,
            yellow: 0.0,
            shadow_cmy: [0.0; 3],
            highlight_cmy: [0.0; 3],
            shadows: 0.0,
            highlights: 0.0,
            toe: 0.0,
            toe_width: 3.0,
            toe_hardness: 1.0,
            shoulder: 0.0,
            shoulder_width: 3.0,
            shoulder_hardness: 1.0,
            d_max: 4.0,
            output_gamma: 2.2,
        }
    }
}

/// Dust removal, healing and dodge/burn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetouchSettings {
    pub dust_remove: bool,
    pub dust_sensitivity: f32,
    /// Typical dust footprint in reference pixels.
    pub dust_size: f32,
    /// Spots in source-frame coordinates, applied in order.
    pub manual_spots: Vec<RetouchSpot>,
    pub local_adjustments: Vec<LocalAdjustment>,
    /// Seed for the dust healer's sampling pattern.
    pub seed: u64,
}

impl Default for RetouchSettings {
    fn default() -> Self {
        Self {
            dust_remove: false,
            dust_sensitivity: 1.0,
            dust_size: 3.0,
            manual_spots: Vec::new(),
            local_adjustments: Vec::new(),
            seed: 0,
        }
    }
}

/// Perceptual refinements.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LabSettings {
    /// 1.0 disables separation.
    pub color_separation: f32,
    pub saturation: f32,
    pub vibrance: f32,
    pub chroma_denoise: f32,
    pub clahe_strength: f32,
    pub sharpen: f32,
    /// Row-major override of the process separation matrix.
    pub separation_matrix: Option<[f32; 9]>,
}

impl Default for LabSettings {
    fn default() -> Self {
        Self {
            color_separation: 1.0,
            saturation: 1.0,
            vibrance: 1.0,
            chroma_denoise: 0.0,
            clahe_strength: 0.0,
            sharpen: 0.25,
            separation_matrix: None,
        }
    }
}

/// Paper and chemical toning.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToningSettings {
    pub paper_profile: PaperProfile,
    pub selenium_strength: f32,
    pub sepia_strength: f32,
}
