//! The development pipeline.
//!
//! ```text
//! scan (linear transmittance)
//!   -> geometry -> crop
//!   -> bounds (roll | locked | analysis) -> normalize -> shadow cast
//!   -> exposure                         (linear print transmittance)
//!   -> retouch: dust, spots, dodge/burn
//!   -> lab refinement
//!   -> toning + display gamma           (display encoded)
//! ```
//!
//! A run is a pure function of the input buffer, the settings and the
//! optional roll. The process mode is read from `settings.process.mode`
//! only. A roll contributes bounds and the shadow cast; exposure always
//! follows the frame's own settings. Nothing is cached between runs, so a
//! preview and an export of the same frame only share their parameters.
//!
//! # Example
//!
//! ```rust
//! use filmlab_core::{ColorDomain, ImageBuffer, ProcessMode};
//! use filmlab_ops::pipeline::run_pipeline;
//! use filmlab_ops::settings::DevelopSettings;
//!
//! let scan = ImageBuffer::from_fn(64, 48, ColorDomain::LinearTransmittance, |x, y| {
//!     let t = 0.1 + 0.5 * (x + y) as f32 / 110.0;
//!     [t, t * 0.6, t * 0.35]
//! });
//! let print = run_pipeline(&scan, &DevelopSettings::default(), ProcessMode::C41).unwrap();
//! assert_eq!(print.domain(), ColorDomain::DisplayEncoded);
//! ```

use std::sync::atomic::{AtomicU64, Ordering};

use tracing::{debug, trace, warn};

use filmlab_compute::Executor;
use filmlab_core::{ColorDomain, ImageBuffer, ProcessMode, Rect, luminance_rec709};

use crate::OpsResult;
use crate::bounds::{ChannelBounds, analyze_bounds_with};
use crate::exposure::{ExposureParams, apply_exposure};
use crate::geometry::{GeometryTransform, resolve_crop};
use crate::lab::{LabParams, apply_lab};
use crate::normalize::normalize;
use crate::retouch::{DustConfig, LocalAdjustment, RetouchPass, RetouchSpot, apply_retouch};
use crate::roll::Roll;
use crate::settings::DevelopSettings;
use crate::shadows::{analyze_shadow_cast, apply_shadow_cast};
use crate::toning::{ToningParams, apply_toning};

/// Where a run's bounds came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundsSource {
    Roll,
    Locked,
    Analyzed,
}

/// Result of one run.
#[derive(Debug, Clone)]
pub struct Development {
    /// Display-encoded print.
    pub image: ImageBuffer,
    /// Bounds used, offsets included.
    pub bounds: ChannelBounds,
    pub bounds_source: BoundsSource,
    /// Crop in geometry-corrected pixels.
    pub crop: Rect,
    /// Shadow cast correction applied (zero when disabled).
    pub shadow_cast: [f32; 3],
    pub exposure: ExposureParams,
    /// Spots added by automatic dust removal.
    pub dust_spots: usize,
}

/// A configured pipeline.
#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    settings: DevelopSettings,
    roll: Option<Roll>,
    exec: Executor,
}

impl Pipeline {
    pub fn new(settings: DevelopSettings) -> Self {
        Self {
            settings,
            roll: None,
            exec: Executor::default(),
        }
    }

    /// Attaches a roll profile; used when `use_roll_average` is set.
    pub fn with_roll(mut self, roll: Roll) -> Self {
        self.roll = Some(roll);
        self
    }

    pub fn with_executor(mut self, exec: Executor) -> Self {
        self.exec = exec;
        self
    }

    pub fn settings(&self) -> &DevelopSettings {
        &self.settings
    }

    pub fn roll(&self) -> Option<&Roll> {
        self.roll.as_ref()
    }

    /// Develops one scan in the mode set by `settings.process.mode`.
    pub fn run(&self, buffer: &ImageBuffer) -> OpsResult<Development> {
        buffer.require_domain(ColorDomain::LinearTransmittance)?;
        let s = &self.settings;
        let mode = s.process.mode;
        let exec = &self.exec;
        let (w, h) = buffer.dimensions();
        let scale = s.scale_for(buffer.long_edge());
        trace!(width = w, height = h, %mode, scale, backend = exec.backend_name(), "pipeline");

        let transform = GeometryTransform::from_settings(&s.geometry, w, h);
        let transformed = transform.apply(buffer)?;
        let crop = resolve_crop(&transformed, &s.geometry, scale)?;
        let framed = transformed.crop(crop)?;

        let roll = self.roll.as_ref().filter(|_| s.process.use_roll_average);
        if let Some(r) = roll.filter(|r| r.mode != mode) {
            warn!(roll = %r.name, roll_mode = %r.mode, %mode, "roll was analyzed for another process");
        }
        let (bounds, bounds_source) = match (roll, s.process.locked_bounds) {
            (Some(r), _) => (r.bounds, BoundsSource::Roll),
            (None, Some(locked)) => (locked, BoundsSource::Locked),
            (None, None) => (
                analyze_bounds_with(&framed, &s.process.bounds_config(mode, None))?,
                BoundsSource::Analyzed,
            ),
        };
        let bounds = bounds.with_offsets(s.process.white_point, s.process.black_point);
        debug!(?bounds_source, %crop, "bounds resolved");

        let mut img = normalize(exec, &framed, &bounds)?;

        let mut shadow_cast = [0.0; 3];
        if s.process.shadow_cast_strength > 0.0 {
            shadow_cast = match roll {
                Some(r) => r.shadow_cast,
                None => analyze_shadow_cast(&img, s.process.shadow_cast_threshold),
            };
            img = apply_shadow_cast(exec, &img, shadow_cast, s.process.shadow_cast_strength)?;
        }

        let exposure = ExposureParams::from_settings(&s.exposure, mode);
        img = apply_exposure(exec, &img, &exposure)?;
        if mode.is_monochrome() {
            img = exec.map(&img, "monochrome", ColorDomain::LinearTransmittance, |p| {
                [luminance_rec709(p); 3]
            })?;
        }

        let spots: Vec<RetouchSpot> = s
            .retouch
            .manual_spots
            .iter()
            .map(|spot| spot.to_frame(&transform, crop))
            .collect();
        let strokes: Vec<LocalAdjustment> = s
            .retouch
            .local_adjustments
            .iter()
            .map(|a| a.to_frame(&transform, crop))
            .collect();
        let dust = s.retouch.dust_remove.then(|| DustConfig {
            dust_size: s.retouch.dust_size,
            ..DustConfig::new(s.retouch.dust_sensitivity, scale)
        });
        let retouched = apply_retouch(
            &img,
            &RetouchPass {
                dust,
                spots: &spots,
                adjustments: &strokes,
                scale,
                seed: s.retouch.seed,
            },
        )?;

        let img = apply_lab(exec, &retouched.image, &LabParams::from_settings(&s.lab, mode, scale))?;
        let image = apply_toning(exec, &img, &ToningParams::from_settings(&s.toning, exposure.output_gamma))?;

        Ok(Development {
            image,
            bounds,
            bounds_source,
            crop,
            shadow_cast,
            exposure,
            dust_spots: retouched.dust_spots,
        })
    }
}

/// Develops `buffer` with `settings` in `mode` and returns the
/// display-encoded print. `mode` replaces `settings.process.mode`.
pub fn run_pipeline(buffer: &ImageBuffer, settings: &DevelopSettings, mode: ProcessMode) -> OpsResult<ImageBuffer> {
    let mut settings = settings.clone();
    settings.process.mode = mode;
    Ok(Pipeline::new(settings).run(buffer)?.image)
}

/// Discards results of superseded runs.
///
/// Every run takes a ticket; only the newest ticket may deliver. Older runs
/// finish normally and their output is dropped.
#[derive(Debug, Default)]
pub struct RenderSession {
    latest: AtomicU64,
}

impl RenderSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a run, superseding every earlier one.
    pub fn begin(&self) -> u64 {
        self.latest.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn is_current(&self, ticket: u64) -> bool {
        self.latest.load(Ordering::SeqCst) == ticket
    }

    /// `Some(result)` when `ticket` is still the newest run.
    pub fn deliver<T>(&self, ticket: u64, result: T) -> Option<T> {
        if self.is_current(ticket) {
            Some(result)
        } else {
            debug!(ticket, "discarding superseded render");
            None
        }
    }

    /// Runs `pipeline` under a fresh ticket.
    pub fn render(&self, pipeline: &Pipeline, buffer: &ImageBuffer) -> OpsResult<Option<Development>> {
        let ticket = self.begin();
        let dev = pipeline.run(buffer)?;
        Ok(self.deliver(ticket, dev))
    }
}
