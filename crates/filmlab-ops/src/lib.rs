//! # filmlab-ops
//!
//! Film development on scanned negatives and slides.
//!
//! Each stage consumes a buffer and produces a new one, tagged with the
//! color domain it produced.
//!
//! # Modules
//!
//! - [`geometry`], [`autocrop`] - rotation, flips and crop
//! - [`bounds`], [`roll`] - per-channel log bounds for one frame or a batch
//! - [`normalize`], [`shadows`] - log-density normalization and shadow cast
//! - [`exposure`] - virtual enlarger and H&D print curve
//! - [`retouch`] - dust detection, spot healing, dodge and burn
//! - [`lab`] - separation, vibrance, saturation, CLAHE, sharpening
//! - [`toning`] - paper, selenium, sepia, display gamma
//! - [`pipeline`] - all of the above in order
//!
//! # Example
//!
//! ```rust
//! use filmlab_core::{ColorDomain, ImageBuffer, ProcessMode};
//! use filmlab_ops::{DevelopSettings, analyze_bounds, run_pipeline};
//!
//! let scan = ImageBuffer::from_fn(48, 32, ColorDomain::LinearTransmittance, |x, _| {
//!     let t = 0.08 + 0.5 * x as f32 / 47.0;
//!     [t, t * 0.6, t * 0.4]
//! });
//! let bounds = analyze_bounds(&scan, ProcessMode::C41, 0.07).unwrap();
//! assert!(bounds.floors[0] < bounds.ceils[0]);
//!
//! let print = run_pipeline(&scan, &DevelopSettings::default(), ProcessMode::C41).unwrap();
//! assert!(print.is_finite());
//! ```

mod error;
pub mod autocrop;
pub mod bounds;
pub mod exposure;
pub mod filter;
pub mod geometry;
pub mod lab;
pub mod normalize;
pub mod pipeline;
pub mod retouch;
pub mod roll;
pub mod settings;
pub mod shadows;
pub mod toning;

pub use error::{OpsError, OpsResult};
pub use bounds::{ChannelBounds, analyze_bounds};
pub use exposure::ExposureParams;
pub use pipeline::{Development, Pipeline, RenderSession, run_pipeline};
pub use retouch::{DustCandidate, RetouchSpot, apply_heal, detect_dust};
pub use roll::{Roll, analyze_roll};
pub use settings::DevelopSettings;
