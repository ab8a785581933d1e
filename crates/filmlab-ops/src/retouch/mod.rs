//! Retouch engine: dust removal, spot healing and dodge/burn.
//!
//! Healing is an ordered fold of immutable [`RetouchSpot`] records over a
//! buffer. Every spot reads the buffer as left by the spots before it, so
//! overlapping spots accumulate (a scratch is healed by a chain of spots).
//! Spots on one buffer are never processed in parallel.
//!
//! Spot positions are canonical: the center is normalized to the frame and
//! the radius is a fraction of the frame's long edge, so the same record
//! heals the same area at preview and export resolution.
//!
//! # Example
//!
//! ```rust
//! use filmlab_core::{ColorDomain, ImageBuffer};
//! use filmlab_ops::retouch::{RetouchSpot, apply_heal};
//!
//! let mut img = ImageBuffer::filled(32, 32, ColorDomain::LinearTransmittance, [0.4; 3]);
//! img.set_pixel(16, 16, [1.0; 3]);
//! let healed = apply_heal(&img, &[RetouchSpot::manual([0.515, 0.515], 0.1)]).unwrap();
//! assert!(healed.pixel(16, 16)[0] < 0.5);
//! ```

pub mod dust;
pub mod grain;
pub mod heal;
pub mod local;

pub use dust::{DustCandidate, DustConfig, detect_dust, detect_dust_with};
pub use grain::SpotRng;
pub use local::{LocalAdjustment, apply_local_adjustments};

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use filmlab_core::{ColorDomain, ImageBuffer, Rect, luminance_rec709};

use crate::OpsResult;
use crate::geometry::GeometryTransform;

/// Which path created a spot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SpotSource {
    /// Found by the dust detector; healed by perimeter sampling with grain.
    Automatic,
    /// Placed by the user; healed by boundary sampling with luminance keying.
    #[default]
    Manual,
}

/// One healing operation in canonical coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RetouchSpot {
    /// Normalized `[x, y]` of the center.
    pub center: [f32; 2],
    /// Radius as a fraction of the frame's long edge.
    pub radius: f32,
    #[serde(default)]
    pub source: SpotSource,
}

impl RetouchSpot {
    /// User-placed spot.
    pub fn manual(center: [f32; 2], radius: f32) -> Self {
        Self {
            center,
            radius,
            source: SpotSource::Manual,
        }
    }

    /// Detector-placed spot.
    pub fn automatic(center: [f32; 2], radius: f32) -> Self {
        Self {
            center,
            radius,
            source: SpotSource::Automatic,
        }
    }

    /// Center in pixel units for a `width x height` frame.
    pub fn pixel_center(&self, width: usize, height: usize) -> (f32, f32) {
        (self.center[0] * width as f32, self.center[1] * height as f32)
    }

    /// Radius in pixels for a `width x height` frame, at least one pixel.
    pub fn pixel_radius(&self, width: usize, height: usize) -> f32 {
        (self.radius * width.max(height) as f32).max(1.0)
    }

    /// Re-expresses a source-frame spot in the cropped output frame.
    pub fn to_frame(&self, transform: &GeometryTransform, crop: Rect) -> Self {
        let (sw, sh) = transform.source_size();
        let px = self.radius * sw.max(sh) as f32;
        Self {
            center: map_to_frame(transform, crop, self.center),
            radius: px / crop.width.max(crop.height).max(1) as f32,
            source: self.source,
        }
    }

    /// Heals this spot on `img`, consuming and returning the buffer.
    pub fn heal(&self, img: ImageBuffer, seed: u64) -> ImageBuffer {
        let (w, h) = img.dimensions();
        let (cx, cy) = self.pixel_center(w, h);
        let radius = self.pixel_radius(w, h);
        let mut rng = SpotRng::for_spot(seed, self.center[0], self.center[1]);
        match self.source {
            SpotSource::Automatic => dust::heal_spot(img, cx, cy, radius, &mut rng),
            SpotSource::Manual => heal::heal_manual(img, cx, cy, radius, &mut rng),
        }
    }
}

/// Maps a normalized source-frame point into a normalized crop-frame point.
pub fn map_to_frame(transform: &GeometryTransform, crop: Rect, point: [f32; 2]) -> [f32; 2] {
    let (ox, oy) = transform.forward_point(point[0], point[1]);
    let (ow, oh) = transform.output_size();
    let u = ox * ow as f32 - crop.x as f32;
    let v = oy * oh as f32 - crop.y as f32;
    [u / crop.width.max(1) as f32, v / crop.height.max(1) as f32]
}

/// Folds `spots` over `buffer` in order with seed 0.
pub fn apply_heal(buffer: &ImageBuffer, spots: &[RetouchSpot]) -> OpsResult<ImageBuffer> {
    apply_heal_seeded(buffer, spots, 0)
}

/// Folds `spots` over `buffer` in order.
pub fn apply_heal_seeded(buffer: &ImageBuffer, spots: &[RetouchSpot], seed: u64) -> OpsResult<ImageBuffer> {
    buffer.require_domain(ColorDomain::LinearTransmittance)?;
    trace!(width = buffer.width(), height = buffer.height(), spots = spots.len(), "apply_heal");
    Ok(spots
        .iter()
        .fold(buffer.clone(), |img, spot| spot.heal(img, seed)))
}

/// Everything the retouch stage does to one buffer.
#[derive(Debug, Clone, Default)]
pub struct RetouchPass<'a> {
    /// Automatic dust removal, when enabled.
    pub dust: Option<DustConfig>,
    /// Manual spots in this frame's coordinates.
    pub spots: &'a [RetouchSpot],
    /// Dodge/burn strokes in this frame's coordinates.
    pub adjustments: &'a [LocalAdjustment],
    /// Resolution scale for pixel-sized values.
    pub scale: f32,
    pub seed: u64,
}

/// Retouch result.
#[derive(Debug, Clone)]
pub struct Retouched {
    pub image: ImageBuffer,
    /// Spots the dust detector produced.
    pub dust_spots: usize,
}

/// Runs dust removal, then manual spots, then dodge/burn.
pub fn apply_retouch(buffer: &ImageBuffer, pass: &RetouchPass<'_>) -> OpsResult<Retouched> {
    buffer.require_domain(ColorDomain::LinearTransmittance)?;
    let (w, h) = buffer.dimensions();

    let mut spots: Vec<RetouchSpot> = match &pass.dust {
        Some(config) => detect_dust_with(buffer, config)
            .iter()
            .map(|c| c.to_spot(w, h))
            .collect(),
        None => Vec::new(),
    };
    let dust_spots = spots.len();
    debug!(dust_spots, manual = pass.spots.len(), adjustments = pass.adjustments.len(), "retouch");
    spots.extend_from_slice(pass.spots);

    let healed = apply_heal_seeded(buffer, &spots, pass.seed)?;
    let image = apply_local_adjustments(&healed, pass.adjustments, pass.scale)?;
    Ok(Retouched { image, dust_spots })
}

/// Pixel of lowest luminance in the 3x3 window at `(x, y)`, edge clamped.
pub(crate) fn min_luma_sample(img: &ImageBuffer, x: isize, y: isize) -> [f32; 3] {
    let mut best = img.pixel_clamped(x, y);
    let mut best_luma = luminance_rec709(best);
    for dy in -1..=1 {
        for dx in -1..=1 {
            let p = img.pixel_clamped(x + dx, y + dy);
            let l = luminance_rec709(p);
            if l < best_luma {
                best = p;
                best_luma = l;
            }
        }
    }
    best
}

/// Pixel-index bounds of the disc `(cx, cy, r)` clipped to the frame.
pub(crate) fn disc_bounds(cx: f32, cy: f32, r: f32, width: usize, height: usize) -> Option<Rect> {
    let x0 = (cx - r).floor().max(0.0) as usize;
    let y0 = (cy - r).floor().max(0.0) as usize;
    let x1 = ((cx + r).ceil().max(0.0) as usize).min(width);
    let y1 = ((cy + r).ceil().max(0.0) as usize).min(height);
    (x1 > x0 && y1 > y0).then(|| Rect::new(x0, y0, x1 - x0, y1 - y0))
}
