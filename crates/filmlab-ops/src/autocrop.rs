//! Film border detection.
//!
//! Scanner border and clear film base transmit almost all light; the image
//! area does not. Row and column luminance profiles of a reduced copy are
//! thresholded to find the image area, each edge is snapped to the steepest
//! profile step nearby, then the box is inset and fitted to an aspect ratio.

use std::str::FromStr;

use tracing::{debug, trace};

use filmlab_core::{ImageBuffer, Rect};

use crate::filter::box_downscale;
use crate::{OpsError, OpsResult};

/// Long edge of the reduced copy used for detection.
pub const DETECT_RESOLUTION: usize = 1800;

/// Default luminance threshold separating frame from border.
pub const DEFAULT_THRESHOLD: f32 = 0.96;

/// Fewest content rows (or columns) accepted as a frame.
const MIN_CONTENT_LINES: usize = 10;

/// Half-width of the edge refinement search, in reduced pixels.
const REFINE_WINDOW: usize = 6;

/// Target aspect ratio for autocrop.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AspectRatio {
    /// 35mm.
    R3x2,
    /// 645.
    R4x3,
    /// 4x5 sheet.
    R5x4,
    /// 6x7.
    R6x7,
    /// 6x6.
    R1x1,
    /// XPan.
    R65x24,
    /// Any other `w:h`.
    Custom(f32, f32),
}

impl AspectRatio {
    /// Width over height as written (may be below 1).
    pub fn value(&self) -> f32 {
        let (w, h) = self.parts();
        w / h
    }

    fn parts(&self) -> (f32, f32) {
        match *self {
            Self::R3x2 => (3.0, 2.0),
            Self::R4x3 => (4.0, 3.0),
            Self::R5x4 => (5.0, 4.0),
            Self::R6x7 => (6.0, 7.0),
            Self::R1x1 => (1.0, 1.0),
            Self::R65x24 => (65.0, 24.0),
            Self::Custom(w, h) => (w, h),
        }
    }
}

impl Default for AspectRatio {
    fn default() -> Self {
        Self::R3x2
    }
}

impl FromStr for AspectRatio {
    type Err = OpsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bad = || OpsError::InvalidParameter(format!("aspect ratio '{s}'"));
        let (w, h) = s.trim().split_once(':').ok_or_else(bad)?;
        let w: f32 = w.trim().parse().map_err(|_| bad())?;
        let h: f32 = h.trim().parse().map_err(|_| bad())?;
        if !(w > 0.0 && h > 0.0 && w.is_finite() && h.is_finite()) {
            return Err(bad());
        }
        Ok(match (w as u32, h as u32, w.fract() == 0.0 && h.fract() == 0.0) {
            (3, 2, true) => Self::R3x2,
            (4, 3, true) => Self::R4x3,
            (5, 4, true) => Self::R5x4,
            (6, 7, true) => Self::R6x7,
            (1, 1, true) => Self::R1x1,
            (65, 24, true) => Self::R65x24,
            _ => Self::Custom(w, h),
        })
    }
}

impl std::fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let (w, h) = self.parts();
        write!(f, "{w}:{h}")
    }
}

/// Autocrop parameters.
#[derive(Debug, Clone, Copy)]
pub struct AutocropParams {
    /// Extra inset in reference pixels (added to a fixed 2 px).
    pub offset: f32,
    /// Resolution scale (`long_edge / render_size_ref`).
    pub scale: f32,
    /// Aspect ratio to enforce.
    pub ratio: AspectRatio,
    /// Luminance of a user-picked border sample, overriding the threshold.
    pub assist_luma: Option<f32>,
}

impl Default for AutocropParams {
    fn default() -> Self {
        Self {
            offset: 2.0,
            scale: 1.0,
            ratio: AspectRatio::default(),
            assist_luma: None,
        }
    }
}

impl AutocropParams {
    /// Border threshold in effect.
    pub fn threshold(&self) -> f32 {
        match self.assist_luma {
            Some(l) => (l - 0.02).clamp(0.5, 0.98),
            None => DEFAULT_THRESHOLD,
        }
    }
}

/// Detects the image area of a linear scan. Falls back to the full frame
/// when too little content is found.
pub fn detect_crop(src: &ImageBuffer, params: &AutocropParams) -> Rect {
    let (w, h) = src.dimensions();
    let full = src.bounds();
    trace!(width = w, height = h, threshold = params.threshold(), "autocrop");

    let (small, det_scale) = box_downscale(src, DETECT_RESOLUTION);
    let (sw, sh) = small.dimensions();
    let lum = small.luminance();

    let rows: Vec<f32> = (0..sh)
        .map(|y| lum[y * sw..(y + 1) * sw].iter().sum::<f32>() / sw as f32)
        .collect();
    let cols: Vec<f32> = (0..sw)
        .map(|x| (0..sh).map(|y| lum[y * sw + x]).sum::<f32>() / sh as f32)
        .collect();

    let threshold = params.threshold();
    let (Some((top, bottom)), Some((left, right))) = (
        content_span(&rows, threshold),
        content_span(&cols, threshold),
    ) else {
        debug!("autocrop found no frame, keeping full frame");
        return full;
    };

    let top = refine_edge(&rows, top);
    let bottom = refine_edge(&rows, bottom);
    let left = refine_edge(&cols, left);
    let right = refine_edge(&cols, right);

    let to_full = |v: usize| v as f32 / det_scale;
    let margin = (2.0 + params.offset) * params.scale;
    let x1 = (to_full(left) + margin).max(0.0) as usize;
    let y1 = (to_full(top) + margin).max(0.0) as usize;
    let x2 = ((to_full(right) - margin).max(0.0) as usize).min(w);
    let y2 = ((to_full(bottom) - margin).max(0.0) as usize).min(h);
    if x2 <= x1 || y2 <= y1 {
        return full;
    }

    let rect = enforce_aspect(Rect::new(x1, y1, x2 - x1, y2 - y1), w, h, params.ratio);
    debug!(%rect, "autocrop");
    rect
}

/// First and last indices whose profile value is below `threshold`.
fn content_span(profile: &[f32], threshold: f32) -> Option<(usize, usize)> {
    let count = profile.iter().filter(|&&v| v < threshold).count();
    if count < MIN_CONTENT_LINES {
        return None;
    }
    let first = profile.iter().position(|&v| v < threshold)?;
    let last = profile.iter().rposition(|&v| v < threshold)?;
    Some((first, last))
}

/// Index of the steepest step within [`REFINE_WINDOW`] of `idx`.
fn refine_edge(profile: &[f32], idx: usize) -> usize {
    if profile.len() < 2 {
        return idx;
    }
    let lo = idx.saturating_sub(REFINE_WINDOW);
    let hi = (idx + REFINE_WINDOW).min(profile.len() - 2);
    let mut best = idx;
    let mut best_step = 0.0f32;
    for i in lo..=hi {
        let step = (profile[i + 1] - profile[i]).abs();
        if step > best_step {
            best_step = step;
            // the edge belongs to whichever side is darker
            best = if profile[i + 1] < profile[i] { i + 1 } else { i };
        }
    }
    best
}

/// Shrinks `rect` around its center to `ratio`, oriented like `rect`.
pub fn enforce_aspect(rect: Rect, width: usize, height: usize, ratio: AspectRatio) -> Rect {
    if rect.is_empty() {
        return Rect::from_size(width, height);
    }
    let (cw, ch) = (rect.width as f32, rect.height as f32);
    let mut target = ratio.value();
    let vertical = ch > cw;
    if (vertical && target > 1.0) || (!vertical && target < 1.0) {
        target = 1.0 / target;
    }

    let (mut x1, mut y1, mut x2, mut y2) = (rect.x, rect.y, rect.right(), rect.bottom());
    if cw / ch > target {
        let tw = ch * target;
        let nx1 = rect.x as f32 + (cw - tw) / 2.0;
        x1 = nx1 as usize;
        x2 = (nx1 + tw) as usize;
    } else {
        let th = cw / target;
        let ny1 = rect.y as f32 + (ch - th) / 2.0;
        y1 = ny1 as usize;
        y2 = (ny1 + th) as usize;
    }
    let x2 = x2.min(width);
    let y2 = y2.min(height);
    if x2 <= x1 || y2 <= y1 {
        return rect;
    }
    Rect::new(x1, y1, x2 - x1, y2 - y1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use filmlab_core::ColorDomain;

    fn framed(w: usize, h: usize, frame: Rect) -> ImageBuffer {
        ImageBuffer::from_fn(w, h, ColorDomain::LinearTransmittance, |x, y| {
            if frame.contains(x, y) { [0.3, 0.25, 0.2] } else { [1.0; 3] }
        })
    }

    #[test]
    fn test_ratio_parse() {
        assert_eq!("3:2".parse::<AspectRatio>().unwrap(), AspectRatio::R3x2);
        assert_eq!("65:24".parse::<AspectRatio>().unwrap(), AspectRatio::R65x24);
        assert_eq!(" 16 : 9 ".parse::<AspectRatio>().unwrap(), AspectRatio::Custom(16.0, 9.0));
        assert!("wide".parse::<AspectRatio>().is_err());
        assert!("3:0".parse::<AspectRatio>().is_err());
    }

    #[test]
    fn test_detects_frame() {
        let frame = Rect::new(20, 10, 150, 100);
        let img = framed(200, 120, frame);
        let params = AutocropParams {
            offset: 0.0,
            ..AutocropParams::default()
        };
        let rect = detect_crop(&img, &params);
        // inside the frame, roughly 3:2, clear of the border
        assert!(rect.x >= 20 && rect.y >= 10);
        assert!(rect.right() <= 170 && rect.bottom() <= 110);
        assert!((rect.aspect() - 1.5).abs() < 0.05, "{rect}");
        assert!(rect.width > 130);
    }

    #[test]
    fn test_blank_frame_falls_back() {
        let img = ImageBuffer::filled(64, 64, ColorDomain::LinearTransmittance, [1.0; 3]);
        assert_eq!(detect_crop(&img, &AutocropParams::default()), img.bounds());
    }

    #[test]
    fn test_assist_threshold() {
        let p = AutocropParams {
            assist_luma: Some(0.3),
            ..AutocropParams::default()
        };
        assert!((p.threshold() - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_enforce_aspect_follows_orientation() {
        let portrait = enforce_aspect(Rect::new(0, 0, 100, 200), 100, 200, AspectRatio::R3x2);
        assert!(portrait.height > portrait.width);
        assert!((portrait.aspect() - 2.0 / 3.0).abs() < 0.02);

        let wide = enforce_aspect(Rect::new(0, 0, 300, 100), 300, 100, AspectRatio::R3x2);
        assert_eq!(wide, Rect::new(75, 0, 150, 100));
    }
}
