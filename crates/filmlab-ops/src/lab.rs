//! Perceptual refinement of the print.
//!
//! Stages run in a fixed order on linear print transmittance:
//!
//! 1. chroma denoise: 5x5 Gaussian on a*/b* only, L* untouched so grain
//!    survives
//! 2. spectral separation: calibration matrix blended with identity,
//!    applied to densities
//! 3. vibrance: chroma boost fading out toward already saturated colors
//! 4. saturation: uniform HSV scale on display-encoded values
//! 5. CLAHE on L* (optional)
//! 6. unsharp mask on L*, thresholded, applied as a luminance ratio
//!
//! Every stage is skipped when its control sits at the neutral value. All
//! stages dispatch through the [`Executor`]; CLAHE first gathers its tile
//! histograms in one reduction.

use rayon::prelude::*;
use tracing::{debug, trace};

use filmlab_color::{Mat3, hsv, lab, matrix, srgb};
use filmlab_compute::{Executor, Neighborhood, PixelKernel};
use filmlab_core::{ColorDomain, ImageBuffer, ProcessMode, clamp01};

use crate::OpsResult;
use crate::filter::{Convolve, Kernel};
use crate::settings::LabSettings;

/// Unsharp-mask gain applied to the `sharpen` setting.
pub const USM_BOOST: f32 = 2.5;

/// Detail below this many L* units is treated as noise.
pub const USM_THRESHOLD: f32 = 2.0;

/// Chroma at which vibrance stops boosting.
pub const VIBRANCE_CHROMA: f32 = 60.0;

/// CLAHE clip limit per unit of strength.
pub const CLAHE_CLIP_GAIN: f32 = 2.5;

const CLAHE_BINS: usize = 256;

const C41_SEPARATION: [f32; 9] = [1.0, -0.05, -0.02, -0.04, 1.0, -0.08, -0.01, -0.1, 1.0];
const E6_SEPARATION: [f32; 9] = [1.1, -0.06, -0.04, -0.04, 1.1, -0.06, -0.04, -0.06, 1.1];

/// Calibration matrix for a process, if it has one.
pub fn separation_matrix(mode: ProcessMode) -> Option<Mat3> {
    match mode {
        ProcessMode::C41 => Some(matrix::from_row_major(&C41_SEPARATION)),
        ProcessMode::E6 => Some(matrix::from_row_major(&E6_SEPARATION)),
        ProcessMode::Bw => None,
    }
}

/// Resolved refinement parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LabParams {
    /// Blended, row-normalized separation matrix.
    pub separation: Option<Mat3>,
    pub chroma_denoise: f32,
    pub vibrance: f32,
    pub saturation: f32,
    pub clahe_strength: f32,
    pub sharpen: f32,
    /// Resolution scale for the CLAHE grid.
    pub scale: f32,
}

impl LabParams {
    pub fn from_settings(settings: &LabSettings, mode: ProcessMode, scale: f32) -> Self {
        let strength = (settings.color_separation - 1.0).max(0.0);
        let base = match settings.separation_matrix {
            Some(m) => Some(matrix::from_row_major(&m)),
            None => separation_matrix(mode),
        };
        Self {
            separation: base
                .filter(|_| strength > 0.0)
                .map(|m| matrix::blend_with_identity(&m, strength)),
            chroma_denoise: settings.chroma_denoise.clamp(0.0, 1.0),
            vibrance: settings.vibrance,
            saturation: settings.saturation,
            clahe_strength: settings.clahe_strength.max(0.0),
            sharpen: settings.sharpen.max(0.0),
            scale,
        }
    }

    /// `true` when every stage would be skipped.
    pub fn is_identity(&self) -> bool {
        self.separation.is_none()
            && self.chroma_denoise == 0.0
            && self.vibrance == 1.0
            && self.saturation == 1.0
            && self.clahe_strength == 0.0
            && self.sharpen == 0.0
    }
}

/// Runs all refinement stages.
pub fn apply_lab(exec: &Executor, src: &ImageBuffer, params: &LabParams) -> OpsResult<ImageBuffer> {
    src.require_domain(ColorDomain::LinearTransmittance)?;
    trace!(width = src.width(), height = src.height(), "lab");
    if params.is_identity() {
        return Ok(src.clone());
    }

    let mut img = src.clone();
    if params.chroma_denoise > 0.0 {
        img = chroma_denoise(exec, &img, params.chroma_denoise)?;
    }
    if let Some(m) = params.separation {
        img = apply_separation(exec, &img, &m)?;
    }
    if params.vibrance != 1.0 {
        img = apply_vibrance(exec, &img, params.vibrance)?;
    }
    if params.saturation != 1.0 {
        img = apply_saturation(exec, &img, params.saturation)?;
    }
    if params.clahe_strength > 0.0 {
        img = apply_clahe(exec, &img, params.clahe_strength, params.scale)?;
    }
    if params.sharpen > 0.0 {
        img = apply_sharpen(exec, &img, params.sharpen)?;
    }
    Ok(img)
}

/// Blurs a*/b* with the shared 5x5 Gaussian.
pub fn chroma_denoise(exec: &Executor, src: &ImageBuffer, strength: f32) -> OpsResult<ImageBuffer> {
    let lab_img = exec.map(src, "to_lab", ColorDomain::PerceptualLab, lab::linear_to_lab)?;
    let kernel = Kernel::gaussian_5x5();
    let smoothed = exec.run(&lab_img, &Convolve::new(&kernel, [false, true, true]).with_mix(strength))?;
    Ok(exec.map(&smoothed, "from_lab", ColorDomain::LinearTransmittance, |p| {
        clamp01(lab::lab_to_linear(p))
    })?)
}

/// Applies a separation matrix to densities.
pub fn apply_separation(exec: &Executor, src: &ImageBuffer, m: &Mat3) -> OpsResult<ImageBuffer> {
    let m = *m;
    Ok(exec.map(src, "separation", ColorDomain::LinearTransmittance, move |p| {
        let d = p.map(|v| -v.clamp(1e-6, 1.0).log10());
        matrix::apply(&m, d).map(|v| 10f32.powf(-v).clamp(0.0, 1.0))
    })?)
}

/// Vibrance: `a, b *= 1 + (s - 1) * clamp(1 - chroma / 60)`.
pub fn apply_vibrance(exec: &Executor, src: &ImageBuffer, vibrance: f32) -> OpsResult<ImageBuffer> {
    Ok(exec.map(src, "vibrance", ColorDomain::LinearTransmittance, move |p| {
        let mut l = lab::linear_to_lab(p);
        let mask = (1.0 - lab::chroma(l) / VIBRANCE_CHROMA).clamp(0.0, 1.0);
        let gain = 1.0 + (vibrance - 1.0) * mask;
        l[1] *= gain;
        l[2] *= gain;
        clamp01(lab::lab_to_linear(l))
    })?)
}

/// Uniform HSV saturation on display-encoded values.
pub fn apply_saturation(exec: &Executor, src: &ImageBuffer, saturation: f32) -> OpsResult<ImageBuffer> {
    Ok(exec.map(src, "saturation", ColorDomain::LinearTransmittance, move |p| {
        let encoded = srgb::oetf_rgb(clamp01(p));
        srgb::eotf_rgb(hsv::scale_saturation(encoded, saturation))
    })?)
}

/// L* plane scaled to `[0, 1]`.
fn lightness_plane(src: &ImageBuffer) -> Vec<f32> {
    src.data()
        .par_chunks_exact(3)
        .map(|p| lab::lightness([p[0], p[1], p[2]]) / 100.0)
        .collect()
}

/// Scales `p` so its luminance follows L* moving from `old` to `new`
/// (both scaled to `[0, 1]`).
#[inline]
fn with_lightness(p: [f32; 3], old: f32, new: f32) -> [f32; 3] {
    if old == new {
        return p;
    }
    let y_old = lab::lightness_to_luminance(old * 100.0);
    let y_new = lab::lightness_to_luminance(new * 100.0);
    let ratio = y_new / y_old.max(1e-6);
    p.map(|v| (v * ratio).clamp(0.0, 1.0))
}

/// Per-pixel CLAHE lookup blended by `mix`.
struct ClaheMap {
    tiles: ClaheTiles,
    mix: f32,
}

impl PixelKernel for ClaheMap {
    fn name(&self) -> &'static str {
        "clahe"
    }

    fn apply(&self, n: &Neighborhood<'_>) -> [f32; 3] {
        let p = n.center();
        let l = lab::lightness(p) / 100.0;
        let eq = self.tiles.eval(n.x(), n.y(), l);
        with_lightness(p, l, l + (eq - l) * self.mix)
    }
}

/// Local contrast on L*: CLAHE blended by `strength`.
pub fn apply_clahe(exec: &Executor, src: &ImageBuffer, strength: f32, scale: f32) -> OpsResult<ImageBuffer> {
    let (w, h) = src.dimensions();
    let grid = ((8.0 * scale).round() as usize).max(2);
    let clip = strength * CLAHE_CLIP_GAIN;
    let tiles = ClaheTiles::new(&lightness_plane(src), w, h, grid, clip);
    debug!(grid, tiles_x = tiles.gx, tiles_y = tiles.gy, clip, "clahe");
    let kernel = ClaheMap {
        tiles,
        mix: strength.min(1.0),
    };
    Ok(exec.run(src, &kernel)?)
}

/// Unsharp mask on L*, thresholded, applied as a luminance ratio.
struct Sharpen {
    kernel: Kernel,
    amount: f32,
    threshold: f32,
}

impl PixelKernel for Sharpen {
    fn name(&self) -> &'static str {
        "sharpen"
    }

    fn radius(&self) -> usize {
        let (rx, ry) = self.kernel.radius();
        rx.max(ry)
    }

    fn apply(&self, n: &Neighborhood<'_>) -> [f32; 3] {
        let p = n.center();
        let l = lab::lightness(p) / 100.0;
        let blurred = self.kernel.weighted_sum(n, |q| lab::lightness(q) / 100.0);
        let detail = l - blurred;
        if detail.abs() < self.threshold {
            return p;
        }
        with_lightness(p, l, (l + detail * self.amount).clamp(0.0, 1.0))
    }
}

/// Unsharp mask on L* with the shared 5x5 Gaussian.
pub fn apply_sharpen(exec: &Executor, src: &ImageBuffer, sharpen: f32) -> OpsResult<ImageBuffer> {
    let kernel = Sharpen {
        kernel: Kernel::gaussian_5x5(),
        amount: sharpen * USM_BOOST,
        threshold: USM_THRESHOLD / 100.0,
    };
    Ok(exec.run(src, &kernel)?)
}

/// Contrast-limited adaptive histogram equalization of a `[0, 1]` plane.
///
/// The plane is split into tiles of `ceil(extent / grid)` pixels per axis;
/// the tile count follows from that size, so every tile holds pixels. Each
/// tile's histogram is clipped at `clip` times the mean bin count, the
/// excess spread evenly, and lookups are bilinearly interpolated between
/// tile centers.
pub struct ClaheTiles {
    gx: usize,
    gy: usize,
    tile_w: usize,
    tile_h: usize,
    luts: Vec<Vec<f32>>,
}

impl ClaheTiles {
    pub fn new(plane: &[f32], width: usize, height: usize, grid: usize, clip: f32) -> Self {
        let grid = grid.max(1);
        let tile_w = width.div_ceil(grid).max(1);
        let tile_h = height.div_ceil(grid).max(1);
        let gx = width.div_ceil(tile_w).max(1);
        let gy = height.div_ceil(tile_h).max(1);

        let luts = (0..gx * gy)
            .into_par_iter()
            .map(|t| {
                let (tx, ty) = (t % gx, t / gx);
                let (x0, y0) = (tx * tile_w, ty * tile_h);
                let x1 = (x0 + tile_w).min(width);
                let y1 = (y0 + tile_h).min(height);
                let mut hist = vec![0.0f32; CLAHE_BINS];
                for y in y0..y1 {
                    for x in x0..x1 {
                        hist[clahe_bin(plane[y * width + x])] += 1.0;
                    }
                }
                clipped_cdf(hist, x1.saturating_sub(x0) * y1.saturating_sub(y0), clip)
            })
            .collect();
        Self { gx, gy, tile_w, tile_h, luts }
    }

    /// Equalized value of `v` at pixel `(x, y)`.
    pub fn eval(&self, x: usize, y: usize, v: f32) -> f32 {
        let (gx, gy) = (self.gx, self.gy);
        let fy = ((y as f32 + 0.5) / self.tile_h as f32 - 0.5).clamp(0.0, (gy - 1) as f32);
        let fx = ((x as f32 + 0.5) / self.tile_w as f32 - 0.5).clamp(0.0, (gx - 1) as f32);
        let (ty0, tx0) = (fy.floor() as usize, fx.floor() as usize);
        let (ty1, tx1) = ((ty0 + 1).min(gy - 1), (tx0 + 1).min(gx - 1));
        let (wy, wx) = (fy - ty0 as f32, fx - tx0 as f32);
        let b = clahe_bin(v);
        let lut = |tx: usize, ty: usize| self.luts[ty * gx + tx][b];
        let top = lut(tx0, ty0) * (1.0 - wx) + lut(tx1, ty0) * wx;
        let bottom = lut(tx0, ty1) * (1.0 - wx) + lut(tx1, ty1) * wx;
        (top * (1.0 - wy) + bottom * wy).clamp(0.0, 1.0)
    }
}

#[inline]
fn clahe_bin(v: f32) -> usize {
    ((v.clamp(0.0, 1.0) * (CLAHE_BINS - 1) as f32).round() as usize).min(CLAHE_BINS - 1)
}

/// Normalized cumulative histogram after clipping. An empty histogram maps
/// every bin to itself.
fn clipped_cdf(hist: Vec<f32>, count: usize, clip: f32) -> Vec<f32> {
    if count == 0 {
        return (0..CLAHE_BINS).map(|b| b as f32 / (CLAHE_BINS - 1) as f32).collect();
    }
    let n = count as f32;
    let limit = (clip * n / CLAHE_BINS as f32).max(1.0);
    let excess: f32 = hist.iter().map(|c| (c - limit).max(0.0)).sum();
    let bonus = excess / CLAHE_BINS as f32;
    let mut acc = 0.0f32;
    hist.iter()
        .map(|c| {
            acc += c.min(limit) + bonus;
            acc / n
        })
        .collect()
}
