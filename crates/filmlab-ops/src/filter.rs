//! Convolution and neighborhood statistics.
//!
//! # Kernels
//!
//! [`Kernel::gaussian`] builds a normalized Gaussian. The fixed 5x5 Gaussian
//! ([`Kernel::gaussian_5x5`]) is shared by chroma denoise and sharpening so
//! both see the same spatial support.
//!
//! # Example
//!
//! ```rust
//! use filmlab_compute::Executor;
//! use filmlab_core::{ColorDomain, ImageBuffer};
//! use filmlab_ops::filter::{Convolve, Kernel};
//!
//! let src = ImageBuffer::filled(16, 16, ColorDomain::LinearTransmittance, [0.5; 3]);
//! let k = Kernel::gaussian(3, 1.0);
//! let blurred = Executor::cpu().run(&src, &Convolve::new(&k, [true; 3])).unwrap();
//! assert!((blurred.pixel(8, 8)[0] - 0.5).abs() < 1e-6);
//! ```

use filmlab_compute::{Neighborhood, PixelKernel};
use filmlab_core::ImageBuffer;

/// Convolution kernel for image filtering.
#[derive(Debug, Clone)]
pub struct Kernel {
    /// Kernel weights, row-major.
    pub data: Vec<f32>,
    /// Kernel width (odd).
    pub width: usize,
    /// Kernel height (odd).
    pub height: usize,
}

impl Kernel {
    /// Creates a normalized Gaussian kernel.
    ///
    /// ```rust
    /// use filmlab_ops::filter::Kernel;
    ///
    /// let k = Kernel::gaussian(5, 1.0);
    /// assert_eq!(k.width, 5);
    /// assert!((k.data.iter().sum::<f32>() - 1.0).abs() < 1e-5);
    /// ```
    pub fn gaussian(size: usize, sigma: f32) -> Self {
        let size = if size % 2 == 0 { size + 1 } else { size };
        let half = (size / 2) as i32;
        let sigma2 = 2.0 * sigma * sigma;

        let mut data = Vec::with_capacity(size * size);
        let mut sum = 0.0f32;
        for y in -half..=half {
            for x in -half..=half {
                let w = (-((x * x + y * y) as f32) / sigma2).exp();
                data.push(w);
                sum += w;
            }
        }
        for w in &mut data {
            *w /= sum;
        }

        Self { data, width: size, height: size }
    }

    /// The 5x5, sigma 1 Gaussian used by denoise and sharpening.
    pub fn gaussian_5x5() -> Self {
        Self::gaussian(5, 1.0)
    }

    /// Returns the kernel radius (half-size).
    #[inline]
    pub fn radius(&self) -> (usize, usize) {
        (self.width / 2, self.height / 2)
    }

    /// Weighted sum of `value` over the kernel footprint around `n`.
    #[inline]
    pub fn weighted_sum(&self, n: &Neighborhood<'_>, value: impl Fn([f32; 3]) -> f32) -> f32 {
        let (rx, ry) = self.radius();
        let mut sum = 0.0f32;
        for ky in 0..self.height {
            for kx in 0..self.width {
                let p = n.get(kx as isize - rx as isize, ky as isize - ry as isize);
                sum += value(p) * self.data[ky * self.width + kx];
            }
        }
        sum
    }
}

/// Convolution of selected channels; unselected channels pass through.
///
/// The result is blended with the source by [`mix`](Convolve::with_mix),
/// full strength by default.
pub struct Convolve<'k> {
    kernel: &'k Kernel,
    channels: [bool; 3],
    mix: f32,
}

impl<'k> Convolve<'k> {
    /// Convolves the channels flagged in `channels`.
    pub fn new(kernel: &'k Kernel, channels: [bool; 3]) -> Self {
        Self { kernel, channels, mix: 1.0 }
    }

    /// Moves each convolved channel only `mix` of the way to its blur.
    pub fn with_mix(mut self, mix: f32) -> Self {
        self.mix = mix;
        self
    }
}

impl PixelKernel for Convolve<'_> {
    fn name(&self) -> &'static str {
        "convolve"
    }

    fn radius(&self) -> usize {
        let (rx, ry) = self.kernel.radius();
        rx.max(ry)
    }

    fn apply(&self, n: &Neighborhood<'_>) -> [f32; 3] {
        let center = n.center();
        std::array::from_fn(|c| {
            if self.channels[c] {
                let blurred = self.kernel.weighted_sum(n, |p| p[c]);
                center[c] + (blurred - center[c]) * self.mix
            } else {
                center[c]
            }
        })
    }
}

/// Area-average downscale so the long edge is at most `max_edge`.
///
/// Returns the buffer and the factor applied (`<= 1`).
pub fn box_downscale(src: &ImageBuffer, max_edge: usize) -> (ImageBuffer, f32) {
    let long = src.long_edge();
    if long <= max_edge || max_edge == 0 {
        return (src.clone(), 1.0);
    }
    let scale = max_edge as f32 / long as f32;
    let dw = ((src.width() as f32 * scale) as usize).max(1);
    let dh = ((src.height() as f32 * scale) as usize).max(1);
    let fx = src.width() as f32 / dw as f32;
    let fy = src.height() as f32 / dh as f32;

    let out = ImageBuffer::from_fn(dw, dh, src.domain(), |x, y| {
        let x0 = (x as f32 * fx) as usize;
        let x1 = (((x + 1) as f32 * fx) as usize).clamp(x0 + 1, src.width());
        let y0 = (y as f32 * fy) as usize;
        let y1 = (((y + 1) as f32 * fy) as usize).clamp(y0 + 1, src.height());
        let mut acc = [0.0f32; 3];
        for sy in y0..y1 {
            for sx in x0..x1 {
                let p = src.pixel(sx, sy);
                for c in 0..3 {
                    acc[c] += p[c];
                }
            }
        }
        let n = ((x1 - x0) * (y1 - y0)) as f32;
        acc.map(|v| v / n)
    });
    (out, scale)
}

/// Summed-area tables of a plane and its square for O(1) window statistics.
pub struct IntegralImage {
    width: usize,
    height: usize,
    sum: Vec<f64>,
    sq: Vec<f64>,
}

impl IntegralImage {
    /// Builds the tables for a `width x height` plane.
    pub fn new(plane: &[f32], width: usize, height: usize) -> Self {
        let stride = width + 1;
        let mut sum = vec![0.0f64; stride * (height + 1)];
        let mut sq = vec![0.0f64; stride * (height + 1)];
        for y in 0..height {
            let mut row_sum = 0.0f64;
            let mut row_sq = 0.0f64;
            for x in 0..width {
                let v = plane[y * width + x] as f64;
                row_sum += v;
                row_sq += v * v;
                let i = (y + 1) * stride + x + 1;
                sum[i] = sum[i - stride] + row_sum;
                sq[i] = sq[i - stride] + row_sq;
            }
        }
        Self { width, height, sum, sq }
    }

    /// `(sum, sum of squares, count)` over the square window of `radius`
    /// around `(x, y)`, clipped to the plane.
    pub fn window(&self, x: usize, y: usize, radius: usize) -> (f64, f64, usize) {
        let x0 = x.saturating_sub(radius);
        let y0 = y.saturating_sub(radius);
        let x1 = (x + radius + 1).min(self.width);
        let y1 = (y + radius + 1).min(self.height);
        let stride = self.width + 1;
        let at = |t: &[f64], xx: usize, yy: usize| t[yy * stride + xx];
        let rect = |t: &[f64]| at(t, x1, y1) - at(t, x0, y1) - at(t, x1, y0) + at(t, x0, y0);
        (rect(&self.sum), rect(&self.sq), (x1 - x0) * (y1 - y0))
    }

    /// Mean and population standard deviation over a window.
    pub fn mean_std(&self, x: usize, y: usize, radius: usize) -> (f32, f32) {
        let (s, q, n) = self.window(x, y, radius);
        stats(s, q, n)
    }

    /// Mean and standard deviation over the ring between `inner` (excluded)
    /// and `outer` (included) radii.
    pub fn annulus_mean_std(&self, x: usize, y: usize, inner: usize, outer: usize) -> (f32, f32) {
        let (so, qo, no) = self.window(x, y, outer);
        let (si, qi, ni) = self.window(x, y, inner);
        if no <= ni {
            return stats(so, qo, no);
        }
        stats(so - si, qo - qi, no - ni)
    }
}

fn stats(sum: f64, sq: f64, n: usize) -> (f32, f32) {
    if n == 0 {
        return (0.0, 0.0);
    }
    let mean = sum / n as f64;
    let var = (sq / n as f64 - mean * mean).max(0.0);
    (mean as f32, var.sqrt() as f32)
}
