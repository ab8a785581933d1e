//! Three-channel floating point image buffer.
//!
//! [`ImageBuffer`] is the unit of exchange between every pipeline stage: a
//! row-major grid of RGB `f32` samples tagged with the [`ColorDomain`] the
//! samples live in. Stages take `&ImageBuffer` and return a fresh buffer;
//! nothing in the pipeline mutates its input.
//!
//! # Memory Layout
//!
//! ```text
//! data[(y * width + x) * 3 + c]   c in {0: R, 1: G, 2: B}
//! ```
//!
//! # Example
//!
//! ```rust
//! use filmlab_core::{ColorDomain, ImageBuffer};
//!
//! let img = ImageBuffer::filled(4, 2, ColorDomain::LinearTransmittance, [0.5, 0.4, 0.3]);
//! assert_eq!(img.dimensions(), (4, 2));
//! assert_eq!(img.pixel(3, 1), [0.5, 0.4, 0.3]);
//! ```

use rayon::prelude::*;

use crate::error::{Error, Result};
use crate::pixel::luminance_rec709;
use crate::rect::Rect;

/// Samples per pixel. Alpha never enters the pipeline.
pub const CHANNELS: usize = 3;

/// Color domain a buffer's samples are expressed in.
///
/// The tag travels with the buffer so stages can reject input from the wrong
/// side of the pipeline instead of silently producing garbage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ColorDomain {
    /// Linear light transmittance in `[0, 1]` (scanner output, print output).
    #[default]
    LinearTransmittance,
    /// Normalized log density in `[0, 1]` produced by normalization.
    LogDensity,
    /// CIELAB (D65), L in `[0, 100]`.
    PerceptualLab,
    /// Display-encoded values after the final gamma.
    DisplayEncoded,
}

impl ColorDomain {
    /// Short human readable name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::LinearTransmittance => "linear-transmittance",
            Self::LogDensity => "log-density",
            Self::PerceptualLab => "perceptual-lab",
            Self::DisplayEncoded => "display-encoded",
        }
    }
}

impl std::fmt::Display for ColorDomain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Row-major RGB `f32` image tagged with its color domain.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageBuffer {
    width: usize,
    height: usize,
    domain: ColorDomain,
    data: Vec<f32>,
}

impl ImageBuffer {
    /// Wraps existing samples, validating the length against the dimensions.
    pub fn new(width: usize, height: usize, domain: ColorDomain, data: Vec<f32>) -> Result<Self> {
        let expected = checked_len(width, height)?;
        if data.len() != expected {
            return Err(Error::BufferSize {
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            width,
            height,
            domain,
            data,
        })
    }

    /// Creates a buffer where every pixel is `rgb`.
    ///
    /// Zero dimensions produce an empty buffer; use [`ImageBuffer::new`] when
    /// the size comes from untrusted input.
    pub fn filled(width: usize, height: usize, domain: ColorDomain, rgb: [f32; 3]) -> Self {
        let mut data = Vec::with_capacity(width * height * CHANNELS);
        for _ in 0..width * height {
            data.extend_from_slice(&rgb);
        }
        Self {
            width,
            height,
            domain,
            data,
        }
    }

    /// Creates a buffer by evaluating `f(x, y)` for every pixel in parallel.
    pub fn from_fn<F>(width: usize, height: usize, domain: ColorDomain, f: F) -> Self
    where
        F: Fn(usize, usize) -> [f32; 3] + Sync,
    {
        let mut data = vec![0.0f32; width * height * CHANNELS];
        if width > 0 {
            data.par_chunks_mut(width * CHANNELS)
                .enumerate()
                .for_each(|(y, row)| {
                    for (x, px) in row.chunks_exact_mut(CHANNELS).enumerate() {
                        px.copy_from_slice(&f(x, y));
                    }
                });
        }
        Self {
            width,
            height,
            domain,
            data,
        }
    }

    /// Image width in pixels.
    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    /// Image height in pixels.
    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    /// `(width, height)`.
    #[inline]
    pub fn dimensions(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    /// Longer of the two edges.
    #[inline]
    pub fn long_edge(&self) -> usize {
        self.width.max(self.height)
    }

    /// Number of pixels.
    #[inline]
    pub fn pixel_count(&self) -> usize {
        self.width * self.height
    }

    /// Color domain tag.
    #[inline]
    pub fn domain(&self) -> ColorDomain {
        self.domain
    }

    /// Returns the same samples re-tagged with another domain.
    pub fn with_domain(mut self, domain: ColorDomain) -> Self {
        self.domain = domain;
        self
    }

    /// Raw interleaved samples.
    #[inline]
    pub fn data(&self) -> &[f32] {
        &self.data
    }

    /// Mutable raw samples for stages building their own output buffer.
    #[inline]
    pub fn data_mut(&mut self) -> &mut [f32] {
        &mut self.data
    }

    /// Fails with [`Error::DomainMismatch`] unless the buffer is in `expected`.
    pub fn require_domain(&self, expected: ColorDomain) -> Result<()> {
        if self.domain != expected {
            return Err(Error::domain_mismatch(expected, self.domain));
        }
        Ok(())
    }

    /// RGB at `(x, y)`. Panics when out of range, like slice indexing.
    #[inline]
    pub fn pixel(&self, x: usize, y: usize) -> [f32; 3] {
        let i = (y * self.width + x) * CHANNELS;
        [self.data[i], self.data[i + 1], self.data[i + 2]]
    }

    /// RGB at `(x, y)` with coordinates clamped to the frame edge.
    #[inline]
    pub fn pixel_clamped(&self, x: isize, y: isize) -> [f32; 3] {
        let cx = x.clamp(0, self.width as isize - 1) as usize;
        let cy = y.clamp(0, self.height as isize - 1) as usize;
        self.pixel(cx, cy)
    }

    /// Overwrites the pixel at `(x, y)`.
    #[inline]
    pub fn set_pixel(&mut self, x: usize, y: usize, rgb: [f32; 3]) {
        let i = (y * self.width + x) * CHANNELS;
        self.data[i..i + CHANNELS].copy_from_slice(&rgb);
    }

    /// One row of interleaved samples.
    #[inline]
    pub fn row(&self, y: usize) -> &[f32] {
        let stride = self.width * CHANNELS;
        &self.data[y * stride..(y + 1) * stride]
    }

    /// Iterator over RGB triples in row-major order.
    pub fn pixels(&self) -> impl Iterator<Item = [f32; 3]> + '_ {
        self.data.chunks_exact(CHANNELS).map(|p| [p[0], p[1], p[2]])
    }

    /// Rec.709 luminance plane.
    pub fn luminance(&self) -> Vec<f32> {
        self.data
            .par_chunks_exact(CHANNELS)
            .map(|p| luminance_rec709([p[0], p[1], p[2]]))
            .collect()
    }

    /// Copies out a sub-rectangle.
    pub fn crop(&self, rect: Rect) -> Result<Self> {
        if rect.is_empty() || rect.right() > self.width || rect.bottom() > self.height {
            return Err(Error::invalid_region(
                rect.x,
                rect.y,
                rect.width,
                rect.height,
                self.width,
                self.height,
            ));
        }
        let mut data = Vec::with_capacity(rect.area() * CHANNELS);
        for y in rect.y..rect.bottom() {
            let row = self.row(y);
            data.extend_from_slice(&row[rect.x * CHANNELS..rect.right() * CHANNELS]);
        }
        Ok(Self {
            width: rect.width,
            height: rect.height,
            domain: self.domain,
            data,
        })
    }

    /// Full-frame rectangle.
    #[inline]
    pub fn bounds(&self) -> Rect {
        Rect::from_size(self.width, self.height)
    }

    /// `true` when every sample is finite.
    pub fn is_finite(&self) -> bool {
        self.data.par_iter().all(|v| v.is_finite())
    }
}

fn checked_len(width: usize, height: usize) -> Result<usize> {
    if width == 0 || height == 0 {
        return Err(Error::invalid_dimensions(width, height, "zero-sized frame"));
    }
    width
        .checked_mul(height)
        .and_then(|n| n.checked_mul(CHANNELS))
        .ok_or_else(|| Error::invalid_dimensions(width, height, "sample count overflows"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_validates_length() {
        assert!(ImageBuffer::new(2, 2, ColorDomain::LogDensity, vec![0.0; 12]).is_ok());
        let err = ImageBuffer::new(2, 2, ColorDomain::LogDensity, vec![0.0; 11]).unwrap_err();
        assert!(matches!(err, Error::BufferSize { expected: 12, actual: 11 }));
        assert!(ImageBuffer::new(0, 2, ColorDomain::LogDensity, vec![]).is_err());
    }

    #[test]
    fn test_from_fn_layout() {
        let img = ImageBuffer::from_fn(3, 2, ColorDomain::LinearTransmittance, |x, y| {
            [x as f32, y as f32, 0.5]
        });
        assert_eq!(img.pixel(2, 1), [2.0, 1.0, 0.5]);
        assert_eq!(img.row(1)[0..3], [0.0, 1.0, 0.5]);
    }

    #[test]
    fn test_pixel_clamped() {
        let img = ImageBuffer::from_fn(3, 3, ColorDomain::LinearTransmittance, |x, y| {
            [x as f32, y as f32, 0.0]
        });
        assert_eq!(img.pixel_clamped(-5, 1), [0.0, 1.0, 0.0]);
        assert_eq!(img.pixel_clamped(7, 9), [2.0, 2.0, 0.0]);
    }

    #[test]
    fn test_crop() {
        let img = ImageBuffer::from_fn(4, 4, ColorDomain::LinearTransmittance, |x, y| {
            [x as f32, y as f32, 0.0]
        });
        let c = img.crop(Rect::new(1, 2, 2, 2)).unwrap();
        assert_eq!(c.dimensions(), (2, 2));
        assert_eq!(c.pixel(0, 0), [1.0, 2.0, 0.0]);
        assert_eq!(c.pixel(1, 1), [2.0, 3.0, 0.0]);
        assert!(img.crop(Rect::new(3, 3, 2, 2)).is_err());
    }

    #[test]
    fn test_require_domain() {
        let img = ImageBuffer::filled(1, 1, ColorDomain::LogDensity, [0.0; 3]);
        assert!(img.require_domain(ColorDomain::LogDensity).is_ok());
        assert!(img.require_domain(ColorDomain::PerceptualLab).is_err());
    }

    #[test]
    fn test_luminance() {
        let img = ImageBuffer::filled(2, 1, ColorDomain::LinearTransmittance, [1.0, 1.0, 1.0]);
        for y in img.luminance() {
            approx::assert_abs_diff_eq!(y, 1.0, epsilon = 1e-6);
        }
    }
}
