//! CPU backend using rayon for parallelization.

use rayon::prelude::*;
use tracing::trace;

use filmlab_core::{CHANNELS, ImageBuffer};

use super::{ComputeLimits, KernelBackend, Neighborhood, PixelKernel};
use crate::{ComputeError, ComputeResult};

/// CPU backend: the output grid is cut into row bands, one rayon task each.
#[derive(Debug, Clone)]
pub struct CpuBackend {
    limits: ComputeLimits,
}

impl CpuBackend {
    pub fn new() -> Self {
        Self {
            limits: ComputeLimits::detect(),
        }
    }

    /// Backend with explicit limits.
    pub fn with_limits(limits: ComputeLimits) -> Self {
        Self { limits }
    }
}

impl Default for CpuBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl KernelBackend for CpuBackend {
    fn name(&self) -> &'static str {
        "cpu"
    }

    fn limits(&self) -> &ComputeLimits {
        &self.limits
    }

    fn dispatch<K: PixelKernel>(&self, src: &ImageBuffer, kernel: &K) -> ComputeResult<ImageBuffer> {
        let (width, height) = src.dimensions();
        if width == 0 || height == 0 {
            return Err(ComputeError::InvalidDimensions(width, height));
        }
        if !self.limits.fits_memory(width, height) {
            return Err(ComputeError::ImageTooLarge {
                width,
                height,
                required: self.limits.estimate_memory(width, height),
                available: self.limits.available_memory,
            });
        }

        let band = self.limits.band_rows(width, height);
        let radius = kernel.radius();
        let stride = width * CHANNELS;
        trace!(width, height, band, radius, kernel = kernel.name(), "cpu dispatch");

        let mut out = vec![0.0f32; stride * height];
        out.par_chunks_mut(stride * band)
            .enumerate()
            .for_each(|(bi, chunk)| {
                let y0 = bi * band;
                for (ry, row) in chunk.chunks_exact_mut(stride).enumerate() {
                    let y = y0 + ry;
                    for (x, px) in row.chunks_exact_mut(CHANNELS).enumerate() {
                        let n = Neighborhood::new(src, x, y, radius);
                        px.copy_from_slice(&kernel.apply(&n));
                    }
                }
            });

        Ok(ImageBuffer::new(
            width,
            height,
            kernel.output_domain(src.domain()),
            out,
        )?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::PointKernel;
    use approx::assert_abs_diff_eq;
    use filmlab_core::ColorDomain;

    struct BoxBlur;

    impl PixelKernel for BoxBlur {
        fn radius(&self) -> usize {
            1
        }

        fn apply(&self, n: &Neighborhood<'_>) -> [f32; 3] {
            let mut acc = [0.0f32; 3];
            for dy in -1..=1 {
                for dx in -1..=1 {
                    let p = n.get(dx, dy);
                    for c in 0..3 {
                        acc[c] += p[c] / 9.0;
                    }
                }
            }
            acc
        }
    }

    #[test]
    fn test_point_kernel_changes_domain() {
        let backend = CpuBackend::new();
        let img = ImageBuffer::filled(5, 3, ColorDomain::LinearTransmittance, [0.5; 3]);
        let kernel = PointKernel::new("neg", |rgb: [f32; 3]| rgb.map(|v| 1.0 - v))
            .with_domain(ColorDomain::LogDensity);
        let out = backend.dispatch(&img, &kernel).unwrap();
        assert_eq!(out.domain(), ColorDomain::LogDensity);
        assert_eq!(out.pixel(4, 2), [0.5; 3]);
    }

    #[test]
    fn test_neighborhood_edge_clamp() {
        let backend = CpuBackend::new();
        let img = ImageBuffer::from_fn(3, 1, ColorDomain::LinearTransmittance, |x, _| {
            [x as f32, 0.0, 0.0]
        });
        let out = backend.dispatch(&img, &BoxBlur).unwrap();
        // left edge reads x = 0, 0, 1 in each row
        assert_abs_diff_eq!(out.pixel(0, 0)[0], 1.0 / 3.0, epsilon = 1e-6);
        assert_abs_diff_eq!(out.pixel(1, 0)[0], 1.0, epsilon = 1e-6);
        assert!((out.pixel(2, 0)[0] - 5.0 / 3.0).abs() < 1e-6);
    }

    #[test]
    fn test_band_boundaries_do_not_matter() {
        let img = ImageBuffer::from_fn(7, 11, ColorDomain::LinearTransmittance, |x, y| {
            [(x * y) as f32 * 0.01, x as f32 * 0.1, y as f32 * 0.1]
        });
        let one_row = CpuBackend::with_limits(ComputeLimits {
            band_bytes: 1,
            ..ComputeLimits::default()
        });
        let whole = CpuBackend::with_limits(ComputeLimits {
            band_bytes: usize::MAX / 2,
            ..ComputeLimits::default()
        });
        let a = one_row.dispatch(&img, &BoxBlur).unwrap();
        let b = whole.dispatch(&img, &BoxBlur).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_too_large() {
        let backend = CpuBackend::with_limits(ComputeLimits {
            available_memory: 16,
            ..ComputeLimits::default()
        });
        let img = ImageBuffer::filled(4, 4, ColorDomain::LinearTransmittance, [0.0; 3]);
        let err = backend.dispatch(&img, &BoxBlur).unwrap_err();
        assert!(matches!(err, ComputeError::ImageTooLarge { .. }));
    }
}
