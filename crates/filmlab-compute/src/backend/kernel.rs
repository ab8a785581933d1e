//! Pixel kernel abstraction: "map with bounded neighborhood read".

use filmlab_core::{ColorDomain, ImageBuffer};

/// Per-pixel computation over a source buffer.
///
/// A kernel sees one output position at a time through a [`Neighborhood`]
/// and may read source pixels at most [`radius`](PixelKernel::radius) away
/// in each axis. Reads past the frame edge are clamped. Kernels must be pure:
/// the same neighborhood always yields the same output, so any dispatch
/// order (rows, tiles, GPU workgroups) produces identical buffers.
pub trait PixelKernel: Sync {
    /// Name used in trace output.
    fn name(&self) -> &'static str {
        "kernel"
    }

    /// Largest `|dx|` / `|dy|` the kernel reads.
    fn radius(&self) -> usize {
        0
    }

    /// Domain of the produced buffer given the input domain.
    fn output_domain(&self, input: ColorDomain) -> ColorDomain {
        input
    }

    /// Computes one output pixel.
    fn apply(&self, n: &Neighborhood<'_>) -> [f32; 3];
}

/// Read-only window around one output pixel.
#[derive(Clone, Copy)]
pub struct Neighborhood<'a> {
    src: &'a ImageBuffer,
    x: usize,
    y: usize,
    radius: usize,
}

impl<'a> Neighborhood<'a> {
    /// Window at `(x, y)` allowing reads up to `radius` away.
    #[inline]
    pub fn new(src: &'a ImageBuffer, x: usize, y: usize, radius: usize) -> Self {
        Self { src, x, y, radius }
    }

    /// Output x coordinate.
    #[inline]
    pub fn x(&self) -> usize {
        self.x
    }

    /// Output y coordinate.
    #[inline]
    pub fn y(&self) -> usize {
        self.y
    }

    /// Source width.
    #[inline]
    pub fn width(&self) -> usize {
        self.src.width()
    }

    /// Source height.
    #[inline]
    pub fn height(&self) -> usize {
        self.src.height()
    }

    /// Source pixel under the output position.
    #[inline]
    pub fn center(&self) -> [f32; 3] {
        self.src.pixel(self.x, self.y)
    }

    /// Source pixel at offset `(dx, dy)`, edge clamped.
    #[inline]
    pub fn get(&self, dx: isize, dy: isize) -> [f32; 3] {
        debug_assert!(
            dx.unsigned_abs() <= self.radius && dy.unsigned_abs() <= self.radius,
            "read ({dx}, {dy}) outside declared radius {}",
            self.radius
        );
        self.src
            .pixel_clamped(self.x as isize + dx, self.y as isize + dy)
    }
}

/// Kernel wrapping a pure per-pixel function (radius 0).
pub struct PointKernel<F> {
    name: &'static str,
    domain: Option<ColorDomain>,
    f: F,
}

impl<F> PointKernel<F>
where
    F: Fn([f32; 3]) -> [f32; 3] + Sync,
{
    /// Kernel that keeps the input domain.
    pub fn new(name: &'static str, f: F) -> Self {
        Self {
            name,
            domain: None,
            f,
        }
    }

    /// Tags the output with `domain`.
    pub fn with_domain(mut self, domain: ColorDomain) -> Self {
        self.domain = Some(domain);
        self
    }
}

impl<F> PixelKernel for PointKernel<F>
where
    F: Fn([f32; 3]) -> [f32; 3] + Sync,
{
    fn name(&self) -> &'static str {
        self.name
    }

    fn output_domain(&self, input: ColorDomain) -> ColorDomain {
        self.domain.unwrap_or(input)
    }

    #[inline]
    fn apply(&self, n: &Neighborhood<'_>) -> [f32; 3] {
        (self.f)(n.center())
    }
}
