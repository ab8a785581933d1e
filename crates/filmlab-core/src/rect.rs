//! Pixel rectangles for crops and analysis regions.
//!
//! All values are in pixels with `(0, 0)` at the top-left corner. Crops are
//! often specified in normalized `[0, 1]` frame coordinates so they survive a
//! change of resolution; [`Rect::from_normalized`] resolves them.

use serde::{Deserialize, Serialize};

/// A rectangle defined by origin (x, y) and dimensions (width, height).
///
/// # Example
///
/// ```rust
/// use filmlab_core::Rect;
///
/// let rect = Rect::new(10, 20, 100, 50);
/// assert_eq!(rect.right(), 110);
/// assert_eq!(rect.bottom(), 70);
/// assert_eq!(rect.area(), 5000);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Rect {
    /// X coordinate of the left edge (inclusive)
    pub x: usize,
    /// Y coordinate of the top edge (inclusive)
    pub y: usize,
    /// Width in pixels
    pub width: usize,
    /// Height in pixels
    pub height: usize,
}

impl Rect {
    /// Creates a new rectangle with the given origin and dimensions.
    #[inline]
    pub const fn new(x: usize, y: usize, width: usize, height: usize) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Creates a rectangle from origin (0, 0) with given dimensions.
    #[inline]
    pub const fn from_size(width: usize, height: usize) -> Self {
        Self::new(0, 0, width, height)
    }

    /// Rectangle spanning two corner points in either order.
    #[inline]
    fn from_corners(x1: usize, y1: usize, x2: usize, y2: usize) -> Self {
        let (min_x, max_x) = if x1 <= x2 { (x1, x2) } else { (x2, x1) };
        let (min_y, max_y) = if y1 <= y2 { (y1, y2) } else { (y2, y1) };
        Self::new(min_x, min_y, max_x - min_x, max_y - min_y)
    }

    /// Resolves a normalized `[x1, y1, x2, y2]` rectangle against a frame.
    ///
    /// Coordinates are clamped to `[0, 1]`; the result always lies inside the
    /// frame but may be empty.
    pub fn from_normalized(norm: [f32; 4], width: usize, height: usize) -> Self {
        let fx = |v: f32| ((v.clamp(0.0, 1.0) * width as f32) as usize).min(width);
        let fy = |v: f32| ((v.clamp(0.0, 1.0) * height as f32) as usize).min(height);
        Self::from_corners(fx(norm[0]), fy(norm[1]), fx(norm[2]), fy(norm[3]))
    }

    /// Right edge (exclusive).
    #[inline]
    pub const fn right(&self) -> usize {
        self.x + self.width
    }

    /// Bottom edge (exclusive).
    #[inline]
    pub const fn bottom(&self) -> usize {
        self.y + self.height
    }

    /// Pixel count.
    #[inline]
    pub const fn area(&self) -> usize {
        self.width * self.height
    }

    /// `true` if width or height is zero.
    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Width over height, or 1.0 for an empty rectangle.
    #[inline]
    pub fn aspect(&self) -> f32 {
        if self.is_empty() {
            1.0
        } else {
            self.width as f32 / self.height as f32
        }
    }

    /// `true` if `(x, y)` lies inside.
    #[inline]
    pub fn contains(&self, x: usize, y: usize) -> bool {
        x >= self.x && x < self.right() && y >= self.y && y < self.bottom()
    }

    /// Intersection of two rectangles, `None` when they don't overlap.
    fn intersect(&self, other: &Rect) -> Option<Rect> {
        let x1 = self.x.max(other.x);
        let y1 = self.y.max(other.y);
        let x2 = self.right().min(other.right());
        let y2 = self.bottom().min(other.bottom());
        if x2 > x1 && y2 > y1 {
            Some(Rect::new(x1, y1, x2 - x1, y2 - y1))
        } else {
            None
        }
    }

    /// Shrinks every edge by `margin` pixels (negative grows), staying inside
    /// `width x height`. Returns `None` if nothing is left.
    pub fn inset(&self, margin: f32, width: usize, height: usize) -> Option<Rect> {
        let x1 = (self.x as f32 + margin).max(0.0) as usize;
        let y1 = (self.y as f32 + margin).max(0.0) as usize;
        let x2 = ((self.right() as f32 - margin).max(0.0) as usize).min(width);
        let y2 = ((self.bottom() as f32 - margin).max(0.0) as usize).min(height);
        if x2 > x1 && y2 > y1 {
            Some(Rect::new(x1, y1, x2 - x1, y2 - y1))
        } else {
            None
        }
    }

    /// Portion inside a `width x height` frame.
    #[inline]
    pub fn clamp_to(&self, width: usize, height: usize) -> Option<Rect> {
        self.intersect(&Rect::from_size(width, height))
    }
}

impl std::fmt::Display for Rect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}+{}+{}", self.width, self.height, self.x, self.y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_to() {
        let a = Rect::new(5, 5, 10, 10);
        assert_eq!(a.clamp_to(10, 10), Some(Rect::new(5, 5, 5, 5)));
        assert_eq!(Rect::new(20, 20, 2, 2).clamp_to(10, 10), None);
        // swapped corners resolve to the same frame
        assert_eq!(Rect::from_normalized([0.75, 1.0, 0.25, 0.5], 200, 100), Rect::new(50, 50, 100, 50));
    }

    #[test]
    fn test_inset() {
        let r = Rect::new(0, 0, 100, 80);
        assert_eq!(r.inset(10.0, 100, 80), Some(Rect::new(10, 10, 80, 60)));
        assert_eq!(r.inset(-5.0, 100, 80), Some(Rect::new(0, 0, 100, 80)));
        assert_eq!(r.inset(50.0, 100, 80), None);
    }

    #[test]
    fn test_from_normalized() {
        let r = Rect::from_normalized([0.25, 0.5, 0.75, 1.0], 200, 100);
        assert_eq!(r, Rect::new(50, 50, 100, 50));
        let clamped = Rect::from_normalized([-1.0, -1.0, 2.0, 2.0], 20, 10);
        assert_eq!(clamped, Rect::from_size(20, 10));
    }

    #[test]
    fn test_display() {
        assert_eq!(Rect::new(1, 2, 3, 4).to_string(), "3x4+1+2");
    }
}
