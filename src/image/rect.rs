//! Axis-aligned regions of a frame.

use std::fmt;

/// An axis-aligned rectangle with floating-point coordinates, stored as center and size.
///
/// Width and height may be zero but are never negative.
#[derive(Clone, Copy, PartialEq)]
pub struct Rect {
    cx: f32,
    cy: f32,
    w: f32,
    h: f32,
}

impl Rect {
    #[inline]
    pub fn from_center(cx: f32, cy: f32, w: f32, h: f32) -> Self {
        Self { cx, cy, w, h }
    }

    #[inline]
    pub fn from_top_left(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self::from_center(x + w / 2.0, y + h / 2.0, w, h)
    }

    fn from_corners(left: f32, top: f32, right: f32, bottom: f32) -> Self {
        debug_assert!(left <= right && top <= bottom, "{left},{top} .. {right},{bottom}");
        Self::from_top_left(left, top, right - left, bottom - top)
    }

    /// The smallest rectangle containing every point, or `None` without any points.
    pub fn bounding<I: IntoIterator<Item = [f32; 2]>>(points: I) -> Option<Self> {
        let mut points = points.into_iter();
        let [x, y] = points.next()?;
        let corners = points.fold([x, y, x, y], |[l, t, r, b], [x, y]| {
            [l.min(x), t.min(y), r.max(x), b.max(y)]
        });
        let [l, t, r, b] = corners;
        Some(Self::from_corners(l, t, r, b))
    }

    /// Multiplies width and height by `factor`, keeping the center.
    #[must_use]
    pub fn scale(&self, factor: f32) -> Self {
        Self::from_center(self.cx, self.cy, self.w * factor, self.h * factor)
    }

    /// Adds a margin of `amount` times the width (height) to the left and right (top and bottom).
    #[must_use]
    pub fn grow_rel(&self, amount: f32) -> Self {
        let grow = 1.0 + 2.0 * amount;
        Self::from_center(self.cx, self.cy, self.w * grow, self.h * grow)
    }

    /// Extends the shorter side to the length of the longer one, keeping the center.
    #[must_use]
    pub fn make_square(&self) -> Self {
        let side = self.w.max(self.h);
        Self::from_center(self.cx, self.cy, side, side)
    }

    #[must_use]
    pub fn move_by(&self, dx: f32, dy: f32) -> Self {
        Self::from_center(self.cx + dx, self.cy + dy, self.w, self.h)
    }

    /// X coordinate of the left edge.
    #[inline]
    pub fn x(&self) -> f32 {
        self.cx - self.w / 2.0
    }

    /// Y coordinate of the top edge.
    #[inline]
    pub fn y(&self) -> f32 {
        self.cy - self.h / 2.0
    }

    #[inline]
    pub fn width(&self) -> f32 {
        self.w
    }

    #[inline]
    pub fn height(&self) -> f32 {
        self.h
    }

    #[inline]
    pub fn center(&self) -> (f32, f32) {
        (self.cx, self.cy)
    }

    #[inline]
    pub fn area(&self) -> f32 {
        self.w * self.h
    }

    fn right(&self) -> f32 {
        self.x() + self.w
    }

    fn bottom(&self) -> f32 {
        self.y() + self.h
    }

    /// The region covered by both rectangles, or `None` if they are disjoint.
    pub fn intersection(&self, other: &Rect) -> Option<Rect> {
        let left = self.x().max(other.x());
        let top = self.y().max(other.y());
        let right = self.right().min(other.right());
        let bottom = self.bottom().min(other.bottom());
        (left <= right && top <= bottom).then(|| Self::from_corners(left, top, right, bottom))
    }

    /// Intersection over union, in `0.0..=1.0`.
    ///
    /// Two degenerate rectangles (with no area at all) have an IoU of 0.
    pub fn iou(&self, other: &Self) -> f32 {
        let overlap = self.intersection(other).map_or(0.0, |r| r.area());
        let union = self.area() + other.area() - overlap;
        if union > 0.0 {
            overlap / union
        } else {
            0.0
        }
    }
}

impl fmt::Debug for Rect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Rect {}x{} centered at ({}, {})",
            self.w, self.h, self.cx, self.cy
        )
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    #[test]
    fn intersection() {
        let big = Rect::from_top_left(0.0, 0.0, 10.0, 10.0);
        let point = Rect::from_top_left(5.0, 5.0, 0.0, 0.0);
        assert_eq!(big.intersection(&point), Some(point));

        let left = Rect::from_top_left(0.0, 0.0, 4.0, 4.0);
        let right = Rect::from_top_left(2.0, 1.0, 4.0, 4.0);
        assert_eq!(
            left.intersection(&right),
            Some(Rect::from_top_left(2.0, 1.0, 2.0, 3.0))
        );

        let far = Rect::from_top_left(20.0, 0.0, 1.0, 1.0);
        assert_eq!(big.intersection(&far), None);
    }

    #[test]
    fn iou() {
        let inner = Rect::from_center(9.0, 9.0, 1.0, 1.0);
        let outer = Rect::from_center(9.0, 9.0, 2.0, 2.0);
        assert_eq!(inner.iou(&outer), 0.25);
        assert_eq!(outer.iou(&inner), 0.25);
        assert_eq!(outer.iou(&outer), 1.0);

        let disjoint = outer.move_by(10.0, 0.0);
        assert_eq!(outer.iou(&disjoint), 0.0);

        let empty = Rect::from_center(0.0, 0.0, 0.0, 0.0);
        assert_eq!(empty.iou(&empty), 0.0);
    }

    #[test]
    fn bounding_box_of_points() {
        assert_eq!(Rect::bounding([]), None);
        assert_eq!(
            Rect::bounding([[1.0, 3.0], [-1.0, 0.0], [0.0, -1.0]]),
            Some(Rect::from_top_left(-1.0, -1.0, 2.0, 4.0)),
        );
        assert_eq!(
            Rect::bounding([[2.0, 2.0]]),
            Some(Rect::from_center(2.0, 2.0, 0.0, 0.0))
        );
    }

    #[test]
    fn square_regions() {
        let tall = Rect::from_center(10.0, 10.0, 50.0, 100.0);
        assert_eq!(tall.make_square(), Rect::from_center(10.0, 10.0, 100.0, 100.0));
        let wide = Rect::from_center(-3.0, 4.0, 30.0, 6.0);
        assert_eq!(wide.make_square(), Rect::from_center(-3.0, 4.0, 30.0, 30.0));
    }

    #[test]
    fn resizing_keeps_the_center() {
        let rect = Rect::from_top_left(0.0, 0.0, 10.0, 20.0);

        let grown = rect.grow_rel(0.5);
        assert_eq!(grown.center(), (5.0, 10.0));
        assert_relative_eq!(grown.width(), 20.0);
        assert_relative_eq!(grown.height(), 40.0);

        let scaled = rect.scale(2.6);
        assert_eq!(scaled.center(), (5.0, 10.0));
        assert_relative_eq!(scaled.width(), 26.0);
        assert_relative_eq!(scaled.height(), 52.0);

        let moved = rect.move_by(1.0, -1.0);
        assert_eq!((moved.x(), moved.y()), (1.0, -1.0));
    }
}
