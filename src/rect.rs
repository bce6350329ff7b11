//! Rectangles and edge insets, in integer pixels.

use cgmath::{Point2, Vector2};
use std::ops;

/// A rectangle.
///
/// Rectangles are half-open: a rectangle covers `left..right` horizontally and `top..bottom`
/// vertically, so two rectangles that only share an edge do not intersect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    /// Rectangle origin (top left corner).
    pub origin: Point2<i32>,

    /// Rectangle size.
    pub size: Vector2<i32>,
}

impl Rect {
    /// Creates a new rectangle.
    pub fn new(origin: Point2<i32>, size: Vector2<i32>) -> Rect {
        Rect { origin, size }
    }

    /// Creates a rectangle from its four edges.
    pub fn from_ltrb(left: i32, top: i32, right: i32, bottom: i32) -> Rect {
        Rect {
            origin: Point2::new(left, top),
            size: Vector2::new(right - left, bottom - top),
        }
    }

    /// Returns a zero-sized rectangle at the origin.
    pub fn zero() -> Rect {
        Rect::from_ltrb(0, 0, 0, 0)
    }

    pub fn left(&self) -> i32 {
        self.origin.x
    }

    pub fn top(&self) -> i32 {
        self.origin.y
    }

    pub fn right(&self) -> i32 {
        self.origin.x + self.size.x
    }

    pub fn bottom(&self) -> i32 {
        self.origin.y + self.size.y
    }

    pub fn width(&self) -> i32 {
        self.size.x
    }

    pub fn height(&self) -> i32 {
        self.size.y
    }

    /// Area in square pixels. Negative sizes count as empty.
    pub fn area(&self) -> i64 {
        i64::from(self.size.x.max(0)) * i64::from(self.size.y.max(0))
    }

    /// Returns true if the rectangle covers no pixels.
    pub fn is_empty(&self) -> bool {
        self.size.x <= 0 || self.size.y <= 0
    }

    /// Returns true if the point is inside the rectangle.
    pub fn contains(&self, point: Point2<i32>) -> bool {
        point.x >= self.left()
            && point.y >= self.top()
            && point.x < self.right()
            && point.y < self.bottom()
    }

    /// Returns true if the two rectangles intersect.
    pub fn intersects(&self, rect: Rect) -> bool {
        self.left() < rect.right()
            && self.top() < rect.bottom()
            && rect.left() < self.right()
            && rect.top() < self.bottom()
    }

    /// Returns the intersection rectangle.
    pub fn intersect(&self, rect: Rect) -> Option<Rect> {
        if !self.intersects(rect) {
            return None;
        }

        Some(Rect::from_ltrb(
            self.left().max(rect.left()),
            self.top().max(rect.top()),
            self.right().min(rect.right()),
            self.bottom().min(rect.bottom()),
        ))
    }

    /// Returns a new rectangle grown outwards by the given edges.
    pub fn outset(&self, edges: Edges) -> Rect {
        Rect::from_ltrb(
            self.left() - edges.left,
            self.top() - edges.top,
            self.right() + edges.right,
            self.bottom() + edges.bottom,
        )
    }

    /// Returns a new rectangle shrunk inwards by the given edges.
    pub fn inset(&self, edges: Edges) -> Rect {
        Rect::from_ltrb(
            self.left() + edges.left,
            self.top() + edges.top,
            self.right() - edges.right,
            self.bottom() - edges.bottom,
        )
    }

    /// Returns a new rectangle with the given origin.
    pub fn with_origin(&self, origin: Point2<i32>) -> Rect {
        Rect {
            origin,
            size: self.size,
        }
    }
}

impl Default for Rect {
    fn default() -> Rect {
        Rect::zero()
    }
}

impl ops::Add<Vector2<i32>> for Rect {
    type Output = Rect;
    fn add(self, offset: Vector2<i32>) -> Rect {
        Rect {
            origin: self.origin + offset,
            size: self.size,
        }
    }
}

impl ops::Sub<Vector2<i32>> for Rect {
    type Output = Rect;
    fn sub(self, offset: Vector2<i32>) -> Rect {
        Rect {
            origin: self.origin - offset,
            size: self.size,
        }
    }
}

/// Per-edge pixel amounts (padding, margins, border widths, touch expansion).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Edges {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl Edges {
    pub const fn new(left: i32, top: i32, right: i32, bottom: i32) -> Edges {
        Edges {
            left,
            top,
            right,
            bottom,
        }
    }

    /// The same amount on every edge.
    pub const fn all(amount: i32) -> Edges {
        Edges::new(amount, amount, amount, amount)
    }

    pub fn horizontal(&self) -> i32 {
        self.left + self.right
    }

    pub fn vertical(&self) -> i32 {
        self.top + self.bottom
    }

    pub fn is_zero(&self) -> bool {
        *self == Edges::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn edges_do_not_intersect() {
        let a = Rect::from_ltrb(0, 0, 10, 10);
        let b = Rect::from_ltrb(0, 10, 10, 20);
        assert!(!a.intersects(b), "rectangles sharing an edge must not intersect");
        assert!(a.intersects(Rect::from_ltrb(0, 5, 10, 15)));
    }

    #[test]
    fn intersection_is_clipped() {
        let a = Rect::from_ltrb(0, 0, 10, 10);
        let visible = Rect::from_ltrb(-5, 5, 5, 30);
        assert_eq!(a.intersect(visible), Some(Rect::from_ltrb(0, 5, 5, 10)));
        assert_eq!(a.intersect(Rect::from_ltrb(20, 20, 30, 30)), None);
    }

    #[test]
    fn outset_and_offset() {
        let a = Rect::from_ltrb(10, 10, 20, 20);
        assert_eq!(a.outset(Edges::all(5)), Rect::from_ltrb(5, 5, 25, 25));
        assert_eq!(a.inset(Edges::new(1, 2, 3, 4)), Rect::from_ltrb(11, 12, 17, 16));
        assert_eq!(a + Vector2::new(5, -5), Rect::from_ltrb(15, 5, 25, 15));
        assert_eq!(a.area(), 100);
        assert_eq!(Rect::from_ltrb(0, 0, -3, 4).area(), 0);
    }
}
