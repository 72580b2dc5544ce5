#![forbid(unsafe_code)]

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::Point;

/// Axis-aligned rectangle stored as center + extent. The y axis grows
/// downwards, so `north` is the top edge.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub center: Point,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub const fn new(center: Point, width: f64, height: f64) -> Self {
        Self {
            center,
            width,
            height,
        }
    }

    pub fn from_top_left(top_left: Point, width: f64, height: f64) -> Self {
        Self::new(
            Point::new(top_left.x + width * 0.5, top_left.y + height * 0.5),
            width,
            height,
        )
    }

    fn offset(&self, dx: f64, dy: f64) -> Point {
        self.center + Point::new(dx * self.width, dy * self.height)
    }

    pub fn north(&self) -> Point {
        self.offset(0.0, -0.5)
    }

    pub fn south(&self) -> Point {
        self.offset(0.0, 0.5)
    }

    pub fn east(&self) -> Point {
        self.offset(0.5, 0.0)
    }

    pub fn west(&self) -> Point {
        self.offset(-0.5, 0.0)
    }

    pub fn northwest(&self) -> Point {
        self.offset(-0.5, -0.5)
    }

    pub fn northeast(&self) -> Point {
        self.offset(0.5, -0.5)
    }

    pub fn southeast(&self) -> Point {
        self.offset(0.5, 0.5)
    }

    pub fn southwest(&self) -> Point {
        self.offset(-0.5, 0.5)
    }

    /// Shrinks both dimensions by `2 * margin` around the same center.
    pub fn inset(&self, margin: f64) -> Self {
        let amount = margin * 2.0;
        Self::new(self.center, self.width - amount, self.height - amount)
    }

    pub fn split_left(&self, pos: f64) -> Self {
        Self::from_top_left(self.northwest(), pos, self.height)
    }

    pub fn split_right(&self, pos: f64) -> Self {
        let top_left = self.northwest() + Point::new(pos, 0.0);
        Self::from_top_left(top_left, self.width - pos, self.height)
    }

    pub fn split_top(&self, pos: f64) -> Self {
        Self::from_top_left(self.northwest(), self.width, pos)
    }

    pub fn split_bottom(&self, pos: f64) -> Self {
        let top_left = self.northwest() + Point::new(0.0, pos);
        Self::from_top_left(top_left, self.width, self.height - pos)
    }

    /// `(left, right)` halves of a vertical cut at `pos` from the west edge.
    pub fn split_vertical(&self, pos: f64) -> (Self, Self) {
        (self.split_left(pos), self.split_right(pos))
    }

    /// `(top, bottom)` halves of a horizontal cut at `pos` from the north edge.
    pub fn split_horizontal(&self, pos: f64) -> (Self, Self) {
        (self.split_top(pos), self.split_bottom(pos))
    }

    /// Radius of the largest circle centered in the rect; never negative.
    pub fn radius(&self) -> f64 {
        (self.width.min(self.height) * 0.5).max(0.0)
    }
}

impl fmt::Display for Rect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.center, self.width, self.height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit() -> Rect {
        Rect::new(Point::ORIGIN, 4.0, 2.0)
    }

    #[test]
    fn compass_anchors() {
        let r = unit();
        assert_eq!(r.north(), Point::new(0.0, -1.0));
        assert_eq!(r.south(), Point::new(0.0, 1.0));
        assert_eq!(r.east(), Point::new(2.0, 0.0));
        assert_eq!(r.west(), Point::new(-2.0, 0.0));
        assert_eq!(r.northwest(), Point::new(-2.0, -1.0));
        assert_eq!(r.northeast(), Point::new(2.0, -1.0));
        assert_eq!(r.southeast(), Point::new(2.0, 1.0));
        assert_eq!(r.southwest(), Point::new(-2.0, 1.0));
    }

    #[test]
    fn inset_shrinks_twice_the_margin() {
        let r = unit().inset(0.5);
        assert_eq!(r.center, Point::ORIGIN);
        assert_eq!((r.width, r.height), (3.0, 1.0));
    }

    #[test]
    fn vertical_split_shares_the_cut_edge() {
        let (left, right) = unit().split_vertical(1.0);
        assert_eq!(left.width, 1.0);
        assert_eq!(right.width, 3.0);
        assert_eq!(left.east(), right.west());
        assert_eq!(left.northwest(), unit().northwest());
    }

    #[test]
    fn horizontal_split_shares_the_cut_edge() {
        let (top, bottom) = unit().split_horizontal(0.5);
        assert_eq!(top.height, 0.5);
        assert_eq!(bottom.height, 1.5);
        assert_eq!(top.south(), bottom.north());
    }

    #[test]
    fn radius_is_clamped_at_zero() {
        assert_eq!(unit().radius(), 1.0);
        assert_eq!(unit().inset(3.0).radius(), 0.0);
    }

    #[test]
    fn from_top_left_round_trips_northwest() {
        let r = Rect::from_top_left(Point::new(10.0, 20.0), 6.0, 8.0);
        assert_eq!(r.center, Point::new(13.0, 24.0));
        assert_eq!(r.northwest(), Point::new(10.0, 20.0));
    }
}
