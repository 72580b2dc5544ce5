#![forbid(unsafe_code)]

use std::fmt;
use std::ops::{Add, Div, Mul, Neg, Sub};

use serde::{Deserialize, Serialize};

/// A 2-D point (or vector). Arithmetic is componentwise; a scalar operand is
/// broadcast to both components.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const ORIGIN: Self = Self { x: 0.0, y: 0.0 };

    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Both components set to `v`.
    pub const fn splat(v: f64) -> Self {
        Self { x: v, y: v }
    }

    /// Euclidean length of the vector from the origin.
    pub fn length(self) -> f64 {
        self.x.hypot(self.y)
    }

    pub fn map(self, f: impl Fn(f64) -> f64) -> Self {
        Self::new(f(self.x), f(self.y))
    }

    pub fn zip_with(self, other: Self, f: impl Fn(f64, f64) -> f64) -> Self {
        Self::new(f(self.x, other.x), f(self.y, other.y))
    }
}

impl From<(f64, f64)> for Point {
    fn from((x, y): (f64, f64)) -> Self {
        Self::new(x, y)
    }
}

impl From<Point> for (f64, f64) {
    fn from(p: Point) -> Self {
        (p.x, p.y)
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{})", self.x, self.y)
    }
}

macro_rules! broadcast_op {
    ($trait:ident, $method:ident, $op:tt) => {
        impl $trait for Point {
            type Output = Point;

            fn $method(self, rhs: Point) -> Point {
                self.zip_with(rhs, |a, b| a $op b)
            }
        }

        impl $trait<f64> for Point {
            type Output = Point;

            fn $method(self, rhs: f64) -> Point {
                self $op Point::splat(rhs)
            }
        }

        impl $trait<Point> for f64 {
            type Output = Point;

            fn $method(self, rhs: Point) -> Point {
                Point::splat(self) $op rhs
            }
        }
    };
}

broadcast_op!(Add, add, +);
broadcast_op!(Sub, sub, -);
broadcast_op!(Mul, mul, *);
broadcast_op!(Div, div, /);

impl Neg for Point {
    type Output = Point;

    fn neg(self) -> Point {
        self.map(|v| -v)
    }
}
