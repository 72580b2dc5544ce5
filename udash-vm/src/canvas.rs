#![forbid(unsafe_code)]

use std::fmt;

use serde::{Deserialize, Serialize};
use udash_geom::{Matrix, Point};

/// Solid color source, components in `0.0..=1.0`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Pattern {
    pub r: f64,
    pub g: f64,
    pub b: f64,
    pub a: f64,
}

impl Pattern {
    pub const BLACK: Self = Self::rgba(0.0, 0.0, 0.0, 1.0);

    pub const fn rgb(r: f64, g: f64, b: f64) -> Self {
        Self::rgba(r, g, b, 1.0)
    }

    pub const fn rgba(r: f64, g: f64, b: f64, a: f64) -> Self {
        Self { r, g, b, a }
    }
}

impl Default for Pattern {
    fn default() -> Self {
        Self::BLACK
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rgba({}, {}, {}, {})", self.r, self.g, self.b, self.a)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineJoin {
    #[default]
    Miter,
    Round,
    Bevel,
}

impl LineJoin {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "miter" => Some(Self::Miter),
            "round" => Some(Self::Round),
            "bevel" => Some(Self::Bevel),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineCap {
    #[default]
    Butt,
    Round,
    Square,
}

impl LineCap {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "butt" => Some(Self::Butt),
            "round" => Some(Self::Round),
            "square" => Some(Self::Square),
            _ => None,
        }
    }
}

/// The drawing capability the VM renders through.
///
/// Mirrors the usual immediate-mode 2-D API: a current path built in user
/// space, a transform matrix, and a save/restore stack of graphics state.
/// Angles are in radians.
pub trait Canvas {
    fn new_path(&mut self);
    fn new_sub_path(&mut self);
    fn move_to(&mut self, to: Point);
    fn line_to(&mut self, to: Point);
    fn curve_to(&mut self, c1: Point, c2: Point, to: Point);
    fn arc(&mut self, center: Point, radius: f64, start: f64, end: f64);
    fn rectangle(&mut self, origin: Point, width: f64, height: f64);
    fn close_path(&mut self);

    fn fill(&mut self);
    fn stroke(&mut self);
    fn clip(&mut self);
    fn paint(&mut self);

    fn save(&mut self);
    fn restore(&mut self);
    fn translate(&mut self, by: Point);
    fn rotate(&mut self, radians: f64);
    fn scale(&mut self, sx: f64, sy: f64);

    fn set_source(&mut self, pattern: Pattern);
    fn set_line_width(&mut self, width: f64);
    fn set_line_join(&mut self, join: LineJoin);
    fn set_line_cap(&mut self, cap: LineCap);

    /// Current user-to-device transform.
    fn matrix(&self) -> Matrix;
    /// Current point in user space, if a path is open.
    fn current_point(&self) -> Option<Point>;
}
