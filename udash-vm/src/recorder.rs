#![forbid(unsafe_code)]

use serde::Serialize;
use udash_geom::{Matrix, Point};

use crate::canvas::{Canvas, LineCap, LineJoin, Pattern};

/// One call made against a [`Recorder`], with user-space arguments.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum DrawOp {
    NewPath,
    NewSubPath,
    MoveTo { to: Point },
    LineTo { to: Point },
    CurveTo { c1: Point, c2: Point, to: Point },
    Arc { center: Point, radius: f64, start: f64, end: f64 },
    Rectangle { origin: Point, width: f64, height: f64 },
    ClosePath,
    Fill,
    Stroke,
    Clip,
    Paint,
    Save,
    Restore,
    Translate { by: Point },
    Rotate { radians: f64 },
    Scale { sx: f64, sy: f64 },
    SetSource { pattern: Pattern },
    SetLineWidth { width: f64 },
    SetLineJoin { join: LineJoin },
    SetLineCap { cap: LineCap },
}

#[derive(Clone, Debug, PartialEq)]
struct GraphicsState {
    matrix: Matrix,
    source: Pattern,
    line_width: f64,
    line_join: LineJoin,
    line_cap: LineCap,
}

impl Default for GraphicsState {
    fn default() -> Self {
        Self {
            matrix: Matrix::IDENTITY,
            source: Pattern::BLACK,
            line_width: 2.0,
            line_join: LineJoin::default(),
            line_cap: LineCap::default(),
        }
    }
}

/// In-memory canvas that records every call and tracks enough state to
/// answer `matrix` and `current_point`.
///
/// Cloning snapshots the whole surface, which the allowable-opcode probe
/// relies on.
#[derive(Clone, Debug, Default)]
pub struct Recorder {
    ops: Vec<DrawOp>,
    state: GraphicsState,
    saved: Vec<GraphicsState>,
    // Device space, so later transforms don't move it.
    current: Option<Point>,
    subpath_start: Option<Point>,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ops(&self) -> &[DrawOp] {
        &self.ops
    }

    pub fn take_ops(&mut self) -> Vec<DrawOp> {
        std::mem::take(&mut self.ops)
    }

    /// Number of `save` calls not yet matched by a `restore`.
    pub fn save_depth(&self) -> usize {
        self.saved.len()
    }

    pub fn source(&self) -> Pattern {
        self.state.source
    }

    pub fn line_width(&self) -> f64 {
        self.state.line_width
    }

    pub fn line_join(&self) -> LineJoin {
        self.state.line_join
    }

    pub fn line_cap(&self) -> LineCap {
        self.state.line_cap
    }

    fn to_device(&self, p: Point) -> Point {
        self.state.matrix.transform_point(p)
    }

    fn set_current(&mut self, user: Point) {
        self.current = Some(self.to_device(user));
    }

    fn start_subpath(&mut self, user: Point) {
        self.set_current(user);
        self.subpath_start = self.current;
    }

    fn clear_path(&mut self) {
        self.current = None;
        self.subpath_start = None;
    }
}

impl Canvas for Recorder {
    fn new_path(&mut self) {
        self.ops.push(DrawOp::NewPath);
        self.clear_path();
    }

    fn new_sub_path(&mut self) {
        self.ops.push(DrawOp::NewSubPath);
        self.clear_path();
    }

    fn move_to(&mut self, to: Point) {
        self.ops.push(DrawOp::MoveTo { to });
        self.start_subpath(to);
    }

    fn line_to(&mut self, to: Point) {
        self.ops.push(DrawOp::LineTo { to });
        if self.current.is_none() {
            self.start_subpath(to);
        } else {
            self.set_current(to);
        }
    }

    fn curve_to(&mut self, c1: Point, c2: Point, to: Point) {
        self.ops.push(DrawOp::CurveTo { c1, c2, to });
        if self.current.is_none() {
            self.start_subpath(c1);
        }
        self.set_current(to);
    }

    fn arc(&mut self, center: Point, radius: f64, start: f64, end: f64) {
        self.ops.push(DrawOp::Arc {
            center,
            radius,
            start,
            end,
        });
        let at = |angle: f64| center + Point::new(angle.cos(), angle.sin()) * radius;
        if self.current.is_none() {
            self.start_subpath(at(start));
        }
        self.set_current(at(end));
    }

    fn rectangle(&mut self, origin: Point, width: f64, height: f64) {
        self.ops.push(DrawOp::Rectangle {
            origin,
            width,
            height,
        });
        self.start_subpath(origin);
    }

    fn close_path(&mut self) {
        self.ops.push(DrawOp::ClosePath);
        self.current = self.subpath_start;
    }

    fn fill(&mut self) {
        self.ops.push(DrawOp::Fill);
        self.clear_path();
    }

    fn stroke(&mut self) {
        self.ops.push(DrawOp::Stroke);
        self.clear_path();
    }

    fn clip(&mut self) {
        self.ops.push(DrawOp::Clip);
        self.clear_path();
    }

    fn paint(&mut self) {
        self.ops.push(DrawOp::Paint);
    }

    fn save(&mut self) {
        self.ops.push(DrawOp::Save);
        self.saved.push(self.state.clone());
    }

    fn restore(&mut self) {
        self.ops.push(DrawOp::Restore);
        if let Some(state) = self.saved.pop() {
            self.state = state;
        }
    }

    fn translate(&mut self, by: Point) {
        self.ops.push(DrawOp::Translate { by });
        self.state.matrix.translate(by.x, by.y);
    }

    fn rotate(&mut self, radians: f64) {
        self.ops.push(DrawOp::Rotate { radians });
        self.state.matrix.rotate(radians);
    }

    fn scale(&mut self, sx: f64, sy: f64) {
        self.ops.push(DrawOp::Scale { sx, sy });
        self.state.matrix.scale(sx, sy);
    }

    fn set_source(&mut self, pattern: Pattern) {
        self.ops.push(DrawOp::SetSource { pattern });
        self.state.source = pattern;
    }

    fn set_line_width(&mut self, width: f64) {
        self.ops.push(DrawOp::SetLineWidth { width });
        self.state.line_width = width;
    }

    fn set_line_join(&mut self, join: LineJoin) {
        self.ops.push(DrawOp::SetLineJoin { join });
        self.state.line_join = join;
    }

    fn set_line_cap(&mut self, cap: LineCap) {
        self.ops.push(DrawOp::SetLineCap { cap });
        self.state.line_cap = cap;
    }

    fn matrix(&self) -> Matrix {
        self.state.matrix
    }

    fn current_point(&self) -> Option<Point> {
        let device = self.current?;
        let inverse = self.state.matrix.invert()?;
        Some(inverse.transform_point(device))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: Point, b: Point) -> bool {
        (a - b).length() < 1e-9
    }

    #[test]
    fn current_point_follows_path_construction() {
        let mut r = Recorder::new();
        assert_eq!(r.current_point(), None);
        r.move_to(Point::new(1.0, 2.0));
        r.line_to(Point::new(5.0, 2.0));
        assert_eq!(r.current_point(), Some(Point::new(5.0, 2.0)));
        r.close_path();
        assert_eq!(r.current_point(), Some(Point::new(1.0, 2.0)));
        r.fill();
        assert_eq!(r.current_point(), None);
    }

    #[test]
    fn current_point_is_reported_in_user_space() {
        let mut r = Recorder::new();
        r.move_to(Point::new(10.0, 0.0));
        r.translate(Point::new(10.0, 0.0));
        assert!(close(r.current_point().unwrap(), Point::ORIGIN));
    }

    #[test]
    fn arc_ends_on_its_circle() {
        let mut r = Recorder::new();
        r.arc(Point::ORIGIN, 2.0, 0.0, std::f64::consts::FRAC_PI_2);
        assert!(close(r.current_point().unwrap(), Point::new(0.0, 2.0)));
    }

    #[test]
    fn restore_brings_back_transform_and_style() {
        let mut r = Recorder::new();
        r.save();
        r.translate(Point::new(3.0, 4.0));
        r.set_line_width(7.0);
        r.set_line_join(LineJoin::Round);
        assert_eq!(r.save_depth(), 1);
        r.restore();
        assert_eq!(r.matrix(), Matrix::IDENTITY);
        assert_eq!(r.line_width(), 2.0);
        assert_eq!(r.line_join(), LineJoin::Miter);
        assert_eq!(r.save_depth(), 0);
    }

    #[test]
    fn unmatched_restore_is_recorded_but_harmless() {
        let mut r = Recorder::new();
        r.scale(2.0, 2.0);
        r.restore();
        assert_eq!(r.matrix().xx, 2.0);
        assert_eq!(r.ops().last(), Some(&DrawOp::Restore));
    }
}
