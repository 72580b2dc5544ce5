#![forbid(unsafe_code)]

use tracing::{debug, warn};
use udash_geom::{Matrix, Point};

use crate::canvas::{Canvas, LineCap, LineJoin, Pattern};

/// Canvas wrapper that keeps `save`/`restore` balanced for one run.
///
/// A `restore` with no matching `save` from the same run is dropped, so a
/// program can never pop graphics state the host pushed. Saves still open
/// when the guard goes away are restored, on error paths too.
pub struct SaveGuard<'a> {
    inner: &'a mut dyn Canvas,
    open: usize,
}

impl<'a> SaveGuard<'a> {
    pub fn new(inner: &'a mut dyn Canvas) -> Self {
        Self { inner, open: 0 }
    }

    pub fn open_saves(&self) -> usize {
        self.open
    }
}

impl Drop for SaveGuard<'_> {
    fn drop(&mut self) {
        if self.open > 0 {
            debug!(unmatched = self.open, "restoring unmatched saves");
        }
        for _ in 0..self.open {
            self.inner.restore();
        }
    }
}

impl Canvas for SaveGuard<'_> {
    fn new_path(&mut self) {
        self.inner.new_path();
    }

    fn new_sub_path(&mut self) {
        self.inner.new_sub_path();
    }

    fn move_to(&mut self, to: Point) {
        self.inner.move_to(to);
    }

    fn line_to(&mut self, to: Point) {
        self.inner.line_to(to);
    }

    fn curve_to(&mut self, c1: Point, c2: Point, to: Point) {
        self.inner.curve_to(c1, c2, to);
    }

    fn arc(&mut self, center: Point, radius: f64, start: f64, end: f64) {
        self.inner.arc(center, radius, start, end);
    }

    fn rectangle(&mut self, origin: Point, width: f64, height: f64) {
        self.inner.rectangle(origin, width, height);
    }

    fn close_path(&mut self) {
        self.inner.close_path();
    }

    fn fill(&mut self) {
        self.inner.fill();
    }

    fn stroke(&mut self) {
        self.inner.stroke();
    }

    fn clip(&mut self) {
        self.inner.clip();
    }

    fn paint(&mut self) {
        self.inner.paint();
    }

    fn save(&mut self) {
        self.open += 1;
        self.inner.save();
    }

    fn restore(&mut self) {
        if self.open == 0 {
            warn!("restore without a matching save ignored");
            return;
        }
        self.open -= 1;
        self.inner.restore();
    }

    fn translate(&mut self, by: Point) {
        self.inner.translate(by);
    }

    fn rotate(&mut self, radians: f64) {
        self.inner.rotate(radians);
    }

    fn scale(&mut self, sx: f64, sy: f64) {
        self.inner.scale(sx, sy);
    }

    fn set_source(&mut self, pattern: Pattern) {
        self.inner.set_source(pattern);
    }

    fn set_line_width(&mut self, width: f64) {
        self.inner.set_line_width(width);
    }

    fn set_line_join(&mut self, join: LineJoin) {
        self.inner.set_line_join(join);
    }

    fn set_line_cap(&mut self, cap: LineCap) {
        self.inner.set_line_cap(cap);
    }

    fn matrix(&self) -> Matrix {
        self.inner.matrix()
    }

    fn current_point(&self) -> Option<Point> {
        self.inner.current_point()
    }
}
