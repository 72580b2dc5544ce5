#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};

use crate::Point;

/// Affine transform in the usual drawing-library layout:
///
/// ```text
/// x' = xx * x + xy * y + x0
/// y' = yx * x + yy * y + y0
/// ```
///
/// `translate`, `rotate` and `scale` modify the transform in user space, i.e.
/// the new operation applies before the existing one.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Matrix {
    pub xx: f64,
    pub yx: f64,
    pub xy: f64,
    pub yy: f64,
    pub x0: f64,
    pub y0: f64,
}

impl Default for Matrix {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Matrix {
    pub const IDENTITY: Self = Self {
        xx: 1.0,
        yx: 0.0,
        xy: 0.0,
        yy: 1.0,
        x0: 0.0,
        y0: 0.0,
    };

    pub fn translate(&mut self, tx: f64, ty: f64) {
        self.x0 += self.xx * tx + self.xy * ty;
        self.y0 += self.yx * tx + self.yy * ty;
    }

    pub fn scale(&mut self, sx: f64, sy: f64) {
        self.xx *= sx;
        self.yx *= sx;
        self.xy *= sy;
        self.yy *= sy;
    }

    pub fn rotate(&mut self, radians: f64) {
        let (s, c) = radians.sin_cos();
        let Self { xx, yx, xy, yy, .. } = *self;
        self.xx = xx * c + xy * s;
        self.yx = yx * c + yy * s;
        self.xy = xy * c - xx * s;
        self.yy = yy * c - yx * s;
    }

    /// Transform that applies `self` first, then `then`.
    pub fn then(&self, then: &Matrix) -> Matrix {
        Matrix {
            xx: self.xx * then.xx + self.yx * then.xy,
            yx: self.xx * then.yx + self.yx * then.yy,
            xy: self.xy * then.xx + self.yy * then.xy,
            yy: self.xy * then.yx + self.yy * then.yy,
            x0: self.x0 * then.xx + self.y0 * then.xy + then.x0,
            y0: self.x0 * then.yx + self.y0 * then.yy + then.y0,
        }
    }

    pub fn transform_point(&self, p: Point) -> Point {
        Point::new(
            self.xx * p.x + self.xy * p.y + self.x0,
            self.yx * p.x + self.yy * p.y + self.y0,
        )
    }

    /// Transforms a direction; translation is ignored.
    pub fn transform_distance(&self, d: Point) -> Point {
        Point::new(self.xx * d.x + self.xy * d.y, self.yx * d.x + self.yy * d.y)
    }

    pub fn determinant(&self) -> f64 {
        self.xx * self.yy - self.xy * self.yx
    }

    /// `None` when the transform is singular.
    pub fn invert(&self) -> Option<Matrix> {
        let det = self.determinant();
        if det == 0.0 || !det.is_finite() {
            return None;
        }
        let xx = self.yy / det;
        let yx = -self.yx / det;
        let xy = -self.xy / det;
        let yy = self.xx / det;
        Some(Matrix {
            xx,
            yx,
            xy,
            yy,
            x0: -(xx * self.x0 + xy * self.y0),
            y0: -(yx * self.x0 + yy * self.y0),
        })
    }
}
