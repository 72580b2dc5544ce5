#![forbid(unsafe_code)]

//! Geometry value types shared by the VM layout opcodes and the canvas layer.

mod matrix;
mod point;
mod rect;

pub use matrix::Matrix;
pub use point::Point;
pub use rect::Rect;
