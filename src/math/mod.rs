//! This module contains the 2D math utils used by canvases, on top of `cgmath`.

pub use cgmath::*;

pub mod affine;
pub use self::affine::Affine;

pub mod color;
pub use self::color::Color;

pub mod rect;
pub use self::rect::{PixelRect, Rect};

pub mod prelude {
    pub use super::affine::Affine;
    pub use super::color::Color;
    pub use super::rect::{PixelRect, Rect};
    pub use cgmath::prelude::*;
    pub use cgmath::{Matrix3, Matrix4, Vector2, Vector3, Vector4};
}
