//! Drawing abstractions shared by every target: triangle batches, pictures
//! and the targets that accept them.
//!
//! Triangle batches and pictures expose their optional capabilities through
//! accessor methods, e.g. `Triangles::as_color`. A target may keep its own
//! native copies of them with `Target::make_triangles` and
//! `Target::make_picture`, which are then drawn with `TargetPicture::draw` or
//! `TargetTriangles::draw`.

pub mod picture;
pub mod sprite;
pub mod triangles;

pub mod prelude {
    pub use super::picture::{Picture, PictureColor, PictureData};
    pub use super::sprite::Sprite;
    pub use super::triangles::{
        Triangles, TrianglesColor, TrianglesData, TrianglesPicture, TrianglesPosition, Vertex,
    };
    pub use super::{Target, TargetPicture, TargetTriangles};
}

use crate::canvas::CanvasTriangles;
use crate::video::errors::Result;

use self::picture::Picture;
use self::triangles::Triangles;

/// Something triangles and pictures can be drawn onto.
pub trait Target {
    /// Creates a triangle batch that draws onto this target, copying the
    /// geometry of `t` unless it can be shared.
    fn make_triangles<'a>(&'a self, t: &dyn Triangles) -> Box<dyn TargetTriangles + 'a>;

    /// Creates a picture that can be drawn onto this target through its
    /// triangle batches.
    fn make_picture<'a>(&'a self, p: &dyn Picture) -> Result<Box<dyn TargetPicture + 'a>>;
}

/// Triangles created by a `Target`.
pub trait TargetTriangles: Triangles {
    /// Draws the triangles onto their target, without a picture.
    fn draw(&self);

    /// Returns the canvas specific batch, if the triangles were made by a
    /// canvas.
    fn canvas_triangles(&self) -> Option<&CanvasTriangles<'_>> {
        None
    }
}

/// A picture created by a `Target`.
pub trait TargetPicture: Picture {
    /// Draws `t` textured with this picture. `t` must have been created by the
    /// same target.
    fn draw(&self, t: &dyn TargetTriangles);
}
