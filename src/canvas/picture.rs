use std::ptr;

use crate::draw::picture::{Picture, PictureColor};
use crate::draw::{TargetPicture, TargetTriangles};
use crate::math::prelude::Rect;
use crate::video::picture::GLPicture;

use super::Canvas;

/// A texture backed picture that draws onto the canvas that made it.
pub struct CanvasPicture<'a> {
    picture: GLPicture,
    canvas: &'a Canvas,
}

impl<'a> CanvasPicture<'a> {
    pub(crate) fn new(picture: GLPicture, canvas: &'a Canvas) -> Self {
        CanvasPicture { picture, canvas }
    }

    #[inline]
    pub fn canvas(&self) -> &'a Canvas {
        self.canvas
    }

    #[inline]
    pub fn picture(&self) -> &GLPicture {
        &self.picture
    }
}

impl<'a> Picture for CanvasPicture<'a> {
    #[inline]
    fn bounds(&self) -> Rect {
        self.picture.bounds()
    }

    fn as_color(&self) -> Option<&dyn PictureColor> {
        Some(&self.picture)
    }

    fn gl_picture(&self) -> Option<GLPicture> {
        Some(self.picture.clone())
    }
}

impl<'a> TargetPicture for CanvasPicture<'a> {
    fn draw(&self, t: &dyn TargetTriangles) {
        let ct = match t.canvas_triangles() {
            Some(ct) => ct,
            None => panic!("CanvasPicture::draw: triangles were not made by a canvas."),
        };

        if !ptr::eq(ct.canvas(), self.canvas) {
            panic!("CanvasPicture::draw: triangles were made by a different canvas.");
        }

        ct.draw_with(Some(self.picture.texture()), self.picture.bounds());
    }
}
