use crate::math::prelude::{Affine, Color, Rect};
use crate::video::errors::Result;

use super::picture::Picture;
use super::triangles::{TrianglesData, Vertex};
use super::Target;

/// Draws a rectangular frame of a picture as two textured triangles. The
/// quad spans the frame itself before the matrix is applied.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Sprite {
    frame: Rect,
}

impl Sprite {
    pub fn new(frame: Rect) -> Self {
        Sprite { frame }
    }

    #[inline]
    pub fn frame(&self) -> Rect {
        self.frame
    }

    #[inline]
    pub fn set_frame(&mut self, frame: Rect) {
        self.frame = frame;
    }

    /// Returns the quad transformed by `matrix` and tinted by `mask`.
    pub fn triangles(&self, matrix: Affine, mask: Color) -> TrianglesData {
        let [p0, p1, p2, p3] = self.frame.corners();
        TrianglesData(
            [p0, p1, p2, p0, p2, p3]
                .iter()
                .map(|&p| Vertex {
                    position: matrix.project(p),
                    color: mask,
                    picture: p,
                    intensity: 1.0,
                })
                .collect(),
        )
    }

    /// Draws the frame of `picture` onto `target`.
    #[inline]
    pub fn draw(&self, picture: &dyn Picture, target: &dyn Target, matrix: Affine) -> Result<()> {
        self.draw_color_mask(picture, target, matrix, None)
    }

    /// Draws the frame of `picture` onto `target`, tinted by `mask`. `None`
    /// leaves the colors untouched.
    pub fn draw_color_mask(
        &self,
        picture: &dyn Picture,
        target: &dyn Target,
        matrix: Affine,
        mask: Option<Color>,
    ) -> Result<()> {
        let tri = self.triangles(matrix, mask.unwrap_or_else(Color::white));
        let tt = target.make_triangles(&tri);
        let tp = target.make_picture(picture)?;
        tp.draw(tt.as_ref());
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::math::prelude::Vector2;

    #[test]
    fn quad() {
        let sprite = Sprite::new(Rect::new(10.0, 20.0, 30.0, 40.0));
        let tri = sprite.triangles(Affine::IDENTITY.moved(Vector2::new(1.0, 0.0)), Color::red());

        assert_eq!(tri.0.len(), 6);
        assert_eq!(tri.0[0].position, Vector2::new(11.0, 20.0));
        assert_eq!(tri.0[0].picture, Vector2::new(10.0, 20.0));
        assert_eq!(tri.0[2].picture, Vector2::new(30.0, 40.0));
        assert!(tri.0.iter().all(|v| v.intensity == 1.0 && v.color == Color::red()));
    }
}
