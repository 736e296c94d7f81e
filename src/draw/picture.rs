use crate::math::prelude::{Color, Rect, Vector2};
use crate::video::picture::GLPicture;

/// A rectangle of pixels.
pub trait Picture {
    /// Returns the rectangle the picture covers.
    fn bounds(&self) -> Rect;

    fn as_color(&self) -> Option<&dyn PictureColor> {
        None
    }

    /// Returns a GPU texture backed view of this picture, if it has one.
    fn gl_picture(&self) -> Option<GLPicture> {
        None
    }
}

/// A picture whose pixels can be sampled one by one.
pub trait PictureColor {
    /// Returns the premultiplied color at `at`, transparent outside the
    /// bounds.
    fn color_at(&self, at: Vector2<f32>) -> Color;
}

/// A picture held in CPU memory. Row 0 is the bottom row of the bounds.
#[derive(Debug, Clone, PartialEq)]
pub struct PictureData {
    pub pixels: Vec<Color>,
    pub stride: usize,
    pub rect: Rect,
}

impl PictureData {
    /// Creates a transparent picture covering `rect`.
    pub fn new(rect: Rect) -> Self {
        let area = rect.int_bounds();
        PictureData {
            pixels: vec![Color::transparent(); area.len()],
            stride: area.w.max(0) as usize,
            rect,
        }
    }

    /// Creates a picture from premultiplied RGBA bytes, rows from the bottom.
    pub fn from_pixels(rect: Rect, bytes: &[u8]) -> Self {
        let mut pd = PictureData::new(rect);
        assert!(
            bytes.len() == 4 * pd.pixels.len(),
            "PictureData::from_pixels: incorrect length of pixel data ({} != {}).",
            bytes.len(),
            4 * pd.pixels.len()
        );

        for (dst, src) in pd.pixels.iter_mut().zip(bytes.chunks(4)) {
            *dst = Color::from_bytes([src[0], src[1], src[2], src[3]]);
        }

        pd
    }

    /// Samples any picture with color access into CPU memory.
    pub fn from_picture(p: &dyn Picture) -> Self {
        let rect = p.bounds();
        let mut pd = PictureData::new(rect);

        if let Some(pc) = p.as_color() {
            let area = rect.int_bounds();
            for y in 0..area.h.max(0) {
                for x in 0..area.w.max(0) {
                    let at = Vector2::new(
                        area.x as f32 + x as f32 + 0.5,
                        area.y as f32 + y as f32 + 0.5,
                    );
                    pd.pixels[y as usize * pd.stride + x as usize] = pc.color_at(at);
                }
            }
        }

        pd
    }

    /// Returns the premultiplied RGBA bytes, rows from the bottom.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.pixels.len() * 4);
        for c in &self.pixels {
            bytes.extend_from_slice(&c.to_bytes());
        }
        bytes
    }

    /// Returns the index of the pixel at `at`, which must be inside the
    /// bounds.
    #[inline]
    pub fn index(&self, at: Vector2<f32>) -> usize {
        let x = (at.x - self.rect.min.x.floor()).floor() as usize;
        let y = (at.y - self.rect.min.y.floor()).floor() as usize;
        y * self.stride + x
    }
}

impl Picture for PictureData {
    #[inline]
    fn bounds(&self) -> Rect {
        self.rect
    }

    fn as_color(&self) -> Option<&dyn PictureColor> {
        Some(self)
    }
}

impl PictureColor for PictureData {
    fn color_at(&self, at: Vector2<f32>) -> Color {
        if !self.rect.contains(at) {
            return Color::transparent();
        }

        self.pixels[self.index(at)]
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn color_at() {
        let mut pd = PictureData::new(Rect::new(10.0, 10.0, 12.0, 12.0));
        assert_eq!(pd.pixels.len(), 4);

        let i = pd.index(Vector2::new(11.5, 10.2));
        assert_eq!(i, 1);
        pd.pixels[i] = Color::red();

        assert_eq!(pd.color_at(Vector2::new(11.0, 10.0)), Color::red());
        assert_eq!(pd.color_at(Vector2::new(10.0, 10.0)), Color::transparent());
        assert_eq!(pd.color_at(Vector2::new(12.0, 10.0)), Color::transparent());
    }

    #[test]
    fn bytes() {
        let rect = Rect::new(0.0, 0.0, 2.0, 1.0);
        let bytes = vec![255, 0, 0, 255, 0, 0, 255, 255];
        let pd = PictureData::from_pixels(rect, &bytes);
        assert_eq!(pd.color_at(Vector2::new(1.5, 0.5)), Color::blue());
        assert_eq!(pd.to_bytes(), bytes);
        assert_eq!(PictureData::from_picture(&pd), pd);
    }
}
