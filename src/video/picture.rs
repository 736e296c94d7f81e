use std::sync::Arc;

use crate::draw::picture::{Picture, PictureColor, PictureData};
use crate::math::prelude::{Color, PixelRect, Rect, Vector2};

use super::errors::*;
use super::texture::{Texture, TextureParams};
use super::VideoSystem;

/// A picture backed by a GPU texture. Texel `(0, 0)` maps to the bottom-left
/// integer pixel of the bounds.
#[derive(Clone)]
pub struct GLPicture {
    texture: Texture,
    bounds: Rect,
    pixels: Option<Arc<PictureData>>,
}

impl GLPicture {
    /// Wraps an existing texture, colors are read back from the GPU on demand.
    pub fn new(texture: Texture, bounds: Rect) -> Self {
        GLPicture {
            texture,
            bounds,
            pixels: None,
        }
    }

    /// Uploads the pixels of `p` into a new texture, or shares the texture of
    /// `p` if it already has one.
    pub fn from_picture(video: &VideoSystem, p: &dyn Picture) -> Result<Self> {
        if let Some(gp) = p.gl_picture() {
            return Ok(gp);
        }

        let pd = PictureData::from_picture(p);
        let area = pd.rect.int_bounds();
        let params = TextureParams::new(
            area.w.max(0) as u32,
            area.h.max(0) as u32,
            video.params().smooth,
        );
        let texture = Texture::new(video, params, Some(pd.to_bytes()))?;

        Ok(GLPicture {
            texture,
            bounds: pd.rect,
            pixels: Some(Arc::new(pd)),
        })
    }

    #[inline]
    pub fn texture(&self) -> &Texture {
        &self.texture
    }
}

impl Picture for GLPicture {
    #[inline]
    fn bounds(&self) -> Rect {
        self.bounds
    }

    fn as_color(&self) -> Option<&dyn PictureColor> {
        Some(self)
    }

    fn gl_picture(&self) -> Option<GLPicture> {
        Some(self.clone())
    }
}

impl PictureColor for GLPicture {
    fn color_at(&self, at: Vector2<f32>) -> Color {
        if let Some(ref pd) = self.pixels {
            return pd.color_at(at);
        }

        if !self.bounds.contains(at) {
            return Color::transparent();
        }

        let area = self.bounds.int_bounds();
        let x = at.x.floor() as i32 - area.x;
        let y = at.y.floor() as i32 - area.y;

        match self.texture.pixels(PixelRect::new(x, y, 1, 1)) {
            Ok(v) => Color::from_bytes([v[0], v[1], v[2], v[3]]),
            Err(err) => {
                warn!("Failed to read back {}: {}", self.texture.handle(), err);
                Color::transparent()
            }
        }
    }
}
