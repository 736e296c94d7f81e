//! Textures and the framebuffers that render into them.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::math::prelude::{PixelRect, Vector2};

use super::errors::*;
use super::VideoSystem;

impl_handle!(TextureHandle);
impl_handle!(FrameHandle);

/// The parameters of a RGBA8 texture with premultiplied alpha.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextureParams {
    pub dimensions: Vector2<u32>,
    /// Linear filtering if true, nearest otherwise.
    pub smooth: bool,
}

impl TextureParams {
    #[inline]
    pub fn new(width: u32, height: u32, smooth: bool) -> Self {
        TextureParams {
            dimensions: Vector2::new(width, height),
            smooth,
        }
    }

    /// Returns the length in bytes of the whole texture.
    #[inline]
    pub fn len(&self) -> usize {
        4 * self.dimensions.x as usize * self.dimensions.y as usize
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    pub fn area(&self) -> PixelRect {
        PixelRect::new(0, 0, self.dimensions.x as i32, self.dimensions.y as i32)
    }
}

struct TextureObject {
    handle: TextureHandle,
    params: TextureParams,
    video: VideoSystem,
}

impl Drop for TextureObject {
    fn drop(&mut self) {
        self.video.delete_texture(self.handle);
    }
}

/// A GPU texture. Clones share the same GPU object, which is deleted once the
/// last clone is dropped.
#[derive(Clone)]
pub struct Texture {
    object: Arc<TextureObject>,
}

impl Texture {
    /// Creates a texture, with transparent pixels if `data` is `None`. Blocks
    /// until the texture exists.
    pub fn new(video: &VideoSystem, params: TextureParams, data: Option<Vec<u8>>) -> Result<Self> {
        if let Some(ref v) = data {
            assert!(
                v.len() == params.len(),
                "Texture::new: incorrect length of pixel data ({} != {}).",
                v.len(),
                params.len()
            );
        }

        let handle = video.create_texture_handle();
        let rsp = video.executor().call(move |visitor| {
            visitor.create_texture(handle, params, data.as_ref().map(|v| &v[..]))
        });

        if let Err(err) = rsp {
            video.free_texture_handle(handle);
            return Err(err.into());
        }

        debug!(
            "Created {} with {}x{} pixels.",
            handle, params.dimensions.x, params.dimensions.y
        );

        Ok(Texture {
            object: Arc::new(TextureObject {
                handle,
                params,
                video: video.clone(),
            }),
        })
    }

    #[inline]
    pub fn handle(&self) -> TextureHandle {
        self.object.handle
    }

    #[inline]
    pub fn params(&self) -> TextureParams {
        self.object.params
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.object.params.dimensions.x
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.object.params.dimensions.y
    }

    #[inline]
    pub fn video(&self) -> &VideoSystem {
        &self.object.video
    }

    /// Replaces the pixels of `area`. Blocks until the upload finished.
    pub fn set_pixels(&self, area: PixelRect, data: Vec<u8>) -> Result<()> {
        if !self.contains(area) {
            return Err(Error::OutOfBounds);
        }

        assert!(
            data.len() == 4 * area.len(),
            "Texture::set_pixels: incorrect length of pixel data ({} != {}).",
            data.len(),
            4 * area.len()
        );

        let handle = self.handle();
        let rsp = self
            .video()
            .executor()
            .call(move |visitor| visitor.update_texture(handle, area, &data));
        Ok(rsp?)
    }

    /// Reads back the pixels of `area`. Blocks until the pixels arrived.
    pub fn pixels(&self, area: PixelRect) -> Result<Vec<u8>> {
        if !self.contains(area) {
            return Err(Error::OutOfBounds);
        }

        let handle = self.handle();
        let rsp = self
            .video()
            .executor()
            .call(move |visitor| visitor.read_texture(handle, area));
        Ok(rsp?)
    }

    /// Returns whether the texture uses linear filtering now.
    pub fn smooth(&self) -> Result<bool> {
        let handle = self.handle();
        let rsp = self
            .video()
            .executor()
            .call(move |visitor| visitor.texture_smooth(handle));
        Ok(rsp?)
    }

    fn contains(&self, area: PixelRect) -> bool {
        let dims = self.object.params.dimensions;
        area.x >= 0
            && area.y >= 0
            && area.w >= 0
            && area.h >= 0
            && (area.x + area.w) as u32 <= dims.x
            && (area.y + area.h) as u32 <= dims.y
    }
}

/// Owns a framebuffer object, deleted without blocking on drop.
pub(crate) struct FrameObject {
    handle: FrameHandle,
    video: VideoSystem,
}

impl FrameObject {
    /// Creates a framebuffer rendering into `texture`. Blocks until it exists.
    pub fn new(video: &VideoSystem, texture: &Texture) -> Result<Self> {
        let handle = video.create_frame_handle();
        let texture = texture.handle();
        let rsp = video
            .executor()
            .call(move |visitor| visitor.create_frame(handle, texture));

        if let Err(err) = rsp {
            video.free_frame_handle(handle);
            return Err(err.into());
        }

        Ok(FrameObject {
            handle,
            video: video.clone(),
        })
    }

    #[inline]
    pub fn handle(&self) -> FrameHandle {
        self.handle
    }
}

impl Drop for FrameObject {
    fn drop(&mut self) {
        self.video.delete_frame(self.handle);
    }
}
