use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use crate::math::prelude::{Color, PixelRect, Rect, Vector2};
use crate::video::errors::*;
use crate::video::texture::{FrameHandle, FrameObject, Texture, TextureParams};
use crate::video::VideoSystem;

struct FrameState {
    bounds: Rect,
    texture: Texture,
    frame: Arc<FrameObject>,
}

/// A framebuffer and the texture it renders into, covering some bounds in
/// world space. Pixel `(0, 0)` of the texture is the bottom-left integer pixel
/// of the bounds.
///
/// A CPU copy of the pixels is kept for `color_at`, and reloaded lazily after
/// the frame has been marked dirty.
pub struct Frame {
    video: VideoSystem,
    state: RwLock<FrameState>,
    resizing: Mutex<()>,
    dirty: AtomicBool,
    pixels: Mutex<Vec<u8>>,
}

/// Returns the pixels covered by `bounds`, starting at `(0, 0)`.
fn pixel_area(bounds: Rect) -> PixelRect {
    let area = bounds.int_bounds();
    PixelRect::new(0, 0, area.w.max(0), area.h.max(0))
}

/// Returns the texture size for `bounds`, at least one pixel per dimension.
fn texture_params(video: &VideoSystem, bounds: Rect) -> TextureParams {
    let area = bounds.int_bounds();
    TextureParams::new(area.w.max(1) as u32, area.h.max(1) as u32, video.params().smooth)
}

impl Frame {
    /// Creates a fully transparent frame.
    pub fn new(video: &VideoSystem, bounds: Rect) -> Result<Self> {
        let texture = Texture::new(video, texture_params(video, bounds), None)?;
        let frame = FrameObject::new(video, &texture)?;

        Ok(Frame {
            video: video.clone(),
            state: RwLock::new(FrameState {
                bounds,
                texture,
                frame: Arc::new(frame),
            }),
            resizing: Mutex::new(()),
            dirty: AtomicBool::new(true),
            pixels: Mutex::new(Vec::new()),
        })
    }

    #[inline]
    pub fn bounds(&self) -> Rect {
        self.state.read().unwrap().bounds
    }

    /// Returns the integer pixel area of the bounds, relative to the bottom
    /// left pixel. Empty bounds give an empty area, although the texture keeps
    /// at least one pixel.
    #[inline]
    pub fn area(&self) -> PixelRect {
        pixel_area(self.bounds())
    }

    /// Resizes the frame. Pixels inside both the old and the new bounds keep
    /// their content, the rest becomes transparent. Blocks until the new
    /// texture exists. The state lock is only taken to swap in the new
    /// texture, draws submitted meanwhile still go to the old one.
    pub fn set_bounds(&self, bounds: Rect) -> Result<()> {
        let _resizing = self.resizing.lock().unwrap();

        let (old_bounds, old) = {
            let state = self.state.read().unwrap();
            (state.bounds, state.texture.clone())
        };

        if old_bounds == bounds {
            return Ok(());
        }

        let src = old_bounds.int_bounds();
        let src = PixelRect::new(src.x, src.y, src.w.max(0), src.h.max(0));

        let params = texture_params(&self.video, bounds);
        let dst = bounds.int_bounds();
        let dst = PixelRect::new(
            dst.x,
            dst.y,
            params.dimensions.x as i32,
            params.dimensions.y as i32,
        );

        let mut dst_pixels = vec![0u8; params.len()];

        let x0 = src.x.max(dst.x);
        let x1 = (src.x + src.w).min(dst.x + dst.w);
        let y0 = src.y.max(dst.y);
        let y1 = (src.y + src.h).min(dst.y + dst.h);

        if !bounds.int_bounds().is_empty() && x0 < x1 && y0 < y1 {
            let src_pixels = old.pixels(pixel_area(old_bounds))?;
            let row = (x1 - x0) as usize * 4;
            for y in y0..y1 {
                let from = (((y - src.y) * src.w + (x0 - src.x)) * 4) as usize;
                let to = (((y - dst.y) * dst.w + (x0 - dst.x)) * 4) as usize;
                dst_pixels[to..to + row].copy_from_slice(&src_pixels[from..from + row]);
            }
        }

        let texture = Texture::new(&self.video, params, Some(dst_pixels))?;
        let frame = FrameObject::new(&self.video, &texture)?;

        debug!(
            "Resized frame to {:?}..{:?} with {}x{} pixels.",
            bounds.min, bounds.max, params.dimensions.x, params.dimensions.y
        );

        *self.state.write().unwrap() = FrameState {
            bounds,
            texture,
            frame: Arc::new(frame),
        };

        self.dirty();
        Ok(())
    }

    /// Marks the content as changed, the next `color_at` reloads the pixels.
    #[inline]
    pub fn dirty(&self) {
        self.dirty.store(true, Ordering::Release);
    }

    #[inline]
    pub fn is_dirty(&self) -> bool {
        self.dirty.load(Ordering::Acquire)
    }

    #[inline]
    pub fn texture(&self) -> Texture {
        self.state.read().unwrap().texture.clone()
    }

    #[inline]
    pub fn frame_handle(&self) -> FrameHandle {
        self.state.read().unwrap().frame.handle()
    }

    /// Returns the texture together with its pixel area, read at once.
    pub(crate) fn texture_area(&self) -> (Texture, PixelRect) {
        let state = self.state.read().unwrap();
        (state.texture.clone(), pixel_area(state.bounds))
    }

    /// Keeps the framebuffer alive for an operation that renders into it.
    pub(crate) fn frame_object(&self) -> Arc<FrameObject> {
        self.state.read().unwrap().frame.clone()
    }

    /// Returns the color of the pixel under `at`, transparent outside the
    /// bounds. Reloads the pixels with a blocking read if the frame is dirty.
    pub fn color_at(&self, at: Vector2<f32>) -> Color {
        let (bounds, texture) = {
            let state = self.state.read().unwrap();
            (state.bounds, state.texture.clone())
        };

        if !bounds.contains(at) {
            return Color::transparent();
        }

        let mut pixels = self.pixels.lock().unwrap();
        if self.dirty.swap(false, Ordering::AcqRel) || pixels.len() != texture.params().len() {
            match texture.pixels(texture.params().area()) {
                Ok(v) => *pixels = v,
                Err(err) => {
                    self.dirty();
                    warn!("Failed to read back {}: {}", texture.handle(), err);
                    return Color::transparent();
                }
            }
        }

        let area = bounds.int_bounds();
        let x = at.x.floor() as i32 - area.x;
        let y = at.y.floor() as i32 - area.y;
        let i = ((y * texture.width() as i32 + x) * 4) as usize;

        match pixels.get(i..i + 4) {
            Some(v) => Color::from_bytes([v[0], v[1], v[2], v[3]]),
            None => Color::transparent(),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::video::settings::VideoParams;

    #[test]
    fn area() {
        let (video, _) = VideoSystem::immediate(VideoParams::default());
        let frame = Frame::new(&video, Rect::new(1.0, 0.0, 1.0, 3.0)).unwrap();
        assert!(frame.area().is_empty());
        assert_eq!(frame.texture().width(), 1);

        frame.set_bounds(Rect::new(-1.0, -1.0, 1.5, 2.0)).unwrap();
        assert_eq!(frame.area(), PixelRect::new(0, 0, 3, 3));
        assert_eq!(frame.texture().width(), 3);
        assert!(frame.is_dirty());
    }
}
