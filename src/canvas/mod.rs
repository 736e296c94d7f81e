//! Off-screen render targets.
//!
//! A `Canvas` is a `Target` that triangles and pictures are drawn onto, and a
//! `Picture` that can itself be drawn onto other targets:
//!
//! ```rust,ignore
//! let canvas = Canvas::new(&video, Rect::new(0.0, 0.0, 64.0, 64.0))?;
//! canvas.clear(Color::black());
//!
//! let tri = canvas.make_triangles(&TrianglesData::from_rect(canvas.bounds(), Color::red()));
//! let sprite = canvas.make_picture(&picture)?;
//! sprite.draw(&tri);
//!
//! canvas.draw(&other, Affine::IDENTITY.moved(Vector2::new(32.0, 32.0)))?;
//! ```
//!
//! Setters take effect from the next draw. Every draw captures the render
//! state of its canvas before it is deferred to the GPU context, and returns
//! without waiting for it. Reading pixels back blocks until all the draws
//! submitted before have finished.

pub mod frame;
pub mod picture;
pub mod triangles;

pub use self::picture::CanvasPicture;
pub use self::triangles::CanvasTriangles;

use std::convert::TryFrom;
use std::sync::RwLock;

use crate::draw::picture::{Picture, PictureColor};
use crate::draw::sprite::Sprite;
use crate::draw::triangles::Triangles;
use crate::draw::{Target, TargetPicture, TargetTriangles};
use crate::math::prelude::{Affine, Color, Matrix3, PixelRect, Rect, SquareMatrix, Vector2};
use crate::video::backends::Visitor;
use crate::video::blend::ComposeMethod;
use crate::video::errors::*;
use crate::video::executor::report;
use crate::video::picture::GLPicture;
use crate::video::shader::{Shader, UniformVariable, FRAGMENT_SHADER};
use crate::video::texture::{FrameHandle, FrameObject, Texture};
use crate::video::triangles::GLTriangles;
use crate::video::VideoSystem;

use self::frame::Frame;

/// The state every draw onto a canvas is rendered with.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct RenderState {
    /// Applied to every vertex position, the last row is always `[0, 0, 1]`.
    pub transform: Matrix3<f32>,
    /// Multiplied with every output color.
    pub color_mask: Color,
    pub compose: ComposeMethod,
    /// Whether pictures are sampled with linear filtering.
    pub smooth: bool,
}

impl Default for RenderState {
    fn default() -> Self {
        RenderState {
            transform: Matrix3::identity(),
            color_mask: Color::white(),
            compose: ComposeMethod::Over,
            smooth: false,
        }
    }
}

struct CanvasState {
    render: RenderState,
    matrix: Affine,
}

/// An off-screen rectangular target and picture at the same time.
///
/// Supports every triangle capability, and `PictureColor`.
pub struct Canvas {
    video: VideoSystem,
    frame: Frame,
    shader: Shader,
    state: RwLock<CanvasState>,
    sprite: RwLock<Sprite>,
}

impl Canvas {
    /// Creates a fully transparent canvas covering `bounds`.
    pub fn new(video: &VideoSystem, bounds: Rect) -> Result<Self> {
        let frame = Frame::new(video, bounds)?;
        let shader = Shader::new(video, FRAGMENT_SHADER)?;

        debug!("Created canvas {:?}..{:?}.", bounds.min, bounds.max);

        Ok(Canvas {
            video: video.clone(),
            sprite: RwLock::new(Sprite::new(frame.bounds())),
            frame,
            shader,
            state: RwLock::new(CanvasState {
                render: RenderState::default(),
                matrix: Affine::IDENTITY,
            }),
        })
    }

    #[inline]
    pub fn video(&self) -> &VideoSystem {
        &self.video
    }

    /// Sets a user uniform of the canvas program. Values named like the
    /// uniforms the canvas computes itself are stored, but overridden in
    /// every draw.
    pub fn set_uniform<T>(&self, name: &str, value: T)
    where
        T: Into<UniformVariable>,
    {
        self.shader.set_uniform(name, value);
    }

    /// Sets a user uniform from a flat list of floats, whose length picks the
    /// uniform type.
    pub fn set_uniform_slice(&self, name: &str, value: &[f32]) -> Result<()> {
        let value = UniformVariable::try_from(value)?;
        self.shader.set_uniform(name, value);
        Ok(())
    }

    pub fn uniform(&self, name: &str) -> Option<UniformVariable> {
        self.shader.uniform(name)
    }

    /// Replaces the fragment stage of the canvas program, blocking until the
    /// new program is linked. On failure the old program stays in use.
    pub fn set_fragment_shader(&self, fs: &str) -> Result<()> {
        self.shader.set_fragment_shader(fs)
    }

    #[inline]
    pub fn shader(&self) -> &Shader {
        &self.shader
    }

    /// Creates triangles that draw onto this canvas. GPU triangles are
    /// shared, any other triangles are copied into a new GPU mesh.
    ///
    /// # Panics
    ///
    /// Panics if `t` has no positions.
    pub fn make_triangles(&self, t: &dyn Triangles) -> CanvasTriangles<'_> {
        let triangles = match t.gl_triangles() {
            Some(gt) => gt.clone(),
            None => GLTriangles::new(&self.video, t),
        };

        CanvasTriangles::new(triangles, self)
    }

    /// Creates a picture that draws onto this canvas. Pictures which already
    /// live in a texture share it, any other pictures are uploaded.
    pub fn make_picture(&self, p: &dyn Picture) -> Result<CanvasPicture<'_>> {
        let picture = GLPicture::from_picture(&self.video, p)?;
        Ok(CanvasPicture::new(picture, self))
    }

    /// Sets the matrix every vertex position is projected by.
    pub fn set_matrix(&self, matrix: Affine) {
        let mut state = self.state.write().unwrap();
        state.matrix = matrix;
        state.render.transform = matrix.to_matrix3();
    }

    #[inline]
    pub fn matrix(&self) -> Affine {
        self.state.read().unwrap().matrix
    }

    /// Sets the color every drawn color is multiplied by. `None` is opaque
    /// white, which has no effect.
    pub fn set_color_mask(&self, mask: Option<Color>) {
        self.state.write().unwrap().render.color_mask = mask.unwrap_or_else(Color::white);
    }

    #[inline]
    pub fn color_mask(&self) -> Color {
        self.state.read().unwrap().render.color_mask
    }

    /// Sets the Porter-Duff operator of the following draws.
    pub fn set_compose_method(&self, compose: ComposeMethod) {
        self.state.write().unwrap().render.compose = compose;
    }

    #[inline]
    pub fn compose_method(&self) -> ComposeMethod {
        self.state.read().unwrap().render.compose
    }

    /// Sets whether stretched pictures are drawn smooth or pixely.
    pub fn set_smooth(&self, smooth: bool) {
        self.state.write().unwrap().render.smooth = smooth;
    }

    #[inline]
    pub fn smooth(&self) -> bool {
        self.state.read().unwrap().render.smooth
    }

    /// Returns a copy of the current render state.
    #[inline]
    pub fn render_state(&self) -> RenderState {
        self.state.read().unwrap().render
    }

    /// Resizes the canvas. Content inside both the old and the new bounds is
    /// preserved.
    pub fn set_bounds(&self, bounds: Rect) -> Result<()> {
        self.frame.set_bounds(bounds)?;
        self.sprite.write().unwrap().set_frame(self.frame.bounds());
        Ok(())
    }

    #[inline]
    pub fn bounds(&self) -> Rect {
        self.frame.bounds()
    }

    /// Fills the whole canvas with `color` multiplied by the color mask.
    pub fn clear(&self, color: Color) {
        let color = color * self.color_mask();
        self.frame.dirty();

        let frame = self.frame.frame_object();
        let vp = self.viewport();
        self.video
            .executor()
            .call_non_blocking(Box::new(move |visitor| {
                report("clear", clear_frame(visitor, &frame, vp, color));
            }));
    }

    /// Returns the color of the pixel over `at`, transparent outside the
    /// bounds.
    #[inline]
    pub fn color_at(&self, at: Vector2<f32>) -> Color {
        self.frame.color_at(at)
    }

    /// Replaces the content of the canvas with premultiplied RGBA pixels, row
    /// by row from the bottom. Blocks until uploaded.
    ///
    /// # Panics
    ///
    /// Panics if the length is not `4 * width * height`.
    pub fn set_pixels(&self, pixels: &[u8]) -> Result<()> {
        let (texture, area) = self.frame.texture_area();
        let len = 4 * area.len();
        assert!(
            pixels.len() == len,
            "Canvas::set_pixels: incorrect length of pixel data ({} != {}).",
            pixels.len(),
            len
        );

        if area.is_empty() {
            return Ok(());
        }

        self.frame.dirty();
        texture.set_pixels(area, pixels.to_vec())
    }

    /// Returns the premultiplied RGBA pixels of the canvas, row by row from
    /// the bottom. Blocks until all the draws submitted before are done.
    pub fn pixels(&self) -> Result<Vec<u8>> {
        let (texture, area) = self.frame.texture_area();
        if area.is_empty() {
            return Ok(Vec::new());
        }

        texture.pixels(area)
    }

    /// Returns the texture the canvas renders into. It is replaced whenever
    /// the bounds change.
    #[inline]
    pub fn texture(&self) -> Texture {
        self.frame.texture()
    }

    #[inline]
    pub fn frame_handle(&self) -> FrameHandle {
        self.frame.frame_handle()
    }

    /// Draws the whole canvas onto `target`, transformed by `matrix`.
    pub fn draw(&self, target: &dyn Target, matrix: Affine) -> Result<()> {
        self.draw_color_mask(target, matrix, None)
    }

    /// Draws the whole canvas onto `target`, transformed by `matrix` and
    /// multiplied by `mask`. `None` is opaque white.
    pub fn draw_color_mask(
        &self,
        target: &dyn Target,
        matrix: Affine,
        mask: Option<Color>,
    ) -> Result<()> {
        let sprite = *self.sprite.read().unwrap();
        sprite.draw_color_mask(self, target, matrix, mask)
    }

    fn viewport(&self) -> PixelRect {
        self.texture().params().area()
    }
}

fn clear_frame(
    visitor: &mut dyn Visitor,
    frame: &FrameObject,
    vp: PixelRect,
    color: Color,
) -> crate::errors::Result<()> {
    visitor.set_viewport(vp)?;
    visitor.bind_frame(Some(frame.handle()))?;
    visitor.clear(color)?;
    visitor.bind_frame(None)
}

impl Target for Canvas {
    fn make_triangles<'a>(&'a self, t: &dyn Triangles) -> Box<dyn TargetTriangles + 'a> {
        Box::new(Canvas::make_triangles(self, t))
    }

    fn make_picture<'a>(&'a self, p: &dyn Picture) -> Result<Box<dyn TargetPicture + 'a>> {
        Ok(Box::new(Canvas::make_picture(self, p)?))
    }
}

impl Picture for Canvas {
    #[inline]
    fn bounds(&self) -> Rect {
        self.frame.bounds()
    }

    fn as_color(&self) -> Option<&dyn PictureColor> {
        Some(self)
    }

    fn gl_picture(&self) -> Option<GLPicture> {
        Some(GLPicture::new(self.texture(), self.bounds()))
    }
}

impl PictureColor for Canvas {
    #[inline]
    fn color_at(&self, at: Vector2<f32>) -> Color {
        self.frame.color_at(at)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::video::settings::VideoParams;

    fn canvas(w: f32, h: f32) -> Canvas {
        let (video, _) = VideoSystem::immediate(VideoParams::default());
        Canvas::new(&video, Rect::new(0.0, 0.0, w, h)).unwrap()
    }

    #[test]
    fn defaults() {
        let c = canvas(4.0, 4.0);
        assert_eq!(c.render_state(), RenderState::default());
        assert_eq!(c.matrix(), Affine::IDENTITY);
        assert_eq!(c.pixels().unwrap(), vec![0; 64]);
        assert_eq!(c.color_at(Vector2::new(1.5, 1.5)), Color::transparent());
    }

    #[test]
    fn matrix() {
        let c = canvas(4.0, 4.0);
        let m = Affine([1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        c.set_matrix(m);
        assert_eq!(c.matrix(), m);
        assert_eq!(c.render_state().transform, m.to_matrix3());
    }

    #[test]
    fn clear_uses_mask() {
        let c = canvas(2.0, 2.0);
        c.set_color_mask(Some(Color::new(0.0, 1.0, 0.0, 1.0)));
        c.clear(Color::rgb(1.0, 1.0, 0.0));
        assert_eq!(c.color_at(Vector2::new(0.5, 0.5)), Color::green());
        assert_eq!(c.color_at(Vector2::new(2.5, 0.5)), Color::transparent());
    }

    #[test]
    fn uniform_shapes() {
        let c = canvas(2.0, 2.0);
        c.set_uniform_slice("uTime", &[1.0]).unwrap();
        assert_eq!(c.uniform("uTime"), Some(UniformVariable::F32(1.0)));
        assert!(c.set_uniform_slice("uBad", &[1.0; 5]).is_err());
        assert_eq!(c.uniform("uBad"), None);
    }
}
