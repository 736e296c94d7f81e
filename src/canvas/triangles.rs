use std::sync::Arc;

use smallvec::SmallVec;

use crate::draw::triangles::{
    Triangles, TrianglesColor, TrianglesData, TrianglesPicture, TrianglesPosition,
};
use crate::draw::TargetTriangles;
use crate::math::prelude::{PixelRect, Rect, Vector4};
use crate::video::backends::Visitor;
use crate::video::blend::blend_factors;
use crate::video::executor::report;
use crate::video::mesh::Mesh;
use crate::video::shader::{apply_uniforms, ShaderObject, UniformDefaults, UniformVariable};
use crate::video::texture::{FrameObject, Texture};
use crate::video::triangles::GLTriangles;

use super::{Canvas, RenderState};

/// Everything a deferred draw needs, captured at submission time.
pub(crate) struct DrawRequest {
    state: RenderState,
    frame: Arc<FrameObject>,
    viewport: PixelRect,
    bounds: Rect,
    program: Arc<ShaderObject>,
    uniforms: SmallVec<[(String, UniformVariable); 4]>,
    texture: Option<(Texture, Rect)>,
    mesh: Mesh,
}

impl DrawRequest {
    /// Captures the state of the canvas of `ct`, keeping every GPU object the
    /// draw needs alive until it ran.
    fn capture(ct: &CanvasTriangles, texture: Option<&Texture>, texture_bounds: Rect) -> Self {
        let canvas = ct.canvas;
        DrawRequest {
            state: canvas.render_state(),
            frame: canvas.frame.frame_object(),
            viewport: canvas.viewport(),
            bounds: canvas.bounds(),
            program: canvas.shader.program(),
            uniforms: canvas.shader.uniforms().into_iter().collect(),
            texture: texture.map(|v| (v.clone(), texture_bounds)),
            mesh: ct.triangles.mesh().clone(),
        }
    }

    fn execute(&self, visitor: &mut dyn Visitor) -> crate::errors::Result<u32> {
        let (src, dst) = blend_factors(self.state.compose);
        visitor.set_viewport(self.viewport)?;
        visitor.set_blend_func(src, dst)?;
        visitor.bind_frame(Some(self.frame.handle()))?;
        visitor.bind_shader(Some(self.program.handle()))?;

        let tex_bounds = self
            .texture
            .as_ref()
            .map(|(_, bounds)| bounds.int_bounds().to_vec4())
            .unwrap_or_else(|| Vector4::new(0.0, 0.0, 0.0, 0.0));

        let defaults = UniformDefaults {
            transform: self.state.transform,
            color_mask: self.state.color_mask.into(),
            bounds: Vector4::new(
                self.bounds.min.x,
                self.bounds.min.y,
                self.bounds.w(),
                self.bounds.h(),
            ),
            tex_bounds,
        };

        apply_uniforms(visitor, &defaults, &self.uniforms)?;

        let n = match self.texture {
            None => {
                visitor.bind_texture(None)?;
                visitor.draw(self.mesh.handle())?
            }
            Some((ref texture, _)) => {
                let handle = texture.handle();
                visitor.bind_texture(Some(handle))?;

                if visitor.texture_smooth(handle)? != self.state.smooth {
                    visitor.set_texture_smooth(handle, self.state.smooth)?;
                }

                let n = visitor.draw(self.mesh.handle())?;
                visitor.bind_texture(None)?;
                n
            }
        };

        visitor.bind_shader(None)?;
        visitor.bind_frame(None)?;
        Ok(n)
    }
}

/// Triangles that draw onto the canvas that made them.
pub struct CanvasTriangles<'a> {
    triangles: GLTriangles,
    canvas: &'a Canvas,
}

impl<'a> CanvasTriangles<'a> {
    pub(crate) fn new(triangles: GLTriangles, canvas: &'a Canvas) -> Self {
        CanvasTriangles { triangles, canvas }
    }

    #[inline]
    pub fn canvas(&self) -> &'a Canvas {
        self.canvas
    }

    #[inline]
    pub fn triangles(&self) -> &GLTriangles {
        &self.triangles
    }

    /// Draws the triangles, textured with `texture` covering `texture_bounds`
    /// if present. Returns without waiting for the GPU.
    pub fn draw_with(&self, texture: Option<&Texture>, texture_bounds: Rect) {
        let canvas = self.canvas;
        canvas.frame.dirty();

        let request = DrawRequest::capture(self, texture, texture_bounds);
        canvas
            .video
            .executor()
            .call_non_blocking(Box::new(move |visitor| {
                report("draw", request.execute(visitor));
            }));
    }
}

impl<'a> Triangles for CanvasTriangles<'a> {
    #[inline]
    fn len(&self) -> usize {
        self.triangles.len()
    }

    fn set_len(&mut self, len: usize) {
        self.triangles.set_len(len)
    }

    fn slice(&self, i: usize, j: usize) -> TrianglesData {
        self.triangles.slice(i, j)
    }

    fn update(&mut self, t: &dyn Triangles) {
        self.triangles.update(t)
    }

    fn as_position(&self) -> Option<&dyn TrianglesPosition> {
        Some(&self.triangles)
    }

    fn as_color(&self) -> Option<&dyn TrianglesColor> {
        Some(&self.triangles)
    }

    fn as_picture(&self) -> Option<&dyn TrianglesPicture> {
        Some(&self.triangles)
    }

    fn gl_triangles(&self) -> Option<&GLTriangles> {
        Some(&self.triangles)
    }
}

impl<'a> TargetTriangles for CanvasTriangles<'a> {
    fn draw(&self) {
        self.draw_with(None, Rect::default());
    }

    fn canvas_triangles(&self) -> Option<&CanvasTriangles<'_>> {
        Some(self)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::draw::triangles::TrianglesData;
    use crate::math::prelude::{Color, Vector2};
    use crate::video::settings::VideoParams;
    use crate::video::shader::FRAGMENT_SHADER;
    use crate::video::VideoSystem;

    #[test]
    fn captured_program_outlives_relink() {
        let params = VideoParams {
            warn_custom_shaders: false,
            ..VideoParams::default()
        };

        let (video, _) = VideoSystem::immediate(params);
        let canvas = Canvas::new(&video, Rect::new(0.0, 0.0, 4.0, 4.0)).unwrap();

        let tri = TrianglesData::from_rect(canvas.bounds(), Color::blue());
        let request = DrawRequest::capture(&canvas.make_triangles(&tri), None, Rect::default());

        // Relinking drops the canvas' reference to the captured program.
        let captured = request.program.handle();
        canvas.set_fragment_shader(FRAGMENT_SHADER).unwrap();
        assert_ne!(canvas.shader.handle(), captured);

        let n = video
            .executor()
            .call(move |visitor| request.execute(visitor))
            .unwrap();

        assert_eq!(n, 2);
        canvas.frame.dirty();
        assert_eq!(canvas.color_at(Vector2::new(1.5, 1.5)), Color::blue());
    }
}
