//! The backend of canvases, which should be responsible for only one thing:
//! executing low-level graphics calls on the GPU execution context.
//!
//! Every method runs on the context owned by the executor. Handles are
//! allocated by `VideoSystem` before the corresponding `create_*` call is
//! submitted.

pub mod gl;
pub mod software;
mod utils;

use crate::errors::*;
use crate::math::prelude::{Color, PixelRect};

use super::blend::BlendFactor;
use super::mesh::{MeshHandle, MeshVertex};
use super::shader::{ShaderHandle, UniformVariable};
use super::texture::{FrameHandle, TextureHandle, TextureParams};

pub trait Visitor {
    /// Creates a RGBA8 texture, `data` holds premultiplied rows from bottom to
    /// top if present.
    fn create_texture(
        &mut self,
        handle: TextureHandle,
        params: TextureParams,
        data: Option<&[u8]>,
    ) -> Result<()>;

    /// Replaces the pixels of `area`, which must lie inside the texture.
    fn update_texture(&mut self, handle: TextureHandle, area: PixelRect, data: &[u8])
        -> Result<()>;

    /// Reads back the pixels of `area`, row by row from the bottom.
    fn read_texture(&mut self, handle: TextureHandle, area: PixelRect) -> Result<Vec<u8>>;

    fn texture_smooth(&self, handle: TextureHandle) -> Result<bool>;

    /// Switches between linear and nearest filtering.
    fn set_texture_smooth(&mut self, handle: TextureHandle, smooth: bool) -> Result<()>;

    fn delete_texture(&mut self, handle: TextureHandle) -> Result<()>;

    /// Creates a framebuffer that renders into `texture`.
    fn create_frame(&mut self, handle: FrameHandle, texture: TextureHandle) -> Result<()>;

    fn delete_frame(&mut self, handle: FrameHandle) -> Result<()>;

    /// Makes `handle` the current render target, `None` restores the default
    /// one.
    fn bind_frame(&mut self, handle: Option<FrameHandle>) -> Result<()>;

    fn set_viewport(&mut self, vp: PixelRect) -> Result<()>;

    fn set_blend_func(&mut self, src: BlendFactor, dst: BlendFactor) -> Result<()>;

    /// Clears the whole bound render target.
    fn clear(&mut self, color: Color) -> Result<()>;

    /// Compiles and links a program.
    fn create_shader(&mut self, handle: ShaderHandle, vs: &str, fs: &str) -> Result<()>;

    fn delete_shader(&mut self, handle: ShaderHandle) -> Result<()>;

    fn bind_shader(&mut self, handle: Option<ShaderHandle>) -> Result<()>;

    /// Sets a uniform of the bound program, unknown names are ignored.
    fn set_uniform(&mut self, name: &str, variable: UniformVariable) -> Result<()>;

    fn create_mesh(&mut self, handle: MeshHandle, vertices: &[MeshVertex]) -> Result<()>;

    fn update_mesh(&mut self, handle: MeshHandle, vertices: &[MeshVertex]) -> Result<()>;

    fn delete_mesh(&mut self, handle: MeshHandle) -> Result<()>;

    fn bind_texture(&mut self, handle: Option<TextureHandle>) -> Result<()>;

    /// Draws all the triangles of `mesh` with the bound program, texture and
    /// render target. Returns the number of triangles.
    fn draw(&mut self, mesh: MeshHandle) -> Result<u32>;

    /// Waits until all submitted commands have finished.
    fn flush(&mut self) -> Result<()>;
}
