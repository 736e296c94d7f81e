use std::collections::HashMap;
use std::ffi::{CStr, CString};
use std::os::raw::c_void;

use gl::types::*;

use crate::errors::*;
use crate::math::prelude::{Color, PixelRect};

use super::super::super::blend::BlendFactor;
use super::super::super::mesh::{MeshHandle, MeshVertex};
use super::super::super::shader::{ShaderHandle, UniformVariable};
use super::super::super::texture::{FrameHandle, TextureHandle, TextureParams};
use super::super::utils::DataVec;
use super::super::Visitor;
use super::types;

#[derive(Debug, Clone)]
struct GLTextureData {
    id: GLuint,
    params: TextureParams,
    smooth: bool,
}

#[derive(Debug, Copy, Clone)]
struct GLFrameData {
    id: GLuint,
}

#[derive(Debug, Clone)]
struct GLShaderData {
    id: GLuint,
    uniforms: HashMap<String, GLint>,
}

impl GLShaderData {
    unsafe fn uniform_location(&mut self, name: &str) -> Result<GLint> {
        if let Some(&location) = self.uniforms.get(name) {
            return Ok(location);
        }

        let c_name = CString::new(name.as_bytes())?;
        let location = gl::GetUniformLocation(self.id, c_name.as_ptr());
        check()?;

        self.uniforms.insert(name.to_owned(), location);
        Ok(location)
    }
}

#[derive(Debug, Copy, Clone)]
struct GLMeshData {
    vao: GLuint,
    vbo: GLuint,
    len: usize,
}

struct GLMutableState {
    view: PixelRect,
    blend: Option<(BlendFactor, BlendFactor)>,
    binded_frame: Option<FrameHandle>,
    binded_shader: Option<ShaderHandle>,
    binded_texture: Option<TextureHandle>,
}

/// Executes canvas draws with OpenGL.
pub struct GLVisitor {
    state: GLMutableState,
    textures: DataVec<GLTextureData>,
    frames: DataVec<GLFrameData>,
    shaders: DataVec<GLShaderData>,
    meshes: DataVec<GLMeshData>,
}

impl GLVisitor {
    /// Loads the OpenGL functions with `loader` and resets the render state.
    ///
    /// # Safety
    ///
    /// The OpenGL context must be current on the calling thread, and stay
    /// current on the thread which uses the visitor.
    pub unsafe fn new<F>(loader: F) -> Result<Self>
    where
        F: FnMut(&'static str) -> *const c_void,
    {
        gl::load_with(loader);

        let version = gl::GetString(gl::VERSION);
        if version.is_null() {
            bail!("[GL] The OpenGL context is not current.");
        }

        info!(
            "GLVisitor with OpenGL {}.",
            CStr::from_ptr(version as *const GLchar).to_string_lossy()
        );

        let state = GLMutableState {
            view: PixelRect::default(),
            blend: None,
            binded_frame: None,
            binded_shader: None,
            binded_texture: None,
        };

        let mut visitor = GLVisitor {
            state,
            textures: DataVec::new(),
            frames: DataVec::new(),
            shaders: DataVec::new(),
            meshes: DataVec::new(),
        };

        Self::reset_render_state(&mut visitor.state)?;
        Ok(visitor)
    }
}

impl Visitor for GLVisitor {
    fn create_texture(
        &mut self,
        handle: TextureHandle,
        params: TextureParams,
        data: Option<&[u8]>,
    ) -> Result<()> {
        if let Some(v) = data {
            if v.len() != params.len() {
                bail!("Pixel data of {} has {} bytes, expected {}.", handle, v.len(), params.len());
            }
        }

        let id = unsafe {
            let mut id = 0;
            gl::GenTextures(1, &mut id);
            assert!(id != 0);

            Self::bind_texture_id(&mut self.state, None, id)?;
            Self::bind_texture_params(params.smooth)?;

            let value = match data {
                Some(v) if !v.is_empty() => v.as_ptr() as *const c_void,
                _ => ::std::ptr::null(),
            };

            gl::TexImage2D(
                gl::TEXTURE_2D,
                0,
                gl::RGBA8 as GLint,
                params.dimensions.x as GLsizei,
                params.dimensions.y as GLsizei,
                0,
                gl::RGBA,
                gl::UNSIGNED_BYTE,
                value,
            );

            // Unspecified storage is undefined in GL, canvases start transparent.
            if data.is_none() && !params.is_empty() {
                let zeros = vec![0u8; params.len()];
                gl::TexSubImage2D(
                    gl::TEXTURE_2D,
                    0,
                    0,
                    0,
                    params.dimensions.x as GLsizei,
                    params.dimensions.y as GLsizei,
                    gl::RGBA,
                    gl::UNSIGNED_BYTE,
                    zeros.as_ptr() as *const c_void,
                );
            }

            if let Err(err) = check() {
                gl::DeleteTextures(1, &id);
                return Err(err);
            }

            id
        };

        let texture = GLTextureData {
            id,
            params,
            smooth: params.smooth,
        };

        self.textures.create(handle, texture);
        self.state.binded_texture = Some(handle);
        Ok(())
    }

    fn update_texture(
        &mut self,
        handle: TextureHandle,
        area: PixelRect,
        data: &[u8],
    ) -> Result<()> {
        let texture = self
            .textures
            .get(handle)
            .cloned()
            .ok_or_else(|| format_err!("{} is invalid.", handle))?;

        if !contains(texture.params, area) || data.len() != area.len() * 4 {
            bail!("Trying to update {} out of bounds.", handle);
        }

        if area.is_empty() {
            return Ok(());
        }

        unsafe {
            Self::bind_texture_id(&mut self.state, Some(handle), texture.id)?;
            gl::TexSubImage2D(
                gl::TEXTURE_2D,
                0,
                area.x,
                area.y,
                area.w,
                area.h,
                gl::RGBA,
                gl::UNSIGNED_BYTE,
                data.as_ptr() as *const c_void,
            );

            check()
        }
    }

    fn read_texture(&mut self, handle: TextureHandle, area: PixelRect) -> Result<Vec<u8>> {
        let texture = self
            .textures
            .get(handle)
            .cloned()
            .ok_or_else(|| format_err!("{} is invalid.", handle))?;

        if !contains(texture.params, area) {
            bail!("Trying to read {} out of bounds.", handle);
        }

        let mut full = vec![0u8; texture.params.len()];
        unsafe {
            Self::bind_texture_id(&mut self.state, Some(handle), texture.id)?;
            gl::GetTexImage(
                gl::TEXTURE_2D,
                0,
                gl::RGBA,
                gl::UNSIGNED_BYTE,
                full.as_mut_ptr() as *mut c_void,
            );
            check()?;
        }

        let width = texture.params.dimensions.x as usize;
        let row = area.w as usize * 4;
        let mut bytes = Vec::with_capacity(area.len() * 4);
        for y in area.y..area.y + area.h {
            let offset = (y as usize * width + area.x as usize) * 4;
            bytes.extend_from_slice(&full[offset..offset + row]);
        }

        Ok(bytes)
    }

    fn texture_smooth(&self, handle: TextureHandle) -> Result<bool> {
        self.textures
            .get(handle)
            .map(|v| v.smooth)
            .ok_or_else(|| format_err!("{} is invalid.", handle))
    }

    fn set_texture_smooth(&mut self, handle: TextureHandle, smooth: bool) -> Result<()> {
        let id = {
            let texture = self
                .textures
                .get_mut(handle)
                .ok_or_else(|| format_err!("{} is invalid.", handle))?;

            if texture.smooth == smooth {
                return Ok(());
            }

            texture.smooth = smooth;
            texture.id
        };

        unsafe {
            Self::bind_texture_id(&mut self.state, Some(handle), id)?;
            Self::bind_texture_params(smooth)?;
            check()
        }
    }

    fn delete_texture(&mut self, handle: TextureHandle) -> Result<()> {
        let texture = self
            .textures
            .free(handle)
            .ok_or_else(|| format_err!("{} is invalid.", handle))?;

        if self.state.binded_texture == Some(handle) {
            self.state.binded_texture = None;
        }

        unsafe {
            gl::DeleteTextures(1, &texture.id);
            check()
        }
    }

    fn create_frame(&mut self, handle: FrameHandle, texture: TextureHandle) -> Result<()> {
        let tex = self
            .textures
            .get(texture)
            .cloned()
            .ok_or_else(|| format_err!("{} is invalid.", texture))?;

        unsafe {
            let mut id = 0;
            gl::GenFramebuffers(1, &mut id);
            assert!(id != 0);

            gl::BindFramebuffer(gl::FRAMEBUFFER, id);
            gl::FramebufferTexture2D(
                gl::FRAMEBUFFER,
                gl::COLOR_ATTACHMENT0,
                gl::TEXTURE_2D,
                tex.id,
                0,
            );

            let status = gl::CheckFramebufferStatus(gl::FRAMEBUFFER);
            self.restore_frame()?;

            if status != gl::FRAMEBUFFER_COMPLETE {
                gl::DeleteFramebuffers(1, &id);
                bail!("[GL] Framebuffer of {} is incomplete ({:#x}).", handle, status);
            }

            check()?;
            self.frames.create(handle, GLFrameData { id });
        }

        Ok(())
    }

    fn delete_frame(&mut self, handle: FrameHandle) -> Result<()> {
        let frame = self
            .frames
            .free(handle)
            .ok_or_else(|| format_err!("{} is invalid.", handle))?;

        unsafe {
            if self.state.binded_frame == Some(handle) {
                self.state.binded_frame = None;
                gl::BindFramebuffer(gl::FRAMEBUFFER, 0);
            }

            gl::DeleteFramebuffers(1, &frame.id);
            check()
        }
    }

    fn bind_frame(&mut self, handle: Option<FrameHandle>) -> Result<()> {
        if self.state.binded_frame == handle {
            return Ok(());
        }

        let id = match handle {
            Some(h) => {
                self.frames
                    .get(h)
                    .ok_or_else(|| format_err!("{} is invalid.", h))?
                    .id
            }
            None => 0,
        };

        unsafe {
            gl::BindFramebuffer(gl::FRAMEBUFFER, id);
            check()?;
        }

        self.state.binded_frame = handle;
        Ok(())
    }

    fn set_viewport(&mut self, vp: PixelRect) -> Result<()> {
        unsafe { Self::set_viewport(&mut self.state, vp) }
    }

    fn set_blend_func(&mut self, src: BlendFactor, dst: BlendFactor) -> Result<()> {
        unsafe { Self::set_color_blend(&mut self.state, Some((src, dst))) }
    }

    fn clear(&mut self, color: Color) -> Result<()> {
        if self.state.binded_frame.is_none() {
            bail!("No render target is bound.");
        }

        unsafe {
            gl::ClearColor(color.r, color.g, color.b, color.a);
            gl::Clear(gl::COLOR_BUFFER_BIT);
            check()
        }
    }

    fn create_shader(&mut self, handle: ShaderHandle, vs: &str, fs: &str) -> Result<()> {
        unsafe {
            let vs = Self::compile(gl::VERTEX_SHADER, vs)?;
            let fs = match Self::compile(gl::FRAGMENT_SHADER, fs) {
                Ok(fs) => fs,
                Err(err) => {
                    gl::DeleteShader(vs);
                    return Err(err);
                }
            };

            let id = Self::link(&[vs, fs]);
            gl::DeleteShader(vs);
            gl::DeleteShader(fs);

            let id = id?;
            check()?;

            let mut shader = GLShaderData {
                id,
                uniforms: HashMap::new(),
            };

            // The texture is always bound to the first unit.
            let location = shader.uniform_location("uTexture")?;
            if location != -1 {
                gl::UseProgram(id);
                gl::Uniform1i(location, 0);
                self.state.binded_shader = Some(handle);
                check()?;
            }

            self.shaders.create(handle, shader);
        }

        Ok(())
    }

    fn delete_shader(&mut self, handle: ShaderHandle) -> Result<()> {
        let shader = self
            .shaders
            .free(handle)
            .ok_or_else(|| format_err!("{} is invalid.", handle))?;

        unsafe {
            if self.state.binded_shader == Some(handle) {
                self.state.binded_shader = None;
                gl::UseProgram(0);
            }

            gl::DeleteProgram(shader.id);
            check()
        }
    }

    fn bind_shader(&mut self, handle: Option<ShaderHandle>) -> Result<()> {
        if self.state.binded_shader == handle {
            return Ok(());
        }

        let id = match handle {
            Some(h) => {
                self.shaders
                    .get(h)
                    .ok_or_else(|| format_err!("{} is invalid.", h))?
                    .id
            }
            None => 0,
        };

        unsafe {
            gl::UseProgram(id);
            check()?;
        }

        self.state.binded_shader = handle;
        Ok(())
    }

    fn set_uniform(&mut self, name: &str, variable: UniformVariable) -> Result<()> {
        let handle = self
            .state
            .binded_shader
            .ok_or_else(|| format_err!("No program is bound."))?;

        let shader = self
            .shaders
            .get_mut(handle)
            .ok_or_else(|| format_err!("{} is invalid.", handle))?;

        unsafe {
            let location = shader.uniform_location(name)?;
            if location == -1 {
                trace!("Uniform {:?} is not active in {}.", name, handle);
                return Ok(());
            }

            Self::bind_uniform_variable(location, &variable)
        }
    }

    fn create_mesh(&mut self, handle: MeshHandle, vertices: &[MeshVertex]) -> Result<()> {
        unsafe {
            let mut vao = 0;
            gl::GenVertexArrays(1, &mut vao);
            gl::BindVertexArray(vao);

            let mut vbo = 0;
            gl::GenBuffers(1, &mut vbo);
            assert!(vbo != 0);
            gl::BindBuffer(gl::ARRAY_BUFFER, vbo);
            Self::upload_vertices(vertices);

            for (location, &(_, size, offset)) in MeshVertex::ATTRIBUTES.iter().enumerate() {
                gl::EnableVertexAttribArray(location as GLuint);
                gl::VertexAttribPointer(
                    location as GLuint,
                    size as GLint,
                    gl::FLOAT,
                    gl::FALSE,
                    MeshVertex::STRIDE as GLsizei,
                    (offset * 4) as *const c_void,
                );
            }

            gl::BindVertexArray(0);
            check()?;

            let mesh = GLMeshData {
                vao,
                vbo,
                len: vertices.len(),
            };

            self.meshes.create(handle, mesh);
        }

        Ok(())
    }

    fn update_mesh(&mut self, handle: MeshHandle, vertices: &[MeshVertex]) -> Result<()> {
        let mesh = self
            .meshes
            .get_mut(handle)
            .ok_or_else(|| format_err!("{} is invalid.", handle))?;

        unsafe {
            gl::BindBuffer(gl::ARRAY_BUFFER, mesh.vbo);
            Self::upload_vertices(vertices);
            mesh.len = vertices.len();
            check()
        }
    }

    fn delete_mesh(&mut self, handle: MeshHandle) -> Result<()> {
        let mesh = self
            .meshes
            .free(handle)
            .ok_or_else(|| format_err!("{} is invalid.", handle))?;

        unsafe {
            gl::DeleteVertexArrays(1, &mesh.vao);
            gl::DeleteBuffers(1, &mesh.vbo);
            check()
        }
    }

    fn bind_texture(&mut self, handle: Option<TextureHandle>) -> Result<()> {
        let id = match handle {
            Some(h) => {
                self.textures
                    .get(h)
                    .ok_or_else(|| format_err!("{} is invalid.", h))?
                    .id
            }
            None => 0,
        };

        unsafe { Self::bind_texture_id(&mut self.state, handle, id) }
    }

    fn draw(&mut self, mesh: MeshHandle) -> Result<u32> {
        if self.state.binded_frame.is_none() {
            bail!("No render target is bound.");
        }

        if self.state.binded_shader.is_none() {
            bail!("No program is bound.");
        }

        let mesh = self
            .meshes
            .get(mesh)
            .cloned()
            .ok_or_else(|| format_err!("{} is invalid.", mesh))?;

        let len = mesh.len - mesh.len % 3;
        if len == 0 {
            return Ok(0);
        }

        unsafe {
            gl::BindVertexArray(mesh.vao);
            gl::DrawArrays(gl::TRIANGLES, 0, len as GLsizei);
            gl::BindVertexArray(0);
            check()?;
        }

        Ok((len / 3) as u32)
    }

    fn flush(&mut self) -> Result<()> {
        unsafe {
            gl::Finish();
            check()
        }
    }
}

impl GLVisitor {
    unsafe fn restore_frame(&mut self) -> Result<()> {
        let id = self
            .state
            .binded_frame
            .and_then(|h| self.frames.get(h))
            .map(|v| v.id)
            .unwrap_or(0);

        gl::BindFramebuffer(gl::FRAMEBUFFER, id);
        check()
    }

    unsafe fn bind_texture_id(
        state: &mut GLMutableState,
        handle: Option<TextureHandle>,
        id: GLuint,
    ) -> Result<()> {
        gl::ActiveTexture(gl::TEXTURE0);
        gl::BindTexture(gl::TEXTURE_2D, id);
        state.binded_texture = handle;
        check()
    }

    unsafe fn bind_texture_params(smooth: bool) -> Result<()> {
        let filter = types::texture_filter(smooth);
        gl::TexParameteri(gl::TEXTURE_2D, gl::TEXTURE_MIN_FILTER, filter);
        gl::TexParameteri(gl::TEXTURE_2D, gl::TEXTURE_MAG_FILTER, filter);
        gl::TexParameteri(gl::TEXTURE_2D, gl::TEXTURE_WRAP_S, gl::CLAMP_TO_EDGE as GLint);
        gl::TexParameteri(gl::TEXTURE_2D, gl::TEXTURE_WRAP_T, gl::CLAMP_TO_EDGE as GLint);
        check()
    }

    unsafe fn bind_uniform_variable(location: GLint, variable: &UniformVariable) -> Result<()> {
        match *variable {
            UniformVariable::I32(v) => gl::Uniform1i(location, v),
            UniformVariable::F32(v) => gl::Uniform1f(location, v),
            UniformVariable::Vector2f(v) => gl::Uniform2f(location, v[0], v[1]),
            UniformVariable::Vector3f(v) => gl::Uniform3f(location, v[0], v[1], v[2]),
            UniformVariable::Vector4f(v) => gl::Uniform4f(location, v[0], v[1], v[2], v[3]),
            UniformVariable::Matrix3f(v) => {
                gl::UniformMatrix3fv(location, 1, gl::FALSE, v[0].as_ptr())
            }
            UniformVariable::Matrix4f(v) => {
                gl::UniformMatrix4fv(location, 1, gl::FALSE, v[0].as_ptr())
            }
        }

        check()
    }

    unsafe fn upload_vertices(vertices: &[MeshVertex]) {
        let value = if vertices.is_empty() {
            ::std::ptr::null()
        } else {
            vertices.as_ptr() as *const c_void
        };

        gl::BufferData(
            gl::ARRAY_BUFFER,
            (vertices.len() * MeshVertex::STRIDE) as GLsizeiptr,
            value,
            gl::DYNAMIC_DRAW,
        );
    }
}

impl GLVisitor {
    unsafe fn reset_render_state(state: &mut GLMutableState) -> Result<()> {
        gl::Disable(gl::CULL_FACE);
        gl::Disable(gl::DEPTH_TEST);
        gl::DepthMask(gl::FALSE);
        gl::Disable(gl::SCISSOR_TEST);
        gl::ColorMask(1, 1, 1, 1);

        gl::Disable(gl::BLEND);
        state.blend = None;

        gl::PixelStorei(gl::UNPACK_ALIGNMENT, 1);
        gl::PixelStorei(gl::PACK_ALIGNMENT, 1);
        gl::BindFramebuffer(gl::FRAMEBUFFER, 0);
        state.binded_frame = None;

        check()
    }

    // Specifies how source and destination are combined.
    unsafe fn set_color_blend(
        state: &mut GLMutableState,
        blend: Option<(BlendFactor, BlendFactor)>,
    ) -> Result<()> {
        if state.blend != blend {
            if let Some((src, dst)) = blend {
                if state.blend == None {
                    gl::Enable(gl::BLEND);
                }

                gl::BlendFunc(src.into(), dst.into());
                gl::BlendEquation(gl::FUNC_ADD);
            } else if state.blend != None {
                gl::Disable(gl::BLEND);
            }

            state.blend = blend;
            check()?;
        }

        Ok(())
    }

    /// Set the viewport relative to the bottom-left corner of the target, in pixels.
    unsafe fn set_viewport(state: &mut GLMutableState, vp: PixelRect) -> Result<()> {
        if state.view != vp {
            gl::Viewport(vp.x, vp.y, vp.w, vp.h);
            state.view = vp;
            check()?;
        }

        Ok(())
    }

    unsafe fn compile(shader: GLenum, src: &str) -> Result<GLuint> {
        let shader = gl::CreateShader(shader);
        // Attempt to compile the shader
        let c_str = CString::new(src.as_bytes())?;
        gl::ShaderSource(shader, 1, &c_str.as_ptr(), ::std::ptr::null());
        gl::CompileShader(shader);

        // Get the compile status
        let mut status = GLint::from(gl::FALSE);
        gl::GetShaderiv(shader, gl::COMPILE_STATUS, &mut status);

        // Fail on error
        if status != GLint::from(gl::TRUE) {
            let log = Self::info_log(shader, gl::GetShaderiv, gl::GetShaderInfoLog);
            gl::DeleteShader(shader);
            bail!("{}", log);
        } else {
            Ok(shader)
        }
    }

    /// Links a program, with the vertex attributes at the fixed locations of
    /// `MeshVertex::ATTRIBUTES`.
    unsafe fn link(shaders: &[GLuint]) -> Result<GLuint> {
        let program = gl::CreateProgram();
        for &shader in shaders {
            gl::AttachShader(program, shader)
        }

        for (location, &(name, _, _)) in MeshVertex::ATTRIBUTES.iter().enumerate() {
            let c_name = CString::new(name.as_bytes())?;
            gl::BindAttribLocation(program, location as GLuint, c_name.as_ptr());
        }

        gl::LinkProgram(program);

        for &shader in shaders {
            gl::DetachShader(program, shader);
        }

        // Get the link status
        let mut status = GLint::from(gl::FALSE);
        gl::GetProgramiv(program, gl::LINK_STATUS, &mut status);

        // Fail on error
        if status != GLint::from(gl::TRUE) {
            let log = Self::info_log(program, gl::GetProgramiv, gl::GetProgramInfoLog);
            gl::DeleteProgram(program);
            bail!("{}", log);
        } else {
            Ok(program)
        }
    }

    unsafe fn info_log(
        id: GLuint,
        get: unsafe fn(GLuint, GLenum, *mut GLint),
        log: unsafe fn(GLuint, GLsizei, *mut GLsizei, *mut GLchar),
    ) -> String {
        let mut len = 0;
        get(id, gl::INFO_LOG_LENGTH, &mut len);
        if len <= 0 {
            return String::new();
        }

        let mut buf = vec![0u8; len as usize];
        let mut written = 0;
        log(id, len, &mut written, buf.as_mut_ptr() as *mut GLchar);
        buf.truncate(written.max(0) as usize);
        String::from_utf8_lossy(&buf).into_owned()
    }
}

fn contains(params: TextureParams, area: PixelRect) -> bool {
    area.x >= 0
        && area.y >= 0
        && area.w >= 0
        && area.h >= 0
        && (area.x + area.w) as u32 <= params.dimensions.x
        && (area.y + area.h) as u32 <= params.dimensions.y
}

unsafe fn check() -> Result<()> {
    match gl::GetError() {
        gl::NO_ERROR => Ok(()),

        gl::INVALID_ENUM => {
            bail!("[GL] An unacceptable value is specified for an enumerated argument.")
        }

        gl::INVALID_VALUE => bail!("[GL] A numeric argument is out of range."),

        gl::INVALID_OPERATION => {
            bail!("[GL] The specified operation is not allowed in the current state.")
        }

        gl::INVALID_FRAMEBUFFER_OPERATION => bail!(
            r"[GL] The command is trying to render to or read from the framebuffer while the \
            currently bound framebuffer is not framebuffer complete."
        ),

        gl::OUT_OF_MEMORY => bail!("[GL] There is not enough memory left to execute the command."),
        _ => bail!("[GL] Oops, Unknown OpenGL error."),
    }
}
