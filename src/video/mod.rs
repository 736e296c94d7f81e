//! The video system owns the GPU execution context and the handle pools of
//! every GPU resource.
//!
//! All graphics calls are submitted through an `Executor`. `VideoSystem::new`
//! spawns a dedicated `GpuThread` running the visitor returned by the given
//! factory, e.g. a `GLVisitor` created after making a context current:
//!
//! ```rust,ignore
//! let video = VideoSystem::new(VideoParams::default(), move || {
//!     unsafe { context.make_current()? };
//!     let visitor = unsafe { GLVisitor::new(|s| context.get_proc_address(s) as *const _)? };
//!     Ok(Box::new(visitor) as Box<dyn Visitor>)
//! })?;
//! ```
//!
//! `VideoSystem::headless` runs the software rasterizer on a GPU thread, and
//! `VideoSystem::immediate` runs it synchronously on the calling thread.

pub mod backends;
pub mod blend;
pub mod errors;
pub mod executor;
pub mod mesh;
pub mod picture;
pub mod settings;
pub mod shader;
pub mod texture;
pub mod triangles;

pub mod prelude {
    pub use super::backends::gl::GLVisitor;
    pub use super::backends::software::SoftwareVisitor;
    pub use super::backends::Visitor;
    pub use super::blend::{blend_factors, BlendFactor, BlendValue, ComposeMethod};
    pub use super::executor::{Executor, GpuThread, Immediate, Submission};
    pub use super::mesh::{Mesh, MeshHandle, MeshVertex};
    pub use super::picture::GLPicture;
    pub use super::settings::VideoParams;
    pub use super::shader::{Shader, ShaderHandle, UniformDefaults, UniformVariable};
    pub use super::texture::{FrameHandle, Texture, TextureHandle, TextureParams};
    pub use super::triangles::GLTriangles;
    pub use super::VideoSystem;
}

use std::sync::{Arc, Mutex};

use crate::utils::handle::HandleLike;
use crate::utils::handle_pool::HandlePool;

use self::backends::software::SoftwareVisitor;
use self::backends::Visitor;
use self::errors::*;
use self::executor::{report, Executor, GpuThread, Immediate};
use self::mesh::MeshHandle;
use self::settings::VideoParams;
use self::shader::ShaderHandle;
use self::texture::{FrameHandle, TextureHandle};

type Pool<H> = Arc<Mutex<HandlePool<H>>>;

struct VideoState {
    params: VideoParams,
    executor: Arc<dyn Executor>,
    textures: Pool<TextureHandle>,
    frames: Pool<FrameHandle>,
    shaders: Pool<ShaderHandle>,
    meshes: Pool<MeshHandle>,
}

/// Cheap to clone, every clone refers to the same GPU context.
#[derive(Clone)]
pub struct VideoSystem {
    state: Arc<VideoState>,
}

impl VideoSystem {
    /// Spawns a GPU thread and creates the backend visitor on it with
    /// `factory`.
    pub fn new<F>(params: VideoParams, factory: F) -> Result<Self>
    where
        F: FnOnce() -> crate::errors::Result<Box<dyn Visitor>> + Send + 'static,
    {
        let executor = GpuThread::spawn(&params.thread_name, factory)?;
        Ok(VideoSystem::with_executor(params, Arc::new(executor)))
    }

    /// Spawns a GPU thread running the software rasterizer.
    pub fn headless(params: VideoParams) -> Result<Self> {
        let warn = params.warn_custom_shaders;
        VideoSystem::new(params, move || {
            Ok(Box::new(SoftwareVisitor::new(warn)) as Box<dyn Visitor>)
        })
    }

    /// Runs the software rasterizer synchronously on the submitting thread.
    pub fn immediate(params: VideoParams) -> (Self, Arc<Immediate>) {
        let visitor = SoftwareVisitor::new(params.warn_custom_shaders);
        let executor = Arc::new(Immediate::new(Box::new(visitor)));
        (VideoSystem::with_executor(params, executor.clone()), executor)
    }

    /// Creates a video system on top of an existing executor.
    pub fn with_executor(params: VideoParams, executor: Arc<dyn Executor>) -> Self {
        let state = VideoState {
            params,
            executor,
            textures: Arc::new(Mutex::new(HandlePool::new())),
            frames: Arc::new(Mutex::new(HandlePool::new())),
            shaders: Arc::new(Mutex::new(HandlePool::new())),
            meshes: Arc::new(Mutex::new(HandlePool::new())),
        };

        VideoSystem {
            state: Arc::new(state),
        }
    }

    #[inline]
    pub fn params(&self) -> &VideoParams {
        &self.state.params
    }

    #[inline]
    pub fn executor(&self) -> &Arc<dyn Executor> {
        &self.state.executor
    }

    /// Returns true if both refer to the same GPU context.
    #[inline]
    pub fn same(&self, rhs: &VideoSystem) -> bool {
        Arc::ptr_eq(&self.state, &rhs.state)
    }

    /// Returns the number of alive textures.
    pub fn textures_len(&self) -> usize {
        self.state.textures.lock().unwrap().len()
    }

    pub fn meshes_len(&self) -> usize {
        self.state.meshes.lock().unwrap().len()
    }
}

impl VideoSystem {
    pub(crate) fn create_texture_handle(&self) -> TextureHandle {
        self.state.textures.lock().unwrap().create()
    }

    pub(crate) fn create_frame_handle(&self) -> FrameHandle {
        self.state.frames.lock().unwrap().create()
    }

    pub(crate) fn create_shader_handle(&self) -> ShaderHandle {
        self.state.shaders.lock().unwrap().create()
    }

    pub(crate) fn create_mesh_handle(&self) -> MeshHandle {
        self.state.meshes.lock().unwrap().create()
    }

    pub(crate) fn free_texture_handle(&self, handle: TextureHandle) {
        self.state.textures.lock().unwrap().free(handle);
    }

    pub(crate) fn free_frame_handle(&self, handle: FrameHandle) {
        self.state.frames.lock().unwrap().free(handle);
    }

    pub(crate) fn free_shader_handle(&self, handle: ShaderHandle) {
        self.state.shaders.lock().unwrap().free(handle);
    }

    pub(crate) fn delete_texture(&self, handle: TextureHandle) {
        let pool = self.state.textures.clone();
        self.delete(handle, pool, "delete texture", |v, h| v.delete_texture(h));
    }

    pub(crate) fn delete_frame(&self, handle: FrameHandle) {
        let pool = self.state.frames.clone();
        self.delete(handle, pool, "delete frame", |v, h| v.delete_frame(h));
    }

    pub(crate) fn delete_shader(&self, handle: ShaderHandle) {
        let pool = self.state.shaders.clone();
        self.delete(handle, pool, "delete shader", |v, h| v.delete_shader(h));
    }

    pub(crate) fn delete_mesh(&self, handle: MeshHandle) {
        let pool = self.state.meshes.clone();
        self.delete(handle, pool, "delete mesh", |v, h| v.delete_mesh(h));
    }

    /// Deletes the GPU object without blocking, and recycles the handle once
    /// the backend has let go of it.
    fn delete<H, F>(&self, handle: H, pool: Pool<H>, what: &'static str, func: F)
    where
        H: HandleLike + 'static,
        F: FnOnce(&mut dyn Visitor, H) -> crate::errors::Result<()> + Send + 'static,
    {
        self.state.executor.call_non_blocking(Box::new(move |visitor| {
            report(what, func(visitor, handle));
            pool.lock().unwrap().free(handle);
        }));
    }
}
