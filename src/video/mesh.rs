use std::sync::Arc;

use super::executor::report;
use super::VideoSystem;

impl_handle!(MeshHandle);

/// The vertex layout shared by every canvas program: position, color,
/// texture coordinates in picture space and texture intensity.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct MeshVertex {
    pub position: [f32; 2],
    pub color: [f32; 4],
    pub texcoord: [f32; 2],
    pub intensity: f32,
}

impl Default for MeshVertex {
    fn default() -> Self {
        MeshVertex {
            position: [0.0, 0.0],
            color: [1.0, 1.0, 1.0, 1.0],
            texcoord: [0.0, 0.0],
            intensity: 0.0,
        }
    }
}

impl MeshVertex {
    /// (name, components, offset in floats) of each attribute.
    pub const ATTRIBUTES: [(&'static str, u32, usize); 4] = [
        ("aPosition", 2, 0),
        ("aColor", 4, 2),
        ("aTexCoords", 2, 6),
        ("aIntensity", 1, 8),
    ];

    pub const STRIDE: usize = 9 * 4;
}

struct MeshObject {
    handle: MeshHandle,
    video: VideoSystem,
}

impl Drop for MeshObject {
    fn drop(&mut self) {
        self.video.delete_mesh(self.handle);
    }
}

/// A GPU vertex buffer of triangles. Clones share the same GPU object.
#[derive(Clone)]
pub struct Mesh {
    object: Arc<MeshObject>,
}

impl Mesh {
    /// Creates a mesh without waiting for the upload.
    pub fn new(video: &VideoSystem, vertices: Vec<MeshVertex>) -> Self {
        let handle = video.create_mesh_handle();
        video.executor().call_non_blocking(Box::new(move |visitor| {
            report("create mesh", visitor.create_mesh(handle, &vertices));
        }));

        Mesh {
            object: Arc::new(MeshObject {
                handle,
                video: video.clone(),
            }),
        }
    }

    #[inline]
    pub fn handle(&self) -> MeshHandle {
        self.object.handle
    }

    #[inline]
    pub fn video(&self) -> &VideoSystem {
        &self.object.video
    }

    /// Replaces all the vertices without waiting for the upload.
    pub fn update(&self, vertices: Vec<MeshVertex>) {
        let handle = self.handle();
        self.object
            .video
            .executor()
            .call_non_blocking(Box::new(move |visitor| {
                report("update mesh", visitor.update_mesh(handle, &vertices));
            }));
    }
}
