use std::sync::{Arc, RwLock};

use crate::draw::triangles::{
    Triangles, TrianglesColor, TrianglesData, TrianglesPicture, TrianglesPosition, Vertex,
};
use crate::math::prelude::{Color, Vector2};

use super::mesh::{Mesh, MeshHandle, MeshVertex};
use super::VideoSystem;

/// Triangles uploaded into a GPU mesh in the canvas vertex layout. A CPU copy
/// of the vertices is kept, so the batch can be read back and partially
/// updated. Clones share the mesh and the vertices.
#[derive(Clone)]
pub struct GLTriangles {
    mesh: Mesh,
    vertices: Arc<RwLock<Vec<MeshVertex>>>,
}

impl GLTriangles {
    /// Uploads a copy of `t`, which must provide positions. Colors default to
    /// white and texture intensities to zero when absent.
    pub fn new(video: &VideoSystem, t: &dyn Triangles) -> Self {
        assert!(
            t.as_position().is_some(),
            "GLTriangles::new: triangles without positions are not supported."
        );

        let mut vertices = vec![MeshVertex::default(); t.len()];
        GLTriangles::fill(&mut vertices, t);

        GLTriangles {
            mesh: Mesh::new(video, vertices.clone()),
            vertices: Arc::new(RwLock::new(vertices)),
        }
    }

    #[inline]
    pub fn mesh(&self) -> &Mesh {
        &self.mesh
    }

    #[inline]
    pub fn handle(&self) -> MeshHandle {
        self.mesh.handle()
    }

    /// Returns a copy of the vertices.
    pub fn vertices(&self) -> Vec<MeshVertex> {
        self.vertices.read().unwrap().clone()
    }

    fn fill(vertices: &mut [MeshVertex], t: &dyn Triangles) {
        if let Some(t) = t.as_position() {
            for (i, v) in vertices.iter_mut().enumerate() {
                let p = t.position(i);
                v.position = [p.x, p.y];
            }
        }

        if let Some(t) = t.as_color() {
            for (i, v) in vertices.iter_mut().enumerate() {
                v.color = t.color(i).rgba();
            }
        }

        if let Some(t) = t.as_picture() {
            for (i, v) in vertices.iter_mut().enumerate() {
                let (picture, intensity) = t.picture(i);
                v.texcoord = [picture.x, picture.y];
                v.intensity = intensity;
            }
        }
    }

    fn upload(&self) {
        self.mesh.update(self.vertices());
    }
}

impl Triangles for GLTriangles {
    fn len(&self) -> usize {
        self.vertices.read().unwrap().len()
    }

    fn set_len(&mut self, len: usize) {
        self.vertices
            .write()
            .unwrap()
            .resize(len, MeshVertex::default());
        self.upload();
    }

    fn slice(&self, i: usize, j: usize) -> TrianglesData {
        let vertices = self.vertices.read().unwrap();
        TrianglesData(
            vertices[i..j]
                .iter()
                .map(|v| Vertex {
                    position: v.position.into(),
                    color: v.color.into(),
                    picture: v.texcoord.into(),
                    intensity: v.intensity,
                })
                .collect(),
        )
    }

    fn update(&mut self, t: &dyn Triangles) {
        let len = self.len();
        assert!(
            t.len() == len,
            "GLTriangles::update: length mismatch ({} != {}).",
            t.len(),
            len
        );

        // `t` may share our vertices, so it is read before taking the lock.
        let mut vertices = self.vertices();
        GLTriangles::fill(&mut vertices, t);
        *self.vertices.write().unwrap() = vertices;

        self.upload();
    }

    fn as_position(&self) -> Option<&dyn TrianglesPosition> {
        Some(self)
    }

    fn as_color(&self) -> Option<&dyn TrianglesColor> {
        Some(self)
    }

    fn as_picture(&self) -> Option<&dyn TrianglesPicture> {
        Some(self)
    }

    fn gl_triangles(&self) -> Option<&GLTriangles> {
        Some(self)
    }
}

impl TrianglesPosition for GLTriangles {
    fn position(&self, i: usize) -> Vector2<f32> {
        self.vertices.read().unwrap()[i].position.into()
    }
}

impl TrianglesColor for GLTriangles {
    fn color(&self, i: usize) -> Color {
        self.vertices.read().unwrap()[i].color.into()
    }
}

impl TrianglesPicture for GLTriangles {
    fn picture(&self, i: usize) -> (Vector2<f32>, f32) {
        let v = self.vertices.read().unwrap()[i];
        (v.texcoord.into(), v.intensity)
    }
}
