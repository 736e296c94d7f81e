use crate::math::prelude::{Color, Rect, Vector2};
use crate::video::triangles::GLTriangles;

/// A batch of triangles, three consecutive vertices per triangle.
///
/// What a vertex carries depends on the capabilities a batch exposes through
/// `as_position`, `as_color` and `as_picture`.
pub trait Triangles {
    /// Returns the number of vertices.
    fn len(&self) -> usize;

    #[inline]
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Resizes the batch, new vertices take default values.
    fn set_len(&mut self, len: usize);

    /// Copies the vertices in `[i, j)`.
    fn slice(&self, i: usize, j: usize) -> TrianglesData;

    /// Copies the properties `t` provides into this batch. Both must have the
    /// same length.
    fn update(&mut self, t: &dyn Triangles);

    fn as_position(&self) -> Option<&dyn TrianglesPosition> {
        None
    }

    fn as_color(&self) -> Option<&dyn TrianglesColor> {
        None
    }

    fn as_picture(&self) -> Option<&dyn TrianglesPicture> {
        None
    }

    /// Returns the GPU resident form of this batch, if it is one.
    fn gl_triangles(&self) -> Option<&GLTriangles> {
        None
    }
}

pub trait TrianglesPosition {
    fn position(&self, i: usize) -> Vector2<f32>;
}

pub trait TrianglesColor {
    /// Returns the premultiplied color of a vertex.
    fn color(&self, i: usize) -> Color;
}

pub trait TrianglesPicture {
    /// Returns the picture space texture coordinates of a vertex, and how
    /// much of the texture shows through, from 0 to 1.
    fn picture(&self, i: usize) -> (Vector2<f32>, f32);
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Vertex {
    pub position: Vector2<f32>,
    pub color: Color,
    pub picture: Vector2<f32>,
    pub intensity: f32,
}

impl Default for Vertex {
    fn default() -> Self {
        Vertex {
            position: Vector2::new(0.0, 0.0),
            color: Color::white(),
            picture: Vector2::new(0.0, 0.0),
            intensity: 0.0,
        }
    }
}

impl Vertex {
    #[inline]
    pub fn new(position: Vector2<f32>, color: Color) -> Self {
        Vertex {
            position,
            color,
            ..Default::default()
        }
    }
}

/// Triangles held in CPU memory, with every capability.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrianglesData(pub Vec<Vertex>);

impl TrianglesData {
    /// Creates `len` default vertices.
    pub fn new(len: usize) -> Self {
        TrianglesData(vec![Vertex::default(); len])
    }

    /// Creates two triangles covering `rect` with a solid color.
    pub fn from_rect(rect: Rect, color: Color) -> Self {
        let [p0, p1, p2, p3] = rect.corners();
        TrianglesData(
            [p0, p1, p2, p0, p2, p3]
                .iter()
                .map(|&p| Vertex::new(p, color))
                .collect(),
        )
    }

    #[inline]
    pub fn vertices(&self) -> &[Vertex] {
        &self.0
    }

    /// Copies every vertex out of any batch, filling absent properties with
    /// defaults.
    pub fn from_triangles(t: &dyn Triangles) -> Self {
        let mut data = TrianglesData::new(t.len());
        data.update(t);
        data
    }
}

impl Triangles for TrianglesData {
    #[inline]
    fn len(&self) -> usize {
        self.0.len()
    }

    fn set_len(&mut self, len: usize) {
        self.0.resize(len, Vertex::default());
    }

    fn slice(&self, i: usize, j: usize) -> TrianglesData {
        TrianglesData(self.0[i..j].to_vec())
    }

    fn update(&mut self, t: &dyn Triangles) {
        assert!(
            t.len() == self.len(),
            "TrianglesData::update: length mismatch ({} != {}).",
            t.len(),
            self.len()
        );

        if let Some(t) = t.as_position() {
            for (i, v) in self.0.iter_mut().enumerate() {
                v.position = t.position(i);
            }
        }

        if let Some(t) = t.as_color() {
            for (i, v) in self.0.iter_mut().enumerate() {
                v.color = t.color(i);
            }
        }

        if let Some(t) = t.as_picture() {
            for (i, v) in self.0.iter_mut().enumerate() {
                let (picture, intensity) = t.picture(i);
                v.picture = picture;
                v.intensity = intensity;
            }
        }
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
}

impl TrianglesPosition for TrianglesData {
    #[inline]
    fn position(&self, i: usize) -> Vector2<f32> {
        self.0[i].position
    }
}

impl TrianglesColor for TrianglesData {
    #[inline]
    fn color(&self, i: usize) -> Color {
        self.0[i].color
    }
}

impl TrianglesPicture for TrianglesData {
    #[inline]
    fn picture(&self, i: usize) -> (Vector2<f32>, f32) {
        (self.0[i].picture, self.0[i].intensity)
    }
}
