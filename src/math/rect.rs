//! Axis-aligned rectangles.

use serde::{Deserialize, Serialize};

use cgmath::Vector2;

/// A two-dimensional axis-aligned rectangle in world units. `min` is always
/// the corner nearest to (-inf, -inf).
#[derive(Debug, Serialize, Deserialize, Copy, Clone, PartialEq)]
pub struct Rect {
    pub min: Vector2<f32>,
    pub max: Vector2<f32>,
}

impl Default for Rect {
    fn default() -> Self {
        Rect {
            min: Vector2::new(0.0, 0.0),
            max: Vector2::new(0.0, 0.0),
        }
    }
}

/// An integer rectangle in pixel units, `(x, y)` is the bottom-left corner.
#[derive(Debug, Default, Serialize, Deserialize, Copy, Clone, PartialEq, Eq, Hash)]
pub struct PixelRect {
    pub x: i32,
    pub y: i32,
    pub w: i32,
    pub h: i32,
}

impl Rect {
    /// Constructs a new rectangle from two opposite corners, in any order.
    #[inline]
    pub fn new(x0: f32, y0: f32, x1: f32, y1: f32) -> Self {
        Rect {
            min: Vector2::new(x0.min(x1), y0.min(y1)),
            max: Vector2::new(x0.max(x1), y0.max(y1)),
        }
    }

    #[inline]
    pub fn from_points(p0: Vector2<f32>, p1: Vector2<f32>) -> Self {
        Rect::new(p0.x, p0.y, p1.x, p1.y)
    }

    /// Returns the width of this rectangle.
    #[inline]
    pub fn w(&self) -> f32 {
        self.max.x - self.min.x
    }

    /// Returns the height of this rectangle.
    #[inline]
    pub fn h(&self) -> f32 {
        self.max.y - self.min.y
    }

    #[inline]
    pub fn size(&self) -> Vector2<f32> {
        self.max - self.min
    }

    #[inline]
    pub fn center(&self) -> Vector2<f32> {
        (self.min + self.max) * 0.5
    }

    #[inline]
    pub fn area(&self) -> f32 {
        self.w() * self.h()
    }

    /// Returns the four corners in counter-clockwise order, starting at `min`.
    #[inline]
    pub fn corners(&self) -> [Vector2<f32>; 4] {
        [
            self.min,
            Vector2::new(self.max.x, self.min.y),
            self.max,
            Vector2::new(self.min.x, self.max.y),
        ]
    }

    /// Checks if a point is inside this rectangle. The minimum edges are
    /// inclusive while the maximum edges are exclusive.
    #[inline]
    pub fn contains(&self, p: Vector2<f32>) -> bool {
        self.min.x <= p.x && p.x < self.max.x && self.min.y <= p.y && p.y < self.max.y
    }

    /// Returns the overlapping part of two rectangles, or a zero rectangle if
    /// they do not overlap.
    pub fn intersect(&self, rhs: &Rect) -> Rect {
        let min = Vector2::new(self.min.x.max(rhs.min.x), self.min.y.max(rhs.min.y));
        let max = Vector2::new(self.max.x.min(rhs.max.x), self.max.y.min(rhs.max.y));

        if min.x >= max.x || min.y >= max.y {
            Rect::default()
        } else {
            Rect { min, max }
        }
    }

    /// Returns a copy of this rectangle translated by `delta`.
    #[inline]
    pub fn moved(&self, delta: Vector2<f32>) -> Rect {
        Rect {
            min: self.min + delta,
            max: self.max + delta,
        }
    }

    /// Returns the smallest integer pixel rectangle that covers this one.
    pub fn int_bounds(&self) -> PixelRect {
        let x0 = self.min.x.floor() as i32;
        let y0 = self.min.y.floor() as i32;
        let x1 = self.max.x.ceil() as i32;
        let y1 = self.max.y.ceil() as i32;

        PixelRect {
            x: x0,
            y: y0,
            w: x1 - x0,
            h: y1 - y0,
        }
    }
}

impl PixelRect {
    #[inline]
    pub fn new(x: i32, y: i32, w: i32, h: i32) -> Self {
        PixelRect { x, y, w, h }
    }

    /// Returns the number of pixels covered, treating negative sizes as empty.
    #[inline]
    pub fn len(&self) -> usize {
        (self.w.max(0) as usize) * (self.h.max(0) as usize)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns `(x, y, w, h)` as floats, the layout of bounds uniforms.
    #[inline]
    pub fn to_vec4(&self) -> cgmath::Vector4<f32> {
        cgmath::Vector4::new(self.x as f32, self.y as f32, self.w as f32, self.h as f32)
    }
}
