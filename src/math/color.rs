use std::ops::{Add, Mul, MulAssign};

use serde::{Deserialize, Serialize};

use cgmath::Vector4;

/// A RGBA `Color`. Each color component is a floating point value with a
/// range from 0 to 1.
///
/// Colors that flow through canvases are alpha-premultiplied, use
/// `premultiply` to convert a straight-alpha color.
#[derive(Debug, Default, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    #[inline]
    pub fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Color { r, g, b, a }
    }

    /// Creates an opaque color.
    #[inline]
    pub fn rgb(r: f32, g: f32, b: f32) -> Self {
        Color::new(r, g, b, 1.0)
    }

    /// Creates a gray color with every component set to `a`, which is white
    /// with alpha `a` in premultiplied form.
    #[inline]
    pub fn alpha(a: f32) -> Self {
        Color::new(a, a, a, a)
    }

    /// Multiplies the RGB components by alpha.
    #[inline]
    pub fn premultiply(&self) -> Self {
        Color::new(self.r * self.a, self.g * self.a, self.b * self.a, self.a)
    }

    /// Clip to [0.0, 1.0] range.
    pub fn clip(&self) -> Self {
        Color::new(
            self.r.max(0.0).min(1.0),
            self.g.max(0.0).min(1.0),
            self.b.max(0.0).min(1.0),
            self.a.max(0.0).min(1.0),
        )
    }

    /// Quantizes to 8-bit components.
    pub fn to_bytes(&self) -> [u8; 4] {
        let v = self.clip();
        [
            (v.r * 255.0).round() as u8,
            (v.g * 255.0).round() as u8,
            (v.b * 255.0).round() as u8,
            (v.a * 255.0).round() as u8,
        ]
    }

    #[inline]
    pub fn from_bytes(v: [u8; 4]) -> Self {
        Color::new(
            f32::from(v[0]) / 255.0,
            f32::from(v[1]) / 255.0,
            f32::from(v[2]) / 255.0,
            f32::from(v[3]) / 255.0,
        )
    }

    #[inline]
    pub fn rgba(&self) -> [f32; 4] {
        [self.r, self.g, self.b, self.a]
    }
}

impl Color {
    pub fn white() -> Self {
        Color::new(1.0, 1.0, 1.0, 1.0)
    }

    pub fn black() -> Self {
        Color::new(0.0, 0.0, 0.0, 1.0)
    }

    pub fn red() -> Self {
        Color::new(1.0, 0.0, 0.0, 1.0)
    }

    pub fn green() -> Self {
        Color::new(0.0, 1.0, 0.0, 1.0)
    }

    pub fn blue() -> Self {
        Color::new(0.0, 0.0, 1.0, 1.0)
    }

    pub fn transparent() -> Self {
        Color::new(0.0, 0.0, 0.0, 0.0)
    }
}

impl Mul for Color {
    type Output = Color;

    #[inline]
    fn mul(self, rhs: Color) -> Color {
        Color::new(
            self.r * rhs.r,
            self.g * rhs.g,
            self.b * rhs.b,
            self.a * rhs.a,
        )
    }
}

impl MulAssign for Color {
    #[inline]
    fn mul_assign(&mut self, rhs: Color) {
        *self = *self * rhs;
    }
}

impl Mul<f32> for Color {
    type Output = Color;

    #[inline]
    fn mul(self, rhs: f32) -> Color {
        Color::new(self.r * rhs, self.g * rhs, self.b * rhs, self.a * rhs)
    }
}

impl Add for Color {
    type Output = Color;

    #[inline]
    fn add(self, rhs: Color) -> Color {
        Color::new(
            self.r + rhs.r,
            self.g + rhs.g,
            self.b + rhs.b,
            self.a + rhs.a,
        )
    }
}

impl From<[f32; 4]> for Color {
    fn from(v: [f32; 4]) -> Self {
        Color::new(v[0], v[1], v[2], v[3])
    }
}

impl From<Color> for [f32; 4] {
    fn from(c: Color) -> Self {
        c.rgba()
    }
}

impl From<Vector4<f32>> for Color {
    fn from(v: Vector4<f32>) -> Self {
        Color::new(v.x, v.y, v.z, v.w)
    }
}

impl From<Color> for Vector4<f32> {
    fn from(c: Color) -> Self {
        Vector4::new(c.r, c.g, c.b, c.a)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn mul() {
        let c = Color::new(0.5, 1.0, 0.2, 1.0) * Color::new(0.5, 0.5, 1.0, 0.5);
        assert_eq!(c, Color::new(0.25, 0.5, 0.2, 0.5));
    }

    #[test]
    fn premultiply() {
        let c = Color::new(1.0, 0.5, 0.0, 0.5).premultiply();
        assert_eq!(c, Color::new(0.5, 0.25, 0.0, 0.5));
        assert_eq!(Color::red().premultiply(), Color::red());
    }

    #[test]
    fn bytes() {
        assert_eq!(Color::red().to_bytes(), [255, 0, 0, 255]);
        assert_eq!(Color::new(2.0, -1.0, 0.5, 1.0).to_bytes(), [255, 0, 128, 255]);
        assert_eq!(Color::from_bytes([255, 0, 0, 255]), Color::red());
    }
}
