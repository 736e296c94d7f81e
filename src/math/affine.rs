//! 2D affine transforms.

use serde::{Deserialize, Serialize};

use cgmath::{Matrix3, Vector2};

/// A 2D affine transform stored as six floats `[a, b, c, d, e, f]`, which
/// maps a point `(x, y)` to `(a*x + c*y + e, b*x + d*y + f)`.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct Affine(pub [f32; 6]);

impl Default for Affine {
    fn default() -> Self {
        Affine::IDENTITY
    }
}

impl Affine {
    pub const IDENTITY: Affine = Affine([1.0, 0.0, 0.0, 1.0, 0.0, 0.0]);

    /// Moves everything by `delta`.
    pub fn moved(&self, delta: Vector2<f32>) -> Affine {
        let mut m = self.0;
        m[4] += delta.x;
        m[5] += delta.y;
        Affine(m)
    }

    /// Scales everything around `around` by `scale` per axis.
    pub fn scaled_xy(&self, around: Vector2<f32>, scale: Vector2<f32>) -> Affine {
        let mut m = self.moved(-around).0;
        m[0] *= scale.x;
        m[2] *= scale.x;
        m[4] *= scale.x;
        m[1] *= scale.y;
        m[3] *= scale.y;
        m[5] *= scale.y;
        Affine(m).moved(around)
    }

    #[inline]
    pub fn scaled(&self, around: Vector2<f32>, scale: f32) -> Affine {
        self.scaled_xy(around, Vector2::new(scale, scale))
    }

    /// Rotates everything around `around` by `angle` radians.
    pub fn rotated(&self, around: Vector2<f32>, angle: f32) -> Affine {
        let (sin, cos) = angle.sin_cos();
        self.moved(-around)
            .chained(&Affine([cos, sin, -sin, cos, 0.0, 0.0]))
            .moved(around)
    }

    /// Applies `self` first and then `next`.
    pub fn chained(&self, next: &Affine) -> Affine {
        let m = &self.0;
        let n = &next.0;
        Affine([
            n[0] * m[0] + n[2] * m[1],
            n[1] * m[0] + n[3] * m[1],
            n[0] * m[2] + n[2] * m[3],
            n[1] * m[2] + n[3] * m[3],
            n[0] * m[4] + n[2] * m[5] + n[4],
            n[1] * m[4] + n[3] * m[5] + n[5],
        ])
    }

    /// Applies the transform to a point.
    #[inline]
    pub fn project(&self, p: Vector2<f32>) -> Vector2<f32> {
        let m = &self.0;
        Vector2::new(m[0] * p.x + m[2] * p.y + m[4], m[1] * p.x + m[3] * p.y + m[5])
    }

    /// Applies the inverse transform to a point.
    pub fn unproject(&self, p: Vector2<f32>) -> Vector2<f32> {
        let m = &self.0;
        let det = m[0] * m[3] - m[2] * m[1];
        Vector2::new(
            (m[3] * (p.x - m[4]) - m[2] * (p.y - m[5])) / det,
            (-m[1] * (p.x - m[4]) + m[0] * (p.y - m[5])) / det,
        )
    }

    /// Expands into a 3x3 matrix whose last row is always `[0, 0, 1]`.
    ///
    /// `cgmath` matrices are column-major, so the six components land at
    /// `a -> (0, 0)`, `b -> (1, 0)`, `c -> (0, 1)`, `d -> (1, 1)`,
    /// `e -> (0, 2)` and `f -> (1, 2)` in (row, column) terms.
    #[inline]
    pub fn to_matrix3(&self) -> Matrix3<f32> {
        let [a, b, c, d, e, f] = self.0;
        Matrix3::new(a, b, 0.0, c, d, 0.0, e, f, 1.0)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use cgmath::{Matrix, Vector3};

    fn approx(a: Vector2<f32>, b: Vector2<f32>) -> bool {
        (a.x - b.x).abs() < 1e-4 && (a.y - b.y).abs() < 1e-4
    }

    #[test]
    fn layout() {
        let m = Affine([1.0, 2.0, 3.0, 4.0, 5.0, 6.0]).to_matrix3();
        assert_eq!(m.row(0), Vector3::new(1.0, 3.0, 5.0));
        assert_eq!(m.row(1), Vector3::new(2.0, 4.0, 6.0));
        assert_eq!(m.row(2), Vector3::new(0.0, 0.0, 1.0));
    }

    #[test]
    fn project() {
        let m = Affine::IDENTITY
            .scaled(Vector2::new(0.0, 0.0), 2.0)
            .moved(Vector2::new(10.0, 0.0));
        let p = m.project(Vector2::new(1.0, 1.0));
        assert!(approx(p, Vector2::new(12.0, 2.0)));
        assert!(approx(m.unproject(p), Vector2::new(1.0, 1.0)));

        let r = Affine::IDENTITY.rotated(Vector2::new(1.0, 0.0), ::std::f32::consts::PI);
        assert!(approx(r.project(Vector2::new(2.0, 0.0)), Vector2::new(0.0, 0.0)));
    }

    #[test]
    fn matrix_agrees_with_project() {
        let m = Affine([0.5, 0.25, -1.0, 2.0, 3.0, -4.0]);
        let p = Vector2::new(7.0, -3.0);
        let v = m.to_matrix3() * Vector3::new(p.x, p.y, 1.0);
        assert!(approx(Vector2::new(v.x, v.y), m.project(p)));
        assert_eq!(v.z, 1.0);
    }
}
