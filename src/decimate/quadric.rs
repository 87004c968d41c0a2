use std::ops::{Add, AddAssign};

use glam::{DMat3, DVec3, Vec3};

/// Symmetric quadric error form `x'Ax - 2b'x + c`, accumulated from planes.
/// Stored in double precision because the sums of many planes lose accuracy
/// in `f32`.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct Quadric {
    a00: f64,
    a01: f64,
    a02: f64,
    a11: f64,
    a12: f64,
    a22: f64,
    b0: f64,
    b1: f64,
    b2: f64,
    c: f64,
}

impl Quadric {
    /// Squared distance to the plane through `pos` with unit `normal`.
    pub fn from_plane(pos: Vec3, normal: Vec3) -> Self {
        let (p, n) = (pos.as_dvec3(), normal.as_dvec3());
        let dot = p.dot(n);
        let ndv = n * dot;
        Quadric {
            a00: n.x * n.x,
            a01: n.x * n.y,
            a02: n.x * n.z,
            a11: n.y * n.y,
            a12: n.y * n.z,
            a22: n.z * n.z,
            b0: ndv.x,
            b1: ndv.y,
            b2: ndv.z,
            c: dot * dot,
        }
    }

    fn matrix(&self) -> DMat3 {
        DMat3::from_cols(
            DVec3::new(self.a00, self.a01, self.a02),
            DVec3::new(self.a01, self.a11, self.a12),
            DVec3::new(self.a02, self.a12, self.a22),
        )
    }

    fn vector(&self) -> DVec3 {
        DVec3::new(self.b0, self.b1, self.b2)
    }

    /// The point with the least error, or `None` when the planes don't pin
    /// down a single point.
    pub fn minimizer(&self) -> Option<Vec3> {
        let a = self.matrix();
        let det = a.determinant();
        if det.abs() < 1e-12 || !det.is_finite() {
            return None;
        }
        let x = a.inverse() * self.vector();
        if x.is_finite() {
            Some(x.as_vec3())
        } else {
            None
        }
    }

    /// Error of the point `p`, i.e. the sum of squared distances to all the
    /// planes of this quadric.
    pub fn residual(&self, p: Vec3) -> f64 {
        let p = p.as_dvec3();
        (p.dot(self.matrix() * p) - 2.0 * p.dot(self.vector()) + self.c).max(0.0)
    }
}

impl Add for Quadric {
    type Output = Quadric;

    fn add(self, rhs: Self) -> Self::Output {
        Quadric {
            a00: self.a00 + rhs.a00,
            a01: self.a01 + rhs.a01,
            a02: self.a02 + rhs.a02,
            a11: self.a11 + rhs.a11,
            a12: self.a12 + rhs.a12,
            a22: self.a22 + rhs.a22,
            b0: self.b0 + rhs.b0,
            b1: self.b1 + rhs.b1,
            b2: self.b2 + rhs.b2,
            c: self.c + rhs.c,
        }
    }
}

impl AddAssign for Quadric {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}
