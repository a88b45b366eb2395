use crate::{Aabb, Vec3};

/// Column-major 4x4 matrix, `m[col][row]`, OpenGL clip conventions (z in -w..w).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Mat4 {
    pub m: [[f32; 4]; 4],
}

impl Default for Mat4 {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Mat4 {
    pub const IDENTITY: Mat4 = Mat4 {
        m: [
            [1.0, 0.0, 0.0, 0.0],
            [0.0, 1.0, 0.0, 0.0],
            [0.0, 0.0, 1.0, 0.0],
            [0.0, 0.0, 0.0, 1.0],
        ],
    };

    /// Right-handed perspective projection. `fov_y` in radians.
    pub fn perspective(fov_y: f32, aspect: f32, near: f32, far: f32) -> Mat4 {
        let f = 1.0 / (fov_y * 0.5).tan();
        let mut m = [[0.0f32; 4]; 4];
        m[0][0] = f / aspect;
        m[1][1] = f;
        m[2][2] = (far + near) / (near - far);
        m[2][3] = -1.0;
        m[3][2] = (2.0 * far * near) / (near - far);
        Mat4 { m }
    }

    /// Right-handed view matrix looking from `eye` towards `target`.
    pub fn look_at(eye: Vec3, target: Vec3, up: Vec3) -> Mat4 {
        let f = (target - eye).normalized();
        let s = f.cross(up).normalized();
        let u = s.cross(f);
        Mat4 {
            m: [
                [s.x, u.x, -f.x, 0.0],
                [s.y, u.y, -f.y, 0.0],
                [s.z, u.z, -f.z, 0.0],
                [-s.dot(eye), -u.dot(eye), f.dot(eye), 1.0],
            ],
        }
    }

    pub fn mul(&self, rhs: &Mat4) -> Mat4 {
        let mut out = [[0.0f32; 4]; 4];
        for (c, col) in out.iter_mut().enumerate() {
            for (r, cell) in col.iter_mut().enumerate() {
                *cell = (0..4).map(|k| self.m[k][r] * rhs.m[c][k]).sum();
            }
        }
        Mat4 { m: out }
    }

    #[inline]
    fn row(&self, r: usize) -> [f32; 4] {
        [self.m[0][r], self.m[1][r], self.m[2][r], self.m[3][r]]
    }
}

/// Plane `normal . p + d = 0`; positive side is inside.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Plane {
    pub normal: Vec3,
    pub d: f32,
}

impl Plane {
    #[inline]
    pub const fn new(normal: Vec3, d: f32) -> Self {
        Self { normal, d }
    }

    fn from_row(v: [f32; 4]) -> Plane {
        let p = Plane::new(Vec3::new(v[0], v[1], v[2]), v[3]);
        let len = p.normal.length();
        if len > 0.0 {
            Plane::new(p.normal / len, p.d / len)
        } else {
            p
        }
    }

    #[inline]
    pub fn distance_to_point(&self, p: Vec3) -> f32 {
        self.normal.dot(p) + self.d
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Frustum {
    /// Left, right, bottom, top, near, far.
    pub planes: [Plane; 6],
}

impl Frustum {
    pub fn from_view_projection(vp: &Mat4) -> Frustum {
        let r0 = vp.row(0);
        let r1 = vp.row(1);
        let r2 = vp.row(2);
        let r3 = vp.row(3);
        let add = |a: [f32; 4], b: [f32; 4]| [a[0] + b[0], a[1] + b[1], a[2] + b[2], a[3] + b[3]];
        let sub = |a: [f32; 4], b: [f32; 4]| [a[0] - b[0], a[1] - b[1], a[2] - b[2], a[3] - b[3]];
        Frustum {
            planes: [
                Plane::from_row(add(r3, r0)),
                Plane::from_row(sub(r3, r0)),
                Plane::from_row(add(r3, r1)),
                Plane::from_row(sub(r3, r1)),
                Plane::from_row(add(r3, r2)),
                Plane::from_row(sub(r3, r2)),
            ],
        }
    }

    /// Conservative box test: false only when the box is fully outside one plane.
    pub fn intersects_aabb(&self, bb: &Aabb) -> bool {
        let center = bb.center();
        let half = bb.half_extents();
        self.planes.iter().all(|plane| {
            let r = half.dot(plane.normal.abs());
            plane.distance_to_point(center) >= -r
        })
    }

    pub fn contains_point(&self, p: Vec3) -> bool {
        self.planes.iter().all(|plane| plane.distance_to_point(p) >= 0.0)
    }
}
