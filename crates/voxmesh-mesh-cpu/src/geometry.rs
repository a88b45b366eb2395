use voxmesh_geom::{Aabb, Vec3};

/// CPU-side triangle data for one section, positions relative to `origin`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SectionGeometry {
    pub positions: Vec<f32>,
    pub normals: Vec<f32>,
    pub colors: Vec<f32>,
    pub uvs: Vec<f32>,
    pub indices: Vec<u32>,
    /// World-space block origin of the section.
    pub origin: [i32; 3],
}

impl SectionGeometry {
    pub fn new(origin: [i32; 3]) -> Self {
        Self {
            origin,
            ..Default::default()
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.positions.len() / 3
    }

    #[inline]
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    pub fn local_bounds(&self) -> Option<Aabb> {
        Aabb::from_points(&self.positions)
    }

    /// Appends one quad. Corners may come in either rotational order; the
    /// winding is flipped so the front face points along `n`.
    /// `uv` is `[u0, v0, u1, v1]` in atlas space.
    pub fn add_quad(&mut self, corners: [Vec3; 4], n: Vec3, uv: [f32; 4], rgb: [f32; 3]) {
        let base = self.vertex_count() as u32;
        let [u0, v0, u1, v1] = uv;
        let mut vs = corners;
        let mut uvs = [(u0, v1), (u1, v1), (u1, v0), (u0, v0)];
        let cross = (vs[1] - vs[0]).cross(vs[2] - vs[0]);
        if cross.dot(n) < 0.0 {
            vs.swap(1, 3);
            uvs.swap(1, 3);
        }
        for i in 0..4 {
            self.positions.extend_from_slice(&[vs[i].x, vs[i].y, vs[i].z]);
            self.normals.extend_from_slice(&[n.x, n.y, n.z]);
            self.uvs.extend_from_slice(&[uvs[i].0, uvs[i].1]);
            self.colors.extend_from_slice(&rgb);
        }
        self.indices
            .extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quad_winding_faces_normal() {
        let mut g = SectionGeometry::new([0, 0, 0]);
        let corners = [
            Vec3::new(0.0, 1.0, 0.0),
            Vec3::new(0.0, 1.0, 1.0),
            Vec3::new(1.0, 1.0, 1.0),
            Vec3::new(1.0, 1.0, 0.0),
        ];
        g.add_quad(corners, Vec3::UP, [0.0, 0.0, 1.0, 1.0], [1.0; 3]);
        let p = |i: usize| {
            let k = g.indices[i] as usize * 3;
            Vec3::new(g.positions[k], g.positions[k + 1], g.positions[k + 2])
        };
        let n = (p(1) - p(0)).cross(p(2) - p(0));
        assert!(n.dot(Vec3::UP) > 0.0);
        assert_eq!(g.vertex_count(), 4);
        assert_eq!(g.triangle_count(), 2);
        assert_eq!(g.colors.len(), 12);
    }
}
