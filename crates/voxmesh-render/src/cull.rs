use voxmesh_geom::{Frustum, Mat4, Vec3};

use crate::gpu::SceneSink;
use crate::mesh::SectionMesh;

/// Perspective camera used for culling.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Camera {
    pub position: Vec3,
    pub target: Vec3,
    pub up: Vec3,
    /// Vertical field of view in degrees.
    pub fov_y: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
}

impl Camera {
    pub fn new(position: Vec3, target: Vec3) -> Self {
        Self {
            position,
            target,
            up: Vec3::UP,
            fov_y: 70.0,
            aspect: 16.0 / 9.0,
            near: 0.1,
            far: 1000.0,
        }
    }

    /// Camera on a circle of `radius` around `center`, `height` above it, looking at it.
    pub fn orbit(center: Vec3, radius: f32, height: f32, angle_rad: f32) -> Self {
        let position = center + Vec3::new(angle_rad.cos() * radius, height, angle_rad.sin() * radius);
        Self::new(position, center)
    }

    pub fn view_projection(&self) -> Mat4 {
        let proj = Mat4::perspective(self.fov_y.to_radians(), self.aspect, self.near, self.far);
        let view = Mat4::look_at(self.position, self.target, self.up);
        proj.mul(&view)
    }

    pub fn frustum(&self) -> Frustum {
        Frustum::from_view_projection(&self.view_projection())
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CullStats {
    pub visible: usize,
    pub total: usize,
}

/// Per-frame visibility pass over the live meshes.
#[derive(Debug)]
pub struct FrustumCuller {
    enabled: bool,
    last: CullStats,
}

impl Default for FrustumCuller {
    fn default() -> Self {
        Self::new(true)
    }
}

impl FrustumCuller {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            last: CullStats::default(),
        }
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        if self.enabled != enabled {
            log::info!(target: "cull", "frustum culling {}", if enabled { "enabled" } else { "disabled" });
        }
        self.enabled = enabled;
    }

    pub fn last(&self) -> CullStats {
        self.last
    }

    pub fn cull<'a, I>(&mut self, camera: &Camera, meshes: I, scene: &mut dyn SceneSink) -> CullStats
    where
        I: IntoIterator<Item = &'a mut SectionMesh>,
    {
        let frustum = self.enabled.then(|| camera.frustum());
        let mut stats = CullStats::default();
        for mesh in meshes {
            stats.total += 1;
            let visible = match &frustum {
                None => true,
                Some(f) => mesh.world_bounds().is_none_or(|bb| f.intersects_aabb(&bb)),
            };
            if visible != mesh.visible() {
                mesh.set_visible(visible);
                scene.set_visible(mesh.id(), visible);
            }
            if visible {
                stats.visible += 1;
            }
        }
        self.last = stats;
        stats
    }
}
