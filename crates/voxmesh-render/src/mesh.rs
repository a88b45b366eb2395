use voxmesh_geom::{Aabb, Vec3};
use voxmesh_mesh_cpu::SectionGeometry;
use voxmesh_world::SectionCoord;

use crate::dispose::{Disposable, DisposeStats};
use crate::gpu::{BufferData, BufferId, BufferKind, GpuDevice, GpuError, MeshId};
use crate::material::MaterialHandle;

/// Attribute and index buffers of one uploaded mesh.
#[derive(Debug, Default)]
pub struct GeometryBuffers {
    position: Option<BufferId>,
    normal: Option<BufferId>,
    color: Option<BufferId>,
    uv: Option<BufferId>,
    index: Option<BufferId>,
    index_count: usize,
}

impl GeometryBuffers {
    /// Uploads every attribute; on failure nothing stays allocated.
    pub fn upload(gpu: &mut dyn GpuDevice, g: &SectionGeometry) -> Result<Self, GpuError> {
        let mut out = Self {
            index_count: g.indices.len(),
            ..Default::default()
        };
        let attempt = (|| -> Result<(), GpuError> {
            out.position = Some(gpu.upload_buffer(BufferKind::Position, BufferData::F32(&g.positions))?);
            out.normal = Some(gpu.upload_buffer(BufferKind::Normal, BufferData::F32(&g.normals))?);
            out.color = Some(gpu.upload_buffer(BufferKind::Color, BufferData::F32(&g.colors))?);
            out.uv = Some(gpu.upload_buffer(BufferKind::Uv, BufferData::F32(&g.uvs))?);
            out.index = Some(gpu.upload_buffer(BufferKind::Index, BufferData::U32(&g.indices))?);
            Ok(())
        })();
        if let Err(e) = attempt {
            out.dispose(gpu, &mut DisposeStats::default());
            return Err(e);
        }
        Ok(out)
    }

    pub fn index_count(&self) -> usize {
        self.index_count
    }

    pub fn live(&self) -> usize {
        [self.position, self.normal, self.color, self.uv, self.index]
            .iter()
            .filter(|b| b.is_some())
            .count()
    }
}

impl Disposable for GeometryBuffers {
    fn dispose(&mut self, gpu: &mut dyn GpuDevice, stats: &mut DisposeStats) {
        for slot in [
            &mut self.position,
            &mut self.normal,
            &mut self.color,
            &mut self.uv,
            &mut self.index,
        ] {
            if let Some(id) = slot.take() {
                gpu.release_buffer(id);
                stats.buffers += 1;
            }
        }
    }
}

/// One live section mesh: owns its buffers, borrows the shared material.
#[derive(Debug)]
pub struct SectionMesh {
    id: MeshId,
    coord: SectionCoord,
    buffers: GeometryBuffers,
    material: MaterialHandle,
    translation: Vec3,
    // kept only until bounds are computed
    cpu_positions: Option<Vec<f32>>,
    local_bounds: Option<Aabb>,
    visible: bool,
    disposed: bool,
}

impl SectionMesh {
    pub fn upload(
        gpu: &mut dyn GpuDevice,
        id: MeshId,
        coord: SectionCoord,
        geometry: SectionGeometry,
        material: MaterialHandle,
    ) -> Result<Self, GpuError> {
        let buffers = GeometryBuffers::upload(gpu, &geometry)?;
        let [x, y, z] = geometry.origin;
        Ok(Self {
            id,
            coord,
            buffers,
            material,
            translation: Vec3::new(x as f32, y as f32, z as f32),
            cpu_positions: Some(geometry.positions),
            local_bounds: None,
            visible: true,
            disposed: false,
        })
    }

    #[inline]
    pub fn id(&self) -> MeshId {
        self.id
    }

    #[inline]
    pub fn coord(&self) -> SectionCoord {
        self.coord
    }

    #[inline]
    pub fn material(&self) -> MaterialHandle {
        self.material
    }

    #[inline]
    pub fn translation(&self) -> Vec3 {
        self.translation
    }

    pub fn set_translation(&mut self, t: Vec3) {
        self.translation = t;
    }

    #[inline]
    pub fn visible(&self) -> bool {
        self.visible
    }

    pub(crate) fn set_visible(&mut self, v: bool) {
        self.visible = v;
    }

    pub fn buffers(&self) -> &GeometryBuffers {
        &self.buffers
    }

    pub fn has_cpu_positions(&self) -> bool {
        self.cpu_positions.is_some()
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    /// Local bounds, computed once from the retained positions which are then dropped.
    pub fn local_bounds(&mut self) -> Option<Aabb> {
        if self.local_bounds.is_none() {
            if let Some(p) = self.cpu_positions.take() {
                self.local_bounds = Aabb::from_points(&p);
            }
        }
        self.local_bounds
    }

    pub fn world_bounds(&mut self) -> Option<Aabb> {
        let t = self.translation;
        self.local_bounds().map(|b| b.translated(t))
    }
}

impl Disposable for SectionMesh {
    fn dispose(&mut self, gpu: &mut dyn GpuDevice, stats: &mut DisposeStats) {
        if self.disposed {
            return;
        }
        self.buffers.dispose(gpu, stats);
        self.cpu_positions = None;
        self.disposed = true;
        stats.meshes += 1;
    }
}
