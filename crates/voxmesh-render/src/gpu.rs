use hashbrown::{HashMap, HashSet};
use thiserror::Error;
use voxmesh_geom::Vec3;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BufferId(pub u64);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureId(pub u64);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MaterialId(pub u64);

/// Opaque scene handle for one installed section mesh.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MeshId(pub u64);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BufferKind {
    Position,
    Normal,
    Color,
    Uv,
    Index,
}

#[derive(Clone, Copy, Debug)]
pub enum BufferData<'a> {
    F32(&'a [f32]),
    U32(&'a [u32]),
}

impl BufferData<'_> {
    pub fn byte_len(&self) -> usize {
        match self {
            BufferData::F32(d) => std::mem::size_of_val(*d),
            BufferData::U32(d) => std::mem::size_of_val(*d),
        }
    }
}

/// RGBA8 texture atlas.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AtlasImage {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

impl AtlasImage {
    /// Flat-colored atlas of `tiles x tiles` cells, each `tile_px` square.
    pub fn checker(tiles: u32, tile_px: u32) -> Self {
        let side = tiles * tile_px;
        let mut rgba = Vec::with_capacity((side * side * 4) as usize);
        for y in 0..side {
            for x in 0..side {
                let t = (y / tile_px) * tiles + x / tile_px;
                let shade = if (x / 4 + y / 4) % 2 == 0 { 255 } else { 200 };
                rgba.extend_from_slice(&[
                    ((t * 37) % 256) as u8,
                    ((t * 91) % 256) as u8,
                    shade,
                    255,
                ]);
            }
        }
        Self {
            width: side,
            height: side,
            rgba,
        }
    }
}

#[derive(Debug, Error)]
pub enum GpuError {
    #[error("buffer upload failed: {0}")]
    Upload(String),
    #[error("texture {width}x{height} has {len} bytes of pixel data")]
    BadTexture { width: u32, height: u32, len: usize },
    #[error("unknown material {0:?}")]
    UnknownMaterial(MaterialId),
    #[error("unknown texture {0:?}")]
    UnknownTexture(TextureId),
}

/// GPU resource lifetime operations. Release of an unknown handle is a no-op.
pub trait GpuDevice {
    fn upload_buffer(&mut self, kind: BufferKind, data: BufferData<'_>) -> Result<BufferId, GpuError>;
    fn release_buffer(&mut self, id: BufferId);
    fn create_texture(&mut self, image: &AtlasImage) -> Result<TextureId, GpuError>;
    fn release_texture(&mut self, id: TextureId);
    fn create_material(&mut self) -> Result<MaterialId, GpuError>;
    fn release_material(&mut self, id: MaterialId);
    fn set_material_texture(&mut self, material: MaterialId, texture: TextureId) -> Result<(), GpuError>;
}

/// Where installed meshes become drawable.
pub trait SceneSink {
    fn add(&mut self, id: MeshId, material: MaterialId, translation: Vec3);
    fn remove(&mut self, id: MeshId);
    fn set_visible(&mut self, id: MeshId, visible: bool);
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct GpuCounters {
    pub buffers_uploaded: u64,
    pub buffers_released: u64,
    pub bytes_uploaded: u64,
    pub textures_created: u64,
    pub textures_released: u64,
    pub materials_created: u64,
    pub materials_released: u64,
}

/// Bookkeeping-only device: tracks live handles so leaks are observable.
#[derive(Debug, Default)]
pub struct HeadlessGpu {
    next: u64,
    buffers: HashMap<BufferId, usize>,
    textures: HashSet<TextureId>,
    materials: HashMap<MaterialId, Option<TextureId>>,
    counters: GpuCounters,
    fail_uploads: bool,
}

impl HeadlessGpu {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent buffer upload fail.
    pub fn set_fail_uploads(&mut self, fail: bool) {
        self.fail_uploads = fail;
    }

    fn next_id(&mut self) -> u64 {
        self.next += 1;
        self.next
    }

    pub fn live_buffers(&self) -> usize {
        self.buffers.len()
    }

    pub fn live_textures(&self) -> usize {
        self.textures.len()
    }

    pub fn live_materials(&self) -> usize {
        self.materials.len()
    }

    /// Total live handles of every kind; zero after a clean teardown.
    pub fn live_handles(&self) -> usize {
        self.live_buffers() + self.live_textures() + self.live_materials()
    }

    pub fn material_texture(&self, material: MaterialId) -> Option<TextureId> {
        self.materials.get(&material).copied().flatten()
    }

    pub fn counters(&self) -> GpuCounters {
        self.counters
    }
}

impl GpuDevice for HeadlessGpu {
    fn upload_buffer(&mut self, _kind: BufferKind, data: BufferData<'_>) -> Result<BufferId, GpuError> {
        if self.fail_uploads {
            return Err(GpuError::Upload("device lost".into()));
        }
        let id = BufferId(self.next_id());
        let bytes = data.byte_len();
        self.buffers.insert(id, bytes);
        self.counters.buffers_uploaded += 1;
        self.counters.bytes_uploaded += bytes as u64;
        Ok(id)
    }

    fn release_buffer(&mut self, id: BufferId) {
        if self.buffers.remove(&id).is_some() {
            self.counters.buffers_released += 1;
        }
    }

    fn create_texture(&mut self, image: &AtlasImage) -> Result<TextureId, GpuError> {
        let want = image.width as usize * image.height as usize * 4;
        if image.rgba.len() != want {
            return Err(GpuError::BadTexture {
                width: image.width,
                height: image.height,
                len: image.rgba.len(),
            });
        }
        let id = TextureId(self.next_id());
        self.textures.insert(id);
        self.counters.textures_created += 1;
        Ok(id)
    }

    fn release_texture(&mut self, id: TextureId) {
        if self.textures.remove(&id) {
            self.counters.textures_released += 1;
        }
    }

    fn create_material(&mut self) -> Result<MaterialId, GpuError> {
        let id = MaterialId(self.next_id());
        self.materials.insert(id, None);
        self.counters.materials_created += 1;
        Ok(id)
    }

    fn release_material(&mut self, id: MaterialId) {
        if self.materials.remove(&id).is_some() {
            self.counters.materials_released += 1;
        }
    }

    fn set_material_texture(&mut self, material: MaterialId, texture: TextureId) -> Result<(), GpuError> {
        if !self.textures.contains(&texture) {
            return Err(GpuError::UnknownTexture(texture));
        }
        match self.materials.get_mut(&material) {
            Some(slot) => {
                *slot = Some(texture);
                Ok(())
            }
            None => Err(GpuError::UnknownMaterial(material)),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SceneEntry {
    pub material: MaterialId,
    pub translation: Vec3,
    pub visible: bool,
}

/// In-memory scene used by the headless driver and tests.
#[derive(Debug, Default)]
pub struct HeadlessScene {
    entries: HashMap<MeshId, SceneEntry>,
}

impl HeadlessScene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, id: MeshId) -> Option<&SceneEntry> {
        self.entries.get(&id)
    }

    pub fn visible_count(&self) -> usize {
        self.entries.values().filter(|e| e.visible).count()
    }
}

impl SceneSink for HeadlessScene {
    fn add(&mut self, id: MeshId, material: MaterialId, translation: Vec3) {
        self.entries.insert(
            id,
            SceneEntry {
                material,
                translation,
                visible: true,
            },
        );
    }

    fn remove(&mut self, id: MeshId) {
        self.entries.remove(&id);
    }

    fn set_visible(&mut self, id: MeshId, visible: bool) {
        if let Some(e) = self.entries.get_mut(&id) {
            e.visible = visible;
        }
    }
}
