use crate::dispose::{Disposable, DisposeStats};
use crate::gpu::{AtlasImage, GpuDevice, GpuError, MaterialId, TextureId};

/// Non-owning reference to the shared material. Meshes hold this, never the
/// material itself, so mesh disposal cannot release it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MaterialHandle(MaterialId);

impl MaterialHandle {
    #[inline]
    pub fn id(self) -> MaterialId {
        self.0
    }
}

/// The one atlas-textured material every section mesh draws with.
#[derive(Debug, Default)]
pub struct SharedMaterial {
    material: Option<MaterialId>,
    texture: Option<TextureId>,
}

impl SharedMaterial {
    pub fn create(gpu: &mut dyn GpuDevice, atlas: &AtlasImage) -> Result<Self, GpuError> {
        let material = gpu.create_material()?;
        let texture = match gpu.create_texture(atlas) {
            Ok(t) => t,
            Err(e) => {
                gpu.release_material(material);
                return Err(e);
            }
        };
        if let Err(e) = gpu.set_material_texture(material, texture) {
            gpu.release_texture(texture);
            gpu.release_material(material);
            return Err(e);
        }
        Ok(Self {
            material: Some(material),
            texture: Some(texture),
        })
    }

    pub fn handle(&self) -> Option<MaterialHandle> {
        self.material.map(MaterialHandle)
    }

    pub fn texture(&self) -> Option<TextureId> {
        self.texture
    }

    pub fn is_disposed(&self) -> bool {
        self.material.is_none()
    }

    /// Installs a texture built from `atlas`, then releases the previous one.
    pub fn swap_texture(&mut self, gpu: &mut dyn GpuDevice, atlas: &AtlasImage) -> Result<TextureId, GpuError> {
        let material = self
            .material
            .ok_or(GpuError::UnknownMaterial(MaterialId(0)))?;
        let next = gpu.create_texture(atlas)?;
        if let Err(e) = gpu.set_material_texture(material, next) {
            gpu.release_texture(next);
            return Err(e);
        }
        if let Some(old) = self.texture.replace(next) {
            gpu.release_texture(old);
        }
        log::debug!(target: "coordinator", "atlas texture swapped to {:?}", next);
        Ok(next)
    }
}

impl Disposable for SharedMaterial {
    fn dispose(&mut self, gpu: &mut dyn GpuDevice, stats: &mut DisposeStats) {
        if let Some(t) = self.texture.take() {
            gpu.release_texture(t);
            stats.textures += 1;
        }
        if let Some(m) = self.material.take() {
            gpu.release_material(m);
            stats.materials += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::HeadlessGpu;

    #[test]
    fn swap_installs_before_release() {
        let mut gpu = HeadlessGpu::new();
        let mut mat = SharedMaterial::create(&mut gpu, &AtlasImage::checker(2, 2)).unwrap();
        let old = mat.texture().unwrap();
        let m = mat.handle().unwrap().id();
        let new = mat.swap_texture(&mut gpu, &AtlasImage::checker(4, 2)).unwrap();
        assert_ne!(old, new);
        assert_eq!(gpu.material_texture(m), Some(new));
        assert_eq!(gpu.live_textures(), 1);
    }

    #[test]
    fn failed_swap_keeps_old_texture() {
        let mut gpu = HeadlessGpu::new();
        let mut mat = SharedMaterial::create(&mut gpu, &AtlasImage::checker(2, 2)).unwrap();
        let old = mat.texture();
        let bad = AtlasImage {
            width: 2,
            height: 2,
            rgba: vec![],
        };
        assert!(mat.swap_texture(&mut gpu, &bad).is_err());
        assert_eq!(mat.texture(), old);
        assert_eq!(gpu.live_textures(), 1);
    }

    #[test]
    fn dispose_is_idempotent() {
        let mut gpu = HeadlessGpu::new();
        let mut mat = SharedMaterial::create(&mut gpu, &AtlasImage::checker(1, 1)).unwrap();
        let mut stats = DisposeStats::default();
        mat.dispose(&mut gpu, &mut stats);
        mat.dispose(&mut gpu, &mut stats);
        assert_eq!((stats.textures, stats.materials), (1, 1));
        assert_eq!(gpu.live_handles(), 0);
        assert!(mat.handle().is_none());
    }
}
