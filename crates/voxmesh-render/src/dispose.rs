use crate::gpu::GpuDevice;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DisposeStats {
    pub buffers: u64,
    pub textures: u64,
    pub materials: u64,
    pub meshes: u64,
}

/// Anything that owns GPU handles. Disposing twice must be a no-op: handles
/// are taken out of the owner as they are released.
pub trait Disposable {
    fn dispose(&mut self, gpu: &mut dyn GpuDevice, stats: &mut DisposeStats);
}

/// Releases resources recursively and keeps running totals.
#[derive(Debug, Default)]
pub struct ResourceDisposer {
    stats: DisposeStats,
}

impl ResourceDisposer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn dispose(&mut self, gpu: &mut dyn GpuDevice, item: &mut dyn Disposable) {
        item.dispose(gpu, &mut self.stats);
    }

    pub fn stats(&self) -> DisposeStats {
        self.stats
    }
}
