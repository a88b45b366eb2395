//! Render coordination: GPU resource lifecycle, live mesh set, culling, and readiness waits.
#![forbid(unsafe_code)]

mod assets;
mod coordinator;
mod cull;
mod dispose;
mod gpu;
mod material;
mod mesh;
mod wait;

pub use assets::{AssetError, AssetSource, FileAssets, StaticAssets};
pub use coordinator::{CoordinatorConfig, CoordinatorError, CoordinatorStats, RenderCoordinator};
pub use cull::{Camera, CullStats, FrustumCuller};
pub use dispose::{Disposable, DisposeStats, ResourceDisposer};
pub use gpu::{
    AtlasImage, BufferData, BufferId, BufferKind, GpuCounters, GpuDevice, GpuError, HeadlessGpu,
    HeadlessScene, MaterialId, MeshId, SceneEntry, SceneSink, TextureId,
};
pub use material::{MaterialHandle, SharedMaterial};
pub use mesh::{GeometryBuffers, SectionMesh};
pub use wait::RenderWait;
