use std::sync::Arc;

use voxmesh_blocks::{BlockStateId, BlockStateTable};
use voxmesh_mesh_cpu::SectionGeometry;
use voxmesh_world::{BlockPos, ColumnCoord, SectionCoord};

/// Coordinator -> worker. Each worker handles these strictly in arrival order.
#[derive(Clone, Debug)]
pub enum WorkerMsg {
    SetVersion(String),
    SetBlockStateTable(Arc<BlockStateTable>),
    /// Every `MarkDirty` is answered by exactly one `SectionComplete`.
    MarkDirty { coord: SectionCoord, dirty: bool },
    /// `generation` is unique per load; geometry built from this column carries it.
    LoadColumn {
        coord: ColumnCoord,
        generation: u64,
        payload: Arc<[u8]>,
    },
    UnloadColumn { coord: ColumnCoord },
    MutateBlock { pos: BlockPos, state: BlockStateId },
    /// Drops the world replica and queue; events afterwards carry `epoch`.
    Reset { epoch: u64 },
    Terminate,
}

/// Worker -> coordinator.
#[derive(Debug)]
pub enum WorkerEvent {
    GeometryReady {
        worker: usize,
        epoch: u64,
        /// Load generation of the column the geometry was built from.
        generation: u64,
        coord: SectionCoord,
        geometry: SectionGeometry,
    },
    SectionComplete {
        worker: usize,
        epoch: u64,
        coord: SectionCoord,
    },
    GenerationError {
        worker: usize,
        epoch: u64,
        coord: SectionCoord,
        message: String,
    },
    ProtocolError {
        worker: usize,
        epoch: u64,
        message: String,
    },
}

impl WorkerEvent {
    pub fn worker(&self) -> usize {
        match self {
            WorkerEvent::GeometryReady { worker, .. }
            | WorkerEvent::SectionComplete { worker, .. }
            | WorkerEvent::GenerationError { worker, .. }
            | WorkerEvent::ProtocolError { worker, .. } => *worker,
        }
    }

    pub fn epoch(&self) -> u64 {
        match self {
            WorkerEvent::GeometryReady { epoch, .. }
            | WorkerEvent::SectionComplete { epoch, .. }
            | WorkerEvent::GenerationError { epoch, .. }
            | WorkerEvent::ProtocolError { epoch, .. } => *epoch,
        }
    }
}
