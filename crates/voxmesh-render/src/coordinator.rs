use std::sync::Arc;

use crossbeam_channel::Sender;
use hashbrown::HashMap;
use thiserror::Error;
use voxmesh_blocks::{BlockStateId, BlockStateTable};
use voxmesh_mesh_cpu::SectionGeometry;
use voxmesh_runtime::{DirtyTracker, Transport, WorkerEvent, WorkerMsg, affected_sections};
use voxmesh_world::{BlockPos, Column, ColumnCoord, PayloadError, SectionCoord, World};

use crate::assets::{AssetError, AssetSource};
use crate::cull::{Camera, CullStats, FrustumCuller};
use crate::dispose::{DisposeStats, ResourceDisposer};
use crate::gpu::{AtlasImage, GpuDevice, GpuError, MeshId, SceneSink};
use crate::material::SharedMaterial;
use crate::mesh::SectionMesh;
use crate::wait::RenderWait;

#[derive(Debug, Error)]
pub enum CoordinatorError {
    #[error("coordinator has been disposed")]
    Disposed,
    #[error(transparent)]
    Gpu(#[from] GpuError),
    #[error(transparent)]
    Asset(#[from] AssetError),
    #[error(transparent)]
    Payload(#[from] PayloadError),
}

#[derive(Clone, Debug)]
pub struct CoordinatorConfig {
    pub cache_capacity: usize,
    pub frustum_culling: bool,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            cache_capacity: 512,
            frustum_culling: true,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CoordinatorStats {
    pub meshes: usize,
    pub outstanding: usize,
    pub loaded_columns: usize,
    pub installed: u64,
    pub replaced: u64,
    pub empty_results: u64,
    pub generation_errors: u64,
    pub protocol_errors: u64,
    pub upload_errors: u64,
    /// Geometry for a column that is no longer loaded, or built from an
    /// earlier load of the same key.
    pub stale_results: u64,
    /// Events from before the last reset.
    pub stale_events: u64,
    pub visible: usize,
    pub total: usize,
}

/// Single-threaded owner of the live mesh set. Feeds work to the worker
/// units through `T` and reconciles their results in any arrival order.
pub struct RenderCoordinator<T, G, S> {
    transport: T,
    gpu: G,
    scene: S,
    world: World,
    dirty: DirtyTracker,
    meshes: HashMap<SectionCoord, SectionMesh>,
    /// Load generation of every loaded column.
    generations: HashMap<ColumnCoord, u64>,
    next_generation: u64,
    material: SharedMaterial,
    disposer: ResourceDisposer,
    culler: FrustumCuller,
    waiters: Vec<Sender<()>>,
    version: Option<String>,
    epoch: u64,
    next_mesh_id: u64,
    counters: CoordinatorStats,
    disposed: bool,
}

impl<T, G, S> RenderCoordinator<T, G, S>
where
    T: Transport,
    G: GpuDevice,
    S: SceneSink,
{
    pub fn new(
        transport: T,
        mut gpu: G,
        scene: S,
        table: Arc<BlockStateTable>,
        atlas: &AtlasImage,
        config: CoordinatorConfig,
    ) -> Result<Self, CoordinatorError> {
        let material = SharedMaterial::create(&mut gpu, atlas)?;
        transport.broadcast(WorkerMsg::SetBlockStateTable(table.clone()));
        let workers = transport.worker_count();
        log::info!(target: "coordinator", "coordinator up with {} workers", workers);
        Ok(Self {
            dirty: DirtyTracker::new(workers),
            world: World::new(table, config.cache_capacity),
            transport,
            gpu,
            scene,
            meshes: HashMap::new(),
            generations: HashMap::new(),
            next_generation: 1,
            material,
            disposer: ResourceDisposer::new(),
            culler: FrustumCuller::new(config.frustum_culling),
            waiters: Vec::new(),
            version: None,
            epoch: 0,
            next_mesh_id: 1,
            counters: CoordinatorStats::default(),
            disposed: false,
        })
    }

    fn ensure_live(&self) -> Result<(), CoordinatorError> {
        if self.disposed {
            Err(CoordinatorError::Disposed)
        } else {
            Ok(())
        }
    }

    /// Stores the column, forwards it to every worker, and marks all its
    /// levels plus every level of each loaded lateral neighbour.
    ///
    /// Reloading a loaded key first drops everything the old column had:
    /// meshes, outstanding sections and queued worker builds.
    pub fn load_column(&mut self, coord: ColumnCoord, payload: Arc<[u8]>) -> Result<(), CoordinatorError> {
        self.ensure_live()?;
        let column = Column::decode(&payload)?;
        if self.detach_column(coord) {
            log::debug!(target: "coordinator", "column ({}, {}) reloaded", coord.cx, coord.cz);
        }
        let levels: Vec<i32> = self.world.insert_column(coord, column).section_ys().collect();
        let generation = self.next_generation;
        self.next_generation += 1;
        self.generations.insert(coord, generation);
        self.transport.broadcast(WorkerMsg::LoadColumn {
            coord,
            generation,
            payload,
        });
        for sy in levels {
            self.dirty.mark(coord.section(sy));
        }
        for n in coord.neighbors() {
            if let Some(col) = self.world.column(n) {
                for sy in col.section_ys() {
                    self.dirty.mark(n.section(sy));
                }
            }
        }
        log::debug!(target: "coordinator", "column ({}, {}) loaded", coord.cx, coord.cz);
        Ok(())
    }

    /// No-op for a column that is not loaded.
    pub fn unload_column(&mut self, coord: ColumnCoord) {
        if self.disposed {
            return;
        }
        if !self.detach_column(coord) {
            log::debug!(target: "coordinator", "unload of unknown column ({}, {}) ignored", coord.cx, coord.cz);
            return;
        }
        self.settle();
    }

    /// Removes the column everywhere without settling waiters. Returns `false`
    /// if it was not loaded.
    fn detach_column(&mut self, coord: ColumnCoord) -> bool {
        if self.world.remove_column(coord).is_none() {
            return false;
        }
        self.generations.remove(&coord);
        self.transport.broadcast(WorkerMsg::UnloadColumn { coord });
        self.dirty.forget_column(coord);
        let keys: Vec<SectionCoord> = self
            .meshes
            .keys()
            .filter(|c| c.column() == coord)
            .copied()
            .collect();
        for k in keys {
            self.drop_mesh(k);
        }
        true
    }

    /// Returns `false` when the column is not loaded.
    pub fn mutate_block(&mut self, pos: BlockPos, state: BlockStateId) -> bool {
        if self.disposed || !self.world.set_block_state_id(pos, state) {
            return false;
        }
        self.transport.broadcast(WorkerMsg::MutateBlock { pos, state });
        for s in affected_sections(pos) {
            if self.world.has_column(s.column()) {
                self.dirty.mark(s);
            }
        }
        true
    }

    /// Clears the section's dirty flag; it stays outstanding until its worker acknowledges.
    pub fn unmark_section(&mut self, coord: SectionCoord) {
        if self.disposed {
            return;
        }
        let d = self.dirty.unmark(coord);
        self.transport
            .send(d.worker, WorkerMsg::MarkDirty { coord, dirty: false });
    }

    /// Pumps workers, applies their events, dispatches this frame's dirty
    /// sections, then culls against `camera`.
    pub fn tick(&mut self, camera: &Camera) -> CullStats {
        if self.disposed {
            return CullStats::default();
        }
        self.transport.pump();
        self.poll_events();
        self.flush();
        self.cull(camera)
    }

    pub fn poll_events(&mut self) -> usize {
        let mut n = 0;
        while let Some(ev) = self.transport.try_recv() {
            self.handle_event(ev);
            n += 1;
        }
        n
    }

    pub fn flush(&mut self) -> usize {
        let dispatches = self.dirty.flush_frame();
        for d in &dispatches {
            self.transport.send(
                d.worker,
                WorkerMsg::MarkDirty {
                    coord: d.coord,
                    dirty: true,
                },
            );
        }
        dispatches.len()
    }

    pub fn cull(&mut self, camera: &Camera) -> CullStats {
        self.culler.cull(camera, self.meshes.values_mut(), &mut self.scene)
    }

    pub fn handle_event(&mut self, ev: WorkerEvent) {
        if ev.epoch() != self.epoch {
            self.counters.stale_events += 1;
            return;
        }
        match ev {
            WorkerEvent::GeometryReady {
                coord,
                generation,
                geometry,
                ..
            } => self.install(coord, generation, geometry),
            WorkerEvent::SectionComplete { coord, .. } => {
                self.dirty.complete(coord);
                self.settle();
            }
            WorkerEvent::GenerationError {
                worker,
                coord,
                message,
                ..
            } => {
                log::warn!(target: "coordinator", "worker {} failed on {:?}: {}", worker, coord, message);
                self.counters.generation_errors += 1;
            }
            WorkerEvent::ProtocolError { worker, message, .. } => {
                log::warn!(target: "coordinator", "worker {} protocol error: {}", worker, message);
                self.counters.protocol_errors += 1;
            }
        }
    }

    fn install(&mut self, coord: SectionCoord, generation: u64, geometry: SectionGeometry) {
        if self.generations.get(&coord.column()) != Some(&generation) {
            log::debug!(target: "coordinator", "dropping stale geometry for {:?}", coord);
            self.counters.stale_results += 1;
            return;
        }
        let replaced = self.drop_mesh(coord);
        if geometry.is_empty() {
            self.counters.empty_results += 1;
            return;
        }
        let Some(material) = self.material.handle() else {
            return;
        };
        let id = MeshId(self.next_mesh_id);
        self.next_mesh_id += 1;
        match SectionMesh::upload(&mut self.gpu, id, coord, geometry, material) {
            Ok(mesh) => {
                self.scene.add(id, material.id(), mesh.translation());
                self.meshes.insert(coord, mesh);
                self.counters.installed += 1;
                if replaced {
                    self.counters.replaced += 1;
                }
            }
            Err(e) => {
                log::error!(target: "coordinator", "upload for {:?} failed: {}", coord, e);
                self.counters.upload_errors += 1;
            }
        }
    }

    fn drop_mesh(&mut self, coord: SectionCoord) -> bool {
        match self.meshes.remove(&coord) {
            Some(mut mesh) => {
                self.scene.remove(mesh.id());
                self.disposer.dispose(&mut self.gpu, &mut mesh);
                true
            }
            None => false,
        }
    }

    fn settle(&mut self) {
        if self.dirty.is_idle() && !self.waiters.is_empty() {
            for tx in self.waiters.drain(..) {
                let _ = tx.send(());
            }
        }
    }

    /// Ready now if nothing is outstanding, otherwise on the next transition to empty.
    pub fn wait_for_chunks_to_render(&mut self) -> RenderWait {
        if self.dirty.is_idle() {
            return RenderWait::resolved();
        }
        let (tx, wait) = RenderWait::pair();
        self.waiters.push(tx);
        wait
    }

    fn clear_state(&mut self) {
        let keys: Vec<SectionCoord> = self.meshes.keys().copied().collect();
        for k in keys {
            self.drop_mesh(k);
        }
        self.world.clear();
        self.generations.clear();
        self.dirty.clear();
        self.settle();
    }

    /// Drops every mesh and all world state; worker units stay alive.
    pub fn reset_world(&mut self) {
        if self.disposed {
            return;
        }
        self.clear_state();
        self.epoch += 1;
        self.transport.broadcast(WorkerMsg::Reset { epoch: self.epoch });
        log::info!(target: "coordinator", "world reset (epoch {})", self.epoch);
    }

    /// Switches data version: fresh world, new block states, new atlas texture.
    /// On error nothing has changed.
    pub fn set_version(&mut self, version: &str, assets: &dyn AssetSource) -> Result<(), CoordinatorError> {
        self.ensure_live()?;
        let table = assets.block_states(version)?;
        let atlas = assets.atlas(version)?;
        self.material.swap_texture(&mut self.gpu, &atlas)?;
        self.clear_state();
        self.epoch += 1;
        self.transport.broadcast(WorkerMsg::Reset { epoch: self.epoch });
        self.transport
            .broadcast(WorkerMsg::SetVersion(version.to_string()));
        self.transport
            .broadcast(WorkerMsg::SetBlockStateTable(table.clone()));
        self.world.set_block_states(table);
        self.version = Some(version.to_string());
        log::info!(target: "coordinator", "version set to {}", version);
        Ok(())
    }

    /// Reloads block states and atlas for the current version and re-marks every loaded section.
    pub fn reload_assets(&mut self, assets: &dyn AssetSource) -> Result<(), CoordinatorError> {
        self.ensure_live()?;
        let version = self.version.clone().unwrap_or_default();
        let table = assets.block_states(&version)?;
        let atlas = assets.atlas(&version)?;
        self.material.swap_texture(&mut self.gpu, &atlas)?;
        self.world.set_block_states(table.clone());
        self.transport
            .broadcast(WorkerMsg::SetBlockStateTable(table));
        let columns: Vec<ColumnCoord> = self.world.column_coords().collect();
        let mut marked = 0;
        for c in columns {
            if let Some(col) = self.world.column(c) {
                for sy in col.section_ys() {
                    self.dirty.mark(c.section(sy));
                    marked += 1;
                }
            }
        }
        log::info!(target: "coordinator", "assets reloaded; {} sections re-marked", marked);
        Ok(())
    }

    /// Tears everything down. Later calls are no-ops.
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.reset_world();
        self.transport.terminate();
        self.disposer.dispose(&mut self.gpu, &mut self.material);
        self.disposed = true;
        let s = self.disposer.stats();
        log::info!(
            target: "coordinator",
            "disposed: {} meshes, {} buffers, {} textures, {} materials released",
            s.meshes,
            s.buffers,
            s.textures,
            s.materials
        );
    }

    pub fn stats(&self) -> CoordinatorStats {
        let last = self.culler.last();
        CoordinatorStats {
            meshes: self.meshes.len(),
            outstanding: self.dirty.outstanding_len(),
            loaded_columns: self.world.column_count(),
            visible: last.visible,
            total: last.total,
            ..self.counters
        }
    }

    pub fn dispose_stats(&self) -> DisposeStats {
        self.disposer.stats()
    }

    pub fn set_frustum_culling(&mut self, enabled: bool) {
        self.culler.set_enabled(enabled);
    }

    pub fn mesh(&self, coord: SectionCoord) -> Option<&SectionMesh> {
        self.meshes.get(&coord)
    }

    pub fn meshes(&self) -> impl Iterator<Item = &SectionMesh> {
        self.meshes.values()
    }

    pub fn mesh_count(&self) -> usize {
        self.meshes.len()
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn dirty(&self) -> &DirtyTracker {
        &self.dirty
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn gpu(&self) -> &G {
        &self.gpu
    }

    pub fn gpu_mut(&mut self) -> &mut G {
        &mut self.gpu
    }

    pub fn scene(&self) -> &S {
        &self.scene
    }

    pub fn material(&self) -> &SharedMaterial {
        &self.material
    }

    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }
}
