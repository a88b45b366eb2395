use std::any::Any;
use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use crossbeam_channel::Sender;
use hashbrown::{HashMap, HashSet};
use voxmesh_blocks::BlockStateTable;
use voxmesh_mesh_cpu::{Mesher, SectionGeometry};
use voxmesh_world::{ColumnCoord, SectionCoord, World, WorldView};

use crate::protocol::{WorkerEvent, WorkerMsg};

#[derive(Clone, Debug)]
pub struct WorkerConfig {
    pub max_sections_per_tick: usize,
    pub cache_capacity: usize,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            max_sections_per_tick: 8,
            cache_capacity: 512,
        }
    }
}

/// Everything a worker knows. Rebuilt on `Reset`, dropped with the unit.
pub struct WorkerState {
    pub version: Option<String>,
    pub table: Arc<BlockStateTable>,
    pub world: World,
    pub epoch: u64,
    generations: HashMap<ColumnCoord, u64>,
    // FIFO with lazy removal: a popped coord is live only if still in `queued`.
    queue: VecDeque<SectionCoord>,
    queued: HashSet<SectionCoord>,
}

impl WorkerState {
    fn new(table: Arc<BlockStateTable>, cache_capacity: usize, version: Option<String>, epoch: u64) -> Self {
        Self {
            version,
            world: World::new(table.clone(), cache_capacity),
            table,
            epoch,
            generations: HashMap::new(),
            queue: VecDeque::new(),
            queued: HashSet::new(),
        }
    }

    pub fn queue_len(&self) -> usize {
        self.queued.len()
    }

    pub fn is_queued(&self, coord: SectionCoord) -> bool {
        self.queued.contains(&coord)
    }

    pub fn generation(&self, coord: ColumnCoord) -> Option<u64> {
        self.generations.get(&coord).copied()
    }
}

/// One mesh-generation unit: owns a world replica and its routed sections.
pub struct WorkerUnit {
    index: usize,
    config: WorkerConfig,
    state: WorkerState,
    mesher: Box<dyn Mesher>,
    events: Sender<WorkerEvent>,
}

impl WorkerUnit {
    pub fn new(
        index: usize,
        config: WorkerConfig,
        table: Arc<BlockStateTable>,
        mesher: Box<dyn Mesher>,
        events: Sender<WorkerEvent>,
    ) -> Self {
        let state = WorkerState::new(table, config.cache_capacity, None, 0);
        Self {
            index,
            config,
            state,
            mesher,
            events,
        }
    }

    #[inline]
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn state(&self) -> &WorkerState {
        &self.state
    }

    /// Applies one message. Returns `false` once the unit should stop.
    pub fn handle(&mut self, msg: WorkerMsg) -> bool {
        match msg {
            WorkerMsg::SetVersion(v) => {
                log::info!(target: "worker", "worker {} now on version {}", self.index, v);
                self.state.version = Some(v);
            }
            WorkerMsg::SetBlockStateTable(table) => {
                self.state.world.set_block_states(table.clone());
                self.state.table = table;
            }
            WorkerMsg::MarkDirty { coord, dirty: true } => {
                if self.state.queued.insert(coord) {
                    self.state.queue.push_back(coord);
                } else {
                    // already queued: merged into the pending build
                    self.complete(coord);
                }
            }
            WorkerMsg::MarkDirty { coord, dirty: false } => {
                if self.state.queued.remove(&coord) {
                    self.complete(coord);
                }
                self.complete(coord);
            }
            WorkerMsg::LoadColumn {
                coord,
                generation,
                payload,
            } => {
                if let Err(e) = self.state.world.add_column(coord, &payload) {
                    log::warn!(
                        target: "worker",
                        "worker {}: bad payload for column ({}, {}): {}",
                        self.index,
                        coord.cx,
                        coord.cz,
                        e
                    );
                    self.emit(WorkerEvent::ProtocolError {
                        worker: self.index,
                        epoch: self.state.epoch,
                        message: format!("column ({}, {}): {}", coord.cx, coord.cz, e),
                    });
                } else {
                    self.state.generations.insert(coord, generation);
                }
            }
            WorkerMsg::UnloadColumn { coord } => {
                self.state.world.remove_column(coord);
                self.state.generations.remove(&coord);
                let dropped: Vec<SectionCoord> = self
                    .state
                    .queued
                    .iter()
                    .filter(|c| c.column() == coord)
                    .copied()
                    .collect();
                for c in dropped {
                    self.state.queued.remove(&c);
                    self.complete(c);
                }
            }
            WorkerMsg::MutateBlock { pos, state } => {
                if !self.state.world.set_block_state_id(pos, state) {
                    log::debug!(target: "worker", "worker {}: mutation at {:?} in unloaded column", self.index, pos);
                }
            }
            WorkerMsg::Reset { epoch } => {
                let table = self.state.table.clone();
                let version = self.state.version.take();
                self.state = WorkerState::new(table, self.config.cache_capacity, version, epoch);
                log::debug!(target: "worker", "worker {} reset (epoch {})", self.index, epoch);
            }
            WorkerMsg::Terminate => return false,
        }
        true
    }

    /// Builds up to `max_sections_per_tick` queued sections; returns how many were drained.
    pub fn tick(&mut self) -> usize {
        let mut drained = 0;
        while drained < self.config.max_sections_per_tick {
            let Some(coord) = self.state.queue.pop_front() else {
                break;
            };
            if !self.state.queued.remove(&coord) {
                continue;
            }
            drained += 1;
            self.build(coord);
            self.complete(coord);
        }
        drained
    }

    fn build(&self, coord: SectionCoord) {
        let world = &self.state.world;
        let Some(generation) = self.state.generation(coord.column()) else {
            return;
        };
        let (worker, epoch) = (self.index, self.state.epoch);
        if !world.has_section(coord) {
            self.emit(WorkerEvent::GeometryReady {
                worker,
                epoch,
                generation,
                coord,
                geometry: SectionGeometry::new(coord.origin()),
            });
            return;
        }
        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            self.mesher.mesh(coord, world, &self.state.table)
        }));
        let event = match result {
            Ok(Ok(geometry)) => WorkerEvent::GeometryReady {
                worker,
                epoch,
                generation,
                coord,
                geometry,
            },
            Ok(Err(e)) => WorkerEvent::GenerationError {
                worker,
                epoch,
                coord,
                message: e.to_string(),
            },
            Err(payload) => WorkerEvent::GenerationError {
                worker,
                epoch,
                coord,
                message: panic_message(payload.as_ref()),
            },
        };
        self.emit(event);
    }

    fn complete(&self, coord: SectionCoord) {
        self.emit(WorkerEvent::SectionComplete {
            worker: self.index,
            epoch: self.state.epoch,
            coord,
        });
    }

    fn emit(&self, event: WorkerEvent) {
        if self.events.send(event).is_err() {
            log::debug!(target: "worker", "worker {}: event receiver gone", self.index);
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("mesher panicked: {s}")
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("mesher panicked: {s}")
    } else {
        "mesher panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::{Receiver, unbounded};
    use voxmesh_mesh_cpu::{CubeMesher, MesherError};
    use voxmesh_world::{BlockPos, Column, ColumnCoord};

    fn unit(max: usize) -> (WorkerUnit, Receiver<WorkerEvent>) {
        let (tx, rx) = unbounded();
        let config = WorkerConfig {
            max_sections_per_tick: max,
            cache_capacity: 16,
        };
        let table = Arc::new(BlockStateTable::builtin());
        (WorkerUnit::new(0, config, table, Box::new(CubeMesher), tx), rx)
    }

    fn payload(sections: usize) -> Arc<[u8]> {
        let mut col = Column::new(0, sections);
        for sy in 0..sections as i32 {
            col.section_mut_or_insert(sy).set(1, 1, 1, 1);
        }
        col.to_payload().encode().unwrap().into()
    }

    fn drain(rx: &Receiver<WorkerEvent>) -> Vec<WorkerEvent> {
        rx.try_iter().collect()
    }

    #[test]
    fn tick_respects_budget() {
        let (mut u, rx) = unit(2);
        u.handle(WorkerMsg::LoadColumn { coord: ColumnCoord::new(0, 0), generation: 1, payload: payload(3) });
        for sy in 0..3 {
            u.handle(WorkerMsg::MarkDirty { coord: SectionCoord::new(0, sy, 0), dirty: true });
        }
        assert_eq!(u.tick(), 2);
        assert_eq!(u.state().queue_len(), 1);
        let ev = drain(&rx);
        assert_eq!(ev.len(), 4);
        assert!(matches!(ev[0], WorkerEvent::GeometryReady { .. }));
        assert!(matches!(ev[1], WorkerEvent::SectionComplete { .. }));
        assert_eq!(u.tick(), 1);
        assert_eq!(u.tick(), 0);
    }

    #[test]
    fn unloaded_column_skips_geometry_but_completes() {
        let (mut u, rx) = unit(8);
        let c = SectionCoord::new(3, 0, 3);
        u.handle(WorkerMsg::MarkDirty { coord: c, dirty: true });
        u.tick();
        let ev = drain(&rx);
        assert_eq!(ev.len(), 1);
        assert!(matches!(ev[0], WorkerEvent::SectionComplete { coord, .. } if coord == c));
    }

    #[test]
    fn unload_drops_queue_with_completions() {
        let (mut u, rx) = unit(8);
        let col = ColumnCoord::new(0, 0);
        u.handle(WorkerMsg::LoadColumn { coord: col, generation: 1, payload: payload(2) });
        u.handle(WorkerMsg::MarkDirty { coord: col.section(0), dirty: true });
        u.handle(WorkerMsg::MarkDirty { coord: col.section(1), dirty: true });
        u.handle(WorkerMsg::UnloadColumn { coord: col });
        let ev = drain(&rx);
        assert_eq!(ev.len(), 2);
        assert!(ev.iter().all(|e| matches!(e, WorkerEvent::SectionComplete { .. })));
        assert_eq!(u.tick(), 0);
    }

    #[test]
    fn every_mark_dirty_gets_one_completion() {
        let (mut u, rx) = unit(8);
        let c = SectionCoord::new(0, 0, 0);
        u.handle(WorkerMsg::MarkDirty { coord: c, dirty: true });
        u.handle(WorkerMsg::MarkDirty { coord: c, dirty: true });
        u.handle(WorkerMsg::MarkDirty { coord: c, dirty: false });
        u.handle(WorkerMsg::MarkDirty { coord: c, dirty: false });
        u.tick();
        let completions = drain(&rx)
            .into_iter()
            .filter(|e| matches!(e, WorkerEvent::SectionComplete { .. }))
            .count();
        assert_eq!(completions, 4);
    }

    #[test]
    fn bad_payload_is_a_protocol_error() {
        let (mut u, rx) = unit(8);
        let bad: Arc<[u8]> = Arc::from(&[0xffu8, 0xff][..]);
        assert!(u.handle(WorkerMsg::LoadColumn { coord: ColumnCoord::new(0, 0), generation: 1, payload: bad }));
        assert!(matches!(drain(&rx).as_slice(), [WorkerEvent::ProtocolError { .. }]));
    }

    #[test]
    fn mesher_panic_becomes_generation_error() {
        let (tx, rx) = unbounded();
        let table = Arc::new(BlockStateTable::builtin());
        let mesher = |_: SectionCoord, _: &dyn WorldView, _: &BlockStateTable| -> Result<SectionGeometry, MesherError> {
            panic!("boom")
        };
        let mut u = WorkerUnit::new(3, WorkerConfig::default(), table, Box::new(mesher), tx);
        u.handle(WorkerMsg::LoadColumn { coord: ColumnCoord::new(0, 0), generation: 1, payload: payload(1) });
        u.handle(WorkerMsg::MarkDirty { coord: SectionCoord::new(0, 0, 0), dirty: true });
        u.tick();
        let ev = drain(&rx);
        match &ev[0] {
            WorkerEvent::GenerationError { worker, message, .. } => {
                assert_eq!(*worker, 3);
                assert!(message.contains("boom"));
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(matches!(ev[1], WorkerEvent::SectionComplete { .. }));
    }

    #[test]
    fn reset_keeps_table_and_version() {
        let (mut u, rx) = unit(8);
        u.handle(WorkerMsg::SetVersion("1.20".into()));
        u.handle(WorkerMsg::LoadColumn { coord: ColumnCoord::new(0, 0), generation: 1, payload: payload(1) });
        u.handle(WorkerMsg::MarkDirty { coord: SectionCoord::new(0, 0, 0), dirty: true });
        u.handle(WorkerMsg::Reset { epoch: 7 });
        assert_eq!(u.state().version.as_deref(), Some("1.20"));
        assert_eq!(u.state().queue_len(), 0);
        assert_eq!(u.state().world.column_count(), 0);
        assert!(!u.handle(WorkerMsg::Terminate));
        u.handle(WorkerMsg::MutateBlock { pos: BlockPos::new(0, 0, 0), state: 1 });
        u.handle(WorkerMsg::MarkDirty { coord: SectionCoord::new(0, 0, 0), dirty: false });
        assert!(drain(&rx).iter().all(|e| e.epoch() == 7));
    }

    #[test]
    fn geometry_carries_current_load_generation() {
        let (mut u, rx) = unit(8);
        let col = ColumnCoord::new(0, 0);
        u.handle(WorkerMsg::LoadColumn { coord: col, generation: 4, payload: payload(1) });
        u.handle(WorkerMsg::MarkDirty { coord: col.section(0), dirty: true });
        u.handle(WorkerMsg::UnloadColumn { coord: col });
        u.handle(WorkerMsg::LoadColumn { coord: col, generation: 9, payload: payload(1) });
        u.handle(WorkerMsg::MarkDirty { coord: col.section(0), dirty: true });
        u.tick();
        let gens: Vec<u64> = drain(&rx)
            .iter()
            .filter_map(|e| match e {
                WorkerEvent::GeometryReady { generation, .. } => Some(*generation),
                _ => None,
            })
            .collect();
        assert_eq!(gens, vec![9]);
        assert_eq!(u.state().generation(col), Some(9));
        u.handle(WorkerMsg::UnloadColumn { coord: col });
        assert_eq!(u.state().generation(col), None);
    }

    #[test]
    fn missing_subchunk_yields_empty_geometry() {
        let (mut u, rx) = unit(8);
        u.handle(WorkerMsg::LoadColumn { coord: ColumnCoord::new(0, 0), generation: 1, payload: payload(1) });
        u.handle(WorkerMsg::MarkDirty { coord: SectionCoord::new(0, 4, 0), dirty: true });
        u.tick();
        match &drain(&rx)[0] {
            WorkerEvent::GeometryReady { geometry, .. } => assert!(geometry.is_empty()),
            other => panic!("unexpected {other:?}"),
        }
    }
}
