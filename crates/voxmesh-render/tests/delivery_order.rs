use std::collections::VecDeque;
use std::sync::Arc;

use proptest::prelude::*;
use voxmesh_blocks::BlockStateTable;
use voxmesh_geom::Vec3;
use voxmesh_mesh_cpu::CubeMesher;
use voxmesh_render::{
    AtlasImage, Camera, CoordinatorConfig, HeadlessGpu, HeadlessScene, RenderCoordinator,
};
use voxmesh_runtime::{LocalTransport, Transport, WorkerConfig, WorkerEvent};
use voxmesh_world::{Column, ColumnCoord};

const WORKERS: usize = 3;

type Local = RenderCoordinator<LocalTransport, HeadlessGpu, HeadlessScene>;

fn coordinator() -> Local {
    let table = Arc::new(BlockStateTable::builtin());
    let transport = LocalTransport::new(WORKERS, WorkerConfig::default(), table.clone(), |_| {
        Box::new(CubeMesher)
    });
    RenderCoordinator::new(
        transport,
        HeadlessGpu::new(),
        HeadlessScene::new(),
        table,
        &AtlasImage::checker(16, 2),
        CoordinatorConfig {
            frustum_culling: false,
            ..Default::default()
        },
    )
    .unwrap()
}

fn payload() -> Arc<[u8]> {
    let mut col = Column::new(0, 2);
    col.section_mut_or_insert(0).set(2, 2, 2, 1);
    col.section_mut_or_insert(1).set(2, 2, 2, 3);
    col.to_payload().encode().unwrap().into()
}

fn short_payload() -> Arc<[u8]> {
    let mut col = Column::new(0, 1);
    col.section_mut_or_insert(0).set(2, 2, 2, 1);
    col.to_payload().encode().unwrap().into()
}

fn camera() -> Camera {
    Camera::new(Vec3::new(0.0, 30.0, -30.0), Vec3::ZERO)
}

/// Loads two neighbouring columns and returns every worker event, grouped per worker.
fn dispatched(c: &mut Local) -> Vec<VecDeque<WorkerEvent>> {
    c.load_column(ColumnCoord::new(0, 0), payload()).unwrap();
    c.load_column(ColumnCoord::new(1, 0), payload()).unwrap();
    c.tick(&camera());
    c.transport_mut().pump();
    let mut per_worker: Vec<VecDeque<WorkerEvent>> = (0..WORKERS).map(|_| VecDeque::new()).collect();
    for ev in c.transport().drain_events() {
        per_worker[ev.worker()].push_back(ev);
    }
    per_worker
}

/// Pops the next event from a worker picked by `choice`, keeping each worker's own order.
fn next(per_worker: &mut [VecDeque<WorkerEvent>], choice: u8) -> Option<WorkerEvent> {
    let live: Vec<usize> = (0..per_worker.len())
        .filter(|w| !per_worker[*w].is_empty())
        .collect();
    if live.is_empty() {
        return None;
    }
    per_worker[live[choice as usize % live.len()]].pop_front()
}

proptest! {
    #[test]
    fn any_cross_worker_interleaving_converges(choices in prop::collection::vec(any::<u8>(), 1..64)) {
        let mut c = coordinator();
        let mut per_worker = dispatched(&mut c);
        let mut i = 0;
        while let Some(ev) = next(&mut per_worker, choices[i % choices.len()]) {
            c.handle_event(ev);
            i += 1;
        }
        prop_assert!(c.dirty().is_idle());
        prop_assert_eq!(c.mesh_count(), 4);
        prop_assert_eq!(c.scene().len(), 4);
        prop_assert_eq!(c.gpu().live_buffers(), 4 * 5);
    }

    #[test]
    fn unload_mid_delivery_leaves_no_trace(
        choices in prop::collection::vec(any::<u8>(), 1..64),
        cut in 0usize..10,
    ) {
        let mut c = coordinator();
        let mut per_worker = dispatched(&mut c);
        let gone = ColumnCoord::new(1, 0);
        let mut i = 0;
        while let Some(ev) = next(&mut per_worker, choices[i % choices.len()]) {
            if i == cut {
                c.unload_column(gone);
            }
            c.handle_event(ev);
            i += 1;
        }
        if i <= cut {
            c.unload_column(gone);
        }
        prop_assert!(c.dirty().is_idle());
        prop_assert_eq!(c.mesh_count(), 2);
        prop_assert!(c.meshes().all(|m| m.coord().column() != gone));
        prop_assert_eq!(c.gpu().live_buffers(), 2 * 5);
    }

    #[test]
    fn reload_mid_delivery_installs_only_new_geometry(
        choices in prop::collection::vec(any::<u8>(), 1..64),
        cut in 0usize..10,
    ) {
        let mut c = coordinator();
        let mut per_worker = dispatched(&mut c);
        let moved = ColumnCoord::new(1, 0);
        let mut i = 0;
        while let Some(ev) = next(&mut per_worker, choices[i % choices.len()]) {
            if i == cut {
                c.unload_column(moved);
                c.load_column(moved, short_payload()).unwrap();
            }
            c.handle_event(ev);
            i += 1;
        }
        if i <= cut {
            c.unload_column(moved);
            c.load_column(moved, short_payload()).unwrap();
        }
        let mut ticks = 0;
        while !c.dirty().is_idle() {
            prop_assert!(ticks < 32);
            c.tick(&camera());
            ticks += 1;
        }
        prop_assert!(c.mesh(moved.section(1)).is_none());
        prop_assert!(c.mesh(moved.section(0)).is_some());
        prop_assert_eq!(c.mesh_count(), 3);
        prop_assert_eq!(c.gpu().live_buffers(), 3 * 5);
    }
}
