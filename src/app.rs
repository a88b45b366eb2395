use std::error::Error;
use std::time::{Duration, Instant};

use hashbrown::HashMap;
use voxmesh_blocks::AIR;
use voxmesh_geom::Vec3;
use voxmesh_mesh_cpu::CubeMesher;
use voxmesh_render::{
    AssetSource, Camera, CoordinatorConfig, CoordinatorStats, CullStats, HeadlessGpu, HeadlessScene,
    RenderCoordinator,
};
use voxmesh_runtime::{ThreadTransport, WorkerConfig};
use voxmesh_world::{BlockPos, ColumnCoord, PayloadError};

use crate::config::PipelineConfig;
use crate::event::{Event, EventEnvelope, EventQueue};
use crate::terrain::{Palette, Terrain};
use crate::watchers::FileWatch;

const COLUMNS_PER_TICK: usize = 4;
const SETTLE_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug)]
pub struct RunReport {
    pub frames: u64,
    pub ready: bool,
    pub stats: CoordinatorStats,
    pub elapsed: Duration,
}

/// Headless driver: streams generated columns through the pipeline and orbits a camera over them.
pub struct App {
    coord: RenderCoordinator<ThreadTransport, HeadlessGpu, HeadlessScene>,
    queue: EventQueue,
    assets: Box<dyn AssetSource>,
    watch: Option<FileWatch>,
    config: PipelineConfig,
    surface: HashMap<ColumnCoord, i32>,
    angle: f32,
    frames: u64,
}

impl App {
    pub fn new(
        config: PipelineConfig,
        assets: Box<dyn AssetSource>,
        watch: Option<FileWatch>,
    ) -> Result<Self, Box<dyn Error>> {
        let table = assets.block_states(&config.version)?;
        let atlas = assets.atlas(&config.version)?;
        let worker_config = WorkerConfig {
            max_sections_per_tick: config.max_sections_per_tick,
            cache_capacity: config.cache_capacity,
        };
        let transport = ThreadTransport::spawn(
            config.workers,
            worker_config,
            table.clone(),
            Duration::from_millis(config.tick_ms),
            |_| Box::new(CubeMesher),
        )?;
        let mut coord = RenderCoordinator::new(
            transport,
            HeadlessGpu::new(),
            HeadlessScene::new(),
            table,
            &atlas,
            CoordinatorConfig {
                cache_capacity: config.cache_capacity,
                frustum_culling: config.frustum_culling,
            },
        )?;
        coord.set_version(&config.version, assets.as_ref())?;
        Ok(Self {
            coord,
            queue: EventQueue::new(),
            assets,
            watch,
            config,
            surface: HashMap::new(),
            angle: 0.0,
            frames: 0,
        })
    }

    /// Queues column loads (nearest first), a few edits, and an unload/reload of one corner.
    pub fn schedule_demo(&mut self) -> Result<usize, PayloadError> {
        let table = self.coord.world().block_states().clone();
        let terrain = Terrain::new(
            self.config.world.clone(),
            self.config.seed,
            Palette::from_table(&table),
        );
        let mut payloads = terrain.payloads(self.config.radius)?;
        payloads.sort_by_key(|(c, _)| c.cx * c.cx + c.cz * c.cz);
        for (i, (c, p)) in payloads.iter().enumerate() {
            self.surface.insert(*c, terrain.center_height(*c));
            self.queue.emit_after(
                (i / COLUMNS_PER_TICK) as u64,
                Event::LoadColumn {
                    coord: *c,
                    payload: p.clone(),
                },
            );
        }
        let loaded = (payloads.len() / COLUMNS_PER_TICK) as u64 + 1;

        // glass pillar on the x/z seam of the origin column
        let glass = table.id_by_name("glass").unwrap_or(1);
        let h = self.surface.get(&ColumnCoord::new(0, 0)).copied().unwrap_or(0);
        for dy in 0..4 {
            self.queue.emit_after(
                loaded + 10 + dy as u64,
                Event::MutateBlock {
                    pos: BlockPos::new(15, h + dy, 0),
                    state: glass,
                },
            );
        }
        self.queue.emit_after(
            loaded + 20,
            Event::MutateBlock {
                pos: BlockPos::new(8, h - 1, 8),
                state: AIR,
            },
        );

        let r = self.config.radius;
        if r > 0 {
            let corner = ColumnCoord::new(r, r);
            if let Some((_, p)) = payloads.iter().find(|(c, _)| *c == corner) {
                self.queue
                    .emit_after(loaded + 2, Event::UnloadColumn { coord: corner });
                self.queue.emit_after(
                    loaded + 40,
                    Event::LoadColumn {
                        coord: corner,
                        payload: p.clone(),
                    },
                );
            }
        }
        Ok(payloads.len())
    }

    fn handle_event(&mut self, env: EventEnvelope) {
        match env.kind {
            Event::LoadColumn { coord, payload } => {
                log::trace!("tick {}: load ({}, {})", env.tick, coord.cx, coord.cz);
                if let Err(e) = self.coord.load_column(coord, payload) {
                    log::warn!("column ({}, {}) rejected: {}", coord.cx, coord.cz, e);
                }
            }
            Event::UnloadColumn { coord } => {
                log::trace!("tick {}: unload ({}, {})", env.tick, coord.cx, coord.cz);
                self.coord.unload_column(coord);
            }
            Event::MutateBlock { pos, state } => {
                if !self.coord.mutate_block(pos, state) {
                    log::debug!("mutation at {:?} ignored: column not loaded", pos);
                }
            }
            Event::ReloadAssets => match self.coord.reload_assets(self.assets.as_ref()) {
                Ok(()) => log::info!("block states reloaded"),
                Err(e) => log::warn!("asset reload failed: {}", e),
            },
        }
    }

    fn camera(&self) -> Camera {
        let y = self
            .surface
            .get(&ColumnCoord::new(0, 0))
            .copied()
            .unwrap_or(self.config.world.base_height) as f32;
        let reach = (self.config.radius as f32 + 1.0) * 16.0;
        Camera::orbit(Vec3::new(8.0, y, 8.0), reach, reach * 0.5, self.angle)
    }

    /// One frame: scheduled events, then a coordinator tick against the orbiting camera.
    pub fn step(&mut self) -> CullStats {
        if self.watch.as_ref().is_some_and(FileWatch::changed) {
            self.queue.emit_now(Event::ReloadAssets);
        }
        while let Some(env) = self.queue.pop_ready() {
            self.handle_event(env);
        }
        self.queue.advance_tick();
        self.angle += 0.01;
        self.frames += 1;
        let camera = self.camera();
        self.coord.tick(&camera)
    }

    /// Runs `frames` frames, then keeps ticking until scheduled work has settled.
    pub fn run(&mut self, frames: u64) -> RunReport {
        let start = Instant::now();
        let frame = Duration::from_millis(self.config.tick_ms.max(1));
        for f in 0..frames {
            let cull = self.step();
            if f % 60 == 0 {
                let s = self.coord.stats();
                log::info!(
                    "frame {}: {} meshes, {} outstanding, {}/{} visible",
                    f,
                    s.meshes,
                    s.outstanding,
                    cull.visible,
                    cull.total
                );
            }
            std::thread::sleep(frame);
        }
        let deadline = Instant::now() + SETTLE_TIMEOUT;
        while !self.queue.is_empty() && Instant::now() < deadline {
            self.step();
            std::thread::sleep(frame);
        }
        let mut wait = self.coord.wait_for_chunks_to_render();
        while !wait.is_ready() && Instant::now() < deadline {
            self.step();
            std::thread::sleep(frame);
        }
        let ready = wait.is_ready();
        if !ready {
            log::warn!("gave up waiting for {} outstanding sections", self.coord.dirty().outstanding_len());
        }
        RunReport {
            frames: self.frames,
            ready,
            stats: self.coord.stats(),
            elapsed: start.elapsed(),
        }
    }

    /// Tears the pipeline down; returns the number of GPU handles still alive.
    pub fn shutdown(mut self) -> usize {
        self.coord.dispose();
        let leaked = self.coord.gpu().live_handles();
        let d = self.coord.dispose_stats();
        log::info!(
            "released {} meshes, {} buffers, {} textures, {} materials",
            d.meshes,
            d.buffers,
            d.textures,
            d.materials
        );
        if leaked > 0 {
            log::error!("{} GPU handles leaked", leaked);
        }
        leaked
    }
}
