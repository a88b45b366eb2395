use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use voxmesh_blocks::BlockStateTable;
use voxmesh_render::{AssetSource, AtlasImage, FileAssets, StaticAssets};

mod app;
mod assets;
mod config;
mod event;
mod terrain;
mod watchers;

use app::App;
use config::PipelineConfig;
use watchers::FileWatch;

#[derive(Parser, Debug)]
#[command(name = "voxmesh", about = "Headless voxel meshing pipeline driver")]
struct Cli {
    /// Pipeline config file
    #[arg(long, default_value = "voxmesh.toml")]
    config: PathBuf,
    #[arg(long)]
    workers: Option<usize>,
    /// Columns generated in each direction from the origin
    #[arg(long)]
    radius: Option<i32>,
    /// Data version to load block states for
    #[arg(long = "version", value_name = "VERSION")]
    data_version: Option<String>,
    /// Block state table (TOML); defaults to assets/blocks.toml, then the builtin table
    #[arg(long)]
    blocks: Option<PathBuf>,
    /// Assets root directory
    #[arg(long)]
    assets: Option<PathBuf>,
    /// Reload block states when the file changes
    #[arg(long)]
    watch: bool,
    #[arg(long, default_value_t = 240)]
    frames: u64,
    /// Log filter, e.g. `info,coordinator=debug`; overrides RUST_LOG
    #[arg(long)]
    log: Option<String>,
}

fn init_logging(filter: Option<&str>) {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if let Some(f) = filter {
        builder.parse_filters(f);
    }
    builder.format_timestamp_millis().init();
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    init_logging(cli.log.as_deref());

    let mut config = PipelineConfig::load(&cli.config)?;
    if let Some(w) = cli.workers {
        config.workers = w;
    }
    if let Some(r) = cli.radius {
        config.radius = r;
    }
    if let Some(v) = cli.data_version.clone() {
        config.version = v;
    }
    config.validate()?;

    let root = assets::resolve_assets_root(cli.assets.clone());
    let blocks = cli
        .blocks
        .clone()
        .or_else(|| config.blocks.clone())
        .or_else(|| Some(assets::blocks_path(&root)).filter(|p| p.exists()));
    let (source, watch): (Box<dyn AssetSource>, Option<FileWatch>) = match blocks {
        Some(path) => {
            log::info!("block states from {}", path.display());
            let watch = if cli.watch {
                FileWatch::new(&path)
                    .map_err(|e| log::warn!("cannot watch {}: {}", path.display(), e))
                    .ok()
            } else {
                None
            };
            (Box::new(FileAssets::new(path)), watch)
        }
        None => {
            log::info!("no block file found; using builtin block states");
            let assets = StaticAssets::new().with_version(
                config.version.clone(),
                Arc::new(BlockStateTable::builtin()),
                AtlasImage::checker(16, 16),
            );
            (Box::new(assets), None)
        }
    };

    log::info!(
        "{} workers, radius {}, version {}",
        config.workers,
        config.radius,
        config.version
    );
    let mut app = App::new(config, source, watch)?;
    let columns = app.schedule_demo()?;
    log::info!("scheduled {} columns", columns);

    let report = app.run(cli.frames);
    let s = report.stats;
    println!(
        "{} frames in {:.2?}; settled: {}",
        report.frames, report.elapsed, report.ready
    );
    println!(
        "meshes {} | columns {} | installed {} replaced {} empty {} | stale {} results {} events | errors gen {} protocol {} upload {} | visible {}/{}",
        s.meshes,
        s.loaded_columns,
        s.installed,
        s.replaced,
        s.empty_results,
        s.stale_results,
        s.stale_events,
        s.generation_errors,
        s.protocol_errors,
        s.upload_errors,
        s.visible,
        s.total
    );

    let leaked = app.shutdown();
    if leaked > 0 {
        return Err(format!("{leaked} GPU handles leaked").into());
    }
    println!("teardown clean");
    Ok(())
}
