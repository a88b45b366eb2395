use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("reading {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("parsing pipeline config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid pipeline config: {0}")]
    Invalid(String),
}

#[derive(Clone, Debug, Deserialize)]
pub struct PipelineConfig {
    #[serde(default = "default_workers")] pub workers: usize,
    #[serde(default = "default_tick_ms")] pub tick_ms: u64,
    #[serde(default = "default_max_sections")] pub max_sections_per_tick: usize,
    #[serde(default = "default_cache_capacity")] pub cache_capacity: usize,
    #[serde(default = "default_true")] pub frustum_culling: bool,
    #[serde(default = "default_radius")] pub radius: i32,
    #[serde(default = "default_seed")] pub seed: i32,
    #[serde(default = "default_version")] pub version: String,
    #[serde(default)] pub blocks: Option<PathBuf>,
    #[serde(default)] pub world: WorldConfig,
}

#[derive(Clone, Debug, Deserialize)]
pub struct WorldConfig {
    #[serde(default)] pub min_section_y: i32,
    #[serde(default = "default_section_count")] pub section_count: usize,
    #[serde(default = "default_base_height")] pub base_height: i32,
    #[serde(default = "default_amplitude")] pub amplitude: i32,
    #[serde(default = "default_frequency")] pub frequency: f32,
}

fn default_workers() -> usize { 4 }
fn default_tick_ms() -> u64 { 16 }
fn default_max_sections() -> usize { 8 }
fn default_cache_capacity() -> usize { 512 }
fn default_true() -> bool { true }
fn default_radius() -> i32 { 3 }
fn default_seed() -> i32 { 1337 }
fn default_version() -> String { "1.20".into() }
fn default_section_count() -> usize { 6 }
fn default_base_height() -> i32 { 40 }
fn default_amplitude() -> i32 { 16 }
fn default_frequency() -> f32 { 0.02 }

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            min_section_y: 0,
            section_count: default_section_count(),
            base_height: default_base_height(),
            amplitude: default_amplitude(),
            frequency: default_frequency(),
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            tick_ms: default_tick_ms(),
            max_sections_per_tick: default_max_sections(),
            cache_capacity: default_cache_capacity(),
            frustum_culling: true,
            radius: default_radius(),
            seed: default_seed(),
            version: default_version(),
            blocks: None,
            world: WorldConfig::default(),
        }
    }
}

impl PipelineConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let cfg: PipelineConfig = toml::from_str(s)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Reads `path`; a missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            log::info!("no config at {}; using defaults", path.display());
            return Ok(Self::default());
        }
        let s = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&s)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.workers == 0 {
            return Err(ConfigError::Invalid("workers must be at least 1".into()));
        }
        if self.world.section_count == 0 {
            return Err(ConfigError::Invalid("world.section_count must be at least 1".into()));
        }
        if self.radius < 0 {
            return Err(ConfigError::Invalid(format!("radius {} is negative", self.radius)));
        }
        let top = (self.world.min_section_y + self.world.section_count as i32) * 16;
        if self.world.base_height + self.world.amplitude >= top {
            return Err(ConfigError::Invalid(format!(
                "terrain reaches y={} but the column tops out at {}",
                self.world.base_height + self.world.amplitude,
                top
            )));
        }
        Ok(())
    }
}
