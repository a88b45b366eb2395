//! Block-state metadata, biomes, and the block-state table shared with mesh workers.
#![forbid(unsafe_code)]

pub mod config;
pub mod table;
pub mod types;

pub use table::{BlocksError, BlockStateTable};
pub use types::{AIR, Biome, BiomeId, BlockStateId, BlockStateInfo, Face, Shape};
