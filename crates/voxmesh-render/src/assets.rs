use std::path::PathBuf;
use std::sync::Arc;

use hashbrown::HashMap;
use thiserror::Error;
use voxmesh_blocks::{BlockStateTable, BlocksError};

use crate::gpu::AtlasImage;

#[derive(Debug, Error)]
pub enum AssetError {
    #[error("no assets for version `{0}`")]
    UnknownVersion(String),
    #[error(transparent)]
    Blocks(#[from] BlocksError),
}

/// Block-state table and texture atlas per data version.
pub trait AssetSource {
    fn block_states(&self, version: &str) -> Result<Arc<BlockStateTable>, AssetError>;
    fn atlas(&self, version: &str) -> Result<AtlasImage, AssetError>;
}

/// Fixed in-memory assets keyed by version.
#[derive(Debug, Default)]
pub struct StaticAssets {
    versions: HashMap<String, (Arc<BlockStateTable>, AtlasImage)>,
}

impl StaticAssets {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_version(mut self, version: impl Into<String>, table: Arc<BlockStateTable>, atlas: AtlasImage) -> Self {
        self.versions.insert(version.into(), (table, atlas));
        self
    }

    pub fn insert(&mut self, version: impl Into<String>, table: Arc<BlockStateTable>, atlas: AtlasImage) {
        self.versions.insert(version.into(), (table, atlas));
    }
}

impl AssetSource for StaticAssets {
    fn block_states(&self, version: &str) -> Result<Arc<BlockStateTable>, AssetError> {
        self.versions
            .get(version)
            .map(|(t, _)| t.clone())
            .ok_or_else(|| AssetError::UnknownVersion(version.to_string()))
    }

    fn atlas(&self, version: &str) -> Result<AtlasImage, AssetError> {
        self.versions
            .get(version)
            .map(|(_, a)| a.clone())
            .ok_or_else(|| AssetError::UnknownVersion(version.to_string()))
    }
}

/// Block table read from a TOML file on every request; the atlas is generated
/// from the table's atlas layout since image decoding is out of scope.
#[derive(Debug, Clone)]
pub struct FileAssets {
    pub blocks_path: PathBuf,
    pub tile_px: u32,
}

impl FileAssets {
    pub fn new(blocks_path: impl Into<PathBuf>) -> Self {
        Self {
            blocks_path: blocks_path.into(),
            tile_px: 16,
        }
    }
}

impl AssetSource for FileAssets {
    fn block_states(&self, _version: &str) -> Result<Arc<BlockStateTable>, AssetError> {
        Ok(Arc::new(BlockStateTable::from_path(&self.blocks_path)?))
    }

    fn atlas(&self, version: &str) -> Result<AtlasImage, AssetError> {
        let table = self.block_states(version)?;
        Ok(AtlasImage::checker(table.tiles_per_row(), self.tile_px))
    }
}
