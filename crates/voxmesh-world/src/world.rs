use std::sync::Arc;

use hashbrown::HashMap;
use voxmesh_blocks::{AIR, BiomeId, BlockStateId, BlockStateInfo, BlockStateTable};

use crate::column::{Column, PayloadError};
use crate::coord::{BlockPos, ColumnCoord, SectionCoord};
use crate::lru::{CacheStats, LruCache};

/// Read-only world access handed to meshers.
pub trait WorldView {
    /// `None` when the owning column is not loaded.
    fn state_at(&self, pos: BlockPos) -> Option<BlockStateId>;
    /// Raw biome value stored in the column, if any.
    fn biome_at(&self, pos: BlockPos) -> Option<BiomeId>;
    fn has_section(&self, coord: SectionCoord) -> bool;
}

#[derive(Clone, Debug, PartialEq)]
pub struct BlockDescriptor {
    pub state: BlockStateId,
    pub info: Arc<BlockStateInfo>,
    pub biome: BiomeId,
}

pub struct World {
    columns: HashMap<ColumnCoord, Column>,
    table: Arc<BlockStateTable>,
    cache: LruCache<BlockStateId, Arc<BlockStateInfo>>,
}

impl World {
    pub fn new(table: Arc<BlockStateTable>, cache_capacity: usize) -> Self {
        Self {
            columns: HashMap::new(),
            table,
            cache: LruCache::new(cache_capacity),
        }
    }

    pub fn block_states(&self) -> &Arc<BlockStateTable> {
        &self.table
    }

    /// Swaps the block-state table; cached metadata belongs to the old table and is dropped.
    pub fn set_block_states(&mut self, table: Arc<BlockStateTable>) {
        self.table = table;
        self.cache.clear();
    }

    /// Decodes `payload` and stores it at `coord`, replacing any previous column.
    pub fn add_column(&mut self, coord: ColumnCoord, payload: &[u8]) -> Result<&Column, PayloadError> {
        let column = Column::decode(payload)?;
        Ok(self.insert_column(coord, column))
    }

    pub fn insert_column(&mut self, coord: ColumnCoord, column: Column) -> &Column {
        if self.columns.contains_key(&coord) {
            log::debug!(target: "world", "replacing column ({}, {})", coord.cx, coord.cz);
        }
        self.columns.insert(coord, column);
        &self.columns[&coord]
    }

    pub fn remove_column(&mut self, coord: ColumnCoord) -> Option<Column> {
        self.columns.remove(&coord)
    }

    #[inline]
    pub fn column(&self, coord: ColumnCoord) -> Option<&Column> {
        self.columns.get(&coord)
    }

    #[inline]
    pub fn has_column(&self, coord: ColumnCoord) -> bool {
        self.columns.contains_key(&coord)
    }

    pub fn column_coords(&self) -> impl Iterator<Item = ColumnCoord> + '_ {
        self.columns.keys().copied()
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Full descriptor for a position; `None` if the column is not loaded.
    pub fn get_block(&mut self, pos: BlockPos) -> Option<BlockDescriptor> {
        let state = self.state_at(pos)?;
        let biome = self.table.biome(self.biome_at(pos)).id;
        let info = self.state_info(state);
        Some(BlockDescriptor { state, info, biome })
    }

    /// Cached metadata for a block-state id.
    pub fn state_info(&mut self, state: BlockStateId) -> Arc<BlockStateInfo> {
        if let Some(info) = self.cache.get(&state) {
            return Arc::clone(info);
        }
        let info = Arc::new(self.table.lookup(state).clone());
        self.cache.insert(state, Arc::clone(&info));
        info
    }

    /// Returns `false` when the column is not loaded.
    pub fn set_block_state_id(&mut self, pos: BlockPos, state: BlockStateId) -> bool {
        let Some(column) = self.columns.get_mut(&pos.column()) else {
            return false;
        };
        let (lx, ly, lz) = pos.local();
        let sy = pos.section().sy;
        if state == AIR && column.section(sy).is_none() {
            return true;
        }
        column.section_mut_or_insert(sy).set(lx, ly, lz, state);
        true
    }

    /// Drops all columns and cached metadata.
    pub fn clear(&mut self) {
        self.columns.clear();
        self.cache.clear();
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }
}

impl WorldView for World {
    fn state_at(&self, pos: BlockPos) -> Option<BlockStateId> {
        let column = self.columns.get(&pos.column())?;
        let (lx, _, lz) = pos.local();
        Some(column.state(lx, pos.y, lz))
    }

    fn biome_at(&self, pos: BlockPos) -> Option<BiomeId> {
        let column = self.columns.get(&pos.column())?;
        let (lx, _, lz) = pos.local();
        column.biome(lx, lz)
    }

    fn has_section(&self, coord: SectionCoord) -> bool {
        self.columns
            .get(&coord.column())
            .is_some_and(|c| c.section(coord.sy).is_some())
    }
}
