//! Column/section storage, coordinates, payload decoding, and the block-state cache.
#![forbid(unsafe_code)]

pub mod column;
pub mod coord;
pub mod lru;
pub mod section;
pub mod world;

pub use column::{Column, ColumnPayload, PayloadError};
pub use coord::{BlockPos, ColumnCoord, SECTION_SIZE, SECTION_VOLUME, SectionCoord};
pub use lru::{CacheStats, LruCache};
pub use section::Section;
pub use world::{BlockDescriptor, World, WorldView};
