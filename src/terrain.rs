use std::sync::Arc;

use fastnoise_lite::{FastNoiseLite, NoiseType};
use rayon::prelude::*;
use voxmesh_blocks::{AIR, BlockStateId, BlockStateTable};
use voxmesh_world::{Column, ColumnCoord, PayloadError, SECTION_SIZE};

use crate::config::WorldConfig;

/// Block ids the generator places, resolved by name from the active table.
#[derive(Clone, Copy, Debug)]
pub struct Palette {
    pub stone: BlockStateId,
    pub dirt: BlockStateId,
    pub grass: BlockStateId,
    pub flower: BlockStateId,
}

impl Palette {
    pub fn from_table(table: &BlockStateTable) -> Self {
        let id = |name: &str, fallback: BlockStateId| table.id_by_name(name).unwrap_or(fallback);
        let stone = id("stone", 1);
        Self {
            stone,
            dirt: id("dirt", stone),
            grass: id("grass", stone),
            flower: id("flower", AIR),
        }
    }
}

/// Heightmap terrain: grass over three dirt over stone, sparse flowers on top.
pub struct Terrain {
    cfg: WorldConfig,
    seed: i32,
    palette: Palette,
}

impl Terrain {
    pub fn new(cfg: WorldConfig, seed: i32, palette: Palette) -> Self {
        Self { cfg, seed, palette }
    }

    fn noise(&self) -> FastNoiseLite {
        let mut noise = FastNoiseLite::with_seed(self.seed);
        noise.set_noise_type(Some(NoiseType::OpenSimplex2));
        noise.set_frequency(Some(self.cfg.frequency));
        noise
    }

    pub fn height_at(&self, noise: &FastNoiseLite, x: i32, z: i32) -> i32 {
        let h = noise.get_noise_2d(x as f32, z as f32);
        let min_y = self.cfg.min_section_y * SECTION_SIZE + 1;
        (self.cfg.base_height + (h * self.cfg.amplitude as f32) as i32).max(min_y)
    }

    pub fn column(&self, coord: ColumnCoord) -> Column {
        let noise = self.noise();
        let mut col = Column::new(self.cfg.min_section_y, self.cfg.section_count);
        let bottom = self.cfg.min_section_y * SECTION_SIZE;
        let (x0, z0) = coord.origin();
        for z in 0..16usize {
            for x in 0..16usize {
                let (wx, wz) = (x0 + x as i32, z0 + z as i32);
                let height = self.height_at(&noise, wx, wz);
                for y in bottom..height {
                    let state = if y == height - 1 {
                        self.palette.grass
                    } else if y + 4 >= height {
                        self.palette.dirt
                    } else {
                        self.palette.stone
                    };
                    col.section_mut_or_insert(y.div_euclid(SECTION_SIZE))
                        .set(x, y.rem_euclid(SECTION_SIZE) as usize, z, state);
                }
                if self.palette.flower != AIR && flower_hash(self.seed, wx, wz) % 23 == 0 {
                    col.section_mut_or_insert(height.div_euclid(SECTION_SIZE)).set(
                        x,
                        height.rem_euclid(SECTION_SIZE) as usize,
                        z,
                        self.palette.flower,
                    );
                }
            }
        }
        col
    }

    /// Encodes every column of the square `radius` around the origin, in parallel.
    pub fn payloads(&self, radius: i32) -> Result<Vec<(ColumnCoord, Arc<[u8]>)>, PayloadError> {
        let coords: Vec<ColumnCoord> = (-radius..=radius)
            .flat_map(|cz| (-radius..=radius).map(move |cx| ColumnCoord::new(cx, cz)))
            .collect();
        coords
            .par_iter()
            .map(|&c| -> Result<(ColumnCoord, Arc<[u8]>), PayloadError> {
                let bytes = self.column(c).to_payload().encode()?;
                Ok((c, Arc::from(bytes)))
            })
            .collect()
    }

    /// Surface height at the center of `coord`.
    pub fn center_height(&self, coord: ColumnCoord) -> i32 {
        let (x0, z0) = coord.origin();
        self.height_at(&self.noise(), x0 + 8, z0 + 8)
    }
}

fn flower_hash(seed: i32, x: i32, z: i32) -> u32 {
    let mut h = (seed as u32).wrapping_mul(0x9e37_79b9);
    h ^= (x as u32).wrapping_mul(0x85eb_ca6b);
    h = h.rotate_left(13);
    h ^= (z as u32).wrapping_mul(0xc2b2_ae35);
    h ^ (h >> 16)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn terrain() -> Terrain {
        let table = BlockStateTable::builtin();
        Terrain::new(WorldConfig::default(), 7, Palette::from_table(&table))
    }

    #[test]
    fn surface_is_grass_over_dirt() {
        let t = terrain();
        let coord = ColumnCoord::new(2, -1);
        let col = t.column(coord);
        let (x0, z0) = coord.origin();
        let h = t.height_at(&t.noise(), x0 + 3, z0 + 5);
        assert_eq!(col.state(3, h - 1, 5), t.palette.grass);
        assert_eq!(col.state(3, h - 2, 5), t.palette.dirt);
        assert_eq!(col.state(3, 0, 5), t.palette.stone);
        assert_eq!(col.state(3, h + 1, 5), AIR);
    }

    #[test]
    fn generation_is_deterministic() {
        let t = terrain();
        let a = t.column(ColumnCoord::new(0, 0)).to_payload().encode().unwrap();
        let b = t.column(ColumnCoord::new(0, 0)).to_payload().encode().unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn sky_sections_stay_absent() {
        let t = terrain();
        let col = t.column(ColumnCoord::new(0, 0));
        // default terrain never exceeds y=56, so the top section is never allocated
        assert!(col.section(5).is_none());
        assert!(col.section(0).is_some());
    }

    #[test]
    fn payloads_cover_square() {
        let t = terrain();
        let p = t.payloads(1).unwrap();
        assert_eq!(p.len(), 9);
        assert!(p.iter().any(|(c, _)| *c == ColumnCoord::new(-1, 1)));
    }
}
