use std::collections::HashMap;
use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::{BiomeDef, BlocksConfig, StateDef, TexturesDef};
use crate::types::{AIR, Biome, BiomeId, BlockStateId, BlockStateInfo, Face, Shape};

#[derive(Debug, Error)]
pub enum BlocksError {
    #[error("reading block table: {0}")]
    Io(#[from] std::io::Error),
    #[error("parsing block table: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("block state id {id} defined twice ({first} and {second})")]
    DuplicateId {
        id: BlockStateId,
        first: String,
        second: String,
    },
    #[error("block state `{name}` has unknown shape `{shape}`")]
    UnknownShape { name: String, shape: String },
    #[error("state id 0 must be air, found `{0}`")]
    AirNotEmpty(String),
    #[error("unknown_state `{0}` is not defined")]
    MissingUnknownState(String),
}

/// Versioned block-state metadata. Immutable once built; shared as `Arc` with workers.
#[derive(Clone, Debug)]
pub struct BlockStateTable {
    states: Vec<Option<BlockStateInfo>>,
    by_name: HashMap<String, BlockStateId>,
    unknown: BlockStateInfo,
    biomes: HashMap<BiomeId, Biome>,
    default_biome: Biome,
    tiles_per_row: u32,
}

impl BlockStateTable {
    pub fn from_toml_str(s: &str) -> Result<Self, BlocksError> {
        let cfg: BlocksConfig = toml::from_str(s)?;
        Self::from_config(cfg)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, BlocksError> {
        let s = fs::read_to_string(path)?;
        Self::from_toml_str(&s)
    }

    pub fn from_config(cfg: BlocksConfig) -> Result<Self, BlocksError> {
        let mut states: Vec<Option<BlockStateInfo>> = Vec::new();
        let mut by_name = HashMap::new();
        for def in cfg.states {
            let id = def.id.unwrap_or(states.len().max(1) as u16);
            let info = compile_state(id, def)?;
            let slot = id as usize;
            if states.len() <= slot {
                states.resize(slot + 1, None);
            }
            if let Some(prev) = &states[slot] {
                return Err(BlocksError::DuplicateId {
                    id,
                    first: prev.name.clone(),
                    second: info.name,
                });
            }
            by_name.insert(info.name.clone(), id);
            states[slot] = Some(info);
        }
        if states.is_empty() {
            states.push(None);
        }
        if let Some(s) = states[0].as_ref().filter(|s| !s.is_air()) {
            return Err(BlocksError::AirNotEmpty(s.name.clone()));
        }
        if states[0].is_none() {
            states[0] = Some(BlockStateInfo::air());
        }
        by_name.entry("air".to_string()).or_insert(AIR);

        let unknown = match cfg.unknown_state {
            Some(name) => by_name
                .get(&name)
                .and_then(|id| states[*id as usize].clone())
                .ok_or(BlocksError::MissingUnknownState(name))?,
            None => BlockStateInfo::air(),
        };

        let biomes: HashMap<BiomeId, Biome> = cfg
            .biomes
            .into_iter()
            .map(|b| (b.id, compile_biome(b)))
            .collect();
        let default_biome = biomes
            .get(&cfg.default_biome)
            .cloned()
            .unwrap_or_else(|| {
                compile_biome(BiomeDef {
                    id: cfg.default_biome,
                    name: "default".into(),
                    grass_tint: [0.55, 0.74, 0.33],
                    foliage_tint: [0.47, 0.67, 0.26],
                })
            });

        Ok(Self {
            states,
            by_name,
            unknown,
            biomes,
            default_biome,
            tiles_per_row: cfg.atlas.tiles_per_row.max(1),
        })
    }

    /// Small table used when no block file is configured.
    pub fn builtin() -> Self {
        let cube = |id: BlockStateId, name: &str, top: u16, side: u16, bottom: u16| {
            let mut textures = [side; 6];
            textures[Face::PosY.index()] = top;
            textures[Face::NegY.index()] = bottom;
            BlockStateInfo {
                id,
                name: name.into(),
                shape: Shape::Cube,
                transparent: false,
                textures,
                tint: None,
            }
        };
        let mut grass = cube(3, "grass", 0, 3, 2);
        grass.tint = Some([0.55, 0.74, 0.33]);
        let mut glass = cube(4, "glass", 49, 49, 49);
        glass.transparent = true;
        let flower = BlockStateInfo {
            id: 5,
            name: "flower".into(),
            shape: Shape::Cross,
            transparent: true,
            textures: [12; 6],
            tint: None,
        };
        let slab = BlockStateInfo {
            shape: Shape::Slab,
            ..cube(6, "stone_slab", 6, 5, 6)
        };
        let list = vec![
            BlockStateInfo::air(),
            cube(1, "stone", 1, 1, 1),
            cube(2, "dirt", 2, 2, 2),
            grass,
            glass,
            flower,
            slab,
        ];
        let by_name = list.iter().map(|s| (s.name.clone(), s.id)).collect();
        let plains = Biome {
            id: 1,
            name: "plains".into(),
            grass_tint: [0.55, 0.74, 0.33],
            foliage_tint: [0.47, 0.67, 0.26],
        };
        Self {
            states: list.into_iter().map(Some).collect(),
            by_name,
            unknown: BlockStateInfo::air(),
            biomes: HashMap::from([(1, plains.clone())]),
            default_biome: plains,
            tiles_per_row: 16,
        }
    }

    #[inline]
    pub fn get(&self, id: BlockStateId) -> Option<&BlockStateInfo> {
        self.states.get(id as usize).and_then(|s| s.as_ref())
    }

    /// Like `get`, falling back to the table's unknown-state entry.
    #[inline]
    pub fn lookup(&self, id: BlockStateId) -> &BlockStateInfo {
        self.get(id).unwrap_or(&self.unknown)
    }

    pub fn id_by_name(&self, name: &str) -> Option<BlockStateId> {
        self.by_name.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.states.iter().filter(|s| s.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    pub fn default_biome_id(&self) -> BiomeId {
        self.default_biome.id
    }

    /// Resolves a column biome value; undefined or unknown ids use the default biome.
    pub fn biome(&self, id: Option<BiomeId>) -> &Biome {
        id.and_then(|id| self.biomes.get(&id))
            .unwrap_or(&self.default_biome)
    }

    #[inline]
    pub fn tiles_per_row(&self) -> u32 {
        self.tiles_per_row
    }

    /// `[u0, v0, u1, v1]` for an atlas tile index.
    pub fn tile_uv(&self, tile: u16) -> [f32; 4] {
        let n = self.tiles_per_row;
        let step = 1.0 / n as f32;
        let col = (tile as u32 % n) as f32;
        let row = (tile as u32 / n) as f32;
        [col * step, row * step, (col + 1.0) * step, (row + 1.0) * step]
    }
}

fn compile_state(id: BlockStateId, def: StateDef) -> Result<BlockStateInfo, BlocksError> {
    let shape = match def.shape.as_deref() {
        None => Shape::Cube,
        Some(s) => Shape::from_name(s).ok_or_else(|| BlocksError::UnknownShape {
            name: def.name.clone(),
            shape: s.to_string(),
        })?,
    };
    let textures = compile_textures(def.textures.unwrap_or_default());
    Ok(BlockStateInfo {
        id,
        transparent: def
            .transparent
            .unwrap_or(matches!(shape, Shape::Empty | Shape::Cross)),
        name: def.name,
        shape,
        textures,
        tint: def.tint,
    })
}

fn compile_textures(t: TexturesDef) -> [u16; 6] {
    let mut out = [t.all.unwrap_or(0); 6];
    if let Some(side) = t.side {
        for f in [Face::PosX, Face::NegX, Face::PosZ, Face::NegZ] {
            out[f.index()] = side;
        }
    }
    if let Some(top) = t.top {
        out[Face::PosY.index()] = top;
    }
    if let Some(bottom) = t.bottom {
        out[Face::NegY.index()] = bottom;
    }
    out
}

fn compile_biome(b: BiomeDef) -> Biome {
    Biome {
        id: b.id,
        name: b.name,
        grass_tint: b.grass_tint,
        foliage_tint: b.foliage_tint,
    }
}
