use serde::Deserialize;

#[derive(Clone, Debug, Deserialize)]
pub struct BlocksConfig {
    #[serde(default)]
    pub atlas: AtlasConfig,
    pub states: Vec<StateDef>,
    /// Name of the state used for ids missing from the table.
    #[serde(default)]
    pub unknown_state: Option<String>,
    #[serde(default)]
    pub biomes: Vec<BiomeDef>,
    #[serde(default = "default_biome")]
    pub default_biome: u16,
}

fn default_biome() -> u16 {
    1
}

#[derive(Clone, Debug, Deserialize)]
pub struct AtlasConfig {
    #[serde(default = "default_tiles_per_row")]
    pub tiles_per_row: u32,
}

fn default_tiles_per_row() -> u32 {
    16
}

impl Default for AtlasConfig {
    fn default() -> Self {
        Self {
            tiles_per_row: default_tiles_per_row(),
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct StateDef {
    pub name: String,
    #[serde(default)]
    pub id: Option<u16>,
    #[serde(default)]
    pub shape: Option<String>,
    #[serde(default)]
    pub transparent: Option<bool>,
    #[serde(default)]
    pub textures: Option<TexturesDef>,
    #[serde(default)]
    pub tint: Option<[f32; 3]>,
}

/// Atlas tiles: `all` applies first, then `side`, then `top`/`bottom` override.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct TexturesDef {
    pub all: Option<u16>,
    pub top: Option<u16>,
    pub bottom: Option<u16>,
    pub side: Option<u16>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct BiomeDef {
    pub id: u16,
    pub name: String,
    #[serde(default = "default_tint")]
    pub grass_tint: [f32; 3],
    #[serde(default = "default_tint")]
    pub foliage_tint: [f32; 3],
}

fn default_tint() -> [f32; 3] {
    [0.55, 0.74, 0.33]
}
