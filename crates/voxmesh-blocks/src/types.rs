pub type BlockStateId = u16;
pub type BiomeId = u16;

/// State id 0 is always air.
pub const AIR: BlockStateId = 0;

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Face {
    PosY = 0,
    NegY = 1,
    PosX = 2,
    NegX = 3,
    PosZ = 4,
    NegZ = 5,
}

impl Face {
    pub const ALL: [Face; 6] = [
        Face::PosY,
        Face::NegY,
        Face::PosX,
        Face::NegX,
        Face::PosZ,
        Face::NegZ,
    ];

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    #[inline]
    pub fn delta(self) -> (i32, i32, i32) {
        match self {
            Face::PosY => (0, 1, 0),
            Face::NegY => (0, -1, 0),
            Face::PosX => (1, 0, 0),
            Face::NegX => (-1, 0, 0),
            Face::PosZ => (0, 0, 1),
            Face::NegZ => (0, 0, -1),
        }
    }

    #[inline]
    pub fn normal(self) -> [f32; 3] {
        let (x, y, z) = self.delta();
        [x as f32, y as f32, z as f32]
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Shape {
    Empty,
    Cube,
    /// Bottom half of a cube.
    Slab,
    /// Two crossed quads (plants).
    Cross,
}

impl Shape {
    pub fn from_name(s: &str) -> Option<Shape> {
        match s {
            "empty" | "none" => Some(Shape::Empty),
            "cube" => Some(Shape::Cube),
            "slab" => Some(Shape::Slab),
            "cross" => Some(Shape::Cross),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct BlockStateInfo {
    pub id: BlockStateId,
    pub name: String,
    pub shape: Shape,
    pub transparent: bool,
    /// Atlas tile per face, indexed by `Face::index`.
    pub textures: [u16; 6],
    pub tint: Option<[f32; 3]>,
}

impl BlockStateInfo {
    pub fn air() -> Self {
        Self {
            id: AIR,
            name: "air".into(),
            shape: Shape::Empty,
            transparent: true,
            textures: [0; 6],
            tint: None,
        }
    }

    #[inline]
    pub fn is_air(&self) -> bool {
        self.shape == Shape::Empty
    }

    /// Full opaque cube: hides the neighbouring face it touches.
    #[inline]
    pub fn is_cube(&self) -> bool {
        self.shape == Shape::Cube && !self.transparent
    }

    #[inline]
    pub fn texture(&self, face: Face) -> u16 {
        self.textures[face.index()]
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Biome {
    pub id: BiomeId,
    pub name: String,
    pub grass_tint: [f32; 3],
    pub foliage_tint: [f32; 3],
}
