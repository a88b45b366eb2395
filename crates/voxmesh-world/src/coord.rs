use serde::{Deserialize, Serialize};

/// Edge length of a section in blocks.
pub const SECTION_SIZE: i32 = 16;
pub const SECTION_VOLUME: usize = 16 * 16 * 16;

/// Section key in section units; `origin()` is the world-space block origin.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SectionCoord {
    pub sx: i32,
    pub sy: i32,
    pub sz: i32,
}

impl SectionCoord {
    #[inline]
    pub const fn new(sx: i32, sy: i32, sz: i32) -> Self {
        Self { sx, sy, sz }
    }

    #[inline]
    pub fn column(self) -> ColumnCoord {
        ColumnCoord::new(self.sx, self.sz)
    }

    #[inline]
    pub fn origin(self) -> [i32; 3] {
        [
            self.sx * SECTION_SIZE,
            self.sy * SECTION_SIZE,
            self.sz * SECTION_SIZE,
        ]
    }

    #[inline]
    pub fn offset(self, dx: i32, dy: i32, dz: i32) -> Self {
        Self {
            sx: self.sx + dx,
            sy: self.sy + dy,
            sz: self.sz + dz,
        }
    }
}

impl From<(i32, i32, i32)> for SectionCoord {
    fn from(value: (i32, i32, i32)) -> Self {
        Self::new(value.0, value.1, value.2)
    }
}

/// Column key in section units (x and z only).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ColumnCoord {
    pub cx: i32,
    pub cz: i32,
}

impl ColumnCoord {
    #[inline]
    pub const fn new(cx: i32, cz: i32) -> Self {
        Self { cx, cz }
    }

    /// Column containing world block coordinates `(x, z)`.
    #[inline]
    pub fn containing(x: i32, z: i32) -> Self {
        Self::new(x.div_euclid(SECTION_SIZE), z.div_euclid(SECTION_SIZE))
    }

    #[inline]
    pub fn section(self, sy: i32) -> SectionCoord {
        SectionCoord::new(self.cx, sy, self.cz)
    }

    /// World-space `(x, z)` block origin.
    #[inline]
    pub fn origin(self) -> (i32, i32) {
        (self.cx * SECTION_SIZE, self.cz * SECTION_SIZE)
    }

    /// The four lateral neighbours: +x, -x, +z, -z.
    pub fn neighbors(self) -> [ColumnCoord; 4] {
        [
            Self::new(self.cx + 1, self.cz),
            Self::new(self.cx - 1, self.cz),
            Self::new(self.cx, self.cz + 1),
            Self::new(self.cx, self.cz - 1),
        ]
    }
}

/// World-space block position.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct BlockPos {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl BlockPos {
    #[inline]
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    #[inline]
    pub fn section(self) -> SectionCoord {
        SectionCoord::new(
            self.x.div_euclid(SECTION_SIZE),
            self.y.div_euclid(SECTION_SIZE),
            self.z.div_euclid(SECTION_SIZE),
        )
    }

    #[inline]
    pub fn column(self) -> ColumnCoord {
        ColumnCoord::containing(self.x, self.z)
    }

    /// Offset inside the owning section, each component in `0..16`.
    #[inline]
    pub fn local(self) -> (usize, usize, usize) {
        (
            self.x.rem_euclid(SECTION_SIZE) as usize,
            self.y.rem_euclid(SECTION_SIZE) as usize,
            self.z.rem_euclid(SECTION_SIZE) as usize,
        )
    }

    #[inline]
    pub fn offset(self, dx: i32, dy: i32, dz: i32) -> Self {
        Self::new(self.x + dx, self.y + dy, self.z + dz)
    }
}

impl From<(i32, i32, i32)> for BlockPos {
    fn from(value: (i32, i32, i32)) -> Self {
        Self::new(value.0, value.1, value.2)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negative_coords_floor() {
        let p = BlockPos::new(-1, -17, 15);
        assert_eq!(p.section(), SectionCoord::new(-1, -2, 0));
        assert_eq!(p.local(), (15, 15, 15));
        assert_eq!(p.column(), ColumnCoord::new(-1, 0));
    }

    #[test]
    fn origin_is_section_times_sixteen() {
        assert_eq!(SectionCoord::new(2, -1, -3).origin(), [32, -16, -48]);
        assert_eq!(ColumnCoord::new(-2, 5).origin(), (-32, 80));
    }
}
