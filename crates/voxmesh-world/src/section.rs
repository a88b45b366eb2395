use voxmesh_blocks::{AIR, BlockStateId};

use crate::coord::SECTION_VOLUME;

/// 16x16x16 block-state ids in YZX order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Section {
    states: Box<[BlockStateId]>,
}

impl Section {
    pub fn air() -> Self {
        Self {
            states: vec![AIR; SECTION_VOLUME].into_boxed_slice(),
        }
    }

    /// `None` unless `states` holds exactly 4096 entries.
    pub fn from_states(states: Vec<BlockStateId>) -> Option<Self> {
        (states.len() == SECTION_VOLUME).then(|| Self {
            states: states.into_boxed_slice(),
        })
    }

    #[inline]
    pub fn idx(x: usize, y: usize, z: usize) -> usize {
        (y * 16 + z) * 16 + x
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize, z: usize) -> BlockStateId {
        self.states[Self::idx(x, y, z)]
    }

    #[inline]
    pub fn set(&mut self, x: usize, y: usize, z: usize, state: BlockStateId) {
        self.states[Self::idx(x, y, z)] = state;
    }

    pub fn is_empty(&self) -> bool {
        self.states.iter().all(|&s| s == AIR)
    }

    pub fn non_air_count(&self) -> usize {
        self.states.iter().filter(|&&s| s != AIR).count()
    }

    pub fn states(&self) -> &[BlockStateId] {
        &self.states
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn yzx_layout() {
        assert_eq!(Section::idx(1, 0, 0), 1);
        assert_eq!(Section::idx(0, 0, 1), 16);
        assert_eq!(Section::idx(0, 1, 0), 256);
        assert_eq!(Section::idx(15, 15, 15), SECTION_VOLUME - 1);
    }

    #[test]
    fn set_and_count() {
        let mut s = Section::air();
        assert!(s.is_empty());
        s.set(3, 4, 5, 7);
        assert_eq!(s.get(3, 4, 5), 7);
        assert_eq!(s.non_air_count(), 1);
        assert!(Section::from_states(vec![0; 10]).is_none());
    }
}
