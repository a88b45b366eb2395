use std::collections::BTreeMap;
use std::ops::Range;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use voxmesh_blocks::{AIR, BiomeId, BlockStateId};

use crate::coord::SECTION_VOLUME;
use crate::section::Section;

#[derive(Debug, Error)]
pub enum PayloadError {
    #[error("column payload codec: {0}")]
    Codec(#[from] bincode::Error),
    #[error("section {index} has {len} states, expected {SECTION_VOLUME}")]
    SectionSize { index: usize, len: usize },
    #[error("column declares {0} sections")]
    SectionCount(usize),
    #[error("biome grid has {0} entries, expected 256")]
    BiomeSize(usize),
}

/// Wire form of a column: the declared stack bottom-up from `min_section_y`,
/// absent ones `None`, plus any sections allocated outside that stack.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ColumnPayload {
    pub min_section_y: i32,
    pub sections: Vec<Option<Vec<BlockStateId>>>,
    /// 16x16 biome ids, indexed `z * 16 + x`.
    pub biomes: Option<Vec<BiomeId>>,
    pub extra: Vec<(i32, Vec<BlockStateId>)>,
}

impl ColumnPayload {
    pub fn encode(&self) -> Result<Vec<u8>, PayloadError> {
        Ok(bincode::serialize(self)?)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, PayloadError> {
        Ok(bincode::deserialize(bytes)?)
    }
}

/// Sections are stored sparsely by level, so a write far outside the
/// declared stack allocates one section and nothing in between.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Column {
    min_section_y: i32,
    section_count: i32,
    sections: BTreeMap<i32, Section>,
    biomes: Option<Box<[BiomeId]>>,
}

impl Column {
    pub fn new(min_section_y: i32, section_count: usize) -> Self {
        Self {
            min_section_y,
            section_count: i32::try_from(section_count).unwrap_or(i32::MAX),
            sections: BTreeMap::new(),
            biomes: None,
        }
    }

    pub fn from_payload(payload: ColumnPayload) -> Result<Self, PayloadError> {
        let count = payload.sections.len();
        let section_count =
            i32::try_from(count).map_err(|_| PayloadError::SectionCount(count))?;
        if payload.min_section_y.checked_add(section_count).is_none() {
            return Err(PayloadError::SectionCount(count));
        }
        let mut sections = BTreeMap::new();
        for (index, s) in payload.sections.into_iter().enumerate() {
            let Some(states) = s else {
                continue;
            };
            let len = states.len();
            let section =
                Section::from_states(states).ok_or(PayloadError::SectionSize { index, len })?;
            sections.insert(payload.min_section_y + index as i32, section);
        }
        for (index, (sy, states)) in payload.extra.into_iter().enumerate() {
            let len = states.len();
            let section = Section::from_states(states).ok_or(PayloadError::SectionSize {
                index: count + index,
                len,
            })?;
            sections.insert(sy, section);
        }
        let biomes = match payload.biomes {
            Some(b) if b.len() != 256 => return Err(PayloadError::BiomeSize(b.len())),
            Some(b) => Some(b.into_boxed_slice()),
            None => None,
        };
        Ok(Self {
            min_section_y: payload.min_section_y,
            section_count,
            sections,
            biomes,
        })
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, PayloadError> {
        Self::from_payload(ColumnPayload::decode(bytes)?)
    }

    pub fn to_payload(&self) -> ColumnPayload {
        let span = self.span();
        ColumnPayload {
            min_section_y: self.min_section_y,
            sections: span
                .clone()
                .map(|sy| self.section(sy).map(|s| s.states().to_vec()))
                .collect(),
            biomes: self.biomes.as_ref().map(|b| b.to_vec()),
            extra: self
                .sections
                .iter()
                .filter(|(sy, _)| !span.contains(*sy))
                .map(|(sy, s)| (*sy, s.states().to_vec()))
                .collect(),
        }
    }

    #[inline]
    pub fn min_section_y(&self) -> i32 {
        self.min_section_y
    }

    /// Levels declared by the payload, present or not.
    pub fn span(&self) -> Range<i32> {
        self.min_section_y..self.min_section_y.saturating_add(self.section_count)
    }

    /// Every level the column covers: the declared span, then any section
    /// allocated outside it, ascending.
    pub fn section_ys(&self) -> impl Iterator<Item = i32> + '_ {
        let span = self.span();
        let below = self.sections.range(..span.start).map(|(sy, _)| *sy);
        let above = self.sections.range(span.end..).map(|(sy, _)| *sy);
        below.chain(span).chain(above)
    }

    pub fn section(&self, sy: i32) -> Option<&Section> {
        self.sections.get(&sy)
    }

    pub fn section_len(&self) -> usize {
        self.sections.len()
    }

    /// Section at `sy`, allocating an all-air one if missing.
    pub fn section_mut_or_insert(&mut self, sy: i32) -> &mut Section {
        self.sections.entry(sy).or_insert_with(Section::air)
    }

    /// State at local `(x, z)` and world `y`; air where the sub-chunk is absent.
    pub fn state(&self, x: usize, y: i32, z: usize) -> BlockStateId {
        let sy = y.div_euclid(16);
        match self.section(sy) {
            Some(s) => s.get(x, y.rem_euclid(16) as usize, z),
            None => AIR,
        }
    }

    pub fn set_biomes(&mut self, biomes: Vec<BiomeId>) -> Result<(), PayloadError> {
        if biomes.len() != 256 {
            return Err(PayloadError::BiomeSize(biomes.len()));
        }
        self.biomes = Some(biomes.into_boxed_slice());
        Ok(())
    }

    #[inline]
    pub fn biome(&self, x: usize, z: usize) -> Option<BiomeId> {
        self.biomes.as_ref().map(|b| b[z * 16 + x])
    }
}
