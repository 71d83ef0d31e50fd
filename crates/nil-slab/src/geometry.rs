use crate::error::{Result, SlabError};
use nil_types::{CHUNKS_PER_UNIT, CHUNK_SIZE, COMMITMENT_SIZE, UNIT_SIZE};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitKind {
    FileTable,
    Witness,
    UserData,
}

/// Unit addressing for a committed slab
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlabGeometry {
    pub total_units: u64,
    pub witness_units: u64,
}

impl SlabGeometry {
    pub fn new(total_units: u64, witness_units: u64) -> Result<Self> {
        if total_units < witness_units.saturating_add(2) {
            return Err(SlabError::SizeMismatch(format!(
                "{} units cannot hold unit 0, {} witness units and any user data",
                total_units, witness_units
            )));
        }
        Ok(Self {
            total_units,
            witness_units,
        })
    }

    pub fn meta_units(&self) -> u64 {
        1 + self.witness_units
    }

    pub fn user_units(&self) -> u64 {
        self.total_units.saturating_sub(self.meta_units())
    }

    pub fn unit_kind(&self, unit_index: u64) -> Result<UnitKind> {
        match unit_index {
            0 => Ok(UnitKind::FileTable),
            i if i <= self.witness_units => Ok(UnitKind::Witness),
            i if i < self.total_units => Ok(UnitKind::UserData),
            i => Err(SlabError::IndexOutOfRange {
                index: i,
                limit: self.total_units,
            }),
        }
    }

    /// `(unit_index, chunk_index)` holding a byte of the user-data region
    pub fn locate(&self, user_offset: u64) -> Result<(u64, u64)> {
        let unit = self.meta_units() + user_offset / UNIT_SIZE as u64;
        if unit >= self.total_units {
            return Err(SlabError::IndexOutOfRange {
                index: unit,
                limit: self.total_units,
            });
        }
        let chunk = (user_offset % UNIT_SIZE as u64) / CHUNK_SIZE as u64;
        Ok((unit, chunk))
    }

    /// Every `(unit_index, chunk_index)` touched by a byte range
    pub fn chunks_for_range(&self, user_offset: u64, len: u64) -> Result<Vec<(u64, u64)>> {
        if len == 0 {
            return Ok(Vec::new());
        }
        let last = user_offset
            .checked_add(len - 1)
            .ok_or_else(|| SlabError::SizeMismatch("range overflows u64".to_string()))?;
        // Validates the end of the range before allocating
        self.locate(last)?;

        let first_chunk = user_offset / CHUNK_SIZE as u64;
        let last_chunk = last / CHUNK_SIZE as u64;
        let mut out = Vec::with_capacity((last_chunk - first_chunk + 1) as usize);
        for global in first_chunk..=last_chunk {
            out.push(self.locate(global * CHUNK_SIZE as u64)?);
        }
        Ok(out)
    }

    /// Witness unit and byte offset of the commitment for a user chunk
    pub fn witness_location(&self, unit_index: u64, chunk_index: u64) -> Result<(u64, usize)> {
        if self.unit_kind(unit_index)? != UnitKind::UserData || chunk_index >= CHUNKS_PER_UNIT as u64
        {
            return Err(SlabError::IndexOutOfRange {
                index: unit_index,
                limit: self.total_units,
            });
        }
        let ordinal = unit_index - self.meta_units();
        let byte = (ordinal * CHUNKS_PER_UNIT as u64 + chunk_index) * COMMITMENT_SIZE as u64;
        let witness = 1 + byte / UNIT_SIZE as u64;
        if witness > self.witness_units {
            return Err(SlabError::IndexOutOfRange {
                index: witness,
                limit: self.witness_units + 1,
            });
        }
        Ok((witness, (byte % UNIT_SIZE as u64) as usize))
    }
}
