use crate::error::{Result, SlabError};
use crate::layout::{
    FileRecord, FileTableHeader, FILE_TABLE_START, FILE_TABLE_VERSION, MAGIC_NILF,
    MAX_FILE_RECORDS, RECORDS_START, ROOT_TABLE_SLOTS, ROOT_TABLE_START,
};
use nil_types::{CHUNKS_PER_UNIT, COMMITMENT_SIZE, SCALAR_SIZE, UNIT_SIZE};
use tracing::debug;

/// Number of witness units needed to hold the chunk commitments of
/// `max_user_units` user-data units, rounded up.
pub fn witness_units_for(max_user_units: u64) -> u64 {
    let bytes = max_user_units as u128 * CHUNKS_PER_UNIT as u128 * COMMITMENT_SIZE as u128;
    bytes.div_ceil(UNIT_SIZE as u128) as u64
}

/// In-memory image of unit 0 with typed accessors.
///
/// The header is rewritten on every mutation, so `bytes()` is always a valid
/// image.
#[derive(Clone)]
pub struct SlabBuilder {
    buffer: Vec<u8>,
    header: FileTableHeader,
    max_user_units: u64,
    witness_units: u64,
}

impl SlabBuilder {
    pub fn init(max_user_units: u64) -> Self {
        let mut builder = Self {
            buffer: vec![0u8; UNIT_SIZE],
            header: FileTableHeader::default(),
            max_user_units,
            witness_units: witness_units_for(max_user_units),
        };
        builder.flush_header();
        builder
    }

    pub fn load(data: &[u8], max_user_units: u64) -> Result<Self> {
        if data.len() != UNIT_SIZE {
            return Err(SlabError::SizeMismatch(format!(
                "unit 0 must be {} bytes, got {}",
                UNIT_SIZE,
                data.len()
            )));
        }

        let header = FileTableHeader::from_bytes(&data[FILE_TABLE_START..])?;
        if header.magic != MAGIC_NILF {
            return Err(SlabError::BadMagic(header.magic));
        }
        if header.version != FILE_TABLE_VERSION {
            return Err(SlabError::BadVersion(header.version));
        }
        if header.record_size as usize != FileRecord::SIZE {
            return Err(SlabError::SizeMismatch(format!(
                "record size {} (expected {})",
                header.record_size,
                FileRecord::SIZE
            )));
        }
        if header.record_count as usize > MAX_FILE_RECORDS {
            return Err(SlabError::SizeMismatch(format!(
                "record count {} exceeds table capacity {}",
                header.record_count, MAX_FILE_RECORDS
            )));
        }

        Ok(Self {
            buffer: data.to_vec(),
            header,
            max_user_units,
            witness_units: witness_units_for(max_user_units),
        })
    }

    pub fn witness_units(&self) -> u64 {
        self.witness_units
    }

    pub fn max_user_units(&self) -> u64 {
        self.max_user_units
    }

    pub fn record_count(&self) -> u32 {
        self.header.record_count
    }

    /// Addressable root-table entries (witness + user units, bounded by the region)
    pub fn root_capacity(&self) -> u64 {
        self.witness_units
            .saturating_add(self.max_user_units)
            .min(ROOT_TABLE_SLOTS as u64)
    }

    pub fn bytes(&self) -> &[u8] {
        &self.buffer
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buffer
    }

    fn flush_header(&mut self) {
        let bytes = self.header.to_bytes();
        self.buffer[FILE_TABLE_START..FILE_TABLE_START + FileTableHeader::SIZE]
            .copy_from_slice(&bytes);
    }

    fn root_offset(&self, table_index: u64) -> Result<usize> {
        let limit = self.root_capacity();
        if table_index >= limit {
            return Err(SlabError::IndexOutOfRange {
                index: table_index,
                limit,
            });
        }
        Ok(ROOT_TABLE_START + table_index as usize * SCALAR_SIZE)
    }

    /// Root of slab unit `table_index + 1`
    pub fn get_root(&self, table_index: u64) -> Result<[u8; SCALAR_SIZE]> {
        let offset = self.root_offset(table_index)?;
        let mut root = [0u8; SCALAR_SIZE];
        root.copy_from_slice(&self.buffer[offset..offset + SCALAR_SIZE]);
        Ok(root)
    }

    pub fn set_root(&mut self, table_index: u64, root: &[u8]) -> Result<()> {
        if root.len() != SCALAR_SIZE {
            return Err(SlabError::SizeMismatch(format!(
                "root must be {} bytes, got {}",
                SCALAR_SIZE,
                root.len()
            )));
        }
        let offset = self.root_offset(table_index)?;
        self.buffer[offset..offset + SCALAR_SIZE].copy_from_slice(root);
        Ok(())
    }

    fn record_offset(index: u32) -> usize {
        RECORDS_START + index as usize * FileRecord::SIZE
    }

    fn check_record_index(&self, index: u32) -> Result<()> {
        if index >= self.header.record_count {
            return Err(SlabError::IndexOutOfRange {
                index: index as u64,
                limit: self.header.record_count as u64,
            });
        }
        Ok(())
    }

    fn read_record(&self, index: u32) -> Result<FileRecord> {
        let offset = Self::record_offset(index);
        FileRecord::from_bytes(&self.buffer[offset..offset + FileRecord::SIZE])
    }

    fn write_record(&mut self, index: u32, rec: &FileRecord) {
        let offset = Self::record_offset(index);
        self.buffer[offset..offset + FileRecord::SIZE].copy_from_slice(&rec.to_bytes());
    }

    pub fn get_file_record(&self, index: u32) -> Result<FileRecord> {
        self.check_record_index(index)?;
        self.read_record(index)
    }

    pub fn update_file_record(&mut self, index: u32, rec: FileRecord) -> Result<()> {
        self.check_record_index(index)?;
        self.write_record(index, &rec);
        Ok(())
    }

    /// Mark a record as free space, keeping its extent for reuse
    pub fn tombstone_file_record(&mut self, index: u32) -> Result<()> {
        let rec = self.get_file_record(index)?;
        let tomb = FileRecord::tombstone(rec.start_offset, rec.length());
        self.write_record(index, &tomb);
        debug!(index, start = rec.start_offset, length = rec.length(), "🪦 File record tombstoned");
        Ok(())
    }

    fn push_record(&mut self, rec: &FileRecord) -> Result<u32> {
        let index = self.header.record_count;
        if index as usize >= MAX_FILE_RECORDS {
            return Err(SlabError::TableFull(index));
        }
        self.write_record(index, rec);
        self.header.record_count += 1;
        self.flush_header();
        Ok(index)
    }

    /// Insert a record, reusing the first tombstone large enough to hold it
    /// and growing the table otherwise.
    pub fn append_file_record(&mut self, rec: FileRecord) -> Result<u32> {
        if let Some(index) = self.find_or_split_free_slot(rec)? {
            return Ok(index);
        }
        self.push_record(&rec)
    }

    /// First-fit tombstone reuse.
    ///
    /// The new record takes over the tombstone's start offset. A strictly
    /// larger tombstone leaves one trailing tombstone covering the remainder.
    /// Returns `None` when no tombstone fits; nothing is written in that case.
    pub fn find_or_split_free_slot(&mut self, mut rec: FileRecord) -> Result<Option<u32>> {
        let required = rec.length();

        for index in 0..self.header.record_count {
            let existing = self.read_record(index)?;
            if !existing.is_tombstone() || existing.length() < required {
                continue;
            }

            let leftover = existing.length() - required;
            if leftover > 0 && self.header.record_count as usize >= MAX_FILE_RECORDS {
                return Err(SlabError::TableFull(self.header.record_count));
            }

            rec.start_offset = existing.start_offset;
            self.write_record(index, &rec);
            if leftover > 0 {
                let tail = FileRecord::tombstone(existing.start_offset + required, leftover);
                self.push_record(&tail)?;
            }

            debug!(
                index,
                reused = existing.length(),
                required,
                leftover,
                "♻️ Tombstone reused"
            );
            return Ok(Some(index));
        }

        Ok(None)
    }

    pub fn records(&self) -> impl Iterator<Item = (u32, FileRecord)> + '_ {
        (0..self.header.record_count)
            .filter_map(move |i| self.read_record(i).ok().map(|rec| (i, rec)))
    }

    pub fn find_file(&self, path: &str) -> Option<(u32, FileRecord)> {
        self.records()
            .find(|(_, rec)| !rec.is_tombstone() && rec.path_str() == path)
    }

    /// First byte past every allocated extent, tombstones included
    pub fn next_free_offset(&self) -> u64 {
        self.records()
            .map(|(_, rec)| rec.end_offset())
            .max()
            .unwrap_or(0)
    }
}

impl std::fmt::Debug for SlabBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SlabBuilder")
            .field("max_user_units", &self.max_user_units)
            .field("witness_units", &self.witness_units)
            .field("record_count", &self.header.record_count)
            .finish()
    }
}
