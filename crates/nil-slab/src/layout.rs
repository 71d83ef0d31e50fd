use crate::error::{Result, SlabError};
use nil_types::{CHUNK_SIZE, SCALAR_SIZE, UNIT_SIZE};
use serde::{Deserialize, Serialize};

pub const MAGIC_NILF: [u8; 4] = *b"NILF";
pub const FILE_TABLE_VERSION: u8 = 1;

pub const ROOT_TABLE_START: usize = 0;
pub const ROOT_TABLE_END: usize = 16 * CHUNK_SIZE;
/// One 32-byte root per witness or user unit
pub const ROOT_TABLE_SLOTS: usize = (ROOT_TABLE_END - ROOT_TABLE_START) / SCALAR_SIZE;

pub const FILE_TABLE_START: usize = ROOT_TABLE_END;
pub const FILE_TABLE_END: usize = UNIT_SIZE;
pub const RECORDS_START: usize = FILE_TABLE_START + FileTableHeader::SIZE;
pub const MAX_FILE_RECORDS: usize = (FILE_TABLE_END - RECORDS_START) / FileRecord::SIZE;

pub const FLAG_ENCRYPTED: u8 = 0x80;
pub const FLAG_HIDDEN: u8 = 0x40;
pub const FLAG_COMPRESSION_MASK: u8 = 0x0F;

pub const PATH_LEN: usize = 40;
const LENGTH_MASK: u64 = 0x00FF_FFFF_FFFF_FFFF;

/// Largest file length representable in a record
pub const MAX_RECORD_LENGTH: u64 = LENGTH_MASK;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Compression {
    None,
    Gzip,
    Zstd,
    Brotli,
    /// Codes 4..=15 are reserved
    Other(u8),
}

impl Compression {
    pub fn from_flags(flags: u8) -> Self {
        match flags & FLAG_COMPRESSION_MASK {
            0 => Compression::None,
            1 => Compression::Gzip,
            2 => Compression::Zstd,
            3 => Compression::Brotli,
            other => Compression::Other(other),
        }
    }

    pub fn code(&self) -> u8 {
        match self {
            Compression::None => 0,
            Compression::Gzip => 1,
            Compression::Zstd => 2,
            Compression::Brotli => 3,
            Compression::Other(c) => c & FLAG_COMPRESSION_MASK,
        }
    }
}

pub fn pack_length_and_flags(length: u64, flags: u8) -> u64 {
    ((flags as u64) << 56) | (length & LENGTH_MASK)
}

pub fn unpack_length_and_flags(val: u64) -> (u64, u8) {
    (val & LENGTH_MASK, (val >> 56) as u8)
}

/// 128-byte header at the start of the file table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileTableHeader {
    pub magic: [u8; 4],
    pub version: u8,
    pub record_size: u16,
    pub record_count: u32,
}

impl Default for FileTableHeader {
    fn default() -> Self {
        Self {
            magic: MAGIC_NILF,
            version: FILE_TABLE_VERSION,
            record_size: FileRecord::SIZE as u16,
            record_count: 0,
        }
    }
}

impl FileTableHeader {
    pub const SIZE: usize = 128;

    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let mut out = [0u8; Self::SIZE];
        out[0..4].copy_from_slice(&self.magic);
        out[4] = self.version;
        // byte 5 is padding
        out[6..8].copy_from_slice(&self.record_size.to_le_bytes());
        out[8..12].copy_from_slice(&self.record_count.to_le_bytes());
        out
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < Self::SIZE {
            return Err(SlabError::SizeMismatch(format!(
                "header needs {} bytes, got {}",
                Self::SIZE,
                bytes.len()
            )));
        }
        let mut magic = [0u8; 4];
        magic.copy_from_slice(&bytes[0..4]);
        Ok(Self {
            magic,
            version: bytes[4],
            record_size: u16::from_le_bytes([bytes[6], bytes[7]]),
            record_count: u32::from_le_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]),
        })
    }
}

/// 64-byte file table entry. A record whose path starts with NUL is a tombstone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileRecord {
    /// Offset relative to the start of the user-data region
    pub start_offset: u64,
    pub length_and_flags: u64,
    pub timestamp: u64,
    pub path: [u8; PATH_LEN],
}

impl FileRecord {
    pub const SIZE: usize = 64;

    pub fn new(path: &str, start_offset: u64, length: u64, flags: u8, timestamp: u64) -> Result<Self> {
        let raw = path.as_bytes();
        if raw.is_empty() {
            return Err(SlabError::InvalidRecord("path must not be empty".to_string()));
        }
        if raw.len() > PATH_LEN {
            return Err(SlabError::InvalidRecord(format!(
                "path is {} bytes, max {}",
                raw.len(),
                PATH_LEN
            )));
        }
        if raw.contains(&0) {
            return Err(SlabError::InvalidRecord("path contains NUL".to_string()));
        }
        if length > MAX_RECORD_LENGTH {
            return Err(SlabError::InvalidRecord(format!("length {} exceeds 56 bits", length)));
        }

        let mut buf = [0u8; PATH_LEN];
        buf[..raw.len()].copy_from_slice(raw);
        Ok(Self {
            start_offset,
            length_and_flags: pack_length_and_flags(length, flags),
            timestamp,
            path: buf,
        })
    }

    pub fn tombstone(start_offset: u64, length: u64) -> Self {
        Self {
            start_offset,
            length_and_flags: pack_length_and_flags(length, 0),
            timestamp: 0,
            path: [0u8; PATH_LEN],
        }
    }

    pub fn is_tombstone(&self) -> bool {
        self.path[0] == 0
    }

    pub fn length(&self) -> u64 {
        unpack_length_and_flags(self.length_and_flags).0
    }

    pub fn flags(&self) -> u8 {
        unpack_length_and_flags(self.length_and_flags).1
    }

    pub fn end_offset(&self) -> u64 {
        self.start_offset.saturating_add(self.length())
    }

    pub fn is_encrypted(&self) -> bool {
        self.flags() & FLAG_ENCRYPTED != 0
    }

    pub fn is_hidden(&self) -> bool {
        self.flags() & FLAG_HIDDEN != 0
    }

    pub fn compression(&self) -> Compression {
        Compression::from_flags(self.flags())
    }

    /// Path up to the first NUL, lossy on invalid UTF-8
    pub fn path_str(&self) -> String {
        let end = self.path.iter().position(|b| *b == 0).unwrap_or(PATH_LEN);
        String::from_utf8_lossy(&self.path[..end]).into_owned()
    }

    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let mut out = [0u8; Self::SIZE];
        out[0..8].copy_from_slice(&self.start_offset.to_le_bytes());
        out[8..16].copy_from_slice(&self.length_and_flags.to_le_bytes());
        out[16..24].copy_from_slice(&self.timestamp.to_le_bytes());
        out[24..64].copy_from_slice(&self.path);
        out
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < Self::SIZE {
            return Err(SlabError::SizeMismatch(format!(
                "record needs {} bytes, got {}",
                Self::SIZE,
                bytes.len()
            )));
        }
        let u64_at = |at: usize| {
            let mut b = [0u8; 8];
            b.copy_from_slice(&bytes[at..at + 8]);
            u64::from_le_bytes(b)
        };
        let mut path = [0u8; PATH_LEN];
        path.copy_from_slice(&bytes[24..64]);
        Ok(Self {
            start_offset: u64_at(0),
            length_and_flags: u64_at(8),
            timestamp: u64_at(16),
            path,
        })
    }
}
