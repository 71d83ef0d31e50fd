use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SlabError {
    #[error("Bad magic: expected NILF, got {0:02x?}")]
    BadMagic([u8; 4]),

    #[error("Unsupported file table version: {0}")]
    BadVersion(u8),

    #[error("Size mismatch: {0}")]
    SizeMismatch(String),

    #[error("Index {index} out of range (limit {limit})")]
    IndexOutOfRange { index: u64, limit: u64 },

    #[error("File table full ({0} records)")]
    TableFull(u32),

    #[error("Invalid file record: {0}")]
    InvalidRecord(String),
}

pub type Result<T> = std::result::Result<T, SlabError>;
