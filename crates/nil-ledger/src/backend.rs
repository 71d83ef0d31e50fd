use async_trait::async_trait;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("Key not found: {0}")]
    NotFound(String),

    #[error("Ledger backend error: {0}")]
    BackendError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl From<bincode::Error> for LedgerError {
    fn from(e: bincode::Error) -> Self {
        LedgerError::SerializationError(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, LedgerError>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerOp {
    Put(Vec<u8>, Vec<u8>),
    Delete(Vec<u8>),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LedgerStats {
    pub entries: usize,
    pub batches_committed: u64,
}

/// Key/value store backing all persistent engine state
#[async_trait]
pub trait LedgerStore: Send + Sync {
    async fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>>;

    async fn put(&self, key: &[u8], value: &[u8]) -> Result<()>;

    async fn delete(&self, key: &[u8]) -> Result<()>;

    /// All entries whose key starts with `prefix`, in ascending key order
    async fn scan_prefix(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>>;

    /// Apply every op or none of them
    async fn write_batch(&self, ops: Vec<LedgerOp>) -> Result<()>;

    async fn flush(&self) -> Result<()>;

    async fn stats(&self) -> Result<LedgerStats>;
}
