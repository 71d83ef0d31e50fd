use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TypesError {
    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Invalid service hint: {0}")]
    InvalidServiceHint(String),

    #[error("Invalid capabilities: {0}")]
    InvalidCapabilities(String),

    #[error("Invalid stripe parameters: {0}")]
    InvalidStripe(String),

    #[error("Invalid parameters: {0}")]
    InvalidParams(String),

    #[error("Invalid state transition from {from} to {to}")]
    InvalidStateTransition { from: String, to: String },
}

pub type Result<T> = std::result::Result<T, TypesError>;
