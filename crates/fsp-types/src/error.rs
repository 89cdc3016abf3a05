use thiserror::Error;

/// Errors produced by type operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid object id {id:?}: {reason}")]
    InvalidObjectId { id: String, reason: String },

    #[error("invalid hex string: {0}")]
    InvalidHex(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}
