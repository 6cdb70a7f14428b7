//! Parse errors for the primitive types.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypesError {
    #[error("invalid hex: {0}")]
    InvalidHex(String),

    #[error("invalid length: expected {expected} bytes, got {got}")]
    InvalidLength { expected: usize, got: usize },

    #[error("invalid block reference: {0}")]
    InvalidBlockRef(String),

    #[error("unknown sync mode: {0}")]
    UnknownSyncMode(String),
}
