use huc_store::StoreError;
use huc_types::{Address, Hash, U256};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConsensusError {
    #[error("unknown ancestor {0}")]
    UnknownAncestor(Hash),

    #[error("invalid difficulty: have {have}, want {want}")]
    InvalidDifficulty { have: U256, want: U256 },

    #[error("invalid proof-of-work")]
    InvalidPow,

    #[error("timestamp older than parent")]
    InvalidTimestamp,

    #[error("extra-data too long: {0} > 32")]
    ExtraDataTooLong(usize),

    #[error("extra-data seal missing")]
    MissingSignature,

    #[error("invalid seal signature")]
    InvalidSignature,

    #[error("unauthorized signer {0}")]
    UnauthorizedSigner(Address),

    #[error("no signer authorized to seal")]
    NotAuthorized,

    #[error("signing failed: {0}")]
    SignFailed(String),

    #[error("local sealing disabled")]
    SealingDisabled,

    #[error("sealing aborted")]
    SealAborted,

    #[error("corrupt signer snapshot: {0}")]
    CorruptSnapshot(String),

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}
