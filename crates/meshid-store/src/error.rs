use meshid_types::{Classify, ErrorKind};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage backend: {0}")]
    Kv(#[from] crate::kv::KvError),
    #[error("no entry found for key")]
    NotFound,
    #[error("oplog signatures do not meet quorum")]
    QuorumNotMet,
    #[error("oplog status would regress from {from:?} to {to:?}")]
    StatusRegression { from: meshid_types::OplogStatus, to: meshid_types::OplogStatus },
}

impl Classify for StoreError {
    fn kind(&self) -> ErrorKind {
        match self {
            StoreError::Kv(_) => ErrorKind::Transient,
            StoreError::NotFound => ErrorKind::NotFound,
            StoreError::QuorumNotMet => ErrorKind::Validation,
            StoreError::StatusRegression { .. } => ErrorKind::Invariant,
        }
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;
