use meshid_types::{Classify, ErrorKind};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConsensusError {
    #[error("conf-change entry's embedded node-id does not derive to its raft-id")]
    InvalidEntry,
    #[error("node {0} is not a known member of this identity's raft group")]
    InvalidNode(u64),
    #[error("raft storage error: {0}")]
    Storage(String),
}

impl Classify for ConsensusError {
    fn kind(&self) -> ErrorKind {
        match self {
            ConsensusError::InvalidEntry => ErrorKind::Validation,
            ConsensusError::InvalidNode(_) => ErrorKind::Invariant,
            ConsensusError::Storage(_) => ErrorKind::Transient,
        }
    }
}

pub type Result<T> = std::result::Result<T, ConsensusError>;
