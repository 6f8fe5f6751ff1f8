use meshid_types::{Classify, ErrorKind};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PeerError {
    #[error("peer registry is closed")]
    Closed,
    #[error("peer already registered under a different handle")]
    AlreadyRegistered,
    #[error("peer is not registered")]
    NotRegistered,
}

impl Classify for PeerError {
    fn kind(&self) -> ErrorKind {
        match self {
            PeerError::Closed => ErrorKind::Transient,
            PeerError::AlreadyRegistered => ErrorKind::Invariant,
            PeerError::NotRegistered => ErrorKind::NotFound,
        }
    }
}

pub type Result<T> = std::result::Result<T, PeerError>;
