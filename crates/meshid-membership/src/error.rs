use meshid_types::{Classify, ErrorKind};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MembershipError {
    #[error("challenge nonce did not match the recorded join request")]
    ChallengeMismatch,
    #[error("join key unknown or already consumed")]
    UnknownJoinKey,
    #[error("{0}")]
    InvalidEntry(String),
    #[error("device {0} is not a known member of my_nodes")]
    UnknownDevice(String),
    #[error("store error: {0}")]
    Store(#[from] meshid_store::StoreError),
    #[error("consensus error: {0}")]
    Consensus(#[from] meshid_consensus::ConsensusError),
    #[error("crypto error: {0}")]
    Crypto(#[from] meshid_crypto::CryptoError),
    #[error("peer registry error: {0}")]
    Peer(#[from] meshid_peers::PeerError),
}

impl Classify for MembershipError {
    fn kind(&self) -> ErrorKind {
        match self {
            MembershipError::ChallengeMismatch => ErrorKind::Validation,
            MembershipError::UnknownJoinKey => ErrorKind::NotFound,
            MembershipError::InvalidEntry(_) => ErrorKind::Invariant,
            MembershipError::UnknownDevice(_) => ErrorKind::Invariant,
            MembershipError::Store(e) => e.kind(),
            MembershipError::Consensus(e) => e.kind(),
            MembershipError::Crypto(e) => e.kind(),
            MembershipError::Peer(e) => e.kind(),
        }
    }
}

pub type Result<T> = std::result::Result<T, MembershipError>;
