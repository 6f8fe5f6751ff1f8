use meshid_types::{Classify, ErrorKind};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum NodeError {
    #[error("no route for frame hash")]
    UnknownRoute,
    #[error(transparent)]
    Crypto(#[from] meshid_crypto::CryptoError),
    #[error("unrecognized frame code {0}")]
    UnknownCode(u64),
}

impl Classify for NodeError {
    fn kind(&self) -> ErrorKind {
        match self {
            NodeError::UnknownRoute => ErrorKind::NotFound,
            NodeError::Crypto(e) => e.kind(),
            NodeError::UnknownCode(_) => ErrorKind::Validation,
        }
    }
}

pub type Result<T> = std::result::Result<T, NodeError>;
