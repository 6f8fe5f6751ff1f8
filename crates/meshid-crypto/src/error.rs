use meshid_types::{Classify, ErrorKind};

#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
    #[error("malformed key material: {0}")]
    MalformedKey(String),
    #[error("signature verification failed")]
    InvalidSignature,
    #[error("frame payload too short to contain an IV")]
    ShortFrame,
    #[error("PKCS#7 padding invalid")]
    BadPadding,
    #[error("derived scalar out of range, retry with a new salt")]
    DerivationOutOfRange,
}

impl Classify for CryptoError {
    fn kind(&self) -> ErrorKind {
        match self {
            CryptoError::MalformedKey(_) => ErrorKind::Validation,
            CryptoError::InvalidSignature => ErrorKind::Validation,
            CryptoError::ShortFrame => ErrorKind::Validation,
            CryptoError::BadPadding => ErrorKind::Validation,
            CryptoError::DerivationOutOfRange => ErrorKind::Transient,
        }
    }
}

pub type Result<T> = std::result::Result<T, CryptoError>;
