use meshid_types::{Classify, ErrorKind};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("entity already registered")]
    AlreadyRegistered,
    #[error("entity not registered")]
    NotRegistered,
}

impl Classify for ServiceError {
    fn kind(&self) -> ErrorKind {
        match self {
            ServiceError::AlreadyRegistered => ErrorKind::Validation,
            ServiceError::NotRegistered => ErrorKind::NotFound,
        }
    }
}

pub type Result<T> = std::result::Result<T, ServiceError>;
