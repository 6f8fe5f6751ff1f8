use meshid_types::{Classify, ErrorKind};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {0}")]
    NotFound(String),
    #[error("failed to read config file {path}: {source}")]
    Read { path: String, #[source] source: std::io::Error },
    #[error("invalid TOML in {path}: {source}")]
    Toml { path: String, #[source] source: toml::de::Error },
    #[error("invalid environment variable {key}: {message}")]
    Env { key: String, message: String },
    #[error("{0}")]
    Invalid(String),
}

impl Classify for ConfigError {
    fn kind(&self) -> ErrorKind {
        match self {
            ConfigError::NotFound(_) => ErrorKind::NotFound,
            ConfigError::Read { .. } => ErrorKind::Fatal,
            ConfigError::Toml { .. } => ErrorKind::Validation,
            ConfigError::Env { .. } => ErrorKind::Validation,
            ConfigError::Invalid(_) => ErrorKind::Validation,
        }
    }
}

pub type Result<T> = std::result::Result<T, ConfigError>;
