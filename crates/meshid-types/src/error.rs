//! Shared error taxonomy (§7).
//!
//! Every component-level error type in the workspace implements
//! [`Classify`] so the PM event loop and the RPC layer can react to the
//! five buckets uniformly without matching on each crate's concrete enum.

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ErrorKind {
    /// Bad signature, wrong entity hash, malformed payload, wrong raft-id
    /// derivation, non-matching challenge. Logged at warn, never retried.
    Validation,
    /// Store miss / unknown key. Background loops continue.
    NotFound,
    /// `ErrInvalidMe`/`ErrInvalidNode`/`ErrInvalidEntry`-class violation of
    /// a structural invariant. Fatal to the current operation only.
    Invariant,
    /// Transport error, short write, lock contention timeout. Retried with
    /// jittered backoff.
    Transient,
    /// Storage open failure at boot, corrupt master-log-id. Process exits.
    Fatal,
}

pub trait Classify: std::error::Error {
    fn kind(&self) -> ErrorKind;
}

/// Generic error used by components that don't need a richer enum of
/// their own (e.g. `meshid-store`'s `KvStore` trait boundary).
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("invariant violated: {0}")]
    Invariant(String),
    #[error("transient failure: {0}")]
    Transient(String),
    #[error("fatal: {0}")]
    Fatal(String),
}

impl Classify for CoreError {
    fn kind(&self) -> ErrorKind {
        match self {
            CoreError::Validation(_) => ErrorKind::Validation,
            CoreError::NotFound(_) => ErrorKind::NotFound,
            CoreError::Invariant(_) => ErrorKind::Invariant,
            CoreError::Transient(_) => ErrorKind::Transient,
            CoreError::Fatal(_) => ErrorKind::Fatal,
        }
    }
}
