//! RPC-layer error mapping (§7): "The RPC layer converts known sentinel
//! errors to stable numeric codes for UI consumption." Grounded on the
//! `Classify`/`ErrorKind` taxonomy every component's own error enum
//! already implements; this crate's only job is assigning each `ErrorKind`
//! a stable JSON-RPC error code.

use meshid_types::{Classify, ErrorKind};
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RpcError {
    #[error(transparent)]
    Membership(#[from] meshid_membership::MembershipError),
    #[error(transparent)]
    Node(#[from] meshid_node::NodeError),
    #[error("unknown method {0}")]
    UnknownMethod(String),
    #[error("invalid params: {0}")]
    InvalidParams(String),
}

impl Classify for RpcError {
    fn kind(&self) -> ErrorKind {
        match self {
            RpcError::Membership(e) => e.kind(),
            RpcError::Node(e) => e.kind(),
            RpcError::UnknownMethod(_) => ErrorKind::Validation,
            RpcError::InvalidParams(_) => ErrorKind::Validation,
        }
    }
}

/// Stable numeric codes a UI can match on, one per `ErrorKind` (§7).
#[derive(Clone, Copy, Debug, Serialize)]
pub struct RpcErrorCode(pub i64);

pub fn code_for(kind: ErrorKind) -> RpcErrorCode {
    RpcErrorCode(match kind {
        ErrorKind::Validation => -32001,
        ErrorKind::NotFound => -32002,
        ErrorKind::Invariant => -32003,
        ErrorKind::Transient => -32004,
        ErrorKind::Fatal => -32005,
    })
}

pub type Result<T> = std::result::Result<T, RpcError>;
