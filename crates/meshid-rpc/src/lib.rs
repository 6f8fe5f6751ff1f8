#![allow(clippy::too_many_arguments)]

pub mod dispatch;
pub mod dto;
pub mod error;
pub mod service;

pub use dispatch::{dispatch, RpcRequest, RpcResponse, RpcResponseError};
pub use error::{code_for, Result, RpcError, RpcErrorCode};
pub use service::{MeRpc, MeRpcService};
