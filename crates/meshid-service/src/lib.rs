#![allow(clippy::too_many_arguments)]

pub mod error;
pub mod registry;

pub use error::{Result, ServiceError};
pub use registry::{Entity, ServiceProtocolManager};
