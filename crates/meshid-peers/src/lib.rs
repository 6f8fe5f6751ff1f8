//! Classified peer set (component C, §4.3).

pub mod error;
pub mod registry;

pub use error::{PeerError, Result};
pub use registry::{PeerClass, PeerRegistry};
