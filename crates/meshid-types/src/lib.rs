//! Shared data model for the multi-device identity core.
//!
//! This crate has no behavior — only the types every other component
//! shares (identifiers, timestamps, the weight table, status DAGs,
//! `MyInfo`/`MyNode`/`KeyInfo`/`Oplog`/Merkle leaves, and the storage key
//! layout). Keeping it behavior-free avoids the cyclic-dependency trap the
//! teacher's design notes warn about (§9): every other crate can depend on
//! `meshid-types` without pulling in a sibling component.

pub mod error;
pub mod ids;
pub mod key_info;
pub mod keys;
pub mod merkle;
pub mod my_info;
pub mod my_node;
pub mod oplog;
pub mod status;
pub mod timestamp;
pub mod weight;

pub use error::{Classify, CoreError, ErrorKind};
pub use ids::{Address, MeshId, NodeId, NodeSignId, RaftId};
pub use key_info::{DerivationMeta, KeyInfo, KeyKind};
pub use merkle::{MerkleLeaf, MerkleLevel};
pub use my_info::MyInfo;
pub use my_node::MyNode;
pub use oplog::{Oplog, OplogStream, SignInfo};
pub use status::{OplogStatus, Status};
pub use timestamp::Timestamp;
pub use weight::{quorum, NodeType};
