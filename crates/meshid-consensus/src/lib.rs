#![allow(clippy::too_many_arguments, clippy::large_enum_variant)]
//! Per-identity Raft group (component D, §4.4).
//!
//! One `openraft` group per identity arbitrates membership changes: only
//! conf-change entries carry meaning, and a weighted-quorum overlay sits on
//! top of Raft's native vote-counting liveness so that a desktop's or
//! server's vote counts for more than a lone mobile's.

pub mod commit;
pub mod error;
pub mod group;
pub mod network;
pub mod quorum;
pub mod send;
pub mod startup;
pub mod storage;
pub mod apply;
pub mod types;

pub use commit::{publish_entries, run_commit_loop, CommitSink};
pub use error::{ConsensusError, Result};
pub use group::RaftGroup;
pub use network::{LoopbackNetwork, LoopbackNetworkFactory, LoopbackRegistry};
pub use quorum::WeightTable;
pub use send::{filter_outbound_raft_msgs, RaftDestination};
pub use startup::{startup_mode, StartupMode};
pub use storage::{ApplyResponse, MemStorage, NodeId, RaftInstance, TypeConfig};
pub use apply::raft_entries_to_apply;
pub use types::{ConfChange, ConfChangeKind, EntryKind, RaftEntry};
