//! Conf-change entry shape (§4.4).
//!
//! Only conf-change entries carry meaning in an identity's raft log; a
//! `Normal` entry with non-empty data is a protocol warning, not an error
//! (`original_source/me/protocol_raft_entries.go` `PublishRaftEntries`:
//! `"XXX should be no meaningful EntryNormal"`).

use meshid_types::NodeId;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub enum ConfChangeKind {
    AddNode,
    RemoveNode,
}

/// One membership change, carrying the 64-byte node-id in `context` the
/// way the original embeds it in `ConfChange.Context` for the committing
/// side to re-derive and cross-check the raft-id.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct ConfChange {
    pub kind: ConfChangeKind,
    pub raft_id: u64,
    pub node_id: NodeId,
    pub weight: u32,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum EntryKind {
    /// Application data outside the conf-change path. Expected to always
    /// be empty; non-empty payloads are logged and dropped.
    Normal(Vec<u8>),
    ConfChange(ConfChange),
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RaftEntry {
    pub index: u64,
    pub kind: EntryKind,
}
