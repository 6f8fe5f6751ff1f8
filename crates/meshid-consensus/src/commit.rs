//! Commit publication pipeline (§4.4 steps 1-6), grounded on
//! `original_source/me/protocol_raft_entries.go` `PublishRaftEntries` /
//! `publishEntriesAddNode` / `publishEntriesRemoveNode`.
//!
//! The actual master-oplog synthesis, `my_nodes` mutation, and dial-out
//! live in `meshid-membership` (which owns the my-nodes lock and the
//! oplog store) — this module only owns the entry-walking algorithm and
//! calls out to a [`CommitSink`] for the effectful part, so the publication
//! order and "never regress `applied_index`" invariant are testable without
//! a live identity.

use crate::error::{ConsensusError, Result};
use crate::types::{ConfChange, ConfChangeKind, EntryKind, RaftEntry};
use meshid_crypto::derive_raft_id;

/// Effectful callbacks invoked as conf-change entries commit. Implemented
/// by `meshid-membership`.
pub trait CommitSink {
    fn on_add_node(&mut self, entry_index: u64, change: &ConfChange) -> Result<()>;
    fn on_remove_node(&mut self, entry_index: u64, change: &ConfChange) -> Result<()>;
    fn set_applied_index(&mut self, index: u64);
}

/// Walk `entries` in order, dispatching conf-changes to `sink` and
/// recording `applied_index` after each entry regardless of outcome
/// (matching the original: a failed `publishEntriesAddNode` is logged and
/// the loop continues to the next entry rather than aborting the batch).
pub fn publish_entries(entries: &[RaftEntry], sink: &mut dyn CommitSink) {
    for entry in entries {
        match &entry.kind {
            EntryKind::Normal(data) => {
                if !data.is_empty() {
                    tracing::warn!(index = entry.index, "unexpected non-empty normal raft entry");
                }
            }
            EntryKind::ConfChange(cc) => {
                if let Err(err) = verify_conf_change(cc) {
                    tracing::warn!(index = entry.index, error = %err, "conf-change entry failed verification");
                } else {
                    let result = match cc.kind {
                        ConfChangeKind::AddNode => sink.on_add_node(entry.index, cc),
                        ConfChangeKind::RemoveNode => sink.on_remove_node(entry.index, cc),
                    };
                    if let Err(err) = result {
                        tracing::warn!(index = entry.index, error = %err, "applying conf-change failed");
                    }
                }
            }
        }
        sink.set_applied_index(entry.index);
    }
}

/// Recover the node-id from the entry, re-derive its raft-id, and check it
/// against `cc.raft_id` (§4.4 step 1).
fn verify_conf_change(cc: &ConfChange) -> Result<()> {
    let derived = derive_raft_id(&cc.node_id);
    if derived.0 != cc.raft_id {
        return Err(ConsensusError::InvalidEntry);
    }
    Ok(())
}

/// Drain `applied_rx` forever, calling [`publish_entries`] one entry at a
/// time as they arrive. Spawned as a background task per identity; exits
/// once the sending half (owned by the identity's `MemStorage`) is dropped,
/// i.e. once the raft group shuts down.
pub async fn run_commit_loop(
    mut applied_rx: tokio::sync::mpsc::UnboundedReceiver<RaftEntry>,
    mut sink: impl CommitSink,
) {
    while let Some(entry) = applied_rx.recv().await {
        publish_entries(std::slice::from_ref(&entry), &mut sink);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use meshid_crypto::derive_raft_id;
    use meshid_types::NodeId;
    use std::cell::RefCell;

    #[derive(Default)]
    struct RecordingSink {
        added: Vec<u64>,
        removed: Vec<u64>,
        applied_index: RefCell<u64>,
    }

    impl CommitSink for RecordingSink {
        fn on_add_node(&mut self, entry_index: u64, _change: &ConfChange) -> Result<()> {
            self.added.push(entry_index);
            Ok(())
        }
        fn on_remove_node(&mut self, entry_index: u64, _change: &ConfChange) -> Result<()> {
            self.removed.push(entry_index);
            Ok(())
        }
        fn set_applied_index(&mut self, index: u64) {
            *self.applied_index.borrow_mut() = index;
        }
    }

    fn add_entry(index: u64, node_id: NodeId) -> RaftEntry {
        let raft_id = derive_raft_id(&node_id).0;
        RaftEntry {
            index,
            kind: EntryKind::ConfChange(ConfChange {
                kind: ConfChangeKind::AddNode,
                raft_id,
                node_id,
                weight: 2,
            }),
        }
    }

    #[test]
    fn add_node_entries_are_dispatched_to_the_sink() {
        let entries = vec![add_entry(1, NodeId([1u8; 64]))];
        let mut sink = RecordingSink::default();
        publish_entries(&entries, &mut sink);
        assert_eq!(sink.added, vec![1]);
        assert_eq!(*sink.applied_index.borrow(), 1);
    }

    #[test]
    fn mismatched_raft_id_is_rejected_before_reaching_the_sink() {
        let mut entry = add_entry(1, NodeId([1u8; 64]));
        if let EntryKind::ConfChange(cc) = &mut entry.kind {
            cc.raft_id ^= 1;
        }
        let mut sink = RecordingSink::default();
        publish_entries(&[entry], &mut sink);
        assert!(sink.added.is_empty());
        // applied_index still advances: a rejected entry is still "applied".
        assert_eq!(*sink.applied_index.borrow(), 1);
    }

    #[test]
    fn non_empty_normal_entries_are_warned_and_skipped() {
        let entries = vec![RaftEntry { index: 5, kind: EntryKind::Normal(vec![1, 2]) }];
        let mut sink = RecordingSink::default();
        publish_entries(&entries, &mut sink);
        assert!(sink.added.is_empty());
        assert!(sink.removed.is_empty());
        assert_eq!(*sink.applied_index.borrow(), 5);
    }

    #[test]
    fn applied_index_tracks_the_last_entry_seen() {
        let entries = vec![add_entry(1, NodeId([1u8; 64])), add_entry(2, NodeId([2u8; 64]))];
        let mut sink = RecordingSink::default();
        publish_entries(&entries, &mut sink);
        assert_eq!(*sink.applied_index.borrow(), 2);
    }
}
