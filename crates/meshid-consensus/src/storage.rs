//! `openraft` storage backend (§4.4), grounded on
//! `cbaugus-rust_loadtest/src/raft.rs`'s `MemStorage`: an in-memory
//! combined `RaftStorage` (v1 API) wrapped by `Adaptor::new` into the v2
//! `RaftLogStorage`/`RaftStateMachine` split `Raft::new` expects.
//!
//! This identity core never needs a real snapshot format — its raft
//! working set is a handful of devices, not the oplog itself, which has
//! its own Merkle-based reconciliation in `meshid-store` — so the
//! snapshot here is a flat JSON dump of the weight table for restart
//! continuity only.

use std::collections::BTreeMap;
use std::io::Cursor;
use std::ops::RangeBounds;

use openraft::storage::{RaftLogReader, RaftSnapshotBuilder, RaftStorage};
use openraft::{
    BasicNode, Entry, EntryPayload, LogId, LogState, RaftLogId, Snapshot, SnapshotMeta,
    StorageError, StoredMembership, TokioRuntime, Vote,
};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::types::{ConfChange, ConfChangeKind, EntryKind, RaftEntry};

pub type NodeId = u64;

/// Application-level response to a committed entry. Carries nothing: the
/// interesting side effect (dispatching to [`crate::commit::CommitSink`])
/// happens off the `applied_tx` channel, not the client-write return value.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ApplyResponse;

openraft::declare_raft_types!(
    pub TypeConfig:
        D            = ConfChange,
        R            = ApplyResponse,
        NodeId       = NodeId,
        Node         = BasicNode,
        Entry        = Entry<TypeConfig>,
        SnapshotData = Cursor<Vec<u8>>,
        AsyncRuntime = TokioRuntime,
);

pub type RaftInstance = openraft::Raft<TypeConfig>;

#[derive(Serialize, Deserialize, Default)]
struct SnapshotPayload {
    weights: Vec<(NodeId, u32)>,
}

/// In-memory combined storage plus an outbound channel of applied
/// conf-change entries. `meshid-membership` drains `applied_rx` (handed
/// back from [`MemStorage::new`]) through
/// [`crate::commit::publish_entries`] — the channel stands in for the
/// original's in-process `raft.Ready()` apply loop.
pub struct MemStorage {
    vote: Option<Vote<NodeId>>,
    log: BTreeMap<u64, Entry<TypeConfig>>,
    committed: Option<LogId<NodeId>>,
    last_purged: Option<LogId<NodeId>>,
    last_applied: Option<LogId<NodeId>>,
    last_membership: StoredMembership<NodeId, BasicNode>,
    weights: BTreeMap<NodeId, u32>,
    applied_tx: mpsc::UnboundedSender<RaftEntry>,
}

impl MemStorage {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<RaftEntry>) {
        let (applied_tx, applied_rx) = mpsc::unbounded_channel();
        let storage = Self {
            vote: None,
            log: BTreeMap::new(),
            committed: None,
            last_purged: None,
            last_applied: None,
            last_membership: StoredMembership::default(),
            weights: BTreeMap::new(),
            applied_tx,
        };
        (storage, applied_rx)
    }
}

impl RaftLogReader<TypeConfig> for MemStorage {
    async fn try_get_log_entries<RB>(
        &mut self,
        range: RB,
    ) -> Result<Vec<Entry<TypeConfig>>, StorageError<NodeId>>
    where
        RB: RangeBounds<u64> + Clone + std::fmt::Debug + Send,
    {
        Ok(self.log.range(range).map(|(_, e)| e.clone()).collect())
    }
}

pub struct MemLogReader {
    log: BTreeMap<u64, Entry<TypeConfig>>,
}

impl RaftLogReader<TypeConfig> for MemLogReader {
    async fn try_get_log_entries<RB>(
        &mut self,
        range: RB,
    ) -> Result<Vec<Entry<TypeConfig>>, StorageError<NodeId>>
    where
        RB: RangeBounds<u64> + Clone + std::fmt::Debug + Send,
    {
        Ok(self.log.range(range).map(|(_, e)| e.clone()).collect())
    }
}

pub struct MemSnapshotBuilder {
    last_applied: Option<LogId<NodeId>>,
    last_membership: StoredMembership<NodeId, BasicNode>,
    weights: BTreeMap<NodeId, u32>,
}

impl RaftSnapshotBuilder<TypeConfig> for MemSnapshotBuilder {
    async fn build_snapshot(&mut self) -> Result<Snapshot<TypeConfig>, StorageError<NodeId>> {
        let payload = SnapshotPayload {
            weights: self.weights.iter().map(|(k, v)| (*k, *v)).collect(),
        };
        let data = serde_json::to_vec(&payload).unwrap_or_default();
        let snap_id = self
            .last_applied
            .map(|id| format!("{}-{}", id.leader_id, id.index))
            .unwrap_or_else(|| "0".to_string());

        Ok(Snapshot {
            meta: SnapshotMeta {
                last_log_id: self.last_applied,
                last_membership: self.last_membership.clone(),
                snapshot_id: snap_id,
            },
            snapshot: Box::new(Cursor::new(data)),
        })
    }
}

/// `RaftStorage` v1 implementation, wrapped by `Adaptor::new(store)` at the
/// call site to produce the v2 split traits `Raft::new` expects. Method
/// names follow the v1 API (`append_to_log`, not `append`; `apply_to_state_machine`,
/// not `apply`).
impl RaftStorage<TypeConfig> for MemStorage {
    type LogReader = MemLogReader;
    type SnapshotBuilder = MemSnapshotBuilder;

    async fn save_vote(&mut self, vote: &Vote<NodeId>) -> Result<(), StorageError<NodeId>> {
        self.vote = Some(*vote);
        Ok(())
    }

    async fn read_vote(&mut self) -> Result<Option<Vote<NodeId>>, StorageError<NodeId>> {
        Ok(self.vote)
    }

    async fn get_log_state(&mut self) -> Result<LogState<TypeConfig>, StorageError<NodeId>> {
        let last = self.log.values().next_back().map(|e| *e.get_log_id());
        Ok(LogState {
            last_purged_log_id: self.last_purged,
            last_log_id: last,
        })
    }

    async fn save_committed(
        &mut self,
        committed: Option<LogId<NodeId>>,
    ) -> Result<(), StorageError<NodeId>> {
        self.committed = committed;
        Ok(())
    }

    async fn read_committed(&mut self) -> Result<Option<LogId<NodeId>>, StorageError<NodeId>> {
        Ok(self.committed)
    }

    async fn get_log_reader(&mut self) -> Self::LogReader {
        MemLogReader { log: self.log.clone() }
    }

    async fn append_to_log<I>(&mut self, entries: I) -> Result<(), StorageError<NodeId>>
    where
        I: IntoIterator<Item = Entry<TypeConfig>> + Send,
    {
        for entry in entries {
            self.log.insert(entry.get_log_id().index, entry);
        }
        Ok(())
    }

    async fn delete_conflict_logs_since(
        &mut self,
        log_id: LogId<NodeId>,
    ) -> Result<(), StorageError<NodeId>> {
        self.log.retain(|&idx, _| idx < log_id.index);
        Ok(())
    }

    async fn purge_logs_upto(&mut self, log_id: LogId<NodeId>) -> Result<(), StorageError<NodeId>> {
        self.log.retain(|&idx, _| idx > log_id.index);
        self.last_purged = Some(log_id);
        Ok(())
    }

    async fn last_applied_state(
        &mut self,
    ) -> Result<(Option<LogId<NodeId>>, StoredMembership<NodeId, BasicNode>), StorageError<NodeId>>
    {
        Ok((self.last_applied, self.last_membership.clone()))
    }

    /// Apply committed entries: `ConfChange` payloads update the local
    /// weight mirror and are forwarded on `applied_tx` for
    /// `meshid-membership` to publish; `Membership` payloads (openraft's
    /// own voter-set bookkeeping) just update `last_membership`.
    async fn apply_to_state_machine(
        &mut self,
        entries: &[Entry<TypeConfig>],
    ) -> Result<Vec<ApplyResponse>, StorageError<NodeId>> {
        let mut responses = Vec::with_capacity(entries.len());
        for entry in entries {
            self.last_applied = Some(*entry.get_log_id());
            let index = entry.get_log_id().index;
            match &entry.payload {
                EntryPayload::Blank => {}
                EntryPayload::Normal(cc) => {
                    match cc.kind {
                        ConfChangeKind::AddNode => {
                            self.weights.insert(cc.raft_id, cc.weight);
                        }
                        ConfChangeKind::RemoveNode => {
                            self.weights.remove(&cc.raft_id);
                        }
                    }
                    let _ = self.applied_tx.send(RaftEntry {
                        index,
                        kind: EntryKind::ConfChange(*cc),
                    });
                }
                EntryPayload::Membership(m) => {
                    self.last_membership = StoredMembership::new(Some(*entry.get_log_id()), m.clone());
                }
            }
            responses.push(ApplyResponse);
        }
        Ok(responses)
    }

    async fn get_snapshot_builder(&mut self) -> Self::SnapshotBuilder {
        MemSnapshotBuilder {
            last_applied: self.last_applied,
            last_membership: self.last_membership.clone(),
            weights: self.weights.clone(),
        }
    }

    async fn begin_receiving_snapshot(&mut self) -> Result<Box<Cursor<Vec<u8>>>, StorageError<NodeId>> {
        Ok(Box::new(Cursor::new(Vec::new())))
    }

    async fn install_snapshot(
        &mut self,
        meta: &SnapshotMeta<NodeId, BasicNode>,
        snapshot: Box<Cursor<Vec<u8>>>,
    ) -> Result<(), StorageError<NodeId>> {
        let payload: SnapshotPayload =
            serde_json::from_slice(snapshot.get_ref()).unwrap_or_default();
        self.last_applied = meta.last_log_id;
        self.last_membership = meta.last_membership.clone();
        self.weights = payload.weights.into_iter().collect();
        Ok(())
    }

    async fn get_current_snapshot(&mut self) -> Result<Option<Snapshot<TypeConfig>>, StorageError<NodeId>> {
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn vote_roundtrips() {
        let (mut s, _rx) = MemStorage::new();
        let vote = Vote::new(1, 7);
        s.save_vote(&vote).await.unwrap();
        assert_eq!(s.read_vote().await.unwrap(), Some(vote));
    }

    #[tokio::test]
    async fn initial_log_state_is_empty() {
        let (mut s, _rx) = MemStorage::new();
        let state = s.get_log_state().await.unwrap();
        assert!(state.last_log_id.is_none());
        assert!(state.last_purged_log_id.is_none());
    }

    #[tokio::test]
    async fn applying_a_conf_change_updates_weights_and_forwards_it() {
        use crate::types::ConfChange;
        use meshid_types::NodeId as MeshNodeId;
        use openraft::{CommittedLeaderId, Entry, EntryPayload, LogId};

        let (mut s, mut rx) = MemStorage::new();
        let log_id = LogId::new(CommittedLeaderId::new(1, 1), 1);
        let cc = ConfChange {
            kind: ConfChangeKind::AddNode,
            raft_id: 42,
            node_id: MeshNodeId([0u8; 64]),
            weight: 2,
        };
        let entry = Entry::<TypeConfig> {
            log_id,
            payload: EntryPayload::Normal(cc),
        };
        s.apply_to_state_machine(&[entry]).await.unwrap();
        assert_eq!(s.weights.get(&42), Some(&2));
        let forwarded = rx.try_recv().unwrap();
        assert_eq!(forwarded.index, 1);
    }

    #[tokio::test]
    async fn snapshot_roundtrips_the_weight_table() {
        let (mut s, _rx) = MemStorage::new();
        s.weights.insert(9, 4);
        let mut builder = s.get_snapshot_builder().await;
        let snap = builder.build_snapshot().await.unwrap();

        let (mut s2, _rx2) = MemStorage::new();
        s2.install_snapshot(&snap.meta, snap.snapshot).await.unwrap();
        assert_eq!(s2.weights.get(&9), Some(&4));
    }
}
