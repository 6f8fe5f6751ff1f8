//! Commit-publication effects (§4.4 steps 2-6), implementing
//! `meshid_consensus::CommitSink`. Grounded on
//! `original_source/me/protocol_raft_entries.go`'s
//! `publishEntriesAddNodeCreateMasterOplogAndSetMyNode` /
//! `publishEntriesRemoveNode`.
//!
//! `CommitSink`'s methods are synchronous (they run inline in the Raft
//! commit walk, `meshid_consensus::commit::publish_entries`); the actual
//! KV write is async. This module does the synchronous part — my-nodes
//! mutation, master-oplog synthesis, signing — inline, then hands the
//! built `Oplog` to a channel a background task drains into
//! [`meshid_store::OplogStore::save`], so the hot commit path never blocks
//! on storage I/O.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use meshid_consensus::commit::CommitSink;
use meshid_consensus::error::{ConsensusError, Result as ConsensusResult};
use meshid_consensus::types::ConfChange;
use meshid_crypto::{derive_node_sign_id, keccak256, reconstruct, sign};
use meshid_types::{KeyInfo, MeshId, MyInfo, MyNode, NodeId, NodeType, Oplog, RaftId, SignInfo, Status, Timestamp};
use parking_lot::RwLock;
use tokio::sync::mpsc;

use crate::my_nodes::SharedMyNodes;

pub const MASTER_OP_ADD_MASTER: u32 = 1;
pub const MASTER_OP_REVOKE_MASTER: u32 = 2;

/// A built, signed master-oplog still waiting to be persisted.
pub enum PersistJob {
    Save(Oplog),
}

fn node_type_for_weight(weight: u32) -> NodeType {
    match weight {
        4 => NodeType::Server,
        2 => NodeType::Desktop,
        _ => NodeType::Mobile,
    }
}

fn random_log_id() -> MeshId {
    let mut bytes = [0u8; 32];
    rand::RngCore::fill_bytes(&mut rand::rngs::OsRng, &mut bytes);
    MeshId(bytes)
}

fn oplog_signing_hash(log: &Oplog) -> [u8; 32] {
    let mut buf = Vec::new();
    buf.extend_from_slice(log.object_id.as_bytes());
    buf.extend_from_slice(log.doer_id.as_bytes());
    buf.extend_from_slice(&log.op_type.to_be_bytes());
    buf.extend_from_slice(&log.data);
    buf.extend_from_slice(log.log_id.as_bytes());
    keccak256(&buf)
}

pub struct CommitContext {
    my_nodes: SharedMyNodes,
    my_info: Arc<RwLock<MyInfo>>,
    self_node_id: NodeId,
    owner_id: MeshId,
    sign_key: Arc<RwLock<Option<KeyInfo>>>,
    applied_index: Arc<AtomicU64>,
    persist_tx: mpsc::UnboundedSender<PersistJob>,
}

impl CommitContext {
    pub fn new(
        my_nodes: SharedMyNodes,
        my_info: Arc<RwLock<MyInfo>>,
        self_node_id: NodeId,
        owner_id: MeshId,
        sign_key: Arc<RwLock<Option<KeyInfo>>>,
    ) -> (Self, mpsc::UnboundedReceiver<PersistJob>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            CommitContext {
                my_nodes,
                my_info,
                self_node_id,
                owner_id,
                sign_key,
                applied_index: Arc::new(AtomicU64::new(0)),
                persist_tx: tx,
            },
            rx,
        )
    }

    pub fn applied_index(&self) -> u64 {
        self.applied_index.load(Ordering::SeqCst)
    }

    /// A shared handle a caller can poll after handing `self` off to
    /// [`meshid_consensus::commit::run_commit_loop`].
    pub fn applied_index_handle(&self) -> Arc<AtomicU64> {
        self.applied_index.clone()
    }

    /// Sign with the current sign-key, if one is loaded. A missing
    /// sign-key (e.g. before onboarding completes) is logged and produces
    /// an unsigned oplog rather than panicking — the quorum check elsewhere
    /// will simply never cross for it.
    fn sign_oplog(&self, log: &mut Oplog) {
        let guard = self.sign_key.read();
        let Some(key_info) = guard.as_ref() else {
            tracing::warn!("no sign-key loaded, publishing an unsigned master-oplog");
            return;
        };
        let Ok(signing_key) = reconstruct(key_info) else {
            tracing::warn!("sign-key material is malformed, skipping signature");
            return;
        };
        let hash = oplog_signing_hash(log);
        let sig = sign(&signing_key, &hash);
        let signer_id = derive_node_sign_id(&self.self_node_id, &self.owner_id);
        log.merge_signs(std::slice::from_ref(&SignInfo {
            signer_id,
            hash,
            salt: key_info.derivation.as_ref().map(|d| d.salt).unwrap_or([0u8; 16]),
            sig,
            pubkey: meshid_crypto::uncompressed_xy_of(&signing_key).to_vec(),
        }));
    }
}

impl CommitSink for CommitContext {
    fn on_add_node(&mut self, entry_index: u64, change: &ConfChange) -> ConsensusResult<()> {
        let node_sign_id = derive_node_sign_id(&change.node_id, &self.owner_id);
        let is_self = change.node_id == self.self_node_id;

        let existing_weight = {
            let mut nodes = self.my_nodes.0.write();
            let existing = nodes.get(change.raft_id).cloned();
            let existing_weight = existing.as_ref().map(|n| n.weight);
            let mut node = existing.unwrap_or_else(|| {
                MyNode::new(self.owner_id, change.node_id, RaftId(change.raft_id), node_type_for_weight(change.weight))
            });
            if node.status == Status::Init {
                node.status = Status::InternalPending;
            }
            node.weight = change.weight;
            node.update_ts = Timestamp::now();
            nodes.upsert(node, node_sign_id);
            existing_weight
        };

        let mut oplog = Oplog::new(
            self.owner_id,
            self.owner_id,
            MASTER_OP_ADD_MASTER,
            change.node_id.as_bytes().to_vec(),
            None,
            random_log_id(),
            Timestamp::now(),
        );
        let _ = entry_index;
        self.sign_oplog(&mut oplog);

        if is_self {
            let status = self.my_info.read().status;
            match status {
                Status::Pending => {
                    // CreateFullMe: a fresh identity's own first commit has
                    // no restart/sync round trip to wait on, so it climbs
                    // straight to Alive (§4.4 step 5, single-device case).
                    self.my_info.write().advance_status(Status::Alive, Timestamp::now());
                    let mut nodes = self.my_nodes.0.write();
                    if let Some(mut node) = nodes.get(change.raft_id).cloned() {
                        node.status = Status::Alive;
                        node.update_ts = Timestamp::now();
                        nodes.upsert(node, node_sign_id);
                    }
                }
                Status::InternalSync => {
                    // The actual InternalSync -> Alive completion a joining
                    // device hits once this, its first post-restart commit,
                    // carries the quorum's settled weight for it.
                    let expected = existing_weight.unwrap_or(change.weight);
                    let mut info = self.my_info.write();
                    let needs_repropose = crate::onboarding::internal_sync_to_alive(
                        &mut info,
                        &self.my_nodes,
                        change.raft_id,
                        &oplog,
                        change.weight,
                        expected,
                    );
                    drop(info);
                    if needs_repropose {
                        tracing::warn!(
                            raft_id = change.raft_id,
                            settled = change.weight,
                            expected,
                            "committed weight differs from what this device proposed at join time; a corrective re-propose is owed"
                        );
                    }
                }
                _ => {
                    tracing::debug!(raft_id = change.raft_id, ?status, "redundant add-node commit for self, status unchanged");
                }
            }
        } else {
            tracing::info!(raft_id = change.raft_id, "new master device added; dial-out is owned by meshid-node");
        }

        let _ = self.persist_tx.send(PersistJob::Save(oplog));

        Ok(())
    }

    fn on_remove_node(&mut self, entry_index: u64, change: &ConfChange) -> ConsensusResult<()> {
        {
            let mut nodes = self.my_nodes.0.write();
            match nodes.get(change.raft_id).cloned() {
                Some(mut node) => {
                    node.status = Status::Deleted;
                    node.update_ts = Timestamp::now();
                    let node_sign_id = derive_node_sign_id(&node.node_id, &self.owner_id);
                    nodes.upsert(node, node_sign_id);
                }
                None => return Err(ConsensusError::InvalidNode(change.raft_id)),
            }
        }

        let mut oplog = Oplog::new(
            self.owner_id,
            self.owner_id,
            MASTER_OP_REVOKE_MASTER,
            change.node_id.as_bytes().to_vec(),
            None,
            random_log_id(),
            Timestamp::now(),
        );
        let _ = entry_index;
        self.sign_oplog(&mut oplog);
        let _ = self.persist_tx.send(PersistJob::Save(oplog));

        Ok(())
    }

    fn set_applied_index(&mut self, index: u64) {
        self.applied_index.store(index, Ordering::SeqCst);
    }
}

/// Drains `rx`, persisting each built oplog via `store.save`. Spawned
/// alongside `meshid_consensus::commit::run_commit_loop`.
pub async fn run_persist_loop(mut rx: mpsc::UnboundedReceiver<PersistJob>, store: Arc<meshid_store::OplogStore>) {
    while let Some(job) = rx.recv().await {
        match job {
            PersistJob::Save(log) => {
                if let Err(err) = store.save(&log, false).await {
                    tracing::warn!(error = %err, "failed to persist master-oplog after commit");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use meshid_consensus::types::ConfChangeKind;

    fn change(kind: ConfChangeKind, raft_id: u64, node_id: NodeId, weight: u32) -> ConfChange {
        ConfChange { kind, raft_id, node_id, weight }
    }

    #[test]
    fn add_node_for_self_from_pending_reaches_alive() {
        // Single-device bootstrap (§8 scenario 1): the founding device's own
        // add-node commit is the only one it will ever see, so it must reach
        // `Alive` right away rather than stall at `InternalPending`.
        let my_nodes = SharedMyNodes::new();
        let my_info = Arc::new(RwLock::new(MyInfo::new(MeshId::ZERO)));
        let self_node_id = NodeId([9u8; 64]);
        let (mut ctx, _rx) =
            CommitContext::new(my_nodes.clone(), my_info.clone(), self_node_id, MeshId::ZERO, Arc::new(RwLock::new(None)));

        let cc = change(ConfChangeKind::AddNode, 1, self_node_id, 2);
        ctx.on_add_node(5, &cc).unwrap();

        assert_eq!(my_info.read().status, Status::Alive);
        assert_eq!(my_nodes.0.read().get(1).unwrap().status, Status::Alive);
    }

    #[test]
    fn add_node_for_self_from_internal_sync_reaches_alive() {
        // A joining device's post-restart commit: it arrives already at
        // `InternalSync` (set by `onboarding::handle_init_me_info_sync`) and
        // this commit is what actually drives `internal_sync_to_alive`.
        let my_nodes = SharedMyNodes::new();
        let my_info = Arc::new(RwLock::new(MyInfo::new(MeshId::ZERO)));
        my_info.write().status = Status::InternalSync;
        let self_node_id = NodeId([9u8; 64]);
        let (mut ctx, _rx) =
            CommitContext::new(my_nodes.clone(), my_info.clone(), self_node_id, MeshId::ZERO, Arc::new(RwLock::new(None)));

        let cc = change(ConfChangeKind::AddNode, 1, self_node_id, 2);
        ctx.on_add_node(5, &cc).unwrap();

        assert_eq!(my_info.read().status, Status::Alive);
        assert_eq!(my_nodes.0.read().get(1).unwrap().status, Status::Alive);
    }

    #[test]
    fn add_node_for_self_already_alive_is_a_noop() {
        let my_nodes = SharedMyNodes::new();
        let my_info = Arc::new(RwLock::new(MyInfo::new(MeshId::ZERO)));
        my_info.write().status = Status::Alive;
        let self_node_id = NodeId([9u8; 64]);
        let (mut ctx, _rx) =
            CommitContext::new(my_nodes.clone(), my_info.clone(), self_node_id, MeshId::ZERO, Arc::new(RwLock::new(None)));

        let cc = change(ConfChangeKind::AddNode, 1, self_node_id, 4);
        ctx.on_add_node(5, &cc).unwrap();

        assert_eq!(my_info.read().status, Status::Alive);
    }

    #[test]
    fn add_node_for_a_peer_does_not_touch_self_status() {
        let my_nodes = SharedMyNodes::new();
        let my_info = Arc::new(RwLock::new(MyInfo::new(MeshId::ZERO)));
        let self_node_id = NodeId([9u8; 64]);
        let (mut ctx, _rx) =
            CommitContext::new(my_nodes.clone(), my_info.clone(), self_node_id, MeshId::ZERO, Arc::new(RwLock::new(None)));

        let cc = change(ConfChangeKind::AddNode, 2, NodeId([2u8; 64]), 1);
        ctx.on_add_node(1, &cc).unwrap();

        assert_eq!(my_info.read().status, Status::Pending);
        assert!(my_nodes.0.read().get(2).is_some());
    }

    #[test]
    fn remove_node_marks_deleted_and_preserves_unknown_node_error() {
        let my_nodes = SharedMyNodes::new();
        let my_info = Arc::new(RwLock::new(MyInfo::new(MeshId::ZERO)));
        let self_node_id = NodeId([9u8; 64]);
        let (mut ctx, _rx) =
            CommitContext::new(my_nodes.clone(), my_info, self_node_id, MeshId::ZERO, Arc::new(RwLock::new(None)));

        let unknown = change(ConfChangeKind::RemoveNode, 42, NodeId([4u8; 64]), 1);
        assert!(ctx.on_remove_node(1, &unknown).is_err());

        ctx.on_add_node(1, &change(ConfChangeKind::AddNode, 3, NodeId([3u8; 64]), 1)).unwrap();
        ctx.on_remove_node(2, &change(ConfChangeKind::RemoveNode, 3, NodeId([3u8; 64]), 1)).unwrap();
        assert_eq!(my_nodes.0.read().get(3).unwrap().status, Status::Deleted);
    }

    #[test]
    fn applied_index_is_tracked_independently_of_entry_outcome() {
        let my_nodes = SharedMyNodes::new();
        let my_info = Arc::new(RwLock::new(MyInfo::new(MeshId::ZERO)));
        let (mut ctx, _rx) =
            CommitContext::new(my_nodes, my_info, NodeId([1u8; 64]), MeshId::ZERO, Arc::new(RwLock::new(None)));
        ctx.set_applied_index(7);
        assert_eq!(ctx.applied_index(), 7);
    }
}
