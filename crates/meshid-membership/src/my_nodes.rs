//! The `my_nodes` table (§3, §4.4, §5 `lock_my_nodes`).
//!
//! Every device this identity knows about, indexed both by raft-id
//! (primary, matching Raft's own addressing) and by node-sign-id (used to
//! attribute oplog signatures). This is the one structure shared by the
//! Raft commit pipeline ([`meshid_consensus::CommitSink`]/
//! [`meshid_consensus::RaftDestination`]) and the oplog store's quorum
//! check ([`meshid_store::OplogValidator`]), so both are implemented here
//! rather than duplicating the weight table.
//!
//! Grounded on `original_source/me/protocol_raft_entries.go`'s
//! `pm.MyNodes map[uint64]*MyNode` plus the node-sign-id index implied by
//! `my_node_by_node_sign_id` throughout the onboarding/sync files.

use std::collections::HashMap;

use meshid_consensus::send::RaftDestination;
use meshid_store::OplogValidator;
use meshid_types::{quorum, MyNode, NodeSignId, OplogStream, SignInfo, Status};
use parking_lot::RwLock;

/// Devices known to this identity, keyed by raft-id. Readers (peer-list
/// building, outbound raft-msg dispatch) take the read lock; the Raft
/// commit pipeline takes the write lock for the whole entry application so
/// that master-oplog creation and the node-index update stay atomic (§5).
#[derive(Default)]
pub struct MyNodes {
    by_raft_id: HashMap<u64, MyNode>,
    by_node_sign_id: HashMap<NodeSignId, u64>,
}

impl MyNodes {
    pub fn new() -> Self {
        MyNodes::default()
    }

    pub fn get(&self, raft_id: u64) -> Option<&MyNode> {
        self.by_raft_id.get(&raft_id)
    }

    pub fn get_by_node_sign_id(&self, id: &NodeSignId) -> Option<&MyNode> {
        self.by_node_sign_id.get(id).and_then(|raft_id| self.by_raft_id.get(raft_id))
    }

    /// Upsert a device record, indexing it under `node_sign_id`. Returns
    /// the previous record if one existed under this raft-id.
    pub fn upsert(&mut self, node: MyNode, node_sign_id: NodeSignId) -> Option<MyNode> {
        let raft_id = node.raft_id.0;
        self.by_node_sign_id.insert(node_sign_id, raft_id);
        self.by_raft_id.insert(raft_id, node)
    }

    pub fn remove(&mut self, raft_id: u64) -> Option<MyNode> {
        let node = self.by_raft_id.remove(&raft_id)?;
        self.by_node_sign_id.retain(|_, v| *v != raft_id);
        Some(node)
    }

    /// `total_weight = Σ weight(d)` over devices whose status is live
    /// (§8 weight-monotonicity invariant): `alive`, `internal_pending`, or
    /// `internal_sync`.
    pub fn total_weight(&self) -> u32 {
        self.by_raft_id
            .values()
            .filter(|n| n.is_live())
            .map(|n| n.weight)
            .sum()
    }

    pub fn quorum(&self) -> u32 {
        quorum(self.total_weight())
    }

    pub fn len(&self) -> usize {
        self.by_raft_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_raft_id.is_empty()
    }

    pub fn snapshot(&self) -> Vec<MyNode> {
        self.by_raft_id.values().cloned().collect()
    }
}

/// Shared handle, implementing the traits sibling crates ask for without
/// needing to know about `MyNodes`' internals.
#[derive(Clone, Default)]
pub struct SharedMyNodes(pub std::sync::Arc<RwLock<MyNodes>>);

impl SharedMyNodes {
    pub fn new() -> Self {
        SharedMyNodes(std::sync::Arc::new(RwLock::new(MyNodes::new())))
    }
}

impl RaftDestination for SharedMyNodes {
    fn status(&self, raft_id: u64) -> Option<Status> {
        self.0.read().get(raft_id).map(|n| n.status)
    }

    /// This table alone can't see live transport connections; `has_live_peer`
    /// is conservatively `true` for any known, non-deleted device so the
    /// filter in `send.rs` falls through to the real peer-registry check
    /// layered on top by `meshid-node`. Callers that need the strict
    /// peer-aware filter should compose `SharedMyNodes` with a
    /// `meshid_peers::PeerRegistry` lookup instead of using it bare.
    fn has_live_peer(&self, raft_id: u64) -> bool {
        matches!(self.status(raft_id), Some(s) if s != Status::Deleted)
    }
}

/// Weigh a set of oplog signatures against the live device weight table
/// (§8 quorum-correctness invariant): `is_valid_internal_oplog(signs)` iff
/// the summed weight of signers mapped through `my_node_by_node_sign_id` is
/// ≥ `quorum()`.
impl OplogValidator for SharedMyNodes {
    fn weigh(&self, _stream: OplogStream, _entity: &meshid_types::MeshId, signs: &[SignInfo]) -> (u32, bool) {
        let table = self.0.read();
        let weighed: u32 = signs
            .iter()
            .filter_map(|s| table.get_by_node_sign_id(&s.signer_id))
            .filter(|n| n.is_live())
            .map(|n| n.weight)
            .sum();
        let met = weighed >= table.quorum();
        (weighed, met)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use meshid_crypto::derive_raft_id;
    use meshid_types::{NodeId, NodeType, RaftId, Timestamp};

    fn node(weight: u32, status: Status, raft_id: u64) -> MyNode {
        let mut n = MyNode::new(meshid_types::MeshId::ZERO, NodeId([raft_id as u8; 64]), RaftId(raft_id), NodeType::Desktop);
        n.weight = weight;
        n.status = status;
        n.update_ts = Timestamp::now();
        n
    }

    #[test]
    fn total_weight_counts_only_live_devices() {
        let mut nodes = MyNodes::new();
        nodes.upsert(node(2, Status::Alive, 1), NodeSignId([1; 32]));
        nodes.upsert(node(4, Status::Deleted, 2), NodeSignId([2; 32]));
        nodes.upsert(node(1, Status::InternalPending, 3), NodeSignId([3; 32]));
        assert_eq!(nodes.total_weight(), 3);
    }

    #[test]
    fn quorum_tracks_total_weight() {
        let mut nodes = MyNodes::new();
        nodes.upsert(node(2, Status::Alive, 1), NodeSignId([1; 32]));
        nodes.upsert(node(2, Status::Alive, 2), NodeSignId([2; 32]));
        assert_eq!(nodes.quorum(), 3);
    }

    #[test]
    fn shared_my_nodes_weighs_signatures_via_oplog_validator() {
        let shared = SharedMyNodes::new();
        {
            let mut guard = shared.0.write();
            guard.upsert(node(4, Status::Alive, 1), NodeSignId([1; 32]));
            guard.upsert(node(1, Status::Alive, 2), NodeSignId([2; 32]));
        }

        let sign = |id: u8| SignInfo {
            signer_id: NodeSignId([id; 32]),
            hash: [0; 32],
            salt: [0; 16],
            sig: vec![],
            pubkey: vec![],
        };

        let (weight, met) = shared.weigh(OplogStream::Master, &meshid_types::MeshId::ZERO, &[sign(2)]);
        assert_eq!(weight, 1);
        assert!(!met);

        let (weight, met) = shared.weigh(OplogStream::Master, &meshid_types::MeshId::ZERO, &[sign(1)]);
        assert_eq!(weight, 4);
        assert!(met);
    }

    #[test]
    fn remove_drops_both_indices() {
        let mut nodes = MyNodes::new();
        nodes.upsert(node(2, Status::Alive, 1), NodeSignId([1; 32]));
        nodes.remove(1);
        assert!(nodes.get(1).is_none());
        assert!(nodes.get_by_node_sign_id(&NodeSignId([1; 32])).is_none());
    }

    #[test]
    fn derive_raft_id_matches_upsert_key_shape() {
        let node_id = NodeId([7u8; 64]);
        let raft_id = derive_raft_id(&node_id);
        assert_eq!(raft_id.0, raft_id.0);
    }
}
