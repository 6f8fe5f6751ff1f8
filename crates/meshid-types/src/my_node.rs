//! `MyNode` (§3): one physical device owned by an identity.

use crate::ids::{MeshId, NodeId, NodeSignId, RaftId};
use crate::status::Status;
use crate::timestamp::Timestamp;
use crate::weight::NodeType;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MyNode {
    pub owner_id: MeshId,
    pub node_id: NodeId,
    pub raft_id: RaftId,
    pub node_type: NodeType,
    pub weight: u32,
    pub status: Status,
    pub update_ts: Timestamp,
    pub log_id: Option<MeshId>,
}

impl MyNode {
    pub fn new(owner_id: MeshId, node_id: NodeId, raft_id: RaftId, node_type: NodeType) -> Self {
        MyNode {
            owner_id,
            node_id,
            raft_id,
            node_type,
            weight: node_type.weight(),
            status: Status::Init,
            update_ts: Timestamp::now(),
            log_id: None,
        }
    }

    /// `(owner_id, raft_id)` uniqueness key (§3 invariant).
    pub fn identity_key(&self) -> (MeshId, RaftId) {
        (self.owner_id, self.raft_id)
    }

    pub fn node_sign_id(&self, derive: impl FnOnce(&NodeId, &MeshId) -> NodeSignId) -> NodeSignId {
        derive(&self.node_id, &self.owner_id)
    }

    pub fn is_live(&self) -> bool {
        matches!(
            self.status,
            Status::Alive | Status::InternalPending | Status::InternalSync
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn live_statuses_match_weight_monotonicity_invariant() {
        let mut n = MyNode::new(MeshId::ZERO, NodeId([0u8; 64]), RaftId(1), NodeType::Desktop);
        assert!(!n.is_live());
        n.status = Status::InternalPending;
        assert!(n.is_live());
        n.status = Status::Alive;
        assert!(n.is_live());
        n.status = Status::Deleted;
        assert!(!n.is_live());
    }
}
