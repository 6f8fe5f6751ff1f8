//! `ProtocolManager`: the component that owns an identity end to end —
//! `my_info`/`my_nodes`, the key manager, the master-oplog store and its
//! Merkle tree, the onboarding request tables, and the raft group's commit
//! pipeline. Grounded on `original_source/me/protocol_manager.go`'s
//! `ProtocolManager` struct and `cbaugus-rust_loadtest/src/raft.rs`'s
//! `RaftNode` for the `client_write`/`is_leader` wrapper shape.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use meshid_consensus::{ConfChange, ConfChangeKind, ConsensusError, RaftGroup};
use meshid_crypto::derive_raft_id;
use meshid_peers::PeerRegistry;
use meshid_store::{KvStore, MerkleStore, OplogStore};
use meshid_types::{KeyInfo, MeshId, MyInfo, NodeId, OplogStream};
use parking_lot::RwLock;

use crate::commit_handler::{run_persist_loop, CommitContext};
use crate::error::{MembershipError, Result};
use crate::keymanager::KeyManager;
use crate::my_nodes::SharedMyNodes;
use crate::requests::{FriendRequestTable, RequestTable};

/// `P` is whatever transport handle `meshid-node` registers peers under;
/// this crate never looks inside it, only tracks which class a raft-id
/// falls in.
pub struct ProtocolManager<P: Clone + Send + Sync + 'static> {
    pub my_info: Arc<RwLock<MyInfo>>,
    pub my_nodes: SharedMyNodes,
    pub key_manager: Arc<KeyManager>,
    pub master_store: Arc<OplogStore>,
    pub merkle: Arc<MerkleStore>,
    pub me_requests: Arc<RequestTable>,
    pub friend_requests: Arc<FriendRequestTable>,
    pub peers: Arc<PeerRegistry<P>>,
    pub sign_key: Arc<RwLock<Option<KeyInfo>>>,
    raft: Arc<meshid_consensus::RaftInstance>,
    self_node_id: NodeId,
    self_raft_id: u64,
    applied_index: Arc<AtomicU64>,
}

impl<P: Clone + Send + Sync + 'static> ProtocolManager<P> {
    /// Wires a freshly started [`RaftGroup`] into this identity: spawns the
    /// commit-publication loop (conf-change → `my_nodes` mutation →
    /// signed master-oplog) and the background task that persists each
    /// built oplog, then returns the handle callers drive onboarding and
    /// RPC requests through.
    pub fn new(owner_id: MeshId, self_node_id: NodeId, kv: Arc<dyn KvStore>, raft_group: RaftGroup) -> Self {
        let my_info = Arc::new(RwLock::new(MyInfo::new(owner_id)));
        let my_nodes = SharedMyNodes::new();
        let sign_key = Arc::new(RwLock::new(None));

        let (ctx, persist_rx) =
            CommitContext::new(my_nodes.clone(), my_info.clone(), self_node_id, owner_id, sign_key.clone());
        let applied_index = ctx.applied_index_handle();

        let master_store = Arc::new(OplogStore::new(kv.clone(), OplogStream::Master));
        tokio::spawn(run_persist_loop(persist_rx, master_store.clone()));
        tokio::spawn(meshid_consensus::run_commit_loop(raft_group.applied_rx, ctx));

        ProtocolManager {
            my_info,
            my_nodes,
            key_manager: Arc::new(KeyManager::new(kv.clone(), owner_id)),
            master_store,
            merkle: Arc::new(MerkleStore::new(kv, OplogStream::Master)),
            me_requests: Arc::new(RequestTable::new()),
            friend_requests: Arc::new(RequestTable::new()),
            peers: Arc::new(PeerRegistry::new()),
            sign_key,
            raft: raft_group.raft,
            self_node_id,
            self_raft_id: derive_raft_id(&self_node_id).0,
            applied_index,
        }
    }

    pub fn self_raft_id(&self) -> u64 {
        self.self_raft_id
    }

    pub fn total_weight(&self) -> u32 {
        self.my_nodes.0.read().total_weight()
    }

    pub fn quorum(&self) -> u32 {
        self.my_nodes.0.read().quorum()
    }

    pub fn applied_index(&self) -> u64 {
        self.applied_index.load(Ordering::SeqCst)
    }

    pub fn is_leader(&self) -> bool {
        self.raft.metrics().borrow().current_leader == Some(self.self_raft_id)
    }

    /// Raw raft-id of the current leader, if the group has elected one.
    pub fn current_leader(&self) -> Option<u64> {
        self.raft.metrics().borrow().current_leader
    }

    pub fn current_term(&self) -> u64 {
        self.raft.metrics().borrow().current_term
    }

    /// §4.4's normal propose channel: an onboarding handshake that reached
    /// the operator-confirm step proposes the new device at its node-type
    /// weight.
    pub async fn propose_add_node(&self, node_id: NodeId, weight: u32) -> Result<()> {
        self.client_write(ConfChangeKind::AddNode, node_id, weight).await
    }

    /// §4.4's normal propose channel, remove side.
    pub async fn propose_remove_node(&self, node_id: NodeId) -> Result<()> {
        self.client_write(ConfChangeKind::RemoveNode, node_id, 0).await
    }

    /// §4.4's third (force) channel: an operator-initiated removal that
    /// skips whatever local confirmation gate `propose_remove_node`'s
    /// callers normally sit behind. `openraft`'s `client_write` has no
    /// separate unprioritized submission path the way the original's
    /// `raftForceConfChangeC` channel does, so this only differs from
    /// `propose_remove_node` in caller intent, not in mechanism.
    pub async fn force_remove_node(&self, node_id: NodeId) -> Result<()> {
        self.propose_remove_node(node_id).await
    }

    async fn client_write(&self, kind: ConfChangeKind, node_id: NodeId, weight: u32) -> Result<()> {
        let raft_id = derive_raft_id(&node_id).0;
        let change = ConfChange { kind, raft_id, node_id, weight };
        self.raft
            .client_write(change)
            .await
            .map(|_| ())
            .map_err(|e| MembershipError::Consensus(ConsensusError::Storage(e.to_string())))
    }
}
