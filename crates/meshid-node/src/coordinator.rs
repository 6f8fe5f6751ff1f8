//! Per-node coordinator singleton (component G, §4.7).
//!
//! Grounded on `original_source/service/ptt.go`'s `BasePtt` struct and
//! `ptt_core.go`/`ptt_utils_me.go`'s accessor methods: one process-wide
//! value owning the address routing tables, the self-identity handle, and
//! the stop/restart broadcast. The original's per-connection goroutine +
//! `sync.WaitGroup` pair becomes a `tokio::sync::watch` pair here, the
//! same shutdown-race shape `meshid-peers::PeerRegistry` already uses.

use std::sync::Arc;

use meshid_consensus::RaftGroup;
use meshid_crypto::Frame;
use meshid_store::{KvStore, MerkleStore};
use meshid_types::{MeshId, NodeId, OplogStream};
use meshid_service::{Entity, ServiceProtocolManager};
use tokio::sync::watch;

use crate::dispatch::{route_inbound, RoutedFrame};
use crate::error::Result;
use crate::routing::RouteTable;

/// `P` is the transport peer-handle type `meshid-membership::ProtocolManager`
/// is itself generic over; the coordinator never looks inside it.
pub struct Coordinator<P: Clone + Send + Sync + 'static> {
    pub joins: RouteTable,
    pub ops: RouteTable,
    pub registry: Arc<ServiceProtocolManager>,
    pub me: Arc<meshid_membership::ProtocolManager<P>>,
    pub me_oplog_merkle: Arc<MerkleStore>,
    pub master_oplog_merkle: Arc<MerkleStore>,
    self_node_id: NodeId,
    stop_tx: watch::Sender<()>,
    restart_tx: watch::Sender<()>,
}

impl<P: Clone + Send + Sync + 'static> Coordinator<P> {
    /// Mirrors `NewPtt` + `SetMyEntity`: the node-scoped Merkle trees are
    /// built for the self-identity's master/me oplog streams as soon as
    /// that identity is known, not lazily per request.
    pub fn new(self_node_id: NodeId, owner_id: MeshId, kv: Arc<dyn KvStore>, raft_group: RaftGroup) -> Self {
        let me = Arc::new(meshid_membership::ProtocolManager::new(owner_id, self_node_id, kv.clone(), raft_group));
        let (stop_tx, _) = watch::channel(());
        let (restart_tx, _) = watch::channel(());

        Coordinator {
            joins: RouteTable::new(),
            ops: RouteTable::new(),
            registry: Arc::new(ServiceProtocolManager::new()),
            me,
            me_oplog_merkle: Arc::new(MerkleStore::new(kv.clone(), OplogStream::Me)),
            master_oplog_merkle: Arc::new(MerkleStore::new(kv, OplogStream::Master)),
            self_node_id,
            stop_tx,
            restart_tx,
        }
    }

    pub fn self_node_id(&self) -> NodeId {
        self.self_node_id
    }

    pub fn watch_stop(&self) -> watch::Receiver<()> {
        self.stop_tx.subscribe()
    }

    pub fn watch_restart(&self) -> watch::Receiver<()> {
        self.restart_tx.subscribe()
    }

    /// `Shutdown`: broadcast once, idempotently, to every subscriber.
    pub fn shutdown(&self) {
        let _ = self.stop_tx.send(());
    }

    pub fn restart(&self) {
        let _ = self.restart_tx.send(());
    }

    /// Decode a received frame and resolve which routing table it belongs
    /// to, without yet decrypting the inner payload (§4.7). Callers act on
    /// the returned [`RoutedFrame`] with whichever key applies to its
    /// branch.
    pub fn route_inbound(&self, bytes: &[u8]) -> Result<RoutedFrame> {
        route_inbound(bytes, &self.joins, &self.ops)
    }

    /// Re-encode and hand a frame to the caller for transport send; kept
    /// here rather than in `dispatch` since outbound framing needs the
    /// coordinator's own node id.
    pub fn encode_outbound(&self, code: u64, frame: &Frame, key_scalar: &[u8; 32], op: u32, data: &[u8]) -> Frame {
        Frame::encode(self.self_node_id, code, frame.hash, key_scalar, op, data, frame.relay)
    }
}

/// Adapts a hosted identity's `ProtocolManager` so `meshid-service`'s
/// registry can track it without depending on this crate's concrete `P`.
pub struct MeEntity<P: Clone + Send + Sync + 'static> {
    owner_id: MeshId,
    pm: Arc<meshid_membership::ProtocolManager<P>>,
}

impl<P: Clone + Send + Sync + 'static> MeEntity<P> {
    pub fn new(owner_id: MeshId, pm: Arc<meshid_membership::ProtocolManager<P>>) -> Self {
        MeEntity { owner_id, pm }
    }

    pub fn protocol_manager(&self) -> &Arc<meshid_membership::ProtocolManager<P>> {
        &self.pm
    }
}

impl<P: Clone + Send + Sync + 'static> Entity for MeEntity<P> {
    fn id(&self) -> MeshId {
        self.owner_id
    }

    fn set_no_more_peers(&self, mut rx: watch::Receiver<()>) {
        let peers = self.pm.peers.clone();
        tokio::spawn(async move {
            if rx.changed().await.is_ok() {
                peers.close();
            }
        });
    }
}
