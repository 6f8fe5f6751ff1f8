//! Per-identity Raft group (§4.4): one `openraft::Raft<TypeConfig>` per
//! identity, started according to the current device's [`StartupMode`].
//! Grounded on `cbaugus-rust_loadtest/src/raft.rs`'s `RaftNode`/
//! `start_raft_node`, adapted to the in-process [`LoopbackNetwork`] and to
//! bootstrapping a single-member cluster rather than a statically
//! configured peer list.

use std::collections::BTreeMap;
use std::sync::Arc;

use openraft::storage::Adaptor;
use openraft::BasicNode;
use tokio::sync::mpsc;

use crate::network::{LoopbackNetworkFactory, LoopbackRegistry};
use crate::quorum::WeightTable;
use crate::startup::StartupMode;
use crate::storage::{MemStorage, NodeId, RaftInstance, TypeConfig};
use crate::types::RaftEntry;

/// A running per-identity raft group: the `openraft` engine, this crate's
/// weight-table mirror, and the channel of applied conf-change entries
/// waiting to be published by `meshid-membership`.
pub struct RaftGroup {
    pub raft: Arc<RaftInstance>,
    pub node_id: NodeId,
    pub weights: WeightTable,
    pub applied_rx: mpsc::UnboundedReceiver<RaftEntry>,
}

impl RaftGroup {
    /// Start (mid-join: [`StartupMode::RejoinFromStable`]), bootstrap
    /// ([`StartupMode::BootstrapSelf`]), or restart
    /// ([`StartupMode::RestartFromStable`]) this identity's raft group,
    /// registering it in `registry` so other in-process identities'
    /// [`LoopbackNetwork`]s can reach it.
    pub async fn start(
        node_id: NodeId,
        mode: StartupMode,
        registry: LoopbackRegistry,
        raft_config: Arc<openraft::Config>,
    ) -> Self {
        let (storage, applied_rx) = MemStorage::new();
        let (log_store, state_machine) = Adaptor::new(storage);

        let raft = Arc::new(
            openraft::Raft::<TypeConfig>::new(
                node_id,
                raft_config,
                LoopbackNetworkFactory::new(registry.clone()),
                log_store,
                state_machine,
            )
            .await
            .expect("failed to construct raft instance"),
        );

        registry.register(node_id, raft.clone());

        if let StartupMode::BootstrapSelf { weight: _ } = mode {
            let mut members = BTreeMap::new();
            members.insert(node_id, BasicNode { addr: String::new() });
            if let Err(err) = raft.initialize(members).await {
                tracing::info!(%err, "raft group already initialized, ignoring on restart");
            }
        }

        RaftGroup {
            raft,
            node_id,
            weights: WeightTable::new(),
            applied_rx,
        }
    }

    pub fn is_leader(&self) -> bool {
        self.raft.metrics().borrow().current_leader == Some(self.node_id)
    }

    pub async fn shutdown(&self) {
        let _ = self.raft.shutdown().await;
    }
}
