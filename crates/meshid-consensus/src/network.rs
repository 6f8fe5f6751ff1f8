//! In-process loopback Raft transport.
//!
//! Wire transport between devices is this crate's Non-goal — real framing
//! and dispatch live in `meshid-node`'s frame envelope decode. What this
//! module provides is the `RaftNetwork`/`RaftNetworkFactory` plumbing
//! `openraft::Raft::new` requires, grounded on
//! `cbaugus-rust_loadtest/src/raft.rs`'s `GrpcNetwork`/`GrpcNetworkFactory`
//! with the gRPC hop replaced by a direct call into the target's own
//! `openraft::Raft` handle — every identity's raft group sharing one
//! process shares one [`LoopbackRegistry`].

use std::collections::HashMap;
use std::sync::Arc;

use openraft::error::{InstallSnapshotError, RPCError, RaftError, Unreachable};
use openraft::network::{RPCOption, RaftNetwork, RaftNetworkFactory};
use openraft::raft::{
    AppendEntriesRequest, AppendEntriesResponse, InstallSnapshotRequest, InstallSnapshotResponse,
    VoteRequest, VoteResponse,
};
use openraft::{AnyError, BasicNode};
use parking_lot::RwLock;

use crate::storage::{NodeId, RaftInstance, TypeConfig};

/// Process-wide directory of live `Raft` handles, keyed by raft-id.
#[derive(Clone, Default)]
pub struct LoopbackRegistry {
    nodes: Arc<RwLock<HashMap<NodeId, Arc<RaftInstance>>>>,
}

impl LoopbackRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, node_id: NodeId, raft: Arc<RaftInstance>) {
        self.nodes.write().insert(node_id, raft);
    }

    pub fn unregister(&self, node_id: NodeId) {
        self.nodes.write().remove(&node_id);
    }

    fn get(&self, node_id: NodeId) -> Option<Arc<RaftInstance>> {
        self.nodes.read().get(&node_id).cloned()
    }
}

fn unreachable(msg: impl std::fmt::Display) -> Unreachable {
    Unreachable::new(&AnyError::error(msg.to_string()))
}

pub struct LoopbackNetwork {
    target: NodeId,
    registry: LoopbackRegistry,
}

impl RaftNetwork<TypeConfig> for LoopbackNetwork {
    async fn append_entries(
        &mut self,
        rpc: AppendEntriesRequest<TypeConfig>,
        _option: RPCOption,
    ) -> Result<AppendEntriesResponse<NodeId>, RPCError<NodeId, BasicNode, RaftError<NodeId>>> {
        let raft = self
            .registry
            .get(self.target)
            .ok_or_else(|| RPCError::Unreachable(unreachable("peer not registered")))?;
        raft.append_entries(rpc)
            .await
            .map_err(|err| RPCError::Unreachable(unreachable(err)))
    }

    async fn vote(
        &mut self,
        rpc: VoteRequest<NodeId>,
        _option: RPCOption,
    ) -> Result<VoteResponse<NodeId>, RPCError<NodeId, BasicNode, RaftError<NodeId>>> {
        let raft = self
            .registry
            .get(self.target)
            .ok_or_else(|| RPCError::Unreachable(unreachable("peer not registered")))?;
        raft.vote(rpc)
            .await
            .map_err(|err| RPCError::Unreachable(unreachable(err)))
    }

    async fn install_snapshot(
        &mut self,
        rpc: InstallSnapshotRequest<TypeConfig>,
        _option: RPCOption,
    ) -> Result<
        InstallSnapshotResponse<NodeId>,
        RPCError<NodeId, BasicNode, RaftError<NodeId, InstallSnapshotError>>,
    > {
        let raft = self
            .registry
            .get(self.target)
            .ok_or_else(|| RPCError::Unreachable(unreachable("peer not registered")))?;
        raft.install_snapshot(rpc)
            .await
            .map_err(|err| RPCError::Unreachable(unreachable(err)))
    }
}

pub struct LoopbackNetworkFactory {
    registry: LoopbackRegistry,
}

impl LoopbackNetworkFactory {
    pub fn new(registry: LoopbackRegistry) -> Self {
        Self { registry }
    }
}

impl RaftNetworkFactory<TypeConfig> for LoopbackNetworkFactory {
    type Network = LoopbackNetwork;

    async fn new_client(&mut self, target: NodeId, _node: &BasicNode) -> Self::Network {
        LoopbackNetwork {
            target,
            registry: self.registry.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unregistered_peers_are_simply_absent() {
        let registry = LoopbackRegistry::new();
        assert!(registry.get(1).is_none());
    }
}
