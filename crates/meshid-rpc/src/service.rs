//! `MeRpc`: one method per §6 `me_*` name, implemented against a hosted
//! identity's [`meshid_node::Coordinator`]. Grounded on
//! `original_source/me/api.go`'s `PrivateAPI`/`PublicAPI` method set,
//! narrowed to the in-scope names §6 lists (the account/content/friend
//! methods stay behind their own out-of-scope subsystems per §1).

use std::sync::Arc;

use async_trait::async_trait;
use meshid_membership::JoinRecord;
use meshid_node::Coordinator;
use meshid_peers::PeerClass;
use meshid_types::{Address, KeyKind, NodeId, Status, Timestamp};

use crate::dto::{
    BackendCountPeers, BackendJoinRequest, BackendJoinUrl, BackendKeyInfo, BackendMyInfo, BackendMyNode, RaftStatus,
};
use crate::error::Result;

/// `load_at_startup`'s expiry window has no "never expire" sentinel; RPC
/// reads that want the full key history just pass a window far longer
/// than any realistic key lifetime instead.
const NO_PRACTICAL_EXPIRY_SECONDS: i64 = 100 * 365 * 24 * 3600;

#[async_trait]
pub trait MeRpc {
    async fn get(&self) -> Result<BackendMyInfo>;
    async fn get_raw_me(&self) -> Result<BackendMyInfo>;
    async fn get_total_weight(&self) -> Result<u32>;
    async fn get_my_nodes(&self) -> Result<Vec<BackendMyNode>>;
    async fn show_me_url(&self) -> Result<BackendJoinUrl>;
    async fn join_me(&self, join_key_hash_hex: String, creator_name: Vec<u8>) -> Result<BackendJoinRequest>;
    async fn show_my_key(&self) -> Result<String>;
    async fn set_my_name(&self, name: Vec<u8>) -> Result<BackendMyInfo>;
    async fn set_my_image(&self, img: Vec<u8>) -> Result<BackendMyInfo>;
    async fn revoke(&self) -> Result<bool>;
    async fn get_raft_status(&self) -> Result<RaftStatus>;
    async fn force_remove_node(&self, node_id_hex: String) -> Result<bool>;
    async fn get_join_key_infos(&self) -> Result<Vec<BackendKeyInfo>>;
    async fn get_op_key_infos(&self) -> Result<Vec<BackendKeyInfo>>;
    async fn get_friend_requests(&self) -> Result<Vec<BackendJoinRequest>>;
    async fn get_me_requests(&self) -> Result<Vec<BackendJoinRequest>>;
    async fn count_peers(&self) -> Result<BackendCountPeers>;
    async fn get_peers(&self) -> Result<Vec<String>>;
}

/// `P` is whatever peer-handle type the hosted `Coordinator` was built
/// with; `MeRpc` never looks inside it.
pub struct MeRpcService<P: Clone + Send + Sync + 'static> {
    coordinator: Arc<Coordinator<P>>,
}

impl<P: Clone + Send + Sync + 'static> MeRpcService<P> {
    pub fn new(coordinator: Arc<Coordinator<P>>) -> Self {
        MeRpcService { coordinator }
    }

    fn record_to_dto(record: JoinRecord) -> BackendJoinRequest {
        BackendJoinRequest {
            hash: hex::encode(record.hash.0),
            status: match record.status {
                Status::Init => 0,
                Status::Pending => 1,
                Status::InternalPending => 2,
                Status::InternalSync => 3,
                Status::Alive => 4,
                Status::Deleted => 5,
            },
            creator_id: record.creator_id.to_string(),
        }
    }
}

#[async_trait]
impl<P: Clone + Send + Sync + 'static> MeRpc for MeRpcService<P> {
    async fn get(&self) -> Result<BackendMyInfo> {
        Ok((&*self.coordinator.me.my_info.read()).into())
    }

    async fn get_raw_me(&self) -> Result<BackendMyInfo> {
        self.get().await
    }

    async fn get_total_weight(&self) -> Result<u32> {
        Ok(self.coordinator.me.total_weight())
    }

    async fn get_my_nodes(&self) -> Result<Vec<BackendMyNode>> {
        Ok(self.coordinator.me.my_nodes.0.read().snapshot().iter().map(Into::into).collect())
    }

    async fn show_me_url(&self) -> Result<BackendJoinUrl> {
        let owner = self.coordinator.me.my_info.read().id;
        let join_key = self.coordinator.me.key_manager.new_key(owner, KeyKind::Join, None).await?;
        Ok(BackendJoinUrl {
            identity_id: owner.to_string(),
            acker_node_id: self.coordinator.self_node_id().to_string(),
            join_key_hash: hex::encode(join_key.address.0),
        })
    }

    /// Records the outbound attempt in the me-requests table; actually
    /// carrying the resulting `JoinRequest` to the acker over the wire is
    /// `meshid-node`'s transport concern (§1 Non-goal here).
    async fn join_me(&self, join_key_hash_hex: String, creator_name: Vec<u8>) -> Result<BackendJoinRequest> {
        let bytes = hex::decode(&join_key_hash_hex)
            .map_err(|e| crate::error::RpcError::InvalidParams(e.to_string()))?;
        let hash = Address::from_slice(&bytes)
            .ok_or_else(|| crate::error::RpcError::InvalidParams("join key hash must be 20 bytes".into()))?;

        let self_id = self.coordinator.self_node_id();
        let _request = meshid_membership::onboarding::build_join_request(self_id, creator_name);

        let record = JoinRecord {
            hash,
            status: Status::Init,
            creator_id: self.coordinator.me.my_info.read().id,
            requested_at: Timestamp::now(),
        };
        self.coordinator.me.me_requests.insert(record.clone());
        Ok(Self::record_to_dto(record))
    }

    /// The original's `ShowMyKey` surfaces the node's own transport key so
    /// it can be copy-pasted when joining from elsewhere; this core models
    /// device identity as a bare public `NodeId` rather than holding a
    /// private signing key for it, so this returns the node id's hex form
    /// (documented simplification, see `DESIGN.md`).
    async fn show_my_key(&self) -> Result<String> {
        Ok(hex::encode(self.coordinator.self_node_id().as_bytes()))
    }

    async fn set_my_name(&self, name: Vec<u8>) -> Result<BackendMyInfo> {
        {
            let mut info = self.coordinator.me.my_info.write();
            info.user_name = name;
            info.update_ts = Timestamp::now();
        }
        self.get().await
    }

    async fn set_my_image(&self, img: Vec<u8>) -> Result<BackendMyInfo> {
        {
            let mut info = self.coordinator.me.my_info.write();
            info.user_img = img;
            info.update_ts = Timestamp::now();
        }
        self.get().await
    }

    async fn revoke(&self) -> Result<bool> {
        self.coordinator.me.my_info.write().revoke();
        Ok(true)
    }

    async fn get_raft_status(&self) -> Result<RaftStatus> {
        let me = &self.coordinator.me;
        Ok(RaftStatus {
            self_raft_id: me.self_raft_id(),
            leader: me.current_leader(),
            term: me.current_term(),
            is_leader: me.is_leader(),
            total_weight: me.total_weight(),
            quorum: me.quorum(),
            applied_index: me.applied_index(),
        })
    }

    async fn force_remove_node(&self, node_id_hex: String) -> Result<bool> {
        let bytes = hex::decode(&node_id_hex).map_err(|e| crate::error::RpcError::InvalidParams(e.to_string()))?;
        let node_id = NodeId::from_slice(&bytes)
            .ok_or_else(|| crate::error::RpcError::InvalidParams("node id must be 64 bytes".into()))?;
        self.coordinator.me.force_remove_node(node_id).await?;
        Ok(true)
    }

    async fn get_join_key_infos(&self) -> Result<Vec<BackendKeyInfo>> {
        let keys = self
            .coordinator
            .me
            .key_manager
            .load_at_startup(Timestamp::now(), NO_PRACTICAL_EXPIRY_SECONDS)
            .await?;
        Ok(keys.iter().filter(|k| k.kind == KeyKind::Join).map(Into::into).collect())
    }

    async fn get_op_key_infos(&self) -> Result<Vec<BackendKeyInfo>> {
        let keys = self
            .coordinator
            .me
            .key_manager
            .load_at_startup(Timestamp::now(), NO_PRACTICAL_EXPIRY_SECONDS)
            .await?;
        Ok(keys.iter().filter(|k| k.kind == KeyKind::Op).map(Into::into).collect())
    }

    async fn get_friend_requests(&self) -> Result<Vec<BackendJoinRequest>> {
        Ok(self.coordinator.me.friend_requests.list().into_iter().map(Self::record_to_dto).collect())
    }

    async fn get_me_requests(&self) -> Result<Vec<BackendJoinRequest>> {
        Ok(self.coordinator.me.me_requests.list().into_iter().map(Self::record_to_dto).collect())
    }

    async fn count_peers(&self) -> Result<BackendCountPeers> {
        let peers = &self.coordinator.me.peers;
        Ok(BackendCountPeers {
            my_peers: peers.snapshot_class(PeerClass::Me).len(),
            important_peers: peers.snapshot_class(PeerClass::Important).len(),
            member_peers: peers.snapshot_class(PeerClass::Member).len(),
            random_peers: peers.snapshot_class(PeerClass::Random).len(),
        })
    }

    async fn get_peers(&self) -> Result<Vec<String>> {
        // `PeerRegistry` is keyed by `NodeId` regardless of the (possibly
        // opaque) transport handle type `P`, so the registered ids
        // themselves are always available even when `P` isn't `Display`.
        Ok(self.coordinator.me.peers.snapshot_ids().iter().map(|id| id.to_string()).collect())
    }
}
