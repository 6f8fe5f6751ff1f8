//! Response shapes for the `me_*` RPC surface (§6). Mirrors the original's
//! `Backend*` view-model structs (`me/backend_types.go`-equivalent):
//! hex-encoded identifiers and numeric status codes rather than the raw
//! internal types, so a UI consumer never needs this crate's dependency
//! graph to decode a response.

use meshid_types::{KeyInfo, MeshId, MyInfo, MyNode, Status};
use serde::Serialize;

fn status_code(status: Status) -> u8 {
    match status {
        Status::Init => 0,
        Status::Pending => 1,
        Status::InternalPending => 2,
        Status::InternalSync => 3,
        Status::Alive => 4,
        Status::Deleted => 5,
    }
}

#[derive(Serialize)]
pub struct BackendMyInfo {
    pub id: String,
    pub owner_id: String,
    pub status: u8,
    pub user_name: String,
    pub user_img: String,
}

impl From<&MyInfo> for BackendMyInfo {
    fn from(info: &MyInfo) -> Self {
        BackendMyInfo {
            id: info.id.to_string(),
            owner_id: info.owner_id.to_string(),
            status: status_code(info.status),
            user_name: String::from_utf8_lossy(&info.user_name).into_owned(),
            user_img: String::from_utf8_lossy(&info.user_img).into_owned(),
        }
    }
}

#[derive(Serialize)]
pub struct BackendMyNode {
    pub node_id: String,
    pub raft_id: u64,
    pub weight: u32,
    pub status: u8,
}

impl From<&MyNode> for BackendMyNode {
    fn from(node: &MyNode) -> Self {
        BackendMyNode {
            node_id: node.node_id.to_string(),
            raft_id: node.raft_id.0,
            weight: node.weight,
            status: status_code(node.status),
        }
    }
}

#[derive(Serialize)]
pub struct BackendKeyInfo {
    pub id: String,
    pub address: String,
    pub key_hex: String,
    pub update_ts: i64,
}

impl From<&KeyInfo> for BackendKeyInfo {
    fn from(key: &KeyInfo) -> Self {
        BackendKeyInfo {
            id: key.id.to_string(),
            address: hex::encode(key.address.0),
            key_hex: hex::encode(key.key_bytes),
            update_ts: key.update_ts.secs,
        }
    }
}

#[derive(Serialize)]
pub struct BackendJoinUrl {
    pub identity_id: String,
    pub acker_node_id: String,
    pub join_key_hash: String,
}

#[derive(Serialize)]
pub struct BackendJoinRequest {
    pub hash: String,
    pub status: u8,
    pub creator_id: String,
}

#[derive(Serialize)]
pub struct RaftStatus {
    pub self_raft_id: u64,
    pub leader: Option<u64>,
    pub term: u64,
    pub is_leader: bool,
    pub total_weight: u32,
    pub quorum: u32,
    pub applied_index: u64,
}

#[derive(Serialize)]
pub struct BackendCountPeers {
    pub my_peers: usize,
    pub important_peers: usize,
    pub member_peers: usize,
    pub random_peers: usize,
}

pub fn mesh_id_to_string(id: MeshId) -> String {
    id.to_string()
}
