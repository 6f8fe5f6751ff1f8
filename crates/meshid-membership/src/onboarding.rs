//! Onboarding wire-message handlers (§4.5).
//!
//! Pure(ish) functions over [`crate::wire`] payloads, `MyInfo`, and
//! [`crate::my_nodes::SharedMyNodes`] — the transport that carries these
//! messages between devices belongs to `meshid-node`; this module only
//! knows how each side reacts once a message has already arrived
//! decrypted. Grounded on `original_source/me/protocol_init_me_info_ack.go`,
//! `protocol_init_me_info_sync.go`, and `protocol_internal_sync_to_alive.go`.

use std::sync::Arc;

use meshid_types::{Address, KeyInfo, MeshId, MyInfo, NodeId, Oplog, Status, Timestamp};
use parking_lot::RwLock;
use rand::RngCore;

use crate::my_nodes::SharedMyNodes;
use crate::requests::{JoinRecord, RequestTable};
use crate::wire::{InitMeInfo, InitMeInfoAck, InitMeInfoSync, JoinAck, JoinRequest};

/// §4.5 step 2: a prospective device's first message, built from the
/// out-of-band `JoinUrl` it was handed.
pub fn build_join_request(creator_id: NodeId, name: Vec<u8>) -> JoinRequest {
    let mut nonce = [0u8; 32];
    rand::rngs::OsRng.fill_bytes(&mut nonce);
    JoinRequest { creator_id, challenge_nonce: nonce, name }
}

/// §4.5 step 3: the acker records the pending join under the join-key's
/// hash and answers with its own identity and the hash of its oldest
/// master-oplog (the epoch the requester will be joining into).
pub fn handle_join_request(
    table: &RequestTable,
    req: &JoinRequest,
    join_key_hash: Address,
    acker_id: MeshId,
    master0_hash: Address,
) -> JoinAck {
    table.insert(JoinRecord {
        hash: join_key_hash,
        status: Status::Init,
        creator_id: acker_id,
        requested_at: Timestamp::now(),
    });
    let _ = &req.challenge_nonce;
    JoinAck { master0_hash, acker_id }
}

/// §4.5 step 5: the joining device D receives the master-oplog that
/// resulted from the operator-confirmed `ConfChangeAddNode`. Mirrors
/// `InitMeInfoAck`: a fresh identity climbs from `Init` to
/// `InternalPending` exactly once, then reports back whatever status it's
/// actually at (idempotent on redelivery).
pub fn handle_init_me_info(
    my_info: &Arc<RwLock<MyInfo>>,
    my_nodes: &SharedMyNodes,
    self_raft_id: u64,
    data: &InitMeInfo,
) -> InitMeInfoAck {
    let mut info = my_info.write();
    if info.status == Status::Init {
        let ts = Timestamp::now();
        info.advance_status(Status::InternalPending, ts);
        if let Some(mut node) = my_nodes.0.write().get(self_raft_id).cloned() {
            node.status = info.status;
            node.update_ts = ts;
            let node_sign_id = meshid_crypto::derive_node_sign_id(&node.node_id, &node.owner_id);
            my_nodes.0.write().upsert(node, node_sign_id);
        }
    }
    let _ = &data.master_oplog;
    InitMeInfoAck { status: info.status }
}

/// What the acker should do once it sees the peer's `InitMeInfoAck`
/// (§4.5 step 6).
pub enum AckAction {
    /// Peer reported `InternalPending`: send it the account material.
    SendSync,
    /// Peer's status was recorded; nothing further to do right now.
    Noop,
}

/// Mirrors `HandleInitMeInfoAck`: an ack reporting `InternalPending`
/// triggers the sync push; any other status is just recorded against the
/// peer's `MyNode` entry (never regressed).
pub fn handle_init_me_info_ack(my_nodes: &SharedMyNodes, peer_raft_id: u64, ack: &InitMeInfoAck) -> AckAction {
    if ack.status == Status::InternalPending {
        return AckAction::SendSync;
    }
    let mut nodes = my_nodes.0.write();
    if let Some(mut node) = nodes.get(peer_raft_id).cloned() {
        if node.status != ack.status && node.status.can_advance_to(ack.status) {
            node.status = ack.status;
            node.update_ts = Timestamp::now();
            let node_sign_id = meshid_crypto::derive_node_sign_id(&node.node_id, &node.owner_id);
            nodes.upsert(node, node_sign_id);
        }
    }
    AckAction::Noop
}

/// §4.5 step 7: the acker (already `Alive`) hands D its account material —
/// the master signing key bytes so D can sign with the same identity, plus
/// whatever profile fields are already set.
pub fn build_init_me_info_sync(my_info: &MyInfo, master_key_bytes: [u8; 32]) -> Option<InitMeInfoSync> {
    if my_info.status != Status::Alive {
        return None;
    }
    let id_bytes = my_info.id.as_bytes();
    let mut postfix = [0u8; 12];
    postfix.copy_from_slice(&id_bytes[20..32]);
    Some(InitMeInfoSync {
        master_private_key_bytes: master_key_bytes,
        postfix_bytes: postfix,
        user_name: (!my_info.user_name.is_empty()).then(|| my_info.user_name.clone()),
        user_img: (!my_info.user_img.is_empty()).then(|| my_info.user_img.clone()),
    })
}

/// §4.5 step 7: D installs the synced account, advances to `InternalSync`,
/// and reports back — the caller is responsible for notifying
/// `meshid-node` to restart (§4.7's restart broadcast channel), matching
/// the original's `pm.Ptt().NotifyNodeRestart()` side effect.
pub fn handle_init_me_info_sync(my_info: &mut MyInfo, data: &InitMeInfoSync) -> InitMeInfoAck {
    if let Some(name) = &data.user_name {
        my_info.user_name = name.clone();
    }
    if let Some(img) = &data.user_img {
        my_info.user_img = img.clone();
    }
    my_info.advance_status(Status::InternalSync, Timestamp::now());
    InitMeInfoAck { status: my_info.status }
}

/// §4.5 step 8, post-restart: D's freshly-synced identity sees the real
/// master-oplog (now carrying its true committed weight) and completes
/// onboarding. Returns `true` when the weight this device proposed at
/// join time doesn't match what the quorum actually settled on, in which
/// case the caller should re-propose a corrective `ConfChangeAddNode`
/// (`pm.ProposeRaftAddNode` in the original).
pub fn internal_sync_to_alive(
    my_info: &mut MyInfo,
    my_nodes: &SharedMyNodes,
    self_raft_id: u64,
    master_oplog: &Oplog,
    settled_weight: u32,
    expected_weight: u32,
) -> bool {
    my_info.log_id = Some(master_oplog.log_id);
    my_info.advance_status(Status::Alive, master_oplog.update_ts);

    let mut nodes = my_nodes.0.write();
    if let Some(mut node) = nodes.get(self_raft_id).cloned() {
        node.status = Status::Alive;
        node.update_ts = master_oplog.update_ts;
        let node_sign_id = meshid_crypto::derive_node_sign_id(&node.node_id, &node.owner_id);
        nodes.upsert(node, node_sign_id);
    }

    settled_weight != expected_weight
}
