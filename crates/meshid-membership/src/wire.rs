//! Onboarding wire messages (§4.5).
//!
//! These are the already-decoded inner payloads exchanged after frame
//! decryption; `meshid-node` owns the outer envelope (§4.7) and hands one
//! of these to the onboarding state machine. Grounded on
//! `original_source/me/protocol_init_me_info_ack.go` and
//! `protocol_init_me_info_sync.go`'s message structs.

use meshid_types::{Address, MeshId, NodeId, Oplog, Status};
use serde::{Deserialize, Serialize};

/// Out-of-band `JoinURL` contents (§4.5 step 1): handed to the requester
/// outside the wire protocol (QR code, copy-paste link), not itself a
/// frame payload.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct JoinUrl {
    pub identity_id: MeshId,
    pub acker_node_id: NodeId,
    pub join_key_hash: Address,
    pub user_name: Vec<u8>,
}

/// §4.5 step 2: requester → acker, encrypted under the join-key.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct JoinRequest {
    pub creator_id: NodeId,
    pub challenge_nonce: [u8; 32],
    pub name: Vec<u8>,
}

/// §4.5 step 3: acker → requester.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct JoinAck {
    pub master0_hash: Address,
    pub acker_id: MeshId,
}

/// §4.5 step 5: some master → D, once the add-node commit publishes.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct InitMeInfo {
    pub master_oplog: Oplog,
    pub epoch_master_log_id: MeshId,
}

/// §4.5 steps 6 and 7b: D → acker, reporting the status it just reached.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct InitMeInfoAck {
    pub status: Status,
}

/// §4.5 step 7: acker → D, installing the account.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct InitMeInfoSync {
    pub master_private_key_bytes: [u8; 32],
    pub postfix_bytes: [u8; 12],
    pub user_name: Option<Vec<u8>>,
    pub user_img: Option<Vec<u8>>,
}

/// §4.5 step 7: D's local request to its own node process after installing
/// the synced account, carried over the same restart/stop broadcast
/// channel `meshid-node` exposes (§4.7).
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct NotifyNodeRestart;
