//! Signed, append-only oplog entries (§3).
//!
//! Three streams share this schema: master-oplog (membership changes),
//! me-oplog (identity-internal events), ptt-oplog (node-wide
//! notifications). The payload (`data`) is opaque at this layer — each
//! stream's op-type/payload semantics are owned by the component that
//! produces it (`meshid-membership` for master-oplog).

use crate::ids::{MeshId, NodeSignId};
use crate::status::OplogStatus;
use crate::timestamp::Timestamp;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum OplogStream {
    Master,
    Me,
    Ptt,
}

/// One signature over an oplog entry, attributable to a device via
/// `signer_id` (a node-sign-id).
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct SignInfo {
    pub signer_id: NodeSignId,
    pub hash: [u8; 32],
    pub salt: [u8; 16],
    pub sig: Vec<u8>,
    pub pubkey: Vec<u8>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Oplog {
    pub log_id: MeshId,
    pub object_id: MeshId,
    pub doer_id: MeshId,
    pub op_type: u32,
    pub data: Vec<u8>,
    pub create_ts: Timestamp,
    pub update_ts: Timestamp,
    /// The newest committed master-oplog at signing time: binds this entry
    /// to a membership epoch (§GLOSSARY: Epoch).
    pub master_log_id: Option<MeshId>,
    pub signs: Vec<SignInfo>,
    pub is_sync: bool,
    pub status: OplogStatus,
}

impl Oplog {
    pub fn new(
        stream_entity: MeshId,
        doer_id: MeshId,
        op_type: u32,
        data: Vec<u8>,
        master_log_id: Option<MeshId>,
        log_id: MeshId,
        ts: Timestamp,
    ) -> Self {
        Oplog {
            log_id,
            object_id: stream_entity,
            doer_id,
            op_type,
            data,
            create_ts: ts,
            update_ts: ts,
            master_log_id,
            signs: Vec::new(),
            is_sync: false,
            status: OplogStatus::InternalPending,
        }
    }

    /// Union `other`'s signatures into `self` by `signer_id`, last-write-wins
    /// on the `(salt, sig)` pair (§4.2 `integrate`).
    pub fn merge_signs(&mut self, other: &[SignInfo]) {
        for incoming in other {
            if let Some(existing) = self
                .signs
                .iter_mut()
                .find(|s| s.signer_id == incoming.signer_id)
            {
                existing.salt = incoming.salt;
                existing.sig = incoming.sig.clone();
                existing.hash = incoming.hash;
                existing.pubkey = incoming.pubkey.clone();
            } else {
                self.signs.push(incoming.clone());
            }
        }
    }
}
