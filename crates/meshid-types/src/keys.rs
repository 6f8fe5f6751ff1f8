//! Storage key layout (§6).
//!
//! All keys are 5-byte prefix + big-endian/binary payload. Prefixes are
//! reproduced byte-for-byte from the spec, including the observed
//! `.oklg` collision between the op-key-oplog primary prefix and its
//! merkle prefix (§9 open question: kept as-is, not "fixed").

use crate::ids::MeshId;
use crate::merkle::MerkleLevel;
use crate::oplog::OplogStream;
use crate::status::OplogStatus;

pub const NEWEST_MASTER_LOG_ID: &[u8; 5] = b".nmld";

pub const MASTER_OPLOG_PRIMARY: &[u8; 5] = b".malg";
pub const MASTER_OPLOG_IDX: &[u8; 5] = b".maig";
pub const MASTER_OPLOG_MERKLE: &[u8; 5] = b".mamk";

pub const ME_OPLOG_PRIMARY: &[u8; 5] = b".melg";
pub const ME_OPLOG_IDX: &[u8; 5] = b".meig";
pub const ME_OPLOG_MERKLE: &[u8; 5] = b".memk";

pub const PTT_OPLOG_PRIMARY: &[u8; 5] = b".ptlg";
pub const PTT_OPLOG_IDX: &[u8; 5] = b".ptig";
pub const PTT_OPLOG_MERKLE: &[u8; 5] = b".ptmk";

/// Op-key oplog: primary and merkle prefixes collide in the original
/// source (`.oklg` used for both). Reproduced as observed.
pub const OP_KEY_OPLOG_PRIMARY: &[u8; 5] = b".oklg";
pub const OP_KEY_OPLOG_IDX: &[u8; 5] = b".okig";
pub const OP_KEY_OPLOG_MERKLE: &[u8; 5] = b".oklg";

pub const OP_KEY_PRIMARY: &[u8; 5] = b".okdb";
pub const OP_KEY_IDX_BY_ID: &[u8; 5] = b".okix";
pub const OP_KEY_IDX_BY_ADDRESS: &[u8; 5] = b".oki2";

pub const MERKLE_GENERATE_TS: &[u8; 5] = b".mtgt";
pub const MERKLE_SYNC_TS: &[u8; 5] = b".mtst";
pub const MERKLE_FAIL_SYNC_TS: &[u8; 5] = b".mtft";

fn stream_prefixes(stream: OplogStream) -> (&'static [u8; 5], &'static [u8; 5], &'static [u8; 5]) {
    match stream {
        OplogStream::Master => (MASTER_OPLOG_PRIMARY, MASTER_OPLOG_IDX, MASTER_OPLOG_MERKLE),
        OplogStream::Me => (ME_OPLOG_PRIMARY, ME_OPLOG_IDX, ME_OPLOG_MERKLE),
        OplogStream::Ptt => (PTT_OPLOG_PRIMARY, PTT_OPLOG_IDX, PTT_OPLOG_MERKLE),
    }
}

/// `<prefix> || entity || update-ts || log-id`, with the prefix's final
/// byte swapped to the status char (§3).
pub fn oplog_primary_key(
    stream: OplogStream,
    status: OplogStatus,
    entity: &MeshId,
    update_ts: [u8; 16],
    log_id: &MeshId,
) -> Vec<u8> {
    let (primary, _, _) = stream_prefixes(stream);
    let mut prefix = *primary;
    prefix[4] = status.prefix_byte();

    let mut key = Vec::with_capacity(5 + 32 + 16 + 32);
    key.extend_from_slice(&prefix);
    key.extend_from_slice(entity.as_bytes());
    key.extend_from_slice(&update_ts);
    key.extend_from_slice(log_id.as_bytes());
    key
}

/// `<idx-prefix> || entity || log-id` (§3).
pub fn oplog_idx_key(stream: OplogStream, entity: &MeshId, log_id: &MeshId) -> Vec<u8> {
    let (_, idx, _) = stream_prefixes(stream);
    let mut key = Vec::with_capacity(5 + 32 + 32);
    key.extend_from_slice(idx);
    key.extend_from_slice(entity.as_bytes());
    key.extend_from_slice(log_id.as_bytes());
    key
}

/// `<merkle-prefix> || entity || level || bucket-ts` (§3).
pub fn merkle_key(stream: OplogStream, entity: &MeshId, level: MerkleLevel, bucket_ts: i64) -> Vec<u8> {
    let (_, _, merkle) = stream_prefixes(stream);
    let mut key = Vec::with_capacity(5 + 32 + 1 + 8);
    key.extend_from_slice(merkle);
    key.extend_from_slice(entity.as_bytes());
    key.push(level as u8);
    key.extend_from_slice(&bucket_ts.to_be_bytes());
    key
}

pub fn newest_master_log_id_key(identity: &MeshId) -> Vec<u8> {
    let mut key = Vec::with_capacity(5 + 32);
    key.extend_from_slice(NEWEST_MASTER_LOG_ID);
    key.extend_from_slice(identity.as_bytes());
    key
}

/// Op-key primary key: `<prefix> || entity || update-ts || id` (§4.1).
pub fn op_key_primary_key(entity: &MeshId, update_ts: [u8; 16], id: &MeshId) -> Vec<u8> {
    let mut key = Vec::with_capacity(5 + 32 + 16 + 32);
    key.extend_from_slice(OP_KEY_PRIMARY);
    key.extend_from_slice(entity.as_bytes());
    key.extend_from_slice(&update_ts);
    key.extend_from_slice(id.as_bytes());
    key
}

pub fn op_key_idx_by_id_key(entity: &MeshId, id: &MeshId) -> Vec<u8> {
    let mut key = Vec::with_capacity(5 + 32 + 32);
    key.extend_from_slice(OP_KEY_IDX_BY_ID);
    key.extend_from_slice(entity.as_bytes());
    key.extend_from_slice(id.as_bytes());
    key
}

pub fn op_key_idx_by_address_key(entity: &MeshId, address: &crate::ids::Address) -> Vec<u8> {
    let mut key = Vec::with_capacity(5 + 32 + 20);
    key.extend_from_slice(OP_KEY_IDX_BY_ADDRESS);
    key.extend_from_slice(entity.as_bytes());
    key.extend_from_slice(&address.0);
    key
}

/// Scan prefix for "all op-keys of this entity" (§4.1 load-at-startup).
pub fn op_key_entity_prefix(entity: &MeshId) -> Vec<u8> {
    let mut key = Vec::with_capacity(5 + 32);
    key.extend_from_slice(OP_KEY_PRIMARY);
    key.extend_from_slice(entity.as_bytes());
    key
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn op_key_oplog_primary_and_merkle_prefixes_collide_as_observed() {
        assert_eq!(OP_KEY_OPLOG_PRIMARY, OP_KEY_OPLOG_MERKLE);
    }

    #[test]
    fn oplog_primary_key_swaps_status_byte() {
        let entity = MeshId([1u8; 32]);
        let log_id = MeshId([2u8; 32]);
        let key = oplog_primary_key(
            OplogStream::Master,
            OplogStatus::PendingMasterQuorum,
            &entity,
            [0u8; 16],
            &log_id,
        );
        assert_eq!(&key[..4], &MASTER_OPLOG_PRIMARY[..4]);
        assert_eq!(key[4], b'm');
    }

    #[test]
    fn entity_prefix_is_a_prefix_of_the_full_primary_key() {
        let entity = MeshId([9u8; 32]);
        let id = MeshId([3u8; 32]);
        let prefix = op_key_entity_prefix(&entity);
        let full = op_key_primary_key(&entity, [0u8; 16], &id);
        assert!(full.starts_with(&prefix));
    }
}
