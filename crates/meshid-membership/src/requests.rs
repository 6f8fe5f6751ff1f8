//! Me-request & friend-request tables (§4.6).
//!
//! Read-only surfaces exposed over RPC so a user can inspect in-flight
//! joins without exposing the entity id on the wire: every pending join is
//! indexed by a 20-byte hash of the encrypted frame, matching
//! `original_source/me/protocol_join_me.go`'s `ConfirmJoin` table keyed by
//! join hash. `FriendRequestTable` reuses the identical shape for the
//! out-of-scope friend-onboarding hook (§1): this crate only owns the
//! accessor surface, not friend-specific semantics.

use std::collections::HashMap;

use meshid_types::{Address, MeshId, Status, Timestamp};
use parking_lot::RwLock;

#[derive(Clone, Debug)]
pub struct JoinRecord {
    pub hash: Address,
    pub status: Status,
    pub creator_id: MeshId,
    pub requested_at: Timestamp,
}

#[derive(Default)]
pub struct RequestTable {
    records: RwLock<HashMap<Address, JoinRecord>>,
}

impl RequestTable {
    pub fn new() -> Self {
        RequestTable::default()
    }

    pub fn insert(&self, record: JoinRecord) {
        self.records.write().insert(record.hash, record);
    }

    pub fn get(&self, hash: &Address) -> Option<JoinRecord> {
        self.records.read().get(hash).cloned()
    }

    /// Idempotent status advance (§4.5: "status may only advance, never
    /// regress"). A no-op both when the hash is unknown and when `status`
    /// would regress.
    pub fn advance_status(&self, hash: &Address, status: Status) {
        if let Some(record) = self.records.write().get_mut(hash) {
            if record.status.can_advance_to(status) {
                record.status = status;
            }
        }
    }

    pub fn remove(&self, hash: &Address) -> Option<JoinRecord> {
        self.records.write().remove(hash)
    }

    pub fn list(&self) -> Vec<JoinRecord> {
        self.records.read().values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Same shape, different table: friend-requests never gain
/// friend-specific business logic here (§1 Non-goals — user-content
/// subsystems are out of scope; this crate only gives them a shared
/// hook).
pub type FriendRequestTable = RequestTable;

#[cfg(test)]
mod tests {
    use super::*;

    fn record(hash: u8, status: Status) -> JoinRecord {
        JoinRecord {
            hash: Address([hash; 20]),
            status,
            creator_id: MeshId::ZERO,
            requested_at: Timestamp::now(),
        }
    }

    #[test]
    fn advance_status_ignores_regression() {
        let table = RequestTable::new();
        table.insert(record(1, Status::Alive));
        table.advance_status(&Address([1; 20]), Status::Pending);
        assert_eq!(table.get(&Address([1; 20])).unwrap().status, Status::Alive);
    }

    #[test]
    fn advance_status_applies_forward_moves() {
        let table = RequestTable::new();
        table.insert(record(1, Status::Init));
        table.advance_status(&Address([1; 20]), Status::InternalPending);
        assert_eq!(table.get(&Address([1; 20])).unwrap().status, Status::InternalPending);
    }

    #[test]
    fn unknown_hash_advance_is_a_noop() {
        let table = RequestTable::new();
        table.advance_status(&Address([9; 20]), Status::Alive);
        assert!(table.get(&Address([9; 20])).is_none());
    }

    #[test]
    fn list_and_remove_round_trip() {
        let table = RequestTable::new();
        table.insert(record(1, Status::Init));
        table.insert(record(2, Status::Init));
        assert_eq!(table.len(), 2);
        table.remove(&Address([1; 20]));
        assert_eq!(table.list().len(), 1);
    }
}
