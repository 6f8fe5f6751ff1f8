//! Process-wide address→entity routing tables (§4.7, §5 `lock_joins`/
//! `lock_ops`).
//!
//! Grounded on `original_source/service/ptt.go`'s `BasePtt.joins`/`ops`
//! maps (`common.Address -> *types.PttID`) and their read accessors in
//! `ptt_core.go`'s `GetJoins`/`GetOps`. Both tables share this one type:
//! the original uses the identical `map[common.Address]*types.PttID` shape
//! for each.

use std::collections::HashMap;

use meshid_types::{Address, MeshId};
use parking_lot::RwLock;

#[derive(Default)]
pub struct RouteTable {
    routes: RwLock<HashMap<Address, MeshId>>,
}

impl RouteTable {
    pub fn new() -> Self {
        RouteTable::default()
    }

    pub fn register(&self, hash: Address, entity: MeshId) {
        self.routes.write().insert(hash, entity);
    }

    pub fn unregister(&self, hash: &Address) -> Option<MeshId> {
        self.routes.write().remove(hash)
    }

    pub fn lookup(&self, hash: &Address) -> Option<MeshId> {
        self.routes.read().get(hash).copied()
    }

    pub fn len(&self) -> usize {
        self.routes.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn snapshot(&self) -> HashMap<Address, MeshId> {
        self.routes.read().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_then_lookup_round_trips() {
        let table = RouteTable::new();
        table.register(Address([1; 20]), MeshId([2; 32]));
        assert_eq!(table.lookup(&Address([1; 20])), Some(MeshId([2; 32])));
    }

    #[test]
    fn unregister_removes_the_route() {
        let table = RouteTable::new();
        table.register(Address([1; 20]), MeshId([2; 32]));
        table.unregister(&Address([1; 20]));
        assert!(table.lookup(&Address([1; 20])).is_none());
    }

    #[test]
    fn unknown_hash_lookup_is_none() {
        let table = RouteTable::new();
        assert!(table.lookup(&Address([9; 20])).is_none());
    }
}
