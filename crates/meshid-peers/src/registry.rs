//! Classified peer set (§4.3).
//!
//! Grounded on `original_source/service/ptt_peer_set.go`'s `PttPeerSet`:
//! `register`/`unregister` move a peer between class maps and rebuild the
//! affected class's list, then the aggregate list is the concatenation of
//! the three (here four) class lists in precedence order. The Go mutex is
//! a `parking_lot::RwLock` here; the "no more peers" shutdown signal the
//! original only implies via `Close` zeroing the maps is made explicit as a
//! `tokio::sync::watch` so callers can race a connection attempt against
//! shutdown instead of discovering it was too late after the fact.

use meshid_types::NodeId;
use parking_lot::RwLock;
use std::collections::HashMap;
use tokio::sync::watch;

use crate::error::{PeerError, Result};

/// Fixed precedence: me > important > member > random (§4.3).
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum PeerClass {
    Me,
    Important,
    Member,
    Random,
}

impl PeerClass {
    pub const PRECEDENCE: [PeerClass; 4] = [
        PeerClass::Me,
        PeerClass::Important,
        PeerClass::Member,
        PeerClass::Random,
    ];
}

struct ClassMaps<P> {
    by_class: HashMap<PeerClass, HashMap<NodeId, P>>,
    class_of: HashMap<NodeId, PeerClass>,
    closed: bool,
}

impl<P> ClassMaps<P> {
    fn new() -> Self {
        let mut by_class = HashMap::new();
        for class in PeerClass::PRECEDENCE {
            by_class.insert(class, HashMap::new());
        }
        ClassMaps {
            by_class,
            class_of: HashMap::new(),
            closed: false,
        }
    }
}

/// Generic over the peer handle type `P` (a transport connection handle in
/// production, anything `Clone` in tests): this registry only tracks
/// classification, not transport details.
pub struct PeerRegistry<P> {
    maps: RwLock<ClassMaps<P>>,
    no_more_peers_tx: watch::Sender<bool>,
    no_more_peers_rx: watch::Receiver<bool>,
}

impl<P: Clone> PeerRegistry<P> {
    pub fn new() -> Self {
        let (tx, rx) = watch::channel(false);
        PeerRegistry {
            maps: RwLock::new(ClassMaps::new()),
            no_more_peers_tx: tx,
            no_more_peers_rx: rx,
        }
    }

    /// Insert a peer under `class`, or move it from its current class if
    /// already registered. A no-op if the peer is already in `class`.
    /// Races against [`Self::close`]: once closed, every call returns
    /// `PeerError::Closed`.
    pub fn register(&self, id: NodeId, peer: P, class: PeerClass) -> Result<()> {
        let mut guard = self.maps.write();
        if guard.closed {
            return Err(PeerError::Closed);
        }

        if let Some(&current) = guard.class_of.get(&id) {
            if current == class {
                return Ok(());
            }
            guard.by_class.get_mut(&current).unwrap().remove(&id);
        }

        guard.by_class.get_mut(&class).unwrap().insert(id, peer);
        guard.class_of.insert(id, class);
        Ok(())
    }

    pub fn unregister(&self, id: &NodeId) -> Result<()> {
        let mut guard = self.maps.write();
        let class = guard.class_of.remove(id).ok_or(PeerError::NotRegistered)?;
        guard.by_class.get_mut(&class).unwrap().remove(id);
        Ok(())
    }

    pub fn class_of(&self, id: &NodeId) -> Option<PeerClass> {
        self.maps.read().class_of.get(id).copied()
    }

    pub fn len(&self) -> usize {
        self.maps.read().class_of.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of all registered peers, concatenated in precedence order
    /// (me, then important, then member, then random). Taken under a read
    /// lock; the returned `Vec` does not track later mutations.
    pub fn snapshot(&self) -> Vec<P> {
        let guard = self.maps.read();
        let mut out = Vec::with_capacity(guard.class_of.len());
        for class in PeerClass::PRECEDENCE {
            out.extend(guard.by_class[&class].values().cloned());
        }
        out
    }

    pub fn snapshot_class(&self, class: PeerClass) -> Vec<P> {
        self.maps.read().by_class[&class].values().cloned().collect()
    }

    /// The registered ids themselves, in the same precedence order as
    /// [`Self::snapshot`] — useful to callers that only need to know who's
    /// connected, not the (possibly opaque) transport handle `P`.
    pub fn snapshot_ids(&self) -> Vec<NodeId> {
        let guard = self.maps.read();
        let mut out = Vec::with_capacity(guard.class_of.len());
        for class in PeerClass::PRECEDENCE {
            out.extend(guard.by_class[&class].keys().copied());
        }
        out
    }

    /// Mark the registry closed and signal `no_more_peers` watchers. No
    /// peer is dropped implicitly here (unlike the original's `Close`,
    /// which zeroes the maps) — callers are expected to drain `snapshot()`
    /// themselves before or after observing closure, since dropping
    /// transport handles is their concern, not the registry's.
    pub fn close(&self) {
        let mut guard = self.maps.write();
        guard.closed = true;
        drop(guard);
        let _ = self.no_more_peers_tx.send(true);
    }

    pub fn is_closed(&self) -> bool {
        self.maps.read().closed
    }

    pub fn watch_closed(&self) -> watch::Receiver<bool> {
        self.no_more_peers_rx.clone()
    }
}

impl<P: Clone> Default for PeerRegistry<P> {
    fn default() -> Self {
        PeerRegistry::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(b: u8) -> NodeId {
        NodeId([b; 64])
    }

    #[test]
    fn register_then_snapshot_is_in_precedence_order() {
        let registry: PeerRegistry<&'static str> = PeerRegistry::new();
        registry.register(id(3), "random-peer", PeerClass::Random).unwrap();
        registry.register(id(1), "me-peer", PeerClass::Me).unwrap();
        registry.register(id(2), "member-peer", PeerClass::Member).unwrap();

        let snapshot = registry.snapshot();
        assert_eq!(snapshot, vec!["me-peer", "member-peer", "random-peer"]);
    }

    #[test]
    fn snapshot_ids_matches_snapshot_precedence_order() {
        let registry: PeerRegistry<&'static str> = PeerRegistry::new();
        registry.register(id(3), "random-peer", PeerClass::Random).unwrap();
        registry.register(id(1), "me-peer", PeerClass::Me).unwrap();
        registry.register(id(2), "member-peer", PeerClass::Member).unwrap();

        assert_eq!(registry.snapshot_ids(), vec![id(1), id(2), id(3)]);
    }

    #[test]
    fn reregistering_under_a_new_class_moves_the_peer() {
        let registry: PeerRegistry<&'static str> = PeerRegistry::new();
        registry.register(id(1), "p", PeerClass::Random).unwrap();
        assert_eq!(registry.class_of(&id(1)), Some(PeerClass::Random));

        registry.register(id(1), "p", PeerClass::Important).unwrap();
        assert_eq!(registry.class_of(&id(1)), Some(PeerClass::Important));
        assert_eq!(registry.snapshot_class(PeerClass::Random).len(), 0);
    }

    #[test]
    fn unregister_unknown_peer_errors() {
        let registry: PeerRegistry<&'static str> = PeerRegistry::new();
        assert!(matches!(registry.unregister(&id(9)), Err(PeerError::NotRegistered)));
    }

    #[test]
    fn register_after_close_is_rejected() {
        let registry: PeerRegistry<&'static str> = PeerRegistry::new();
        registry.close();
        assert!(matches!(
            registry.register(id(1), "p", PeerClass::Me),
            Err(PeerError::Closed)
        ));
    }

    #[tokio::test]
    async fn watch_closed_resolves_once_close_is_called() {
        let registry: PeerRegistry<&'static str> = PeerRegistry::new();
        let mut rx = registry.watch_closed();
        assert!(!*rx.borrow());

        registry.close();
        rx.changed().await.unwrap();
        assert!(*rx.borrow());
    }
}
