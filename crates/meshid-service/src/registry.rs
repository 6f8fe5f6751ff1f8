//! Service-level protocol manager (§2, component F).
//!
//! Grounded on `original_source/service/service_protocol_manager.go`'s
//! `BaseServiceProtocolManager`: one registry of entities (here, one
//! `meshid-membership::ProtocolManager` per identity this node hosts),
//! plus the fan-out of a single "no more peers" shutdown signal to every
//! registered entity so each can race a live connection attempt against
//! process shutdown — the same signal shape `meshid-peers::PeerRegistry`
//! already uses internally, reused here at the entity-registration
//! boundary per `me/service_protocol_manager.go`'s `RegisterEntity` call
//! into `e.PM().SetNoMorePeers(spm.noMorePeers)`.

use std::collections::HashMap;
use std::sync::Arc;

use meshid_types::MeshId;
use parking_lot::RwLock;
use tokio::sync::watch;

use crate::error::{Result, ServiceError};

/// What the registry needs from a hosted identity: its own id, and a hook
/// to hand it the shared shutdown signal at registration time.
pub trait Entity: Send + Sync {
    fn id(&self) -> MeshId;
    fn set_no_more_peers(&self, rx: watch::Receiver<()>);
}

pub struct ServiceProtocolManager {
    entities: RwLock<HashMap<MeshId, Arc<dyn Entity>>>,
    no_more_peers_tx: watch::Sender<()>,
    no_more_peers_rx: watch::Receiver<()>,
}

impl ServiceProtocolManager {
    pub fn new() -> Self {
        let (tx, rx) = watch::channel(());
        ServiceProtocolManager {
            entities: RwLock::new(HashMap::new()),
            no_more_peers_tx: tx,
            no_more_peers_rx: rx,
        }
    }

    /// `RegisterEntity` (§2): rejects a second registration under the same
    /// id, otherwise hands the entity this registry's shutdown receiver.
    pub fn register_entity(&self, entity: Arc<dyn Entity>) -> Result<()> {
        let id = entity.id();
        let mut entities = self.entities.write();
        if entities.contains_key(&id) {
            return Err(ServiceError::AlreadyRegistered);
        }
        entity.set_no_more_peers(self.no_more_peers_rx.clone());
        entities.insert(id, entity);
        tracing::debug!(?id, "entity registered");
        Ok(())
    }

    pub fn unregister_entity(&self, id: &MeshId) -> Result<()> {
        let mut entities = self.entities.write();
        if entities.remove(id).is_none() {
            return Err(ServiceError::NotRegistered);
        }
        tracing::debug!(?id, "entity unregistered");
        Ok(())
    }

    pub fn entity(&self, id: &MeshId) -> Option<Arc<dyn Entity>> {
        self.entities.read().get(id).cloned()
    }

    pub fn entities(&self) -> Vec<Arc<dyn Entity>> {
        self.entities.read().values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entities.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Fires once, e.g. on process shutdown: every registered entity's
    /// receiver observes it and can stop waiting on new connections.
    pub fn signal_no_more_peers(&self) {
        let _ = self.no_more_peers_tx.send(());
    }
}

impl Default for ServiceProtocolManager {
    fn default() -> Self {
        ServiceProtocolManager::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};

    struct FakeEntity {
        id: MeshId,
        notified: Arc<AtomicBool>,
    }

    impl Entity for FakeEntity {
        fn id(&self) -> MeshId {
            self.id
        }
        fn set_no_more_peers(&self, mut rx: watch::Receiver<()>) {
            let notified = self.notified.clone();
            tokio::spawn(async move {
                if rx.changed().await.is_ok() {
                    notified.store(true, Ordering::SeqCst);
                }
            });
        }
    }

    #[test]
    fn register_twice_under_the_same_id_is_rejected() {
        let spm = ServiceProtocolManager::new();
        let notified = Arc::new(AtomicBool::new(false));
        let e1 = Arc::new(FakeEntity { id: MeshId::ZERO, notified: notified.clone() });
        let e2 = Arc::new(FakeEntity { id: MeshId::ZERO, notified });
        spm.register_entity(e1).unwrap();
        assert!(matches!(spm.register_entity(e2), Err(ServiceError::AlreadyRegistered)));
    }

    #[test]
    fn unregister_unknown_id_is_an_error() {
        let spm = ServiceProtocolManager::new();
        assert!(matches!(spm.unregister_entity(&MeshId::ZERO), Err(ServiceError::NotRegistered)));
    }

    #[test]
    fn entity_lookup_and_listing_round_trip() {
        let spm = ServiceProtocolManager::new();
        let notified = Arc::new(AtomicBool::new(false));
        let entity = Arc::new(FakeEntity { id: MeshId([7u8; 32]), notified });
        spm.register_entity(entity).unwrap();

        assert_eq!(spm.len(), 1);
        assert!(spm.entity(&MeshId([7u8; 32])).is_some());
        assert_eq!(spm.entities().len(), 1);

        spm.unregister_entity(&MeshId([7u8; 32])).unwrap();
        assert!(spm.is_empty());
    }

    #[tokio::test]
    async fn signal_no_more_peers_reaches_every_registered_entity() {
        let spm = ServiceProtocolManager::new();
        let notified = Arc::new(AtomicBool::new(false));
        let entity = Arc::new(FakeEntity { id: MeshId::ZERO, notified: notified.clone() });
        spm.register_entity(entity).unwrap();

        spm.signal_no_more_peers();
        tokio::task::yield_now().await;
        tokio::task::yield_now().await;
        assert!(notified.load(Ordering::SeqCst));
    }
}
