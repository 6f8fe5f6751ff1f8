//! Key manager (component A persistence, §4.1).
//!
//! `meshid-crypto` only generates/derives key material; this module owns
//! the storage side — the two/three-write batch, the newest-first scan,
//! and the startup expiry sweep — grounded on
//! `original_source/service/key_info.go`'s `Save`/`LoadNewest`.

use std::sync::Arc;

use meshid_crypto::new_key_info;
use meshid_store::{KvBatch, KvStore};
use meshid_types::{keys, KeyInfo, KeyKind, MeshId, Timestamp};

use crate::error::{MembershipError, Result};

pub struct KeyManager {
    kv: Arc<dyn KvStore>,
    entity: MeshId,
}

impl KeyManager {
    pub fn new(kv: Arc<dyn KvStore>, entity: MeshId) -> Self {
        KeyManager { kv, entity }
    }

    /// `new_join_key`/`new_op_key`/`new_sign_key` (§4.1): random for
    /// `Join`, PBKDF2-derived from `master` for `Op`/`Sign`.
    pub async fn new_key(&self, doer_id: MeshId, kind: KeyKind, master: Option<&[u8; 32]>) -> Result<KeyInfo> {
        let info = new_key_info(self.entity, doer_id, kind, master)?;
        self.persist(&info).await?;
        Ok(info)
    }

    /// Two-write batch `(primary_key, marshaled)` and
    /// `(addr_index_key, primary_key)`, plus the by-id index, in one
    /// atomic `write_batch` call. Idempotent on `(entity, update_ts, id)`.
    async fn persist(&self, info: &KeyInfo) -> Result<()> {
        let primary_key = keys::op_key_primary_key(&self.entity, info.update_ts.marshal(), &info.id);
        let value = bincode::serialize(info).map_err(|e| {
            MembershipError::Store(meshid_store::StoreError::Kv(meshid_store::KvError::Backend(e.to_string())))
        })?;

        let mut batch = KvBatch::new();
        batch.put(primary_key.clone(), value);
        batch.put(keys::op_key_idx_by_id_key(&self.entity, &info.id), primary_key.clone());
        batch.put(keys::op_key_idx_by_address_key(&self.entity, &info.address), primary_key);
        self.kv.write_batch(batch).await.map_err(meshid_store::StoreError::Kv)?;
        Ok(())
    }

    /// Load-at-startup (§4.1): scan `<entity-prefix>`, drop entries whose
    /// `update_ts < now - expire_seconds` (queued for deletion in a second
    /// pass), return survivors sorted ascending by `update_ts` (the scan's
    /// natural key order).
    pub async fn load_at_startup(&self, now: Timestamp, expire_seconds: i64) -> Result<Vec<KeyInfo>> {
        let prefix = keys::op_key_entity_prefix(&self.entity);
        let rows = self.kv.scan_prefix(&prefix).await.map_err(meshid_store::StoreError::Kv)?;

        let mut survivors = Vec::new();
        let mut stale = KvBatch::new();
        for (key, value) in rows {
            let info: KeyInfo = bincode::deserialize(&value).map_err(|e| {
                MembershipError::Store(meshid_store::StoreError::Kv(meshid_store::KvError::Backend(e.to_string())))
            })?;
            if info.is_expired(now, expire_seconds) {
                stale.delete(key);
                stale.delete(keys::op_key_idx_by_id_key(&self.entity, &info.id));
                stale.delete(keys::op_key_idx_by_address_key(&self.entity, &info.address));
            } else {
                survivors.push(info);
            }
        }

        if !stale.is_empty() {
            self.kv.write_batch(stale).await.map_err(meshid_store::StoreError::Kv)?;
        }
        Ok(survivors)
    }

    /// Newest non-expired key of `kind`. Readers always return this one;
    /// older keys stay in the address index until their own expiry so
    /// in-flight frames still decrypt.
    pub async fn newest(&self, kind: KeyKind, now: Timestamp, expire_seconds: i64) -> Result<Option<KeyInfo>> {
        let all = self.load_at_startup(now, expire_seconds).await?;
        Ok(all
            .into_iter()
            .filter(|k| k.kind == kind)
            .max_by_key(|k| k.update_ts))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use meshid_store::MemStore;

    #[tokio::test]
    async fn persist_then_load_round_trips() {
        let kv: Arc<dyn KvStore> = Arc::new(MemStore::default());
        let mgr = KeyManager::new(kv, MeshId::ZERO);
        let info = mgr.new_key(MeshId::ZERO, KeyKind::Join, None).await.unwrap();

        let loaded = mgr.load_at_startup(Timestamp::now(), 3600).await.unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].id, info.id);
    }

    #[tokio::test]
    async fn expired_keys_are_swept_on_load() {
        let kv: Arc<dyn KvStore> = Arc::new(MemStore::default());
        let mgr = KeyManager::new(kv, MeshId::ZERO);
        mgr.new_key(MeshId::ZERO, KeyKind::Join, None).await.unwrap();

        let far_future = Timestamp::now().plus_seconds(1000);
        let loaded = mgr.load_at_startup(far_future, 10).await.unwrap();
        assert!(loaded.is_empty());

        // second load sees the sweep already happened (batch was deleted).
        let loaded_again = mgr.load_at_startup(far_future, 10).await.unwrap();
        assert!(loaded_again.is_empty());
    }

    #[tokio::test]
    async fn newest_picks_the_latest_key_of_a_kind() {
        let kv: Arc<dyn KvStore> = Arc::new(MemStore::default());
        let mgr = KeyManager::new(kv, MeshId::ZERO);
        let first = mgr.new_key(MeshId::ZERO, KeyKind::Op, Some(&[1u8; 32])).await.unwrap();
        let second = mgr.new_key(MeshId::ZERO, KeyKind::Op, Some(&[2u8; 32])).await.unwrap();

        let newest = mgr.newest(KeyKind::Op, Timestamp::now(), 3600).await.unwrap().unwrap();
        assert!(newest.update_ts >= first.update_ts);
        assert_eq!(newest.update_ts, second.update_ts.max(first.update_ts));
    }
}
