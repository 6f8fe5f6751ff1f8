//! Oplog persistence (§4.2): `create`, `sign`, `master_sign`, `save`,
//! `set_master_log_id`, `set_is_sync`, `get_oplogs_from_keys`,
//! `get_pending_oplogs`, `remove_non_sync`, `integrate`.
//!
//! Signature-quorum validation is owned by whoever is producing the oplog
//! (`meshid-membership`, which knows the device weight table for an
//! identity), not by the store. The store takes an [`OplogValidator`]
//! reference at the call sites that need a verdict, mirroring the
//! `Save`/`LoadNewest` two-write batch pattern in
//! `original_source/service/key_info.go` generalized to any oplog stream.

use crate::error::{Result, StoreError};
use crate::kv::{KvBatch, KvStore};
use meshid_types::{keys, MeshId, Oplog, OplogStatus, OplogStream, SignInfo, Timestamp};
use std::sync::Arc;

/// Weighs a set of signatures and decides whether they cross quorum for an
/// oplog stream. Implemented by the membership component, which has the
/// device weight table for the owning identity.
pub trait OplogValidator {
    /// Returns the summed weight of signers recognized as live devices of
    /// the signing identity, and whether that weight meets quorum.
    fn weigh(&self, stream: OplogStream, entity: &MeshId, signs: &[SignInfo]) -> (u32, bool);
}

/// No-op validator that always reports quorum met; useful for streams
/// (`me`, `ptt`) that don't gate on weighted quorum the way `master` does.
pub struct AlwaysValid;

impl OplogValidator for AlwaysValid {
    fn weigh(&self, _stream: OplogStream, _entity: &MeshId, signs: &[SignInfo]) -> (u32, bool) {
        (signs.len() as u32, true)
    }
}

pub struct OplogStore {
    kv: Arc<dyn KvStore>,
    stream: OplogStream,
}

impl OplogStore {
    pub fn new(kv: Arc<dyn KvStore>, stream: OplogStream) -> Self {
        OplogStore { kv, stream }
    }

    /// Build a new, unsigned, unsaved oplog entry.
    pub fn create(
        &self,
        entity: MeshId,
        doer_id: MeshId,
        op_type: u32,
        data: Vec<u8>,
        master_log_id: Option<MeshId>,
        log_id: MeshId,
        ts: Timestamp,
    ) -> Oplog {
        Oplog::new(entity, doer_id, op_type, data, master_log_id, log_id, ts)
    }

    /// Append a signature from a device acting on its own behalf (not yet
    /// weighed against quorum).
    pub fn sign(&self, log: &mut Oplog, sign_info: SignInfo) {
        log.merge_signs(std::slice::from_ref(&sign_info));
    }

    /// Append a signature and, if the accumulated signature set now meets
    /// quorum, advance the oplog's status toward `Alive` (monotonic; never
    /// regresses — §4.2 `integrate`).
    pub fn master_sign(&self, log: &mut Oplog, sign_info: SignInfo, validator: &dyn OplogValidator) {
        log.merge_signs(std::slice::from_ref(&sign_info));
        let (_, met) = validator.weigh(self.stream, &log.object_id, &log.signs);
        if met && matches!(log.status, OplogStatus::InternalPending | OplogStatus::PendingMasterQuorum) {
            log.status = OplogStatus::Alive;
        } else if !met && matches!(log.status, OplogStatus::InternalPending) {
            log.status = OplogStatus::PendingMasterQuorum;
        }
    }

    /// Persist `log` under its current status prefix. `is_locked` signals
    /// the caller already holds `ptt.lock_ops` (§5) and should skip any
    /// internal re-acquisition; the in-memory store has no locks of its own
    /// so this is a no-op flag kept for call-site symmetry with the
    /// original's locked/unlocked save pair.
    pub async fn save(&self, log: &Oplog, _is_locked: bool) -> Result<()> {
        let primary = keys::oplog_primary_key(
            self.stream,
            log.status,
            &log.object_id,
            log.update_ts.marshal(),
            &log.log_id,
        );
        let idx = keys::oplog_idx_key(self.stream, &log.object_id, &log.log_id);
        let value = bincode::serialize(log).map_err(|e| StoreError::Kv(crate::kv::KvError::Backend(e.to_string())))?;

        let mut batch = KvBatch::new();
        batch.put(primary, value.clone());
        batch.put(idx, value);
        self.kv.write_batch(batch).await?;
        Ok(())
    }

    /// Re-point an entry at a new master-log-id (rebinding it to a newer
    /// membership epoch) and persist.
    pub async fn set_master_log_id(&self, log: &mut Oplog, master_log_id: MeshId) -> Result<()> {
        log.master_log_id = Some(master_log_id);
        self.save(log, false).await
    }

    pub async fn set_is_sync(&self, log: &mut Oplog, is_sync: bool) -> Result<()> {
        log.is_sync = is_sync;
        self.save(log, false).await
    }

    /// Load oplogs by their idx-key lookup (`entity`, `log_id`): the idx
    /// row holds the same serialized value as the primary row, so no
    /// second read is needed to resolve the status-byte-prefixed primary
    /// key.
    pub async fn get_oplogs_from_keys(&self, entity: &MeshId, log_ids: &[MeshId]) -> Result<Vec<Oplog>> {
        let mut out = Vec::with_capacity(log_ids.len());
        for log_id in log_ids {
            let idx = keys::oplog_idx_key(self.stream, entity, log_id);
            if let Some(bytes) = self.kv.get(&idx).await? {
                let log: Oplog = bincode::deserialize(&bytes)
                    .map_err(|e| StoreError::Kv(crate::kv::KvError::Backend(e.to_string())))?;
                out.push(log);
            }
        }
        Ok(out)
    }

    /// All entries still waiting on quorum, split by whether they're
    /// waiting on the local device's own signature set (internal-pending)
    /// or on the wider membership's (master-pending).
    pub async fn get_pending_oplogs(&self, entity: &MeshId) -> Result<(Vec<Oplog>, Vec<Oplog>)> {
        let internal = self.scan_status(entity, OplogStatus::InternalPending).await?;
        let master = self.scan_status(entity, OplogStatus::PendingMasterQuorum).await?;
        Ok((internal, master))
    }

    async fn scan_status(&self, entity: &MeshId, status: OplogStatus) -> Result<Vec<Oplog>> {
        let prefix = keys::oplog_primary_key(self.stream, status, entity, [0u8; 16], &MeshId::ZERO);
        let prefix = &prefix[..5 + 32];
        let rows = self.kv.scan_prefix(prefix).await?;
        rows.into_iter()
            .map(|(_, v)| {
                bincode::deserialize(&v).map_err(|e| StoreError::Kv(crate::kv::KvError::Backend(e.to_string())))
            })
            .collect()
    }

    /// Drop or demote oplogs that never reached quorum once a competing
    /// entry for the same slot has won (§4.2 `integrate`'s conflict
    /// resolution): entries whose signature set still meets `retain_valid`
    /// are kept but marked `is_sync = false`; everything else is deleted.
    pub async fn remove_non_sync(
        &self,
        entity: &MeshId,
        log_id: &MeshId,
        retain_valid: bool,
        _is_locked: bool,
    ) -> Result<()> {
        let idx = keys::oplog_idx_key(self.stream, entity, log_id);
        let Some(bytes) = self.kv.get(&idx).await? else {
            return Ok(());
        };
        let mut log: Oplog =
            bincode::deserialize(&bytes).map_err(|e| StoreError::Kv(crate::kv::KvError::Backend(e.to_string())))?;

        let old_primary = keys::oplog_primary_key(self.stream, log.status, entity, log.update_ts.marshal(), log_id);

        let mut batch = KvBatch::new();
        batch.delete(old_primary);
        if retain_valid {
            log.is_sync = false;
            let new_primary =
                keys::oplog_primary_key(self.stream, log.status, entity, log.update_ts.marshal(), log_id);
            let value =
                bincode::serialize(&log).map_err(|e| StoreError::Kv(crate::kv::KvError::Backend(e.to_string())))?;
            batch.put(new_primary, value.clone());
            batch.put(idx, value);
        } else {
            batch.delete(idx);
        }
        self.kv.write_batch(batch).await?;
        Ok(())
    }

    /// Merge a remote oplog into the local copy: union signatures, advance
    /// status monotonically if the merged set now meets quorum, never
    /// regress. Returns the merged, saved entry.
    pub async fn integrate(&self, remote: Oplog, validator: &dyn OplogValidator) -> Result<Oplog> {
        let idx = keys::oplog_idx_key(self.stream, &remote.object_id, &remote.log_id);
        let mut local = match self.kv.get(&idx).await? {
            Some(bytes) => {
                bincode::deserialize(&bytes).map_err(|e| StoreError::Kv(crate::kv::KvError::Backend(e.to_string())))?
            }
            None => remote.clone(),
        };

        let old_primary = keys::oplog_primary_key(
            self.stream,
            local.status,
            &local.object_id,
            local.update_ts.marshal(),
            &local.log_id,
        );

        local.merge_signs(&remote.signs);
        if remote.is_sync {
            local.is_sync = true;
        }
        if let Some(master_log_id) = remote.master_log_id {
            local.master_log_id = Some(master_log_id);
        }

        let (_, met) = validator.weigh(self.stream, &local.object_id, &local.signs);
        if met {
            local.status = OplogStatus::Alive;
        } else if matches!(local.status, OplogStatus::InternalPending) {
            local.status = OplogStatus::PendingMasterQuorum;
        }

        let new_primary = keys::oplog_primary_key(
            self.stream,
            local.status,
            &local.object_id,
            local.update_ts.marshal(),
            &local.log_id,
        );
        let value =
            bincode::serialize(&local).map_err(|e| StoreError::Kv(crate::kv::KvError::Backend(e.to_string())))?;

        let mut batch = KvBatch::new();
        if old_primary != new_primary {
            batch.delete(old_primary);
        }
        batch.put(new_primary, value.clone());
        batch.put(idx, value);
        self.kv.write_batch(batch).await?;

        Ok(local)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kv::MemStore;
    use meshid_types::NodeSignId;

    fn sign_info(id: u8) -> SignInfo {
        SignInfo {
            signer_id: NodeSignId([id; 32]),
            hash: [id; 32],
            salt: [id; 16],
            sig: vec![id],
            pubkey: vec![id],
        }
    }

    struct FixedWeight(u32, u32);
    impl OplogValidator for FixedWeight {
        fn weigh(&self, _stream: OplogStream, _entity: &MeshId, signs: &[SignInfo]) -> (u32, bool) {
            let weight = signs.len() as u32 * self.0;
            (weight, weight >= self.1)
        }
    }

    #[tokio::test]
    async fn save_then_get_oplogs_from_keys_round_trips() {
        let kv = Arc::new(MemStore::new());
        let store = OplogStore::new(kv, OplogStream::Master);
        let entity = MeshId([1u8; 32]);
        let log = store.create(entity, entity, 1, vec![1, 2, 3], None, MeshId([2u8; 32]), Timestamp::now());
        store.save(&log, false).await.unwrap();

        let loaded = store.get_oplogs_from_keys(&entity, &[log.log_id]).await.unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].data, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn master_sign_promotes_to_alive_once_quorum_met() {
        let kv = Arc::new(MemStore::new());
        let store = OplogStore::new(kv, OplogStream::Master);
        let entity = MeshId([1u8; 32]);
        let mut log = store.create(entity, entity, 1, vec![], None, MeshId([3u8; 32]), Timestamp::now());
        assert_eq!(log.status, OplogStatus::InternalPending);

        let validator = FixedWeight(2, 4);
        store.master_sign(&mut log, sign_info(1), &validator);
        assert_eq!(log.status, OplogStatus::PendingMasterQuorum);

        store.master_sign(&mut log, sign_info(2), &validator);
        assert_eq!(log.status, OplogStatus::Alive);
    }

    #[tokio::test]
    async fn get_pending_oplogs_splits_by_status() {
        let kv = Arc::new(MemStore::new());
        let store = OplogStore::new(kv, OplogStream::Master);
        let entity = MeshId([1u8; 32]);

        let mut internal = store.create(entity, entity, 1, vec![], None, MeshId([4u8; 32]), Timestamp::now());
        store.save(&internal, false).await.unwrap();

        let mut pending_master =
            store.create(entity, entity, 1, vec![], None, MeshId([5u8; 32]), Timestamp::now());
        pending_master.status = OplogStatus::PendingMasterQuorum;
        store.save(&pending_master, false).await.unwrap();

        internal.status = OplogStatus::Alive;
        store.save(&internal, false).await.unwrap();

        let (got_internal, got_master) = store.get_pending_oplogs(&entity).await.unwrap();
        assert_eq!(got_internal.len(), 0);
        assert_eq!(got_master.len(), 1);
        assert_eq!(got_master[0].log_id, pending_master.log_id);
    }

    #[tokio::test]
    async fn integrate_merges_signatures_and_never_regresses_status() {
        let kv = Arc::new(MemStore::new());
        let store = OplogStore::new(kv, OplogStream::Master);
        let entity = MeshId([1u8; 32]);
        let mut local = store.create(entity, entity, 1, vec![], None, MeshId([6u8; 32]), Timestamp::now());
        local.status = OplogStatus::Alive;
        store.save(&local, false).await.unwrap();

        let mut remote = local.clone();
        remote.status = OplogStatus::InternalPending;
        remote.signs.push(sign_info(9));

        let merged = store.integrate(remote, &AlwaysValid).await.unwrap();
        assert_eq!(merged.status, OplogStatus::Alive);
        assert_eq!(merged.signs.len(), 1);
    }

    #[tokio::test]
    async fn remove_non_sync_deletes_when_not_retained() {
        let kv = Arc::new(MemStore::new());
        let store = OplogStore::new(kv.clone(), OplogStream::Master);
        let entity = MeshId([1u8; 32]);
        let log = store.create(entity, entity, 1, vec![], None, MeshId([7u8; 32]), Timestamp::now());
        store.save(&log, false).await.unwrap();

        store.remove_non_sync(&entity, &log.log_id, false, false).await.unwrap();
        let loaded = store.get_oplogs_from_keys(&entity, &[log.log_id]).await.unwrap();
        assert!(loaded.is_empty());
    }
}
