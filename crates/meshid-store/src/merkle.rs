//! Bucketed Merkle tree with incremental rollup (§4.2).
//!
//! Each stream's tree aggregates oplog entries into `Now` (current hour,
//! live) leaves; a periodic rollup promotes a `Now` bucket into the
//! matching historical `Hour` leaf once it's closed (past the late-arrival
//! grace window), then folds `Hour` leaves up into `Day`, `Day` into
//! `Month`, `Month` into `Year`.
//!
//! The per-leaf `address` is an XOR-accumulator over `keccak256(log_id)`
//! contributions (leaf level) or over child addresses (parent levels).
//! XOR is commutative and associative, so the tree produced by incremental
//! `record_oplog` + periodic `rollup` calls is byte-identical to one built
//! by [`rebuild_from_scratch`] over the same oplog set regardless of
//! arrival order — this is what the Merkle round-trip property (§8) tests.

use crate::error::Result;
use crate::kv::{KvBatch, KvStore};
use meshid_crypto::keccak256;
use meshid_types::{keys, MeshId, MerkleLeaf, MerkleLevel, OplogStream, Timestamp};
use std::collections::BTreeMap;
use std::sync::Arc;

fn xor32(a: [u8; 32], b: [u8; 32]) -> [u8; 32] {
    let mut out = [0u8; 32];
    for i in 0..32 {
        out[i] = a[i] ^ b[i];
    }
    out
}

pub struct MerkleStore {
    kv: Arc<dyn KvStore>,
    stream: OplogStream,
}

impl MerkleStore {
    pub fn new(kv: Arc<dyn KvStore>, stream: OplogStream) -> Self {
        MerkleStore { kv, stream }
    }

    async fn load_leaf(&self, entity: &MeshId, level: MerkleLevel, bucket_ts: i64) -> Result<Option<MerkleLeaf>> {
        let key = keys::merkle_key(self.stream, entity, level, bucket_ts);
        match self.kv.get(&key).await? {
            Some(bytes) => Ok(Some(
                bincode::deserialize(&bytes).map_err(|e| crate::error::StoreError::Kv(crate::kv::KvError::Backend(e.to_string())))?,
            )),
            None => Ok(None),
        }
    }

    async fn save_leaf(&self, entity: &MeshId, leaf: &MerkleLeaf) -> Result<()> {
        let key = keys::merkle_key(self.stream, entity, leaf.level, leaf.bucket_ts);
        let value = bincode::serialize(leaf).map_err(|e| crate::error::StoreError::Kv(crate::kv::KvError::Backend(e.to_string())))?;
        let mut batch = KvBatch::new();
        batch.put(key, value);
        self.kv.write_batch(batch).await?;
        Ok(())
    }

    async fn scan_level(&self, entity: &MeshId, level: MerkleLevel) -> Result<Vec<MerkleLeaf>> {
        let prefix = keys::merkle_key(self.stream, entity, level, 0);
        let prefix = &prefix[..prefix.len() - 8];
        let rows = self.kv.scan_prefix(prefix).await?;
        rows.into_iter()
            .map(|(_, v)| bincode::deserialize(&v).map_err(|e| crate::error::StoreError::Kv(crate::kv::KvError::Backend(e.to_string()))))
            .collect()
    }

    /// Fold one newly-appended oplog into the live `Now` leaf for its
    /// bucket. Called synchronously as part of `save`/`integrate` so the
    /// tree never drifts behind the primary log.
    pub async fn record_oplog(&self, entity: &MeshId, update_ts: Timestamp, log_id: &MeshId, now: Timestamp) -> Result<()> {
        let bucket_ts = update_ts.bucket_start(MerkleLevel::Now.bucket_seconds()).secs;
        let mut leaf = self
            .load_leaf(entity, MerkleLevel::Now, bucket_ts)
            .await?
            .unwrap_or_else(|| MerkleLeaf::empty(MerkleLevel::Now, bucket_ts));

        leaf.address = xor32(leaf.address, keccak256(log_id.as_bytes()));
        leaf.count += 1;
        leaf.generate_ts = now.secs;
        self.save_leaf(entity, &leaf).await
    }

    /// Promote closed `Now` buckets into `Hour`, then fold `Hour` into
    /// `Day`, `Day` into `Month`, `Month` into `Year`. `expire_seconds` is
    /// the late-arrival grace window: a `Now` bucket is eligible only once
    /// `bucket_end + expire_seconds <= now` (§4.2: 15-minute cycle, 7.5
    /// minute lower-bound grace).
    pub async fn rollup(&self, entity: &MeshId, now: Timestamp, expire_seconds: i64) -> Result<()> {
        self.promote_now_to_hour(entity, now, expire_seconds).await?;
        self.aggregate_level(entity, MerkleLevel::Hour, MerkleLevel::Day).await?;
        self.aggregate_level(entity, MerkleLevel::Day, MerkleLevel::Month).await?;
        self.aggregate_level(entity, MerkleLevel::Month, MerkleLevel::Year).await?;
        Ok(())
    }

    async fn promote_now_to_hour(&self, entity: &MeshId, now: Timestamp, expire_seconds: i64) -> Result<()> {
        let cutoff = now.secs - expire_seconds;
        for leaf in self.scan_level(entity, MerkleLevel::Now).await? {
            if leaf.bucket_ts + MerkleLevel::Now.bucket_seconds() > cutoff {
                continue;
            }
            let existing = self.load_leaf(entity, MerkleLevel::Hour, leaf.bucket_ts).await?;
            if existing.as_ref().map(|h| h.generate_ts) >= Some(leaf.generate_ts) {
                continue;
            }
            let mut hour_leaf = leaf.clone();
            hour_leaf.level = MerkleLevel::Hour;
            self.save_leaf(entity, &hour_leaf).await?;
        }
        Ok(())
    }

    async fn aggregate_level(&self, entity: &MeshId, child_level: MerkleLevel, parent_level: MerkleLevel) -> Result<()> {
        let children = self.scan_level(entity, child_level).await?;
        let mut groups: BTreeMap<i64, (Vec<[u8; 32]>, u64, i64)> = BTreeMap::new();
        for child in &children {
            let parent_bucket = Timestamp::from_secs(child.bucket_ts).bucket_start(parent_level.bucket_seconds()).secs;
            let entry = groups.entry(parent_bucket).or_insert_with(|| (Vec::new(), 0, 0));
            entry.0.push(child.address);
            entry.1 += child.count;
            entry.2 = entry.2.max(child.generate_ts);
        }

        for (bucket_ts, (addresses, count, max_generate_ts)) in groups {
            let existing = self.load_leaf(entity, parent_level, bucket_ts).await?;
            if existing.as_ref().map(|p| p.generate_ts) >= Some(max_generate_ts) {
                continue;
            }
            let address = addresses.into_iter().fold([0u8; 32], xor32);
            let leaf = MerkleLeaf {
                level: parent_level,
                address,
                bucket_ts,
                count,
                child_hash: address,
                generate_ts: max_generate_ts,
            };
            self.save_leaf(entity, &leaf).await?;
        }
        Ok(())
    }

    /// The combined top-of-tree address: XOR of all `Year` leaf addresses.
    /// Two trees over the same oplog set agree here regardless of how
    /// incrementally they were built.
    pub async fn top_level_node(&self, entity: &MeshId) -> Result<[u8; 32]> {
        let years = self.scan_level(entity, MerkleLevel::Year).await?;
        Ok(years.into_iter().fold([0u8; 32], |acc, leaf| xor32(acc, leaf.address)))
    }

    /// Build a tree directly from an oplog set, bypassing the incremental
    /// `Now`/rollup machinery. Used to check the round-trip invariant: the
    /// live tree's `top_level_node` must equal this function's result for
    /// the same set of `(update_ts, log_id)` pairs.
    pub async fn rebuild_from_scratch(&self, entity: &MeshId, oplogs: &[(Timestamp, MeshId)]) -> Result<[u8; 32]> {
        let mut now_buckets: BTreeMap<i64, ([u8; 32], u64)> = BTreeMap::new();
        for (ts, log_id) in oplogs {
            let bucket_ts = ts.bucket_start(MerkleLevel::Now.bucket_seconds()).secs;
            let entry = now_buckets.entry(bucket_ts).or_insert(([0u8; 32], 0));
            entry.0 = xor32(entry.0, keccak256(log_id.as_bytes()));
            entry.1 += 1;
        }

        let mut level_buckets: BTreeMap<i64, [u8; 32]> =
            now_buckets.into_iter().map(|(ts, (addr, _))| (ts, addr)).collect();

        for level in [MerkleLevel::Day, MerkleLevel::Month, MerkleLevel::Year] {
            let mut next: BTreeMap<i64, [u8; 32]> = BTreeMap::new();
            for (bucket_ts, address) in level_buckets {
                let parent_bucket = Timestamp::from_secs(bucket_ts).bucket_start(level.bucket_seconds()).secs;
                let entry = next.entry(parent_bucket).or_insert([0u8; 32]);
                *entry = xor32(*entry, address);
            }
            level_buckets = next;
        }

        Ok(level_buckets.into_values().fold([0u8; 32], xor32))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kv::MemStore;

    #[tokio::test]
    async fn record_oplog_accumulates_into_now_bucket() {
        let kv = Arc::new(MemStore::new());
        let store = MerkleStore::new(kv, OplogStream::Master);
        let entity = MeshId([1u8; 32]);
        let ts = Timestamp::from_secs(1_700_000_000);

        store.record_oplog(&entity, ts, &MeshId([2u8; 32]), ts).await.unwrap();
        store.record_oplog(&entity, ts, &MeshId([3u8; 32]), ts).await.unwrap();

        let bucket_ts = ts.bucket_start(3600).secs;
        let leaf = store.load_leaf(&entity, MerkleLevel::Now, bucket_ts).await.unwrap().unwrap();
        assert_eq!(leaf.count, 2);
    }

    #[tokio::test]
    async fn rollup_promotes_closed_now_buckets_and_folds_upward() {
        let kv = Arc::new(MemStore::new());
        let store = MerkleStore::new(kv, OplogStream::Master);
        let entity = MeshId([1u8; 32]);
        let old_ts = Timestamp::from_secs(1_000_000);

        store
            .record_oplog(&entity, old_ts, &MeshId([9u8; 32]), old_ts)
            .await
            .unwrap();

        let now = old_ts.plus_seconds(3600 * 2);
        store.rollup(&entity, now, 450).await.unwrap();

        let bucket_ts = old_ts.bucket_start(3600).secs;
        let hour_leaf = store.load_leaf(&entity, MerkleLevel::Hour, bucket_ts).await.unwrap();
        assert!(hour_leaf.is_some());

        let top = store.top_level_node(&entity).await.unwrap();
        assert_ne!(top, [0u8; 32]);
    }

    #[tokio::test]
    async fn incremental_tree_matches_rebuild_from_scratch() {
        let kv = Arc::new(MemStore::new());
        let store = MerkleStore::new(kv, OplogStream::Master);
        let entity = MeshId([1u8; 32]);

        let oplogs = vec![
            (Timestamp::from_secs(10), MeshId([1u8; 32])),
            (Timestamp::from_secs(90_000), MeshId([2u8; 32])),
            (Timestamp::from_secs(5_000_000), MeshId([3u8; 32])),
        ];

        for (ts, log_id) in &oplogs {
            store.record_oplog(&entity, *ts, log_id, *ts).await.unwrap();
        }

        let far_future = Timestamp::from_secs(10_000_000);
        store.rollup(&entity, far_future, 450).await.unwrap();

        let incremental_top = store.top_level_node(&entity).await.unwrap();
        let scratch_top = store.rebuild_from_scratch(&entity, &oplogs).await.unwrap();
        assert_eq!(incremental_top, scratch_top);
    }
}
