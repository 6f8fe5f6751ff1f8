//! Bucketed Merkle tree leaf types (§3).
//!
//! Five levels over timestamp buckets: now (<=1h), hour, day, month, year.
//! Each leaf aggregates the oplogs whose `update_ts` falls in its bucket.

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
pub enum MerkleLevel {
    Now,
    Hour,
    Day,
    Month,
    Year,
}

impl MerkleLevel {
    pub const ALL: [MerkleLevel; 5] = [
        MerkleLevel::Now,
        MerkleLevel::Hour,
        MerkleLevel::Day,
        MerkleLevel::Month,
        MerkleLevel::Year,
    ];

    /// Bucket width in seconds for this level. `Now` shares the hour's
    /// bucket width (the "now" leaf *is* the current hour bucket, before
    /// it has been rolled up into the `Hour` level proper) (§4.2).
    pub fn bucket_seconds(self) -> i64 {
        match self {
            MerkleLevel::Now => 3600,
            MerkleLevel::Hour => 3600,
            MerkleLevel::Day => 86_400,
            MerkleLevel::Month => 30 * 86_400,
            MerkleLevel::Year => 365 * 86_400,
        }
    }

    /// The level this one rolls up into, if any.
    pub fn parent(self) -> Option<MerkleLevel> {
        match self {
            MerkleLevel::Now => Some(MerkleLevel::Hour),
            MerkleLevel::Hour => Some(MerkleLevel::Day),
            MerkleLevel::Day => Some(MerkleLevel::Month),
            MerkleLevel::Month => Some(MerkleLevel::Year),
            MerkleLevel::Year => None,
        }
    }
}

#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct MerkleLeaf {
    pub level: MerkleLevel,
    /// Hash of the leaf's aggregated contents (the "address" in storage
    /// key terms).
    pub address: [u8; 32],
    pub bucket_ts: i64,
    pub count: u64,
    pub child_hash: [u8; 32],
    /// Timestamp this leaf was last (re)generated, used to decide whether
    /// a rollup is stale (§4.2 "idempotent: recompute from children if any
    /// child changed since last generate-ts").
    pub generate_ts: i64,
}

impl MerkleLeaf {
    pub fn empty(level: MerkleLevel, bucket_ts: i64) -> Self {
        MerkleLeaf {
            level,
            address: [0u8; 32],
            bucket_ts,
            count: 0,
            child_hash: [0u8; 32],
            generate_ts: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parent_chain_terminates_at_year() {
        let mut level = MerkleLevel::Now;
        let mut hops = 0;
        while let Some(p) = level.parent() {
            level = p;
            hops += 1;
            assert!(hops <= 4);
        }
        assert_eq!(level, MerkleLevel::Year);
    }
}
