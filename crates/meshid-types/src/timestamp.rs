//! Wall-clock timestamp used throughout the oplog and key metadata.
//!
//! The original stores seconds + nanoseconds (`types.Timestamp`) so that
//! oplog primary keys, which embed a marshaled timestamp, sort correctly
//! even for entries created within the same second. We keep that shape
//! rather than collapsing to a single `u64` millis field.

use std::time::{SystemTime, UNIX_EPOCH};

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Default, serde::Serialize, serde::Deserialize)]
pub struct Timestamp {
    pub secs: i64,
    pub nanos: i64,
}

impl Timestamp {
    pub const ZERO: Timestamp = Timestamp { secs: 0, nanos: 0 };

    pub fn now() -> Self {
        let d = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();
        Timestamp {
            secs: d.as_secs() as i64,
            nanos: d.subsec_nanos() as i64,
        }
    }

    pub fn from_secs(secs: i64) -> Self {
        Timestamp { secs, nanos: 0 }
    }

    pub fn plus_seconds(&self, secs: i64) -> Self {
        Timestamp {
            secs: self.secs + secs,
            nanos: self.nanos,
        }
    }

    pub fn minus_seconds(&self, secs: i64) -> Self {
        Timestamp {
            secs: self.secs - secs,
            nanos: self.nanos,
        }
    }

    /// Big-endian marshal used as part of oplog/key-info primary keys so
    /// lexicographic byte order matches timestamp order.
    pub fn marshal(&self) -> [u8; 16] {
        let mut buf = [0u8; 16];
        buf[..8].copy_from_slice(&(self.secs as u64).to_be_bytes());
        buf[8..].copy_from_slice(&(self.nanos as u64).to_be_bytes());
        buf
    }

    pub fn unmarshal(bytes: &[u8; 16]) -> Self {
        let secs = u64::from_be_bytes(bytes[..8].try_into().unwrap()) as i64;
        let nanos = u64::from_be_bytes(bytes[8..].try_into().unwrap()) as i64;
        Timestamp { secs, nanos }
    }

    /// Start of the hour-sized "now" bucket this timestamp falls into.
    pub fn bucket_start(&self, bucket_seconds: i64) -> Timestamp {
        Timestamp::from_secs((self.secs / bucket_seconds) * bucket_seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn marshal_round_trip_preserves_order() {
        let a = Timestamp { secs: 10, nanos: 5 };
        let b = Timestamp { secs: 10, nanos: 6 };
        assert!(a.marshal() < b.marshal());
        assert_eq!(Timestamp::unmarshal(&a.marshal()), a);
    }

    #[test]
    fn bucket_start_floors_to_interval() {
        let ts = Timestamp::from_secs(3661);
        assert_eq!(ts.bucket_start(3600), Timestamp::from_secs(3600));
    }
}
