//! `KeyInfo` (§3, §4.1): join/op/sign keys.

use crate::ids::{Address, MeshId};
use crate::status::Status;
use crate::timestamp::Timestamp;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum KeyKind {
    /// Random, short-lived, used to encrypt onboarding frames.
    Join,
    /// Derived from a master key via PBKDF2; used to encrypt post-join
    /// frames.
    Op,
    /// Derived from a master key via PBKDF2; used to sign oplogs.
    Sign,
}

/// BIP32-like derivation metadata recorded alongside a derived key, so a
/// verifier with the master key can re-derive it.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct DerivationMeta {
    pub parent: Option<MeshId>,
    pub salt: [u8; 16],
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct KeyInfo {
    pub id: MeshId,
    /// Raw 32-byte secp256k1 scalar. The reconstructed signing key itself
    /// is never stored; callers re-derive it from these bytes via
    /// `meshid_crypto`.
    pub key_bytes: [u8; 32],
    pub address: Address,
    pub update_ts: Timestamp,
    pub entity_id: MeshId,
    pub doer_id: MeshId,
    pub kind: KeyKind,
    pub status: Status,
    pub log_id: Option<MeshId>,
    pub derivation: Option<DerivationMeta>,
}

impl KeyInfo {
    /// True once `update_ts` is older than `now - expire_seconds`, per the
    /// load-at-startup expiry sweep (§4.1).
    pub fn is_expired(&self, now: Timestamp, expire_seconds: i64) -> bool {
        self.update_ts.secs < now.secs - expire_seconds
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(update_secs: i64) -> KeyInfo {
        KeyInfo {
            id: MeshId::ZERO,
            key_bytes: [7u8; 32],
            address: Address([1u8; 20]),
            update_ts: Timestamp::from_secs(update_secs),
            entity_id: MeshId::ZERO,
            doer_id: MeshId::ZERO,
            kind: KeyKind::Op,
            status: Status::Alive,
            log_id: None,
            derivation: None,
        }
    }

    #[test]
    fn expiry_compares_against_window() {
        let k = sample(100);
        assert!(k.is_expired(Timestamp::from_secs(200), 50));
        assert!(!k.is_expired(Timestamp::from_secs(120), 50));
    }
}
