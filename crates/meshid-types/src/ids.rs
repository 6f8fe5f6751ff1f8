//! Fixed-size identifier newtypes.
//!
//! All identifiers in the identity core are raw byte arrays rather than
//! UUIDs: identities and devices are named by cryptographic material
//! (a hash of a public key), not by a randomly-generated tag.

use std::fmt;

/// 32-byte identifier for an identity, a log entry, or a derived key.
///
/// Mirrors the original `types.PttID`: a single 32-byte id type reused
/// across several entities rather than one newtype per entity.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
pub struct MeshId(pub [u8; 32]);

impl MeshId {
    pub const ZERO: MeshId = MeshId([0u8; 32]);

    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        if bytes.len() != 32 {
            return None;
        }
        let mut buf = [0u8; 32];
        buf.copy_from_slice(bytes);
        Some(MeshId(buf))
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Overwrite the last `n` bytes with `suffix`, used by onboarding's
    /// `postfix_bytes` install step (§4.5 step 7).
    pub fn with_suffix(mut self, suffix: &[u8]) -> Self {
        let n = suffix.len().min(32);
        let start = 32 - n;
        self.0[start..].copy_from_slice(&suffix[..n]);
        self
    }
}

impl fmt::Debug for MeshId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MeshId({})", hex::encode(self.0))
    }
}

impl fmt::Display for MeshId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

/// 64-byte transport node public key, identifying one physical device.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
pub struct NodeId(pub [u8; 64]);

impl NodeId {
    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        if bytes.len() != 64 {
            return None;
        }
        let mut buf = [0u8; 64];
        buf.copy_from_slice(bytes);
        Some(NodeId(buf))
    }

    pub fn as_bytes(&self) -> &[u8; 64] {
        &self.0
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId({}...)", hex::encode(&self.0[..8]))
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

/// 20-byte address: the hash of a public key, used both as a `KeyInfo`
/// lookup handle and as the low bytes of a derived `MeshId`.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
pub struct Address(pub [u8; 20]);

impl Address {
    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        if bytes.len() != 20 {
            return None;
        }
        let mut buf = [0u8; 20];
        buf.copy_from_slice(bytes);
        Some(Address(buf))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", hex::encode(self.0))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

/// uint64 Raft node id, derived from a device's [`NodeId`].
///
/// Derivation lives in `meshid-crypto` (it needs a hash function); this
/// type is just the wire/storage representation plus the invariant check
/// callers run after deriving it (§3: `d.raft_id = derive_raft_id(d.node_id)`).
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, serde::Serialize, serde::Deserialize)]
pub struct RaftId(pub u64);

impl fmt::Display for RaftId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

/// Composite id attributing an oplog signature to a specific device,
/// derived from `(node_pubkey, owner_id)` (§GLOSSARY: node-sign-id).
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
pub struct NodeSignId(pub [u8; 32]);

impl fmt::Debug for NodeSignId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeSignId({})", hex::encode(self.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mesh_id_with_suffix_replaces_only_tail() {
        let id = MeshId([0xAAu8; 32]);
        let replaced = id.with_suffix(&[1, 2, 3]);
        assert_eq!(&replaced.0[..29], &[0xAAu8; 29]);
        assert_eq!(&replaced.0[29..], &[1, 2, 3]);
    }

    #[test]
    fn from_slice_rejects_wrong_length() {
        assert!(MeshId::from_slice(&[0u8; 31]).is_none());
        assert!(NodeId::from_slice(&[0u8; 63]).is_none());
        assert!(Address::from_slice(&[0u8; 19]).is_none());
    }
}
