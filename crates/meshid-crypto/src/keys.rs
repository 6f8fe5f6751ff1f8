//! Key generation, derivation, addressing, raft-id and node-sign-id
//! derivation (§4.1, §3).

use crate::error::{CryptoError, Result};
use crate::hash::{keccak256, pubkey_to_address};
use k256::ecdsa::SigningKey;
use k256::elliptic_curve::sec1::ToEncodedPoint;
use meshid_types::{Address, KeyInfo, KeyKind, MeshId, NodeId, NodeSignId, RaftId, Status, Timestamp};
use pbkdf2::pbkdf2_hmac;
use rand::RngCore;
use sha2::Sha256;
use zeroize::Zeroize;

const PBKDF2_ROUNDS: u32 = 1;

/// Raw 32-byte secp256k1 scalar plus its derived address, bundled so
/// callers never have to re-derive the public key.
pub struct GeneratedKey {
    pub scalar: [u8; 32],
    pub address: Address,
}

fn uncompressed_xy(signing_key: &SigningKey) -> [u8; 64] {
    let point = signing_key.verifying_key().to_encoded_point(false);
    let mut xy = [0u8; 64];
    // `to_encoded_point(false)` is `0x04 || X || Y`; drop the SEC1 tag.
    xy.copy_from_slice(&point.as_bytes()[1..]);
    xy
}

fn from_scalar(scalar: &[u8; 32]) -> Result<SigningKey> {
    SigningKey::from_bytes(scalar.into())
        .map_err(|e| CryptoError::MalformedKey(e.to_string()))
}

/// `new_join_key` / bare `generate_key`: a fresh random ECDSA keypair, no
/// derivation (§4.1).
pub fn generate_key() -> GeneratedKey {
    let signing_key = SigningKey::random(&mut rand::rngs::OsRng);
    let mut scalar = [0u8; 32];
    scalar.copy_from_slice(&signing_key.to_bytes());
    let address = pubkey_to_address(&uncompressed_xy(&signing_key));
    GeneratedKey { scalar, address }
}

/// PBKDF2-HMAC-SHA256(master, salt, 1 iter, 32 bytes) reinterpreted as a
/// secp256k1 scalar (§4.1, SPEC_FULL supplement). Redraws the salt on the
/// near-zero-probability event the derived scalar is invalid for the
/// curve, exactly as `new_join_key`'s plain random generation would if it
/// happened to draw zero.
pub fn derive_key(master_scalar: &[u8; 32]) -> Result<(GeneratedKey, [u8; 16])> {
    for _ in 0..4 {
        let mut salt = [0u8; 16];
        rand::rngs::OsRng.fill_bytes(&mut salt);

        let mut derived = [0u8; 32];
        pbkdf2_hmac::<Sha256>(master_scalar, &salt, PBKDF2_ROUNDS, &mut derived);

        match from_scalar(&derived) {
            Ok(signing_key) => {
                let address = pubkey_to_address(&uncompressed_xy(&signing_key));
                return Ok((
                    GeneratedKey {
                        scalar: derived,
                        address,
                    },
                    salt,
                ));
            }
            Err(_) => continue,
        }
    }
    Err(CryptoError::DerivationOutOfRange)
}

/// Build a `KeyInfo` of the given kind for `entity`, deriving from
/// `master` when one is supplied (op/sign keys) or generating fresh
/// random material otherwise (join keys) (§4.1).
pub fn new_key_info(
    entity: MeshId,
    doer_id: MeshId,
    kind: KeyKind,
    master: Option<&[u8; 32]>,
) -> Result<KeyInfo> {
    let (generated, derivation) = match master {
        Some(m) => {
            let (g, salt) = derive_key(m)?;
            (
                g,
                Some(meshid_types::DerivationMeta { parent: None, salt }),
            )
        }
        None => (generate_key(), None),
    };

    let id = MeshId::ZERO.with_suffix(&generated.address.0);
    Ok(KeyInfo {
        id,
        key_bytes: generated.scalar,
        address: generated.address,
        update_ts: Timestamp::now(),
        entity_id: entity,
        doer_id,
        kind,
        status: Status::Alive,
        log_id: None,
        derivation,
    })
}

/// Reconstruct the signing key for a stored `KeyInfo`, zeroizing the
/// intermediate scalar on drop.
pub fn reconstruct(key_info: &KeyInfo) -> Result<SigningKey> {
    from_scalar(&key_info.key_bytes)
}

/// `derive_raft_id`: uint64 hash of a device's 64-byte node public key
/// (§3 invariant, §GLOSSARY).
pub fn derive_raft_id(node_id: &NodeId) -> RaftId {
    let digest = keccak256(&node_id.0);
    let mut buf = [0u8; 8];
    buf.copy_from_slice(&digest[..8]);
    RaftId(u64::from_be_bytes(buf))
}

/// `node-sign-id`: derived from `(node_pubkey, owner_id)` (§GLOSSARY).
pub fn derive_node_sign_id(node_id: &NodeId, owner_id: &MeshId) -> NodeSignId {
    let mut buf = Vec::with_capacity(64 + 32);
    buf.extend_from_slice(&node_id.0);
    buf.extend_from_slice(owner_id.as_bytes());
    NodeSignId(keccak256(&buf))
}

/// Drop guard wrapper so key bytes in transit are zeroized rather than
/// left on the stack.
pub struct SensitiveScalar(pub [u8; 32]);

impl Drop for SensitiveScalar {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_key_address_is_deterministic_from_scalar() {
        let g = generate_key();
        let signing_key = from_scalar(&g.scalar).unwrap();
        let addr = pubkey_to_address(&uncompressed_xy(&signing_key));
        assert_eq!(addr, g.address);
    }

    #[test]
    fn derive_key_is_deterministic_given_master_and_salt() {
        let master = [42u8; 32];
        let (g1, salt) = derive_key(&master).unwrap();
        let mut derived = [0u8; 32];
        pbkdf2_hmac::<Sha256>(&master, &salt, PBKDF2_ROUNDS, &mut derived);
        assert_eq!(g1.scalar, derived);
    }

    #[test]
    fn raft_id_is_stable_for_same_node_id() {
        let node = NodeId([3u8; 64]);
        assert_eq!(derive_raft_id(&node), derive_raft_id(&node));
    }

    #[test]
    fn raft_id_differs_across_nodes() {
        let a = NodeId([1u8; 64]);
        let b = NodeId([2u8; 64]);
        assert_ne!(derive_raft_id(&a), derive_raft_id(&b));
    }

    #[test]
    fn node_sign_id_binds_owner_and_node() {
        let node = NodeId([5u8; 64]);
        let owner1 = MeshId([1u8; 32]);
        let owner2 = MeshId([2u8; 32]);
        assert_ne!(
            derive_node_sign_id(&node, &owner1),
            derive_node_sign_id(&node, &owner2)
        );
    }

    #[test]
    fn new_key_info_join_key_has_no_derivation_metadata() {
        let info = new_key_info(MeshId::ZERO, MeshId::ZERO, KeyKind::Join, None).unwrap();
        assert!(info.derivation.is_none());
    }

    #[test]
    fn new_key_info_op_key_records_salt() {
        let master = [9u8; 32];
        let info = new_key_info(MeshId::ZERO, MeshId::ZERO, KeyKind::Op, Some(&master)).unwrap();
        assert!(info.derivation.is_some());
    }
}
