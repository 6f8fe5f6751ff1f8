//! ECDSA signing/verification over oplog hashes (§3 `SignInfo`).

use crate::error::{CryptoError, Result};
use k256::ecdsa::signature::{Signer, Verifier};
use k256::ecdsa::{Signature, SigningKey, VerifyingKey};
use k256::elliptic_curve::sec1::ToEncodedPoint;

pub fn sign(signing_key: &SigningKey, hash: &[u8; 32]) -> Vec<u8> {
    let sig: Signature = signing_key.sign(hash);
    sig.to_der().as_bytes().to_vec()
}

pub fn verify(pubkey_uncompressed_xy: &[u8], hash: &[u8; 32], sig_der: &[u8]) -> Result<()> {
    if pubkey_uncompressed_xy.len() != 64 {
        return Err(CryptoError::MalformedKey(
            "expected 64-byte uncompressed public key".into(),
        ));
    }
    let mut sec1 = [0u8; 65];
    sec1[0] = 0x04;
    sec1[1..].copy_from_slice(pubkey_uncompressed_xy);

    let verifying_key = VerifyingKey::from_sec1_bytes(&sec1)
        .map_err(|e| CryptoError::MalformedKey(e.to_string()))?;
    let signature =
        Signature::from_der(sig_der).map_err(|_| CryptoError::InvalidSignature)?;

    verifying_key
        .verify(hash, &signature)
        .map_err(|_| CryptoError::InvalidSignature)
}

pub fn uncompressed_xy_of(signing_key: &SigningKey) -> [u8; 64] {
    let point = signing_key.verifying_key().to_encoded_point(false);
    let mut xy = [0u8; 64];
    xy.copy_from_slice(&point.as_bytes()[1..]);
    xy
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_then_verify_round_trips() {
        let signing_key = SigningKey::random(&mut rand::rngs::OsRng);
        let hash = [1u8; 32];
        let sig = sign(&signing_key, &hash);
        let pubkey = uncompressed_xy_of(&signing_key);
        assert!(verify(&pubkey, &hash, &sig).is_ok());
    }

    #[test]
    fn verify_rejects_tampered_hash() {
        let signing_key = SigningKey::random(&mut rand::rngs::OsRng);
        let hash = [1u8; 32];
        let sig = sign(&signing_key, &hash);
        let pubkey = uncompressed_xy_of(&signing_key);
        let other_hash = [2u8; 32];
        assert!(verify(&pubkey, &other_hash, &sig).is_err());
    }

    #[test]
    fn verify_rejects_wrong_key() {
        let signing_key = SigningKey::random(&mut rand::rngs::OsRng);
        let other_key = SigningKey::random(&mut rand::rngs::OsRng);
        let hash = [1u8; 32];
        let sig = sign(&signing_key, &hash);
        let pubkey = uncompressed_xy_of(&other_key);
        assert!(verify(&pubkey, &hash, &sig).is_err());
    }
}
