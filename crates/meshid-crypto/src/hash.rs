//! Keccak256 hashing: frame checksums and public-key addressing (§6).

use sha3::{Digest, Keccak256};

pub fn keccak256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak256::new();
    hasher.update(data);
    let out = hasher.finalize();
    let mut buf = [0u8; 32];
    buf.copy_from_slice(&out);
    buf
}

/// Derive a 20-byte address from an uncompressed secp256k1 public key
/// (the 64 raw X||Y bytes, without the `0x04` SEC1 prefix), matching the
/// original's `PubkeyToAddress`: Keccak256 of the public key, last 20
/// bytes.
pub fn pubkey_to_address(uncompressed_xy: &[u8; 64]) -> meshid_types::Address {
    let digest = keccak256(uncompressed_xy);
    let mut addr = [0u8; 20];
    addr.copy_from_slice(&digest[12..]);
    meshid_types::Address(addr)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keccak256_is_deterministic_and_sensitive_to_input() {
        let a = keccak256(b"hello");
        let b = keccak256(b"hello");
        let c = keccak256(b"hellp");
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn pubkey_to_address_takes_last_20_bytes_of_hash() {
        let pk = [7u8; 64];
        let addr = pubkey_to_address(&pk);
        let full = keccak256(&pk);
        assert_eq!(addr.0, full[12..]);
    }
}
