//! Wire frame envelope (§6): `{ node, code, hash, ev_with_salt, checksum,
//! relay }`. Encoding/decoding plus checksum verification live here
//! because the checksum is a Keccak256 hash, not an encryption primitive.

use crate::cipher::{decrypt_frame, encrypt_frame};
use crate::error::{CryptoError, Result};
use crate::hash::keccak256;
use meshid_types::{Address, NodeId};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Frame {
    pub node: NodeId,
    pub code: u64,
    pub hash: Address,
    pub ev_with_salt: Vec<u8>,
    pub checksum: [u8; 32],
    pub relay: u8,
}

impl Frame {
    /// Encrypt `(op, data)` under `key_scalar` and wrap it in a frame
    /// whose checksum is computed over the encrypted payload.
    pub fn encode(
        node: NodeId,
        code: u64,
        hash: Address,
        key_scalar: &[u8; 32],
        op: u32,
        data: &[u8],
        relay: u8,
    ) -> Self {
        let ev_with_salt = encrypt_frame(key_scalar, op, data);
        let checksum = keccak256(&ev_with_salt);
        Frame {
            node,
            code,
            hash,
            ev_with_salt,
            checksum,
            relay,
        }
    }

    /// Verify the checksum, then decrypt the payload under `key_scalar`.
    pub fn decode(&self, key_scalar: &[u8; 32]) -> Result<(u32, Vec<u8>)> {
        let expected = keccak256(&self.ev_with_salt);
        if expected != self.checksum {
            return Err(CryptoError::InvalidSignature);
        }
        decrypt_frame(key_scalar, &self.ev_with_salt)
    }

    /// Serialize to the on-wire byte layout: node(64) || code(8 BE) ||
    /// hash(20) || len(ev_with_salt)(4 BE) || ev_with_salt || checksum(32)
    /// || relay(1).
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(64 + 8 + 20 + 4 + self.ev_with_salt.len() + 32 + 1);
        out.extend_from_slice(&self.node.0);
        out.extend_from_slice(&self.code.to_be_bytes());
        out.extend_from_slice(&self.hash.0);
        out.extend_from_slice(&(self.ev_with_salt.len() as u32).to_be_bytes());
        out.extend_from_slice(&self.ev_with_salt);
        out.extend_from_slice(&self.checksum);
        out.push(self.relay);
        out
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        const HEAD: usize = 64 + 8 + 20 + 4;
        if bytes.len() < HEAD + 32 + 1 {
            return Err(CryptoError::ShortFrame);
        }
        let node = NodeId::from_slice(&bytes[..64]).ok_or(CryptoError::ShortFrame)?;
        let code = u64::from_be_bytes(bytes[64..72].try_into().unwrap());
        let hash = Address::from_slice(&bytes[72..92]).ok_or(CryptoError::ShortFrame)?;
        let ev_len = u32::from_be_bytes(bytes[92..96].try_into().unwrap()) as usize;
        let ev_start = 96;
        let ev_end = ev_start + ev_len;
        if bytes.len() < ev_end + 32 + 1 {
            return Err(CryptoError::ShortFrame);
        }
        let ev_with_salt = bytes[ev_start..ev_end].to_vec();
        let mut checksum = [0u8; 32];
        checksum.copy_from_slice(&bytes[ev_end..ev_end + 32]);
        let relay = bytes[ev_end + 32];

        Ok(Frame {
            node,
            code,
            hash,
            ev_with_salt,
            checksum,
            relay,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_decode_round_trips_through_wire_bytes() {
        let key = [3u8; 32];
        let frame = Frame::encode(
            NodeId([1u8; 64]),
            42,
            Address([2u8; 20]),
            &key,
            5,
            b"payload",
            0,
        );
        let bytes = frame.to_bytes();
        let parsed = Frame::from_bytes(&bytes).unwrap();
        assert_eq!(parsed, frame);

        let (op, data) = parsed.decode(&key).unwrap();
        assert_eq!(op, 5);
        assert_eq!(data, b"payload");
    }

    #[test]
    fn tampered_checksum_is_rejected() {
        let key = [3u8; 32];
        let mut frame = Frame::encode(NodeId([1u8; 64]), 1, Address([0u8; 20]), &key, 1, b"x", 0);
        frame.checksum[0] ^= 0xFF;
        assert!(frame.decode(&key).is_err());
    }
}
