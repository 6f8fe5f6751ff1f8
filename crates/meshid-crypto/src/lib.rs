//! Key derivation, hashing, signing, and frame cryptography for the
//! identity core (component A operations, §4.1, §6).

pub mod cipher;
pub mod error;
pub mod frame;
pub mod hash;
pub mod keys;
pub mod sign;

pub use error::{CryptoError, Result};
pub use frame::Frame;
pub use hash::{keccak256, pubkey_to_address};
pub use keys::{derive_key, derive_node_sign_id, derive_raft_id, generate_key, new_key_info, reconstruct, GeneratedKey};
pub use sign::{sign, uncompressed_xy_of, verify};
