//! Frame payload cipher: AES-128-CFB, 16-byte IV prepended, PKCS#7 padded
//! plaintext of `op: u32 BE || data` (§6).

use crate::error::{CryptoError, Result};
use aes::Aes128;
use cfb_mode::cipher::{KeyIvInit, StreamCipher};
use cfb_mode::{Decryptor, Encryptor};
use rand::RngCore;

const BLOCK_SIZE: usize = 16;

type Aes128CfbEnc = Encryptor<Aes128>;
type Aes128CfbDec = Decryptor<Aes128>;

/// The op-key/sign-key/join-key scalar is 32 bytes; the cipher key is its
/// first 16 bytes (§6).
fn cipher_key(scalar32: &[u8; 32]) -> [u8; 16] {
    let mut key = [0u8; 16];
    key.copy_from_slice(&scalar32[..16]);
    key
}

fn pkcs7_pad(data: &[u8]) -> Vec<u8> {
    let pad_len = BLOCK_SIZE - (data.len() % BLOCK_SIZE);
    let mut out = Vec::with_capacity(data.len() + pad_len);
    out.extend_from_slice(data);
    out.extend(std::iter::repeat(pad_len as u8).take(pad_len));
    out
}

fn pkcs7_unpad(data: &[u8]) -> Result<Vec<u8>> {
    let pad_len = *data.last().ok_or(CryptoError::BadPadding)? as usize;
    if pad_len == 0 || pad_len > BLOCK_SIZE || pad_len > data.len() {
        return Err(CryptoError::BadPadding);
    }
    if !data[data.len() - pad_len..].iter().all(|&b| b as usize == pad_len) {
        return Err(CryptoError::BadPadding);
    }
    Ok(data[..data.len() - pad_len].to_vec())
}

/// Encrypt `op: u32 BE || data` under `key`, returning `iv || ciphertext`
/// (the spec's `ev_with_salt`).
pub fn encrypt_frame(key_scalar: &[u8; 32], op: u32, data: &[u8]) -> Vec<u8> {
    let mut plaintext = Vec::with_capacity(4 + data.len());
    plaintext.extend_from_slice(&op.to_be_bytes());
    plaintext.extend_from_slice(data);
    let mut buf = pkcs7_pad(&plaintext);

    let mut iv = [0u8; BLOCK_SIZE];
    rand::rngs::OsRng.fill_bytes(&mut iv);

    let key = cipher_key(key_scalar);
    let mut cipher = Aes128CfbEnc::new(&key.into(), &iv.into());
    cipher.apply_keystream(&mut buf);

    let mut out = Vec::with_capacity(BLOCK_SIZE + buf.len());
    out.extend_from_slice(&iv);
    out.extend_from_slice(&buf);
    out
}

/// Decrypt `iv || ciphertext`, returning `(op, data)`.
pub fn decrypt_frame(key_scalar: &[u8; 32], ev_with_salt: &[u8]) -> Result<(u32, Vec<u8>)> {
    if ev_with_salt.len() < BLOCK_SIZE + BLOCK_SIZE {
        return Err(CryptoError::ShortFrame);
    }
    let (iv, ciphertext) = ev_with_salt.split_at(BLOCK_SIZE);
    let mut buf = ciphertext.to_vec();

    let key = cipher_key(key_scalar);
    let mut iv_arr = [0u8; BLOCK_SIZE];
    iv_arr.copy_from_slice(iv);
    let mut cipher = Aes128CfbDec::new(&key.into(), &iv_arr.into());
    cipher.apply_keystream(&mut buf);

    let plaintext = pkcs7_unpad(&buf)?;
    if plaintext.len() < 4 {
        return Err(CryptoError::ShortFrame);
    }
    let op = u32::from_be_bytes(plaintext[..4].try_into().unwrap());
    Ok((op, plaintext[4..].to_vec()))
}
