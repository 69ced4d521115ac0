//! Authenticated encryption of opaque byte payloads.
//!
//! All AES-GCM work in the crate goes through the two functions here. Keys
//! arrive already derived; this module never sees the master key.
//!
//! Primitive choices:
//! - **Cipher**: AES-256-GCM, no associated data
//! - **Nonce**: 96-bit, freshly random for every `encrypt` call
//! - **Tag**: 128-bit, appended after the ciphertext
//!
//! # Blob layout
//! ```text
//! [ nonce (12 bytes) ][ ciphertext (len(plaintext)) ][ GCM tag (16 bytes) ]
//! ```

use ring::aead::{self, Aad, LessSafeKey, Nonce, UnboundKey, AES_256_GCM};
use ring::rand::{SecureRandom, SystemRandom};

use crate::error::VaultError;

static ALGORITHM: &aead::Algorithm = &AES_256_GCM;

/// Size of the nonce in bytes (96 bits).
pub const NONCE_LEN: usize = aead::NONCE_LEN;

/// Size of the GCM authentication tag in bytes.
pub const TAG_LEN: usize = 16;

/// Size of an AES-256 key in bytes.
pub const KEY_LEN: usize = 32;

/// A source of cryptographically secure random bytes.
///
/// Implementations must be safe to share between threads: nonces and salts
/// are drawn on every call, from any thread holding the vault.
pub trait EntropySource: Send + Sync {
    /// Fill `dest` entirely with random bytes.
    fn fill(&self, dest: &mut [u8]) -> Result<(), VaultError>;
}

impl EntropySource for SystemRandom {
    fn fill(&self, dest: &mut [u8]) -> Result<(), VaultError> {
        SecureRandom::fill(self, dest).map_err(|_| VaultError::RandomSource)
    }
}

pub(crate) fn fill_random<R: EntropySource + ?Sized>(
    rng: &R,
    dest: &mut [u8],
) -> Result<(), VaultError> {
    rng.fill(dest)
}

fn bind_key(key_bytes: &[u8]) -> Result<LessSafeKey, VaultError> {
    let unbound = UnboundKey::new(ALGORITHM, key_bytes).map_err(|_| VaultError::CipherInit)?;
    Ok(LessSafeKey::new(unbound))
}

/// Encrypt `plaintext` under `key_bytes` with a fresh random nonce.
///
/// Fails with `CipherInit` unless the key is exactly 32 bytes, and with
/// `RandomSource` if no nonce could be drawn. Two calls with identical
/// inputs never return the same blob.
pub fn encrypt<R: EntropySource + ?Sized>(
    rng: &R,
    key_bytes: &[u8],
    plaintext: &[u8],
) -> Result<Vec<u8>, VaultError> {
    let key = bind_key(key_bytes)?;

    let mut nonce_bytes = [0u8; NONCE_LEN];
    fill_random(rng, &mut nonce_bytes)?;

    let mut output = Vec::with_capacity(NONCE_LEN + plaintext.len() + TAG_LEN);
    output.extend_from_slice(&nonce_bytes);
    output.extend_from_slice(plaintext);

    // Seal the plaintext region in place; the tag goes on the end.
    let tag = key
        .seal_in_place_separate_tag(
            Nonce::assume_unique_for_key(nonce_bytes),
            Aad::empty(),
            &mut output[NONCE_LEN..],
        )
        .map_err(|_| VaultError::CipherInit)?;
    output.extend_from_slice(tag.as_ref());

    Ok(output)
}

/// Decrypt a blob produced by [`encrypt`].
///
/// Blobs shorter than the nonce are `TruncatedInput`. Every other rejection,
/// including a blob too short to hold a tag, is `Authentication`; no partial
/// plaintext is ever returned.
pub fn decrypt(key_bytes: &[u8], blob: &[u8]) -> Result<Vec<u8>, VaultError> {
    if blob.len() < NONCE_LEN {
        return Err(VaultError::TruncatedInput);
    }
    let key = bind_key(key_bytes)?;

    let (nonce_part, sealed) = blob.split_at(NONCE_LEN);
    let nonce = Nonce::try_assume_unique_for_key(nonce_part)
        .map_err(|_| VaultError::TruncatedInput)?;

    let mut payload = sealed.to_vec();
    let plaintext_len = key
        .open_in_place(nonce, Aad::empty(), &mut payload)
        .map_err(|_| VaultError::Authentication)?
        .len();
    payload.truncate(plaintext_len);

    Ok(payload)
}
