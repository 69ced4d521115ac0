//! Key derivation and ownership.
//!
//! This module owns two responsibilities:
//! 1. Stretching the master key plus a per-credential salt into a 256-bit
//!    AES key with PBKDF2-HMAC-SHA256.
//! 2. Holding key material in types that are opaque, non-cloneable and
//!    zeroised on drop.
//!
//! Together with `crypto`, this is one of the two modules that import `ring`.
//!
//! ## Derivation structure
//!
//! ```text
//! PBKDF2-HMAC-SHA256(
//!     password   = master_key[..32],
//!     salt       = per-credential salt (32 random bytes),
//!     iterations = 100_000,
//!     dk_len     = 32
//! )
//! ```
//!
//! Derivation is deterministic, so the derived key is never stored: the same
//! master key and salt always rebuild it on the decrypt path.

use std::fmt;
use std::num::NonZeroU32;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use ring::pbkdf2;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use crate::crypto::{self, EntropySource, KEY_LEN};
use crate::error::VaultError;

/// Size of a per-credential salt in bytes.
pub const SALT_LEN: usize = 32;

/// PBKDF2 iteration count. Changing it makes every existing ciphertext
/// undecryptable.
pub const PBKDF2_ITERATIONS: NonZeroU32 = match NonZeroU32::new(100_000) {
    Some(n) => n,
    None => panic!("PBKDF2 iteration count must be non-zero"),
};

static PBKDF2_ALGORITHM: pbkdf2::Algorithm = pbkdf2::PBKDF2_HMAC_SHA256;

// ---------------------------------------------------------------------------
// Master key
// ---------------------------------------------------------------------------

/// The process-wide root secret. Every per-credential key is derived from it.
///
/// - Not `Clone`.
/// - Zeroised on drop.
/// - `Debug` never prints the bytes.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct MasterKey {
    bytes: [u8; KEY_LEN],
}

impl MasterKey {
    /// Construct a `MasterKey` from exactly 32 raw bytes.
    pub fn from_bytes(bytes: [u8; KEY_LEN]) -> Self {
        Self { bytes }
    }

    /// Construct a `MasterKey` from decoded key material of any length.
    ///
    /// Fewer than 32 bytes is a configuration error. Longer input is accepted
    /// and only its first 32 bytes are kept.
    pub fn from_slice(material: &[u8]) -> Result<Self, VaultError> {
        if material.len() < KEY_LEN {
            return Err(VaultError::Configuration(format!(
                "master key must be at least {} bytes",
                KEY_LEN
            )));
        }
        let mut bytes = [0u8; KEY_LEN];
        bytes.copy_from_slice(&material[..KEY_LEN]);
        Ok(Self { bytes })
    }

    /// The key in the base64 form accepted by `CredentialVault::new`.
    pub fn to_base64(&self) -> Zeroizing<String> {
        Zeroizing::new(STANDARD.encode(self.bytes))
    }

    /// Raw bytes never leave the crate.
    pub(crate) fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.bytes
    }
}

impl fmt::Debug for MasterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("MasterKey(<redacted>)")
    }
}

// ---------------------------------------------------------------------------
// Derived key
// ---------------------------------------------------------------------------

/// A key derived for one credential. Lives only for a single encrypt or
/// decrypt call.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct DerivedKey {
    bytes: [u8; KEY_LEN],
}

impl DerivedKey {
    pub(crate) fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.bytes
    }
}

// ---------------------------------------------------------------------------
// Derivation
// ---------------------------------------------------------------------------

/// Derive the per-credential key for `salt`.
///
/// The salt length is not checked here. Callers should pass the 32-byte salts
/// produced by [`generate_salt`]; PBKDF2 itself accepts any length.
pub fn derive_key(master: &MasterKey, salt: &[u8]) -> DerivedKey {
    let mut derived = [0u8; KEY_LEN];
    pbkdf2::derive(
        PBKDF2_ALGORITHM,
        PBKDF2_ITERATIONS,
        salt,
        master.as_bytes(),
        &mut derived,
    );
    let key = DerivedKey { bytes: derived };
    derived.zeroize();
    key
}

/// Generate a fresh random salt for a new credential.
pub fn generate_salt<R: EntropySource + ?Sized>(rng: &R) -> Result<[u8; SALT_LEN], VaultError> {
    let mut salt = [0u8; SALT_LEN];
    crypto::fill_random(rng, &mut salt)?;
    Ok(salt)
}
