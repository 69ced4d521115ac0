//! # credvault
//!
//! Encryption at rest for per-user exchange API keys.
//!
//! Each stored credential gets its own AES-256-GCM key, stretched from one
//! master key and a random per-credential salt with PBKDF2-HMAC-SHA256.
//! Every access attempt is recorded in an append-only audit trail that the
//! caller drives independently of the vault.
//!
//! ## Public API
//!
//! - [`CredentialVault`]: encrypt and decrypt secrets under a salt.
//! - [`audit::AuditLog`]: record encrypt, decrypt and validation attempts.
//! - [`selftest::run`]: round-trip and salt-uniqueness diagnostic.
//! - [`config::Config`]: the configuration schema.
//!
//! Salts are the caller's to store: generate one per credential with
//! [`CredentialVault::generate_salt`] and keep it next to the ciphertext.

pub mod audit;
pub mod cli;
pub mod config;
pub mod crypto;
pub mod error;
pub mod keys;
pub mod selftest;
pub mod vault;

pub use error::VaultError;
pub use keys::MasterKey;
pub use vault::{CredentialVault, SecretCipher};

use ring::rand::SystemRandom;

/// Generate a cryptographically secure master key.
///
/// Used to bootstrap configuration. In production the key is provisioned once
/// and supplied through `security.master_key`.
pub fn generate_master_key() -> Result<MasterKey, VaultError> {
    let mut bytes = [0u8; crypto::KEY_LEN];
    crypto::fill_random(&SystemRandom::new(), &mut bytes)?;
    let key = MasterKey::from_bytes(bytes);
    zeroize::Zeroize::zeroize(&mut bytes);
    Ok(key)
}
