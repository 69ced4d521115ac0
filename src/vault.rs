//! The credential encryption service.
//!
//! `CredentialVault` composes key derivation and AES-GCM: every call derives
//! the credential's key from the master key and the caller-supplied salt,
//! encrypts or decrypts, and drops the derived key before returning. The
//! vault holds no mutable state, so one instance can be shared across
//! threads without locking.
//!
//! The vault knows nothing about auditing. Callers record the outcome of each
//! call through [`crate::audit::AuditLog`] after they have observed it.

use std::fmt;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use ring::rand::SystemRandom;
use zeroize::{Zeroize, Zeroizing};

use crate::config::SecurityConfig;
use crate::crypto::{self, EntropySource};
use crate::error::VaultError;
use crate::keys::{self, MasterKey, SALT_LEN};

/// String-level encryption used by operators and diagnostics.
///
/// [`CredentialVault`] is the production implementation; the seam exists so
/// the self-test can be pointed at any implementation.
pub trait SecretCipher {
    /// Encrypt a UTF-8 secret and return base64 text.
    fn encrypt_string(&self, plaintext: &str, salt: &[u8]) -> Result<String, VaultError>;

    /// Reverse [`SecretCipher::encrypt_string`].
    fn decrypt_string(&self, encoded: &str, salt: &[u8]) -> Result<String, VaultError>;
}

/// Encrypts and decrypts stored credentials under keys derived per salt.
pub struct CredentialVault {
    master: MasterKey,
    entropy: Box<dyn EntropySource>,
}

impl fmt::Debug for CredentialVault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialVault")
            .field("master", &self.master)
            .finish_non_exhaustive()
    }
}

impl CredentialVault {
    /// Build a vault from a base64-encoded master key.
    ///
    /// Fails with `KeyFormat` if the text is not base64, and with
    /// `Configuration` if it decodes to fewer than 32 bytes. No vault exists
    /// unless the key is usable.
    pub fn new(master_key_b64: &str) -> Result<Self, VaultError> {
        let decoded = Zeroizing::new(
            STANDARD
                .decode(master_key_b64.trim())
                .map_err(|_| VaultError::KeyFormat)?,
        );
        let master = MasterKey::from_slice(&decoded)?;
        tracing::debug!("credential vault initialised");
        Ok(Self::with_master_key(master))
    }

    /// Build a vault around an already decoded master key.
    pub fn with_master_key(master: MasterKey) -> Self {
        Self {
            master,
            entropy: Box::new(SystemRandom::new()),
        }
    }

    /// Build a vault from validated configuration.
    pub fn from_config(config: &SecurityConfig) -> Result<Self, VaultError> {
        let encoded = config.master_key.as_deref().ok_or_else(|| {
            VaultError::Configuration("security.master_key is required".into())
        })?;
        Self::new(encoded)
    }

    /// Replace the random source used for nonces.
    pub fn with_entropy_source(mut self, entropy: Box<dyn EntropySource>) -> Self {
        self.entropy = entropy;
        self
    }

    /// Generate a salt for a new credential. Does not touch any vault key.
    pub fn generate_salt() -> Result<[u8; SALT_LEN], VaultError> {
        keys::generate_salt(&SystemRandom::new())
    }

    /// Encrypt raw bytes for the credential identified by `salt`.
    pub fn encrypt(&self, plaintext: &[u8], salt: &[u8]) -> Result<Vec<u8>, VaultError> {
        let key = keys::derive_key(&self.master, salt);
        let blob = crypto::encrypt(self.entropy.as_ref(), key.as_bytes(), plaintext)?;
        tracing::debug!(
            plaintext_len = plaintext.len(),
            blob_len = blob.len(),
            "encrypted payload"
        );
        Ok(blob)
    }

    /// Decrypt a blob produced by [`CredentialVault::encrypt`] with the same salt.
    pub fn decrypt(&self, blob: &[u8], salt: &[u8]) -> Result<Vec<u8>, VaultError> {
        let key = keys::derive_key(&self.master, salt);
        crypto::decrypt(key.as_bytes(), blob).map_err(|err| {
            tracing::warn!(blob_len = blob.len(), error = %err, "payload rejected");
            err
        })
    }
}

impl SecretCipher for CredentialVault {
    fn encrypt_string(&self, plaintext: &str, salt: &[u8]) -> Result<String, VaultError> {
        let blob = self.encrypt(plaintext.as_bytes(), salt)?;
        Ok(STANDARD.encode(blob))
    }

    fn decrypt_string(&self, encoded: &str, salt: &[u8]) -> Result<String, VaultError> {
        let blob = STANDARD.decode(encoded).map_err(|_| VaultError::Decode)?;
        let mut plaintext = Zeroizing::new(self.decrypt(&blob, salt)?);
        // The bytes move into the returned `String`; no unzeroised copy is left.
        String::from_utf8(std::mem::take(&mut *plaintext)).map_err(|err| {
            err.into_bytes().zeroize();
            VaultError::Decode
        })
    }
}
