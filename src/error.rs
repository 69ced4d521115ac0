//! Error types for credvault.
//!
//! Each variant is a distinct failure mode of the vault, the audit trail or
//! the diagnostics around them. Messages name *what* failed and never carry
//! key material, plaintext, or a hint about which part of an authenticated
//! ciphertext was rejected.

use std::fmt;

use crate::selftest::SelfTestFailure;

/// The single error type for all credvault operations.
#[derive(Debug)]
pub enum VaultError {
    /// Required configuration is missing or unusable (for example, no master
    /// key, or a master key that decodes to fewer than 32 bytes).
    Configuration(String),

    /// The master key source was not valid base64.
    KeyFormat,

    /// The AES-256-GCM key could not be constructed (wrong key size).
    CipherInit,

    /// The secure random source failed to produce bytes.
    RandomSource,

    /// A ciphertext blob was too short to contain a nonce.
    TruncatedInput,

    /// A base64-encoded ciphertext could not be decoded.
    Decode,

    /// The GCM tag did not verify. Covers tampering, a wrong master key and
    /// a wrong salt alike; the cause is deliberately not distinguished.
    Authentication,

    /// Writing to or reading from an audit sink failed.
    Persistence(String),

    /// The encryption self-test found a broken property.
    SelfTest(SelfTestFailure),
}

impl fmt::Display for VaultError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Configuration(reason) => write!(f, "configuration error: {}", reason),
            Self::KeyFormat => write!(f, "master key is not valid base64"),
            Self::CipherInit => write!(f, "cipher initialisation failed"),
            Self::RandomSource => write!(f, "randomness source failed"),
            Self::TruncatedInput => write!(f, "ciphertext too short"),
            Self::Decode => write!(f, "ciphertext is not valid base64"),
            Self::Authentication => write!(f, "decryption failed"),
            Self::Persistence(reason) => write!(f, "audit persistence failed: {}", reason),
            Self::SelfTest(failure) => write!(f, "self-test failed: {}", failure),
        }
    }
}

impl std::error::Error for VaultError {}

impl From<SelfTestFailure> for VaultError {
    fn from(failure: SelfTestFailure) -> Self {
        Self::SelfTest(failure)
    }
}

impl From<rusqlite::Error> for VaultError {
    fn from(err: rusqlite::Error) -> Self {
        Self::Persistence(err.to_string())
    }
}

impl From<std::io::Error> for VaultError {
    fn from(err: std::io::Error) -> Self {
        Self::Persistence(err.to_string())
    }
}

impl From<serde_json::Error> for VaultError {
    fn from(err: serde_json::Error) -> Self {
        Self::Persistence(err.to_string())
    }
}

impl From<toml::de::Error> for VaultError {
    fn from(err: toml::de::Error) -> Self {
        Self::Configuration(err.to_string())
    }
}
