//! Encryption self-test.
//!
//! Exercises the full string round trip and checks that distinct salts give
//! distinct ciphertexts. Operators run it at startup or on demand; a failure
//! means the build is broken, not that the environment is flaky.

use std::fmt;

use crate::vault::{CredentialVault, SecretCipher};

/// Known plaintext sealed and opened by the self-test.
pub const SELF_TEST_PLAINTEXT: &str = "test-api-key-12345";

/// Which property the self-test found broken.
///
/// Details are rendered error messages from the vault; they never contain
/// key material or the recovered plaintext.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelfTestFailure {
    /// No salt could be generated.
    SaltGeneration(String),
    /// Encrypting the known plaintext failed.
    Encryption(String),
    /// Decryption failed, or returned something other than the plaintext.
    RoundTrip(String),
    /// Two different salts produced the same ciphertext.
    SaltUniqueness,
}

impl fmt::Display for SelfTestFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SaltGeneration(reason) => write!(f, "salt generation failed: {}", reason),
            Self::Encryption(reason) => write!(f, "encryption failed: {}", reason),
            Self::RoundTrip(reason) => write!(f, "round trip failed: {}", reason),
            Self::SaltUniqueness => write!(f, "different salts produced the same ciphertext"),
        }
    }
}

impl std::error::Error for SelfTestFailure {}

/// Run the self-test against `cipher`.
pub fn run<C: SecretCipher + ?Sized>(cipher: &C) -> Result<(), SelfTestFailure> {
    let salt_one = CredentialVault::generate_salt()
        .map_err(|e| SelfTestFailure::SaltGeneration(e.to_string()))?;
    let salt_two = CredentialVault::generate_salt()
        .map_err(|e| SelfTestFailure::SaltGeneration(e.to_string()))?;

    let encrypt = |salt: &[u8]| {
        cipher
            .encrypt_string(SELF_TEST_PLAINTEXT, salt)
            .map_err(|e| SelfTestFailure::Encryption(e.to_string()))
    };

    let sealed = encrypt(&salt_one[..])?;
    let opened = cipher
        .decrypt_string(&sealed, &salt_one)
        .map_err(|e| SelfTestFailure::RoundTrip(e.to_string()))?;
    if opened != SELF_TEST_PLAINTEXT {
        return Err(SelfTestFailure::RoundTrip(format!(
            "decrypted {} bytes, expected {}",
            opened.len(),
            SELF_TEST_PLAINTEXT.len()
        )));
    }

    if encrypt(&salt_one[..])? == encrypt(&salt_two[..])? {
        return Err(SelfTestFailure::SaltUniqueness);
    }

    tracing::info!("encryption self-test passed");
    Ok(())
}
