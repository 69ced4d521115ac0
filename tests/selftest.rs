use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use credvault::selftest::{self, SelfTestFailure};
use credvault::{CredentialVault, SecretCipher, VaultError};

/// Real encryption, but the decrypt path always fails.
struct BrokenDecrypt {
    inner: CredentialVault,
}

impl SecretCipher for BrokenDecrypt {
    fn encrypt_string(&self, plaintext: &str, salt: &[u8]) -> Result<String, VaultError> {
        self.inner.encrypt_string(plaintext, salt)
    }

    fn decrypt_string(&self, _encoded: &str, _salt: &[u8]) -> Result<String, VaultError> {
        Err(VaultError::Authentication)
    }
}

fn vault() -> CredentialVault {
    CredentialVault::new(&STANDARD.encode([b'A'; 32])).unwrap()
}

#[test]
fn test_valid_vault_passes() {
    assert_eq!(selftest::run(&vault()), Ok(()));
}

#[test]
fn test_broken_decrypt_is_reported_as_round_trip() {
    let cipher = BrokenDecrypt { inner: vault() };
    let failure = selftest::run(&cipher).unwrap_err();

    assert!(matches!(failure, SelfTestFailure::RoundTrip(_)));
    let message = VaultError::from(failure).to_string();
    assert!(message.contains("round trip"));
    assert!(!message.contains(selftest::SELF_TEST_PLAINTEXT));
}
