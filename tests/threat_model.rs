use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use credvault::crypto::{self, EntropySource, NONCE_LEN};
use credvault::keys::SALT_LEN;
use credvault::{CredentialVault, SecretCipher, VaultError};
use ring::rand::SystemRandom;

fn vault() -> CredentialVault {
    CredentialVault::new(&STANDARD.encode([b'A'; 32])).unwrap()
}

struct ExhaustedEntropy;

impl EntropySource for ExhaustedEntropy {
    fn fill(&self, _dest: &mut [u8]) -> Result<(), VaultError> {
        Err(VaultError::RandomSource)
    }
}

#[test]
fn test_every_single_byte_flip_is_rejected() {
    // Threat: tampering with a stored blob must never yield altered plaintext.
    let key = [0x42u8; 32];
    let blob = crypto::encrypt(&SystemRandom::new(), &key, b"test-api-key-12345").unwrap();

    for i in 0..blob.len() {
        let mut tampered = blob.clone();
        tampered[i] ^= 0x01;
        assert!(
            matches!(crypto::decrypt(&key, &tampered), Err(VaultError::Authentication)),
            "flip at byte {} was not detected",
            i
        );
    }
}

#[test]
fn test_tampered_base64_ciphertext_is_authentication_failure() {
    let vault = vault();
    let salt = [9u8; SALT_LEN];
    let sealed = vault.encrypt_string("secret", &salt).unwrap();

    let mut raw = STANDARD.decode(&sealed).unwrap();
    // One flip in the nonce, one in the body, one in the tag.
    for i in [0, NONCE_LEN + 1, raw.len() - 1] {
        raw[i] ^= 0x80;
        let tampered = STANDARD.encode(&raw);
        assert!(matches!(
            vault.decrypt_string(&tampered, &salt),
            Err(VaultError::Authentication)
        ));
        raw[i] ^= 0x80;
    }
}

#[test]
fn test_short_blobs_are_rejected_as_truncated() {
    let vault = vault();
    let salt = [0u8; SALT_LEN];
    for len in [0, 1, NONCE_LEN - 1] {
        let encoded = STANDARD.encode(vec![0u8; len]);
        assert!(matches!(
            vault.decrypt_string(&encoded, &salt),
            Err(VaultError::TruncatedInput)
        ));
    }
}

#[test]
fn test_authentication_error_does_not_say_why() {
    let vault = vault();
    let sealed = vault.encrypt_string("secret", &[1u8; SALT_LEN]).unwrap();
    let err = vault.decrypt_string(&sealed, &[2u8; SALT_LEN]).unwrap_err();
    assert_eq!(err.to_string(), "decryption failed");
}

#[test]
fn test_other_master_key_cannot_decrypt() {
    // Threat: a ciphertext copied to a deployment with another root key.
    let other = CredentialVault::new(&STANDARD.encode([b'B'; 32])).unwrap();
    let salt = [3u8; SALT_LEN];
    let sealed = vault().encrypt_string("secret", &salt).unwrap();
    assert!(matches!(
        other.decrypt_string(&sealed, &salt),
        Err(VaultError::Authentication)
    ));
}

#[test]
fn test_short_master_key_builds_no_vault() {
    for len in [0usize, 16, 31] {
        let result = CredentialVault::new(&STANDARD.encode(vec![1u8; len]));
        assert!(matches!(result, Err(VaultError::Configuration(_))));
    }
    assert!(matches!(
        CredentialVault::new("***not-base64***"),
        Err(VaultError::KeyFormat)
    ));
}

#[test]
fn test_entropy_failure_stops_encryption() {
    let vault = vault().with_entropy_source(Box::new(ExhaustedEntropy));
    assert!(matches!(
        vault.encrypt_string("secret", &[0u8; SALT_LEN]),
        Err(VaultError::RandomSource)
    ));
}
