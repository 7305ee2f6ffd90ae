//! Password key derivation.
//!
//! Stored credentials look like `argon2id$<salt-hex>$<key-hex>`. The leading
//! tag selects the derivation parameters when verifying, so no external
//! metadata is needed to check a password later.

use argon2::Argon2;
use rand::{rngs::OsRng, RngCore};
use thiserror::Error;

pub const ALGORITHM_TAG: &str = "argon2id";

const SALT_LEN: usize = 16;
const KEY_LEN: usize = 64;

/// Minimum length enforced by the password update flow.
pub const MIN_UPDATE_LENGTH: usize = 6;

#[derive(Debug, Error)]
pub enum PasswordError {
    #[error("failed to generate salt: {0}")]
    Rng(#[from] rand::Error),

    #[error("key derivation failed: {0}")]
    Kdf(argon2::Error),

    #[error("malformed password hash")]
    Malformed,

    #[error("unsupported password hash algorithm: {0}")]
    UnsupportedAlgorithm(String),
}

/// Derive a salted key from `password` with a fresh random salt.
///
/// # Errors
/// Returns an error if the OS RNG or the KDF fails.
pub fn hash_password(password: &str) -> Result<String, PasswordError> {
    let mut salt = [0u8; SALT_LEN];
    OsRng.try_fill_bytes(&mut salt)?;

    let key = derive(password.as_bytes(), &salt)?;

    Ok(format!(
        "{ALGORITHM_TAG}${}${}",
        hex::encode(salt),
        hex::encode(key)
    ))
}

/// Check `password` against an encoded hash produced by [`hash_password`].
///
/// # Errors
/// Returns an error when the encoded value is malformed or names an unknown algorithm.
pub fn verify_password(password: &str, encoded: &str) -> Result<bool, PasswordError> {
    let mut parts = encoded.split('$');
    let (Some(tag), Some(salt_hex), Some(key_hex), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(PasswordError::Malformed);
    };

    if tag != ALGORITHM_TAG {
        return Err(PasswordError::UnsupportedAlgorithm(tag.to_string()));
    }

    let salt = hex::decode(salt_hex).map_err(|_| PasswordError::Malformed)?;
    let expected = hex::decode(key_hex).map_err(|_| PasswordError::Malformed)?;
    if expected.len() != KEY_LEN {
        return Err(PasswordError::Malformed);
    }

    let actual = derive(password.as_bytes(), &salt)?;

    // Fold the whole key so timing does not depend on where a mismatch occurs.
    let diff = actual
        .iter()
        .zip(expected.iter())
        .fold(0u8, |acc, (a, b)| acc | (a ^ b));

    Ok(diff == 0)
}

fn derive(password: &[u8], salt: &[u8]) -> Result<[u8; KEY_LEN], PasswordError> {
    let mut key = [0u8; KEY_LEN];
    Argon2::default()
        .hash_password_into(password, salt, &mut key)
        .map_err(PasswordError::Kdf)?;
    Ok(key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;

    #[test]
    fn hash_has_tag_salt_and_key() -> Result<()> {
        let encoded = hash_password("hunter22")?;
        let parts: Vec<&str> = encoded.split('$').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], ALGORITHM_TAG);
        assert_eq!(parts[1].len(), SALT_LEN * 2);
        assert_eq!(parts[2].len(), KEY_LEN * 2);
        Ok(())
    }

    #[test]
    fn same_password_gets_fresh_salt() -> Result<()> {
        let first = hash_password("same-password")?;
        let second = hash_password("same-password")?;
        assert_ne!(first, second);
        assert_ne!(first.split('$').nth(1), second.split('$').nth(1));
        assert!(first.starts_with("argon2id$"));
        assert!(second.starts_with("argon2id$"));
        Ok(())
    }

    #[test]
    fn hash_never_contains_plaintext() -> Result<()> {
        let encoded = hash_password("plaintext-secret")?;
        assert!(!encoded.contains("plaintext-secret"));
        Ok(())
    }

    #[test]
    fn verify_accepts_matching_password() -> Result<()> {
        let encoded = hash_password("correct horse")?;
        assert!(verify_password("correct horse", &encoded)?);
        assert!(!verify_password("wrong horse", &encoded)?);
        Ok(())
    }

    #[test]
    fn verify_rejects_unknown_algorithm() {
        let result = verify_password("x", "scrypt$00$00");
        assert!(matches!(
            result,
            Err(PasswordError::UnsupportedAlgorithm(tag)) if tag == "scrypt"
        ));
    }

    #[test]
    fn verify_rejects_malformed() {
        assert!(matches!(
            verify_password("x", "argon2id$zz"),
            Err(PasswordError::Malformed)
        ));
        assert!(matches!(
            verify_password("x", "argon2id$0011$not-hex"),
            Err(PasswordError::Malformed)
        ));
    }
}
