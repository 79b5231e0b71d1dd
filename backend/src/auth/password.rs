//! Password hashing using argon2
//!
//! Stored hashes have the form `<salt>.<key>`: a hex-encoded random salt and
//! the hex-encoded Argon2id key derived from the password and that salt.
//!
//! # Performance Considerations
//!
//! Argon2 is intentionally CPU- and memory-intensive. In async contexts use
//! the `*_async` variants, which run on the blocking thread pool.

use anyhow::Result;
use argon2::{
    password_hash::{
        rand_core::{OsRng, RngCore},
        Output,
    },
    Argon2,
};
use tracing::error;

/// Random salt length in bytes (hex-encoded to twice as many characters)
const SALT_LEN: usize = 16;
/// Derived key length in bytes
const KEY_LEN: usize = 32;
const SEPARATOR: char = '.';

/// Well-formed stored hash that no password is expected to match.
///
/// Checking a candidate against it costs the same as checking against a real
/// account, so a missing account takes as long to reject as a wrong password.
pub const DUMMY_HASH: &str = concat!(
    "00000000000000000000000000000000",
    ".",
    "0000000000000000000000000000000000000000000000000000000000000000"
);

/// Password hashing service
pub struct PasswordService;

impl PasswordService {
    /// Hash a password with a fresh random salt (blocking operation)
    pub fn hash(password: &str) -> Result<String> {
        let mut salt_bytes = [0u8; SALT_LEN];
        OsRng.fill_bytes(&mut salt_bytes);
        let salt = hex::encode(salt_bytes);

        let key = derive_key(password, &salt)?;
        Ok(format!("{}{}{}", salt, SEPARATOR, hex::encode(key)))
    }

    /// Hash a password on the blocking thread pool
    pub async fn hash_async(password: String) -> Result<String> {
        tokio::task::spawn_blocking(move || Self::hash(&password))
            .await
            .map_err(|e| anyhow::anyhow!("Task join error: {}", e))?
    }

    /// Check a candidate password against a stored hash (blocking operation)
    ///
    /// Any malformed stored hash simply fails verification.
    pub fn verify(stored_hash: &str, candidate: &str) -> bool {
        let Some((salt, expected_hex)) = stored_hash.split_once(SEPARATOR) else {
            return false;
        };
        if salt.is_empty() {
            return false;
        }
        let Ok(expected) = hex::decode(expected_hex) else {
            return false;
        };
        if expected.len() != KEY_LEN {
            return false;
        }
        let Ok(derived) = derive_key(candidate, salt) else {
            return false;
        };

        // `Output` equality is constant-time
        match (Output::new(&derived), Output::new(&expected)) {
            (Ok(derived), Ok(expected)) => derived == expected,
            _ => false,
        }
    }

    /// Verify on the blocking thread pool
    pub async fn verify_async(stored_hash: String, candidate: String) -> bool {
        match tokio::task::spawn_blocking(move || Self::verify(&stored_hash, &candidate)).await {
            Ok(valid) => valid,
            Err(e) => {
                error!("Password verification task failed: {}", e);
                false
            }
        }
    }
}

fn derive_key(password: &str, salt: &str) -> Result<[u8; KEY_LEN]> {
    let mut key = [0u8; KEY_LEN];
    Argon2::default()
        .hash_password_into(password.as_bytes(), salt.as_bytes(), &mut key)
        .map_err(|e| anyhow::anyhow!("Failed to derive key: {}", e))?;
    Ok(key)
}
