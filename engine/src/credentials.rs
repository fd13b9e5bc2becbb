// Copyright 2025 Kore Ledger, SL
// SPDX-License-Identifier: Apache-2.0

//! Password hashing and session tokens.

use crate::error::Error;

use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use uuid::Uuid;

const SEPARATOR: char = '$';

fn digest(salt: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(password.as_bytes());
    hex::encode(hasher.finalize())
}

/// Salted hash of `password`, as `salt$hex(sha256(salt || password))`.
pub fn hash_password(password: &str) -> String {
    let salt = Uuid::new_v4().simple().to_string();
    format!("{}{}{}", salt, SEPARATOR, digest(&salt, password))
}

/// Checks `password` against a value produced by [`hash_password`].
pub fn verify_password(password: &str, stored: &str) -> Result<bool, Error> {
    let Some((salt, expected)) = stored.split_once(SEPARATOR) else {
        return Err(Error::database("Malformed password hash"));
    };
    let actual = digest(salt, password);
    Ok(actual.as_bytes().ct_eq(expected.as_bytes()).into())
}

/// Opaque random session token.
pub fn new_token() -> String {
    format!(
        "{}{}",
        Uuid::new_v4().simple(),
        Uuid::new_v4().simple()
    )
}

/// Constant-time token comparison.
pub fn same_token(left: &str, right: &str) -> bool {
    left.as_bytes().ct_eq(right.as_bytes()).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify() {
        let stored = hash_password("hunter2");
        assert!(verify_password("hunter2", &stored).unwrap());
        assert!(!verify_password("hunter3", &stored).unwrap());
        // Salted: same password, different hash.
        assert_ne!(stored, hash_password("hunter2"));
        assert!(verify_password("hunter2", "no-separator").is_err());
    }

    #[test]
    fn test_tokens() {
        let token = new_token();
        assert_eq!(token.len(), 64);
        assert!(same_token(&token, &token.clone()));
        assert!(!same_token(&token, &new_token()));
        assert!(!same_token(&token, ""));
    }
}
