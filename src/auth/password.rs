//! Password hashing and reset tokens
//!
//! Uses bcrypt for passwords. Reset tokens are random bytes handed to the user
//! while only their SHA-256 digest is stored.

use crate::error::AppError;
use bcrypt::{hash, verify};
use rand::RngCore;
use sha2::{Digest, Sha256};

#[cfg(not(test))]
const HASH_COST: u32 = 10;
#[cfg(test)]
const HASH_COST: u32 = 4;

const RESET_TOKEN_BYTES: usize = 20;

/// Hash a password using bcrypt
pub fn hash_password(password: &str) -> Result<String, AppError> {
    hash(password, HASH_COST)
        .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))
}

/// Verify a password against a hash
pub fn verify_password(password: &str, hash: &str) -> Result<bool, AppError> {
    verify(password, hash)
        .map_err(|e| AppError::Internal(format!("Failed to verify password: {}", e)))
}

/// New reset token as `(token for the user, digest to store)`
pub fn generate_reset_token() -> (String, String) {
    let mut bytes = [0u8; RESET_TOKEN_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    let token = hex::encode(bytes);
    let digest = hash_reset_token(&token);
    (token, digest)
}

pub fn hash_reset_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}
