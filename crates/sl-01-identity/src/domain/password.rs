//! Argon2id password hashing.

use super::errors::IdentityError;
use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use lazy_static::lazy_static;
#[cfg(test)]
use std::cell::Cell;

pub const MIN_PASSWORD_LEN: usize = 8;

lazy_static! {
    /// Stand-in hash checked when no account matches the login email, so an
    /// unknown email costs the same argon2 work as a wrong password.
    static ref DECOY_HASH: Option<String> = hash("decoy-login-password").ok();
}

#[cfg(test)]
thread_local! {
    static VERIFICATIONS: Cell<usize> = const { Cell::new(0) };
}

/// Argon2 verifications run on the current thread.
#[cfg(test)]
pub(crate) fn verifications() -> usize {
    VERIFICATIONS.with(Cell::get)
}

pub fn check_policy(password: &str) -> Result<(), IdentityError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(IdentityError::WeakPassword(MIN_PASSWORD_LEN));
    }
    Ok(())
}

/// Hash with a fresh random salt, returning a PHC string.
pub fn hash(password: &str) -> Result<String, IdentityError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| IdentityError::Hashing(e.to_string()))
}

/// Constant-time comparison through argon2. A malformed stored hash never
/// verifies.
pub fn verify(password: &str, phc: &str) -> bool {
    #[cfg(test)]
    VERIFICATIONS.with(|n| n.set(n.get() + 1));
    match PasswordHash::new(phc) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    }
}

/// Verify a login attempt against the account's hash, or against the decoy
/// when there is no account. Never succeeds without an account.
pub fn verify_login(password: &str, stored: Option<&str>) -> bool {
    match stored {
        Some(phc) => verify(password, phc),
        None => {
            if let Some(decoy) = DECOY_HASH.as_deref() {
                verify(password, decoy);
            }
            false
        }
    }
}
