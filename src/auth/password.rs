// Vaultkeep - Password hashing and login
//
// Argon2id PHC strings are the "credential" handed to the UserStore, which
// then seals them with the master key before they reach disk.

use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use rand::RngCore;
use zeroize::Zeroizing;

use super::Identity;
use crate::store::{StoreError, UserStore};

/// Random salt length in bytes (the PHC recommendation).
const SALT_LEN: usize = 16;

/// Hash a password into an Argon2id PHC string.
pub fn hash_password(password: &str) -> Result<String, StoreError> {
    if password.is_empty() {
        return Err(StoreError::Validation("password must not be empty".to_string()));
    }

    let mut salt_bytes = [0u8; SALT_LEN];
    rand::rng().fill_bytes(&mut salt_bytes);
    let salt = SaltString::encode_b64(&salt_bytes)
        .map_err(|e| StoreError::Other(format!("salt encoding failed: {}", e)))?;

    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| StoreError::Other(format!("password hashing failed: {}", e)))
}

/// Check a password against a PHC string. A mismatch is `Ok(false)`.
pub fn verify_password(password: &str, phc: &str) -> Result<bool, StoreError> {
    let parsed = PasswordHash::new(phc)
        .map_err(|e| StoreError::Other(format!("stored password hash is malformed: {}", e)))?;

    match Argon2::default().verify_password(password.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(StoreError::Other(format!("password verification failed: {}", e))),
    }
}

/// Resolve a username/password pair to the identity used for entry ownership.
///
/// Unknown users and wrong passwords both yield `Unauthenticated`.
pub fn authenticate(
    users: &impl UserStore,
    username: &str,
    password: &str,
) -> Result<Identity, StoreError> {
    let user = match users.get_by_username(username) {
        Ok(user) => user,
        Err(StoreError::NotFound(_)) => return Err(StoreError::Unauthenticated),
        Err(e) => return Err(e),
    };

    let phc = Zeroizing::new(
        String::from_utf8(user.credential.to_vec())
            .map_err(|_| StoreError::Other("stored credential is not a PHC string".to_string()))?,
    );

    if verify_password(password, &phc)? {
        tracing::info!(user_id = %user.id, "Login succeeded");
        Ok(Identity::from(user.id))
    } else {
        tracing::warn!(user_id = %user.id, "Login rejected");
        Err(StoreError::Unauthenticated)
    }
}
