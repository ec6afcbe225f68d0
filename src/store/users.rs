// Vaultkeep - User Store
//
// Account records. The credential column holds the upstream password hash
// sealed by the CryptoProvider; both layers are kept, so neither the hash nor
// the encryption is treated as making the other redundant.

use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension};
use uuid::Uuid;

use super::db::{AbortSignal, Database};
use super::models::{NewUser, User};
use super::StoreError;
use crate::crypto::CryptoProvider;

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over account storage.
pub trait UserStore {
    /// Register a user. A taken username is a `Validation` conflict.
    fn create_user(&self, user: NewUser) -> Result<Uuid, StoreError>;

    /// Look a user up by username, with the credential blob decrypted.
    fn get_by_username(&self, username: &str) -> Result<User, StoreError>;

    /// Remove a user by id. Returns whether a row was removed.
    fn delete_user(&self, id: &Uuid) -> Result<bool, StoreError>;
}

// ─── SQLite Implementation ──────────────────────────────────────────────────

pub struct SqliteUserStore<'a> {
    db: &'a Database,
    crypto: &'a CryptoProvider,
    abort: Option<&'a AbortSignal>,
}

impl<'a> SqliteUserStore<'a> {
    pub fn new(db: &'a Database, crypto: &'a CryptoProvider) -> Self {
        Self {
            db,
            crypto,
            abort: None,
        }
    }

    /// Interrupt in-flight statements of this store when `abort` is raised.
    pub fn with_abort(mut self, abort: &'a AbortSignal) -> Self {
        self.abort = Some(abort);
        self
    }
}

impl<'a> SqliteUserStore<'a> {
    fn create_user_inner(&self, user: NewUser) -> Result<Uuid, StoreError> {
        if user.email.trim().is_empty() {
            return Err(StoreError::Validation("email must not be empty".to_string()));
        }
        if user.username.trim().is_empty() {
            return Err(StoreError::Validation("username must not be empty".to_string()));
        }
        if user.credential.is_empty() {
            return Err(StoreError::Validation("credential must not be empty".to_string()));
        }

        let id = Uuid::new_v4();
        let now = Utc::now().to_rfc3339();
        let sealed = self.crypto.encrypt(&user.credential)?;

        let inserted = self.db.conn_abortable(self.abort).and_then(|conn| {
            conn.execute(
                "INSERT INTO users (id, email, username, credential, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![id.to_string(), user.email, user.username, sealed, now, now],
            )
            .map_err(StoreError::from)
        });

        match inserted {
            Ok(_) => {
                tracing::info!(user_id = %id, username = %user.username, "User registered");
                Ok(id)
            }
            Err(e) if e.is_unique_violation("users.username") => Err(StoreError::Validation(
                format!("username '{}' is already taken", user.username),
            )),
            Err(e) => Err(e),
        }
    }

    fn get_by_username_inner(&self, username: &str) -> Result<User, StoreError> {
        let row = self
            .db
            .conn_abortable(self.abort)?
            .query_row(
                "SELECT id, email, username, credential, created_at, updated_at
                 FROM users WHERE username = ?1",
                params![username],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, Vec<u8>>(3)?,
                        row.get::<_, String>(4)?,
                        row.get::<_, String>(5)?,
                    ))
                },
            )
            .optional()?;

        let (id_str, email, username, sealed, created_at, updated_at) =
            row.ok_or_else(|| StoreError::NotFound(format!("user '{}'", username)))?;

        let id = Uuid::parse_str(&id_str)
            .map_err(|e| StoreError::Other(format!("stored user id is not a UUID: {}", e)))?;
        let credential = self.crypto.decrypt(&sealed)?;

        Ok(User {
            id,
            email,
            username,
            credential,
            created_at: parse_timestamp(&created_at)?,
            updated_at: parse_timestamp(&updated_at)?,
        })
    }

    fn delete_user_inner(&self, id: &Uuid) -> Result<bool, StoreError> {
        let affected = self
            .db
            .conn_abortable(self.abort)?
            .execute("DELETE FROM users WHERE id = ?1", params![id.to_string()])?;

        if affected > 0 {
            tracing::info!(user_id = %id, "User deleted");
        }
        Ok(affected > 0)
    }
}

impl<'a> UserStore for SqliteUserStore<'a> {
    fn create_user(&self, user: NewUser) -> Result<Uuid, StoreError> {
        let username = user.username.clone();
        self.create_user_inner(user)
            .map_err(StoreError::cancel_on_interrupt)
            .inspect_err(|e| log_failure("create_user", None, Some(&username), e))
    }

    fn get_by_username(&self, username: &str) -> Result<User, StoreError> {
        self.get_by_username_inner(username)
            .map_err(StoreError::cancel_on_interrupt)
            .inspect_err(|e| log_failure("get_by_username", None, Some(username), e))
    }

    fn delete_user(&self, id: &Uuid) -> Result<bool, StoreError> {
        self.delete_user_inner(id)
            .map_err(StoreError::cancel_on_interrupt)
            .inspect_err(|e| log_failure("delete_user", Some(id), None, e))
    }
}

fn log_failure(
    op: &'static str,
    user_id: Option<&Uuid>,
    username: Option<&str>,
    err: &StoreError,
) {
    if err.is_internal() {
        tracing::error!(
            op,
            user_id = ?user_id,
            username = ?username,
            error = %err,
            "User operation failed"
        );
    }
}

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StoreError::Other(format!("stored timestamp is invalid: {}", e)))
}

// ─── Tests ───────────────────────────────────────────────────────────────────
