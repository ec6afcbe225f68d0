// Vaultkeep - Authorization Gate
//
// Decides whether a caller may act on a given entry. Point reads and deletes
// do not call `authorize`: they scope their single statement by
// `id AND owner`, which gives the same answer without a check-then-act gap.
// `authorize` is for paths that are allowed to disclose existence, and it
// reports a foreign owner as `PermissionDenied` instead of `NotFound`.

use rusqlite::{params, OptionalExtension};
use uuid::Uuid;

use super::Identity;
use crate::store::{AbortSignal, Database, StoreError};

pub struct AuthorizationGate<'a> {
    db: &'a Database,
    abort: Option<&'a AbortSignal>,
}

impl<'a> AuthorizationGate<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db, abort: None }
    }

    /// Interrupt the gate's lookup when `abort` is raised.
    pub fn with_abort(mut self, abort: &'a AbortSignal) -> Self {
        self.abort = Some(abort);
        self
    }

    /// Reject calls that arrive without an identity.
    pub fn require(caller: Option<&Identity>) -> Result<&Identity, StoreError> {
        caller.ok_or(StoreError::MissingIdentity)
    }

    /// Full ownership check: missing identity, missing entry, or foreign owner.
    pub fn authorize(&self, caller: Option<&Identity>, entry_id: &Uuid) -> Result<(), StoreError> {
        let caller = Self::require(caller)?;

        let owner: Option<String> = self
            .db
            .conn_abortable(self.abort)?
            .query_row(
                "SELECT owner FROM entries WHERE id = ?1",
                params![entry_id.to_string()],
                |row| row.get(0),
            )
            .optional()?;

        match owner {
            None => Err(StoreError::NotFound(format!("entry {}", entry_id))),
            Some(owner) if owner != caller.as_str() => {
                tracing::warn!(
                    entry_id = %entry_id,
                    caller = %caller,
                    "Ownership check failed"
                );
                Err(StoreError::PermissionDenied(format!(
                    "entry {} belongs to another identity",
                    entry_id
                )))
            }
            Some(_) => Ok(()),
        }
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
