// Vaultkeep - Store error types

use thiserror::Error;

use crate::crypto::CryptoError;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("No authenticated identity supplied")]
    MissingIdentity,

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Invalid credentials")]
    Unauthenticated,

    #[error("Crypto error: {0}")]
    Crypto(#[from] CryptoError),

    #[error("Persistence error: {0}")]
    Persistence(#[from] rusqlite::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Operation cancelled by caller")]
    Cancelled,

    #[error("Operation deadline exceeded")]
    DeadlineExceeded,

    #[error("{0}")]
    Other(String),
}

impl StoreError {
    /// True for errors caused by the caller's input or identity.
    /// Transports surface these as client faults; everything else is internal.
    pub fn is_client_fault(&self) -> bool {
        matches!(
            self,
            StoreError::MissingIdentity
                | StoreError::Validation(_)
                | StoreError::NotFound(_)
                | StoreError::PermissionDenied(_)
                | StoreError::Unauthenticated
        )
    }

    /// Internal faults that must be logged with operation context.
    pub fn is_internal(&self) -> bool {
        matches!(
            self,
            StoreError::Crypto(_)
                | StoreError::Persistence(_)
                | StoreError::Json(_)
                | StoreError::Other(_)
        )
    }

    /// Whether a persistence error was raised by an interrupted statement.
    pub(crate) fn is_interrupt(&self) -> bool {
        matches!(
            self,
            StoreError::Persistence(rusqlite::Error::SqliteFailure(e, _))
                if e.code == rusqlite::ErrorCode::OperationInterrupted
        )
    }

    /// A statement interrupted by a raised `AbortSignal` is a caller abort.
    pub(crate) fn cancel_on_interrupt(self) -> Self {
        if self.is_interrupt() {
            StoreError::Cancelled
        } else {
            self
        }
    }

    /// Whether a persistence error is a UNIQUE violation on `table.column`.
    pub(crate) fn is_unique_violation(&self, target: &str) -> bool {
        match self {
            StoreError::Persistence(rusqlite::Error::SqliteFailure(e, msg)) => {
                e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
                    && msg.as_deref().is_some_and(|m| m.ends_with(target))
            }
            _ => false,
        }
    }
}
