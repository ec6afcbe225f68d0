// Vaultkeep - Async service facade
//
// The stores are synchronous and hold the connection lock for the length of a
// statement. Every call here runs on the blocking pool and races the caller's
// cancellation token and deadline; the loser raises the call's AbortSignal so
// the statement is interrupted instead of left running.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::auth::{self, Identity};
use crate::crypto::CryptoProvider;
use crate::store::{
    AbortSignal, Database, Entry, EntryFilter, EntryListing, EntryStore, NewEntry, NewUser,
    SqliteEntryStore, SqliteUserStore, StoreError, User, UserStore,
};

/// Cancellation and deadline for one request.
#[derive(Debug, Clone, Default)]
pub struct RequestScope {
    cancel: CancellationToken,
    deadline: Option<Instant>,
}

impl RequestScope {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tie the request to an existing token, e.g. a child of a connection token.
    pub fn with_token(token: CancellationToken) -> Self {
        Self {
            cancel: token,
            deadline: None,
        }
    }

    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }
}

/// Shared handle over the database and crypto provider. Cheap to clone.
#[derive(Clone)]
pub struct VaultService {
    db: Arc<Database>,
    crypto: Arc<CryptoProvider>,
    default_timeout: Option<Duration>,
}

impl VaultService {
    pub fn new(db: Arc<Database>, crypto: Arc<CryptoProvider>) -> Self {
        Self {
            db,
            crypto,
            default_timeout: None,
        }
    }

    /// Deadline applied to requests whose scope carries none.
    pub fn with_default_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.default_timeout = timeout;
        self
    }

    // ─── Entries ─────────────────────────────────────────────────────────────

    pub async fn create_entry(
        &self,
        scope: &RequestScope,
        caller: Option<Identity>,
        entry: NewEntry,
    ) -> Result<Uuid, StoreError> {
        self.run(scope, "create_entry", move |db, crypto, abort| {
            SqliteEntryStore::new(db, crypto)
                .with_abort(abort)
                .create(caller.as_ref(), entry)
        })
        .await
    }

    pub async fn get_entry(
        &self,
        scope: &RequestScope,
        caller: Option<Identity>,
        id: Uuid,
    ) -> Result<Entry, StoreError> {
        self.run(scope, "get_entry", move |db, crypto, abort| {
            SqliteEntryStore::new(db, crypto)
                .with_abort(abort)
                .get(caller.as_ref(), &id)
        })
        .await
    }

    pub async fn delete_entry(
        &self,
        scope: &RequestScope,
        caller: Option<Identity>,
        id: Uuid,
    ) -> Result<bool, StoreError> {
        self.run(scope, "delete_entry", move |db, crypto, abort| {
            SqliteEntryStore::new(db, crypto)
                .with_abort(abort)
                .delete(caller.as_ref(), &id)
        })
        .await
    }

    pub async fn list_entries(
        &self,
        scope: &RequestScope,
        caller: Option<Identity>,
        filter: EntryFilter,
    ) -> Result<EntryListing, StoreError> {
        self.run(scope, "list_entries", move |db, crypto, abort| {
            SqliteEntryStore::new(db, crypto)
                .with_abort(abort)
                .list(caller.as_ref(), &filter)
        })
        .await
    }

    pub async fn authorize_entry(
        &self,
        scope: &RequestScope,
        caller: Option<Identity>,
        id: Uuid,
    ) -> Result<(), StoreError> {
        self.run(scope, "authorize_entry", move |db, crypto, abort| {
            SqliteEntryStore::new(db, crypto)
                .with_abort(abort)
                .authorize(caller.as_ref(), &id)
        })
        .await
    }

    // ─── Users ───────────────────────────────────────────────────────────────

    /// Hash `password` and register the account.
    pub async fn register_user(
        &self,
        scope: &RequestScope,
        email: String,
        username: String,
        password: String,
    ) -> Result<Uuid, StoreError> {
        let password = zeroize::Zeroizing::new(password);
        self.run(scope, "register_user", move |db, crypto, abort| {
            let credential = auth::hash_password(&password)?.into_bytes();
            SqliteUserStore::new(db, crypto)
                .with_abort(abort)
                .create_user(NewUser {
                    email,
                    username,
                    credential,
                })
        })
        .await
    }

    pub async fn get_user(&self, scope: &RequestScope, username: String) -> Result<User, StoreError> {
        self.run(scope, "get_user", move |db, crypto, abort| {
            SqliteUserStore::new(db, crypto)
                .with_abort(abort)
                .get_by_username(&username)
        })
        .await
    }

    pub async fn delete_user(&self, scope: &RequestScope, id: Uuid) -> Result<bool, StoreError> {
        self.run(scope, "delete_user", move |db, crypto, abort| {
            SqliteUserStore::new(db, crypto)
                .with_abort(abort)
                .delete_user(&id)
        })
        .await
    }

    /// Verify a username/password pair and return the owner identity.
    pub async fn login(
        &self,
        scope: &RequestScope,
        username: String,
        password: String,
    ) -> Result<Identity, StoreError> {
        let password = zeroize::Zeroizing::new(password);
        self.run(scope, "login", move |db, crypto, abort| {
            let users = SqliteUserStore::new(db, crypto).with_abort(abort);
            auth::authenticate(&users, &username, &password)
        })
        .await
    }

    // ─── Dispatch ────────────────────────────────────────────────────────────

    async fn run<T, F>(&self, scope: &RequestScope, op: &'static str, f: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&Database, &CryptoProvider, &AbortSignal) -> Result<T, StoreError>
            + Send
            + 'static,
    {
        if scope.cancel.is_cancelled() {
            return Err(StoreError::Cancelled);
        }

        let deadline = scope
            .deadline
            .or_else(|| self.default_timeout.map(|t| Instant::now() + t));
        if deadline.is_some_and(|d| d <= Instant::now()) {
            return Err(StoreError::DeadlineExceeded);
        }

        let abort = AbortSignal::new();
        let task = {
            let db = Arc::clone(&self.db);
            let crypto = Arc::clone(&self.crypto);
            let abort = abort.clone();
            tokio::task::spawn_blocking(move || f(&db, &crypto, &abort))
        };

        let expired = async move {
            match deadline {
                Some(at) => tokio::time::sleep_until(at).await,
                None => std::future::pending::<()>().await,
            }
        };

        // A finished task wins over an abort that became ready at the same time,
        // so a committed write is never reported as failed.
        tokio::select! {
            biased;

            joined = task => match joined {
                Ok(result) => result,
                Err(e) => {
                    tracing::error!(op, error = %e, "Storage task failed");
                    Err(StoreError::Other(format!("storage task failed: {}", e)))
                }
            },
            _ = scope.cancel.cancelled() => {
                abort.abort();
                tracing::warn!(op, "Operation cancelled by caller");
                Err(StoreError::Cancelled)
            }
            _ = expired => {
                abort.abort();
                tracing::warn!(op, "Operation deadline exceeded");
                Err(StoreError::DeadlineExceeded)
            }
        }
    }
}
