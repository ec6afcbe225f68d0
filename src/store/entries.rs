// Vaultkeep - Entry Store
//
// Ownership-scoped CRUD and filtered listing for credential entries.
// Every statement that touches a single entry is scoped by `id AND owner`,
// so an entry owned by someone else is indistinguishable from a missing one.
// Secrets are sealed by the CryptoProvider before they reach SQL and opened
// only on the way back to their owner.

use chrono::{DateTime, Utc};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, OptionalExtension};
use uuid::Uuid;
use zeroize::Zeroizing;

use super::db::{AbortSignal, Database};
use super::models::{Entry, EntryFilter, EntryListing, NewEntry, SecretField};
use super::StoreError;
use crate::auth::{AuthorizationGate, Identity};
use crate::crypto::CryptoProvider;

const ENTRY_COLUMNS: &str = "id, owner, title, username, secret, notes, folder, domain, tags, \
                             created_at, updated_at";

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over entry storage. Every operation takes the caller identity
/// explicitly; `None` is rejected with `StoreError::MissingIdentity`.
pub trait EntryStore {
    /// Store a new entry owned by the caller. Returns the generated id.
    fn create(&self, caller: Option<&Identity>, entry: NewEntry) -> Result<Uuid, StoreError>;

    /// Fetch one of the caller's entries with its secret decrypted.
    fn get(&self, caller: Option<&Identity>, id: &Uuid) -> Result<Entry, StoreError>;

    /// Remove one of the caller's entries. Missing or foreign entries are `NotFound`.
    fn delete(&self, caller: Option<&Identity>, id: &Uuid) -> Result<bool, StoreError>;

    /// List the caller's entries matching every filter in `filter`.
    fn list(
        &self,
        caller: Option<&Identity>,
        filter: &EntryFilter,
    ) -> Result<EntryListing, StoreError>;

    /// Explicit ownership check that discloses a foreign owner as `PermissionDenied`.
    fn authorize(&self, caller: Option<&Identity>, id: &Uuid) -> Result<(), StoreError>;
}

// ─── SQLite Implementation ──────────────────────────────────────────────────

pub struct SqliteEntryStore<'a> {
    db: &'a Database,
    crypto: &'a CryptoProvider,
    abort: Option<&'a AbortSignal>,
}

/// A row as stored, secret still sealed.
struct EntryRow {
    id: Uuid,
    owner: String,
    title: String,
    username: String,
    secret: Vec<u8>,
    notes: Option<String>,
    folder: Option<String>,
    domain: Option<String>,
    tags: Vec<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl EntryRow {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        let id_str: String = row.get(0)?;
        let tags_json: String = row.get(8)?;
        let created_at_str: String = row.get(9)?;
        let updated_at_str: String = row.get(10)?;

        let id = Uuid::parse_str(&id_str).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
        })?;
        let tags: Vec<String> = serde_json::from_str(&tags_json).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(8, rusqlite::types::Type::Text, Box::new(e))
        })?;

        Ok(Self {
            id,
            owner: row.get(1)?,
            title: row.get(2)?,
            username: row.get(3)?,
            secret: row.get(4)?,
            notes: row.get(5)?,
            folder: row.get(6)?,
            domain: row.get(7)?,
            tags,
            created_at: parse_timestamp(9, &created_at_str)?,
            updated_at: parse_timestamp(10, &updated_at_str)?,
        })
    }

    fn into_entry(self, secret: SecretField) -> Entry {
        Entry {
            id: self.id,
            owner: self.owner,
            title: self.title,
            username: self.username,
            secret,
            notes: self.notes,
            folder: self.folder,
            domain: self.domain,
            tags: self.tags,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

impl<'a> SqliteEntryStore<'a> {
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

    fn gate(&self) -> AuthorizationGate<'a> {
        let gate = AuthorizationGate::new(self.db);
        match self.abort {
            Some(abort) => gate.with_abort(abort),
            None => gate,
        }
    }

    fn create_inner(&self, caller: Option<&Identity>, entry: NewEntry) -> Result<Uuid, StoreError> {
        let owner = AuthorizationGate::require(caller)?;
        validate_new_entry(&entry)?;

        let NewEntry {
            title,
            username,
            secret,
            notes,
            folder,
            domain,
            tags,
        } = entry;
        let secret = Zeroizing::new(secret);

        let id = Uuid::new_v4();
        let now = Utc::now().to_rfc3339();
        let tags_json = serde_json::to_string(&normalize_tags(tags))?;
        let sealed = self.crypto.encrypt_str(&secret)?;

        self.db.conn_abortable(self.abort)?.execute(
            "INSERT INTO entries
                (id, owner, title, username, secret, notes, folder, domain, tags,
                 created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                id.to_string(),
                owner.as_str(),
                title,
                username,
                sealed,
                non_blank(notes),
                non_blank(folder),
                non_blank(domain),
                tags_json,
                now,
                now,
            ],
        )?;

        tracing::info!(entry_id = %id, owner = %owner, "Entry stored");
        Ok(id)
    }

    fn get_inner(&self, caller: Option<&Identity>, id: &Uuid) -> Result<Entry, StoreError> {
        let owner = AuthorizationGate::require(caller)?;

        let row = self
            .db
            .conn_abortable(self.abort)?
            .query_row(
                &format!("SELECT {ENTRY_COLUMNS} FROM entries WHERE id = ?1 AND owner = ?2"),
                params![id.to_string(), owner.as_str()],
                EntryRow::from_row,
            )
            .optional()?
            .ok_or_else(|| StoreError::NotFound(format!("entry {}", id)))?;

        let secret = self.crypto.decrypt_string(&row.secret)?;
        Ok(row.into_entry(SecretField::Revealed(secret)))
    }

    fn delete_inner(&self, caller: Option<&Identity>, id: &Uuid) -> Result<bool, StoreError> {
        let owner = AuthorizationGate::require(caller)?;

        // Ownership check and removal are one statement.
        let affected = self.db.conn_abortable(self.abort)?.execute(
            "DELETE FROM entries WHERE id = ?1 AND owner = ?2",
            params![id.to_string(), owner.as_str()],
        )?;

        if affected == 0 {
            return Err(StoreError::NotFound(format!("entry {}", id)));
        }

        tracing::info!(entry_id = %id, owner = %owner, "Entry deleted");
        Ok(true)
    }

    fn list_inner(
        &self,
        caller: Option<&Identity>,
        filter: &EntryFilter,
    ) -> Result<EntryListing, StoreError> {
        let owner = AuthorizationGate::require(caller)?;
        let (sql, args) = build_list_query(owner, filter);

        let rows = {
            let conn = self.db.conn_abortable(self.abort)?;
            let mut stmt = conn.prepare(&sql)?;
            let mapped = stmt.query_map(params_from_iter(args.iter()), EntryRow::from_row)?;
            mapped.collect::<rusqlite::Result<Vec<_>>>()?
        };

        let mut listing = EntryListing {
            entries: Vec::with_capacity(rows.len()),
            undecryptable: Vec::new(),
        };
        for row in rows {
            let secret = match self.crypto.decrypt_string(&row.secret) {
                Ok(secret) => SecretField::Revealed(secret),
                Err(e) => {
                    tracing::error!(
                        entry_id = %row.id,
                        op = "list",
                        error = %e,
                        "Entry secret failed to decrypt; returning it flagged"
                    );
                    listing.undecryptable.push(row.id);
                    SecretField::Unavailable
                }
            };
            listing.entries.push(row.into_entry(secret));
        }

        tracing::debug!(
            owner = %owner,
            count = listing.entries.len(),
            undecryptable = listing.undecryptable.len(),
            "Entries listed"
        );
        Ok(listing)
    }
}

impl<'a> EntryStore for SqliteEntryStore<'a> {
    fn create(&self, caller: Option<&Identity>, entry: NewEntry) -> Result<Uuid, StoreError> {
        self.create_inner(caller, entry)
            .map_err(StoreError::cancel_on_interrupt)
            .inspect_err(|e| log_failure("create", None, e))
    }

    fn get(&self, caller: Option<&Identity>, id: &Uuid) -> Result<Entry, StoreError> {
        self.get_inner(caller, id)
            .map_err(StoreError::cancel_on_interrupt)
            .inspect_err(|e| log_failure("get", Some(id), e))
    }

    fn delete(&self, caller: Option<&Identity>, id: &Uuid) -> Result<bool, StoreError> {
        self.delete_inner(caller, id)
            .map_err(StoreError::cancel_on_interrupt)
            .inspect_err(|e| log_failure("delete", Some(id), e))
    }

    fn list(
        &self,
        caller: Option<&Identity>,
        filter: &EntryFilter,
    ) -> Result<EntryListing, StoreError> {
        self.list_inner(caller, filter)
            .map_err(StoreError::cancel_on_interrupt)
            .inspect_err(|e| log_failure("list", None, e))
    }

    fn authorize(&self, caller: Option<&Identity>, id: &Uuid) -> Result<(), StoreError> {
        self.gate()
            .authorize(caller, id)
            .map_err(StoreError::cancel_on_interrupt)
            .inspect_err(|e| log_failure("authorize", Some(id), e))
    }
}

// ─── Helpers ─────────────────────────────────────────────────────────────────

fn log_failure(op: &'static str, entry_id: Option<&Uuid>, err: &StoreError) {
    if err.is_internal() {
        tracing::error!(op, entry_id = ?entry_id, error = %err, "Entry operation failed");
    }
}

fn validate_new_entry(entry: &NewEntry) -> Result<(), StoreError> {
    if entry.title.trim().is_empty() {
        return Err(StoreError::Validation("title must not be empty".to_string()));
    }
    if entry.username.trim().is_empty() {
        return Err(StoreError::Validation("username must not be empty".to_string()));
    }
    if entry.secret.is_empty() {
        return Err(StoreError::Validation("secret must not be empty".to_string()));
    }
    Ok(())
}

/// Empty optional fields are stored as NULL.
fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Trim, drop blanks and duplicates; first occurrence keeps its position.
fn normalize_tags(tags: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(tags.len());
    for tag in tags {
        let tag = tag.trim();
        if !tag.is_empty() && !out.iter().any(|t| t == tag) {
            out.push(tag.to_string());
        }
    }
    out
}

/// Owner scope is mandatory; each present filter adds one AND clause.
fn build_list_query(owner: &Identity, filter: &EntryFilter) -> (String, Vec<Value>) {
    let mut sql = format!("SELECT {ENTRY_COLUMNS} FROM entries WHERE owner = ?");
    let mut args = vec![Value::Text(owner.as_str().to_string())];

    if let Some(domain) = filter.domain.as_deref().filter(|d| !d.is_empty()) {
        sql.push_str(" AND instr(domain, ?) > 0");
        args.push(Value::Text(domain.to_string()));
    }

    if let Some(folder) = filter.folder.as_deref().filter(|f| !f.is_empty()) {
        sql.push_str(" AND folder = ?");
        args.push(Value::Text(folder.to_string()));
    }

    for tag in normalize_tags(filter.tags.clone()) {
        sql.push_str(
            " AND EXISTS (SELECT 1 FROM json_each(entries.tags) WHERE json_each.value = ?)",
        );
        args.push(Value::Text(tag));
    }

    sql.push_str(" ORDER BY rowid");
    (sql, args)
}

fn parse_timestamp(idx: usize, value: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
        })
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::MasterKey;

    fn crypto() -> CryptoProvider {
        CryptoProvider::new(&MasterKey::from_bytes(&[3u8; 32]).unwrap())
    }

    fn id(raw: &str) -> Identity {
        Identity::parse(raw).unwrap()
    }

    fn count_rows(db: &Database) -> i64 {
        db.conn()
            .unwrap()
            .query_row("SELECT count(*) FROM entries", [], |row| row.get(0))
            .unwrap()
    }

    #[test]
    fn test_create_then_get_returns_decrypted_secret() {
        let db = Database::open_in_memory().unwrap();
        let crypto = crypto();
        let store = SqliteEntryStore::new(&db, &crypto);
        let u1 = id("U1");

        let entry_id = store
            .create(Some(&u1), NewEntry::new("Gmail", "bob", "p@ss"))
            .unwrap();
        assert_eq!(entry_id.get_version(), Some(uuid::Version::Random));

        let entry = store.get(Some(&u1), &entry_id).unwrap();
        assert_eq!(entry.id, entry_id);
        assert_eq!(entry.owner, "U1");
        assert_eq!(entry.title, "Gmail");
        assert_eq!(entry.username, "bob");
        assert_eq!(entry.secret.reveal(), Some("p@ss"));
    }

    #[test]
    fn test_secret_is_never_stored_in_plaintext() {
        let db = Database::open_in_memory().unwrap();
        let crypto = crypto();
        let store = SqliteEntryStore::new(&db, &crypto);
        let u1 = id("U1");

        let entry_id = store
            .create(Some(&u1), NewEntry::new("Bank", "alice", "correct horse"))
            .unwrap();

        let stored: Vec<u8> = db
            .conn()
            .unwrap()
            .query_row(
                "SELECT secret FROM entries WHERE id = ?1",
                params![entry_id.to_string()],
                |row| row.get(0),
            )
            .unwrap();
        assert!(!stored.windows(13).any(|w| w == b"correct horse"));
        assert_eq!(
            crypto.decrypt_string(&stored).unwrap().as_str(),
            "correct horse"
        );
    }

    #[test]
    fn test_create_rejects_empty_required_fields() {
        let db = Database::open_in_memory().unwrap();
        let crypto = crypto();
        let store = SqliteEntryStore::new(&db, &crypto);
        let u1 = id("U1");

        for entry in [
            NewEntry::new("", "bob", "s"),
            NewEntry::new("t", "", "s"),
            NewEntry::new("t", "   ", "s"),
            NewEntry::new("t", "bob", ""),
        ] {
            assert!(matches!(
                store.create(Some(&u1), entry),
                Err(StoreError::Validation(_))
            ));
        }
        assert_eq!(count_rows(&db), 0, "Rejected entries must not be persisted");
    }

    #[test]
    fn test_operations_require_identity() {
        let db = Database::open_in_memory().unwrap();
        let crypto = crypto();
        let store = SqliteEntryStore::new(&db, &crypto);
        let some_id = Uuid::new_v4();

        assert!(matches!(
            store.create(None, NewEntry::new("t", "u", "s")),
            Err(StoreError::MissingIdentity)
        ));
        assert!(matches!(store.get(None, &some_id), Err(StoreError::MissingIdentity)));
        assert!(matches!(store.delete(None, &some_id), Err(StoreError::MissingIdentity)));
        assert!(matches!(
            store.list(None, &EntryFilter::new()),
            Err(StoreError::MissingIdentity)
        ));
        assert_eq!(count_rows(&db), 0);
    }

    #[test]
    fn test_foreign_entry_is_not_found_for_get_and_delete() {
        let db = Database::open_in_memory().unwrap();
        let crypto = crypto();
        let store = SqliteEntryStore::new(&db, &crypto);
        let (u1, u2) = (id("U1"), id("U2"));

        let entry_id = store
            .create(Some(&u1), NewEntry::new("Gmail", "bob", "p@ss"))
            .unwrap();

        assert!(matches!(store.get(Some(&u2), &entry_id), Err(StoreError::NotFound(_))));
        assert!(matches!(
            store.delete(Some(&u2), &entry_id),
            Err(StoreError::NotFound(_))
        ));
        assert!(store.list(Some(&u2), &EntryFilter::new()).unwrap().entries.is_empty());

        // The failed delete left the owner's entry intact.
        assert!(store.get(Some(&u1), &entry_id).is_ok());
    }

    #[test]
    fn test_authorize_discloses_foreign_owner() {
        let db = Database::open_in_memory().unwrap();
        let crypto = crypto();
        let store = SqliteEntryStore::new(&db, &crypto);
        let (u1, u2) = (id("U1"), id("U2"));

        let entry_id = store
            .create(Some(&u1), NewEntry::new("Gmail", "bob", "p@ss"))
            .unwrap();

        assert!(store.authorize(Some(&u1), &entry_id).is_ok());
        assert!(matches!(
            store.authorize(Some(&u2), &entry_id),
            Err(StoreError::PermissionDenied(_))
        ));
    }

    #[test]
    fn test_delete_removes_row_then_reports_not_found() {
        let db = Database::open_in_memory().unwrap();
        let crypto = crypto();
        let store = SqliteEntryStore::new(&db, &crypto);
        let u1 = id("U1");

        let entry_id = store
            .create(Some(&u1), NewEntry::new("Gmail", "bob", "p@ss"))
            .unwrap();

        assert!(store.delete(Some(&u1), &entry_id).unwrap());
        assert!(matches!(store.get(Some(&u1), &entry_id), Err(StoreError::NotFound(_))));
        assert!(matches!(
            store.delete(Some(&u1), &entry_id),
            Err(StoreError::NotFound(_))
        ));
    }

    #[test]
    fn test_delete_nonexistent_is_not_found() {
        let db = Database::open_in_memory().unwrap();
        let crypto = crypto();
        let store = SqliteEntryStore::new(&db, &crypto);
        assert!(matches!(
            store.delete(Some(&id("U1")), &Uuid::new_v4()),
            Err(StoreError::NotFound(_))
        ));
    }

    #[test]
    fn test_tag_filter_requires_all_tags() {
        let db = Database::open_in_memory().unwrap();
        let crypto = crypto();
        let store = SqliteEntryStore::new(&db, &crypto);
        let u1 = id("U1");

        let work = store
            .create(
                Some(&u1),
                NewEntry::new("Work mail", "bob", "a").with_tags(["work", "email"]),
            )
            .unwrap();
        store
            .create(Some(&u1), NewEntry::new("Home", "bob", "b").with_tags(["home"]))
            .unwrap();

        let listing = store
            .list(Some(&u1), &EntryFilter::new().tags(["work"]))
            .unwrap();
        assert_eq!(listing.entries.len(), 1);
        assert_eq!(listing.entries[0].id, work);

        // "contains all", not "any of"
        let listing = store
            .list(Some(&u1), &EntryFilter::new().tags(["work", "home"]))
            .unwrap();
        assert!(listing.entries.is_empty());

        let listing = store
            .list(Some(&u1), &EntryFilter::new().tags(["email", "work"]))
            .unwrap();
        assert_eq!(listing.entries.len(), 1);
    }

    #[test]
    fn test_domain_substring_and_folder_exact_match() {
        let db = Database::open_in_memory().unwrap();
        let crypto = crypto();
        let store = SqliteEntryStore::new(&db, &crypto);
        let u1 = id("U1");

        store
            .create(
                Some(&u1),
                NewEntry::new("Gmail", "bob", "a")
                    .with_domain("mail.google.com")
                    .with_folder("personal"),
            )
            .unwrap();
        store
            .create(
                Some(&u1),
                NewEntry::new("GitHub", "bob", "b")
                    .with_domain("github.com")
                    .with_folder("personal/dev"),
            )
            .unwrap();

        let by_domain = store
            .list(Some(&u1), &EntryFilter::new().domain("google"))
            .unwrap();
        assert_eq!(by_domain.entries.len(), 1);
        assert_eq!(by_domain.entries[0].title, "Gmail");

        let by_folder = store
            .list(Some(&u1), &EntryFilter::new().folder("personal"))
            .unwrap();
        assert_eq!(by_folder.entries.len(), 1, "Folder is an exact match");

        let all_com = store
            .list(Some(&u1), &EntryFilter::new().domain(".com"))
            .unwrap();
        assert_eq!(all_com.entries.len(), 2);
    }

    #[test]
    fn test_combined_filters_are_conjunctive() {
        let db = Database::open_in_memory().unwrap();
        let crypto = crypto();
        let store = SqliteEntryStore::new(&db, &crypto);
        let u1 = id("U1");

        let target = store
            .create(
                Some(&u1),
                NewEntry::new("Jira", "bob", "a")
                    .with_domain("corp.example.com")
                    .with_folder("work")
                    .with_tags(["work", "sso"]),
            )
            .unwrap();
        // Each of these misses exactly one filter.
        store
            .create(
                Some(&u1),
                NewEntry::new("Wiki", "bob", "b")
                    .with_domain("wiki.other.org")
                    .with_folder("work")
                    .with_tags(["work", "sso"]),
            )
            .unwrap();
        store
            .create(
                Some(&u1),
                NewEntry::new("Mail", "bob", "c")
                    .with_domain("mail.example.com")
                    .with_folder("home")
                    .with_tags(["work", "sso"]),
            )
            .unwrap();
        store
            .create(
                Some(&u1),
                NewEntry::new("VPN", "bob", "d")
                    .with_domain("vpn.example.com")
                    .with_folder("work")
                    .with_tags(["work"]),
            )
            .unwrap();

        let filter = EntryFilter::new()
            .domain("example.com")
            .folder("work")
            .tags(["sso"]);
        let listing = store.list(Some(&u1), &filter).unwrap();
        assert_eq!(listing.entries.len(), 1);
        assert_eq!(listing.entries[0].id, target);
        assert_eq!(listing.entries[0].secret.reveal(), Some("a"));
    }

    #[test]
    fn test_list_is_owner_scoped_and_ordered() {
        let db = Database::open_in_memory().unwrap();
        let crypto = crypto();
        let store = SqliteEntryStore::new(&db, &crypto);
        let (u1, u2) = (id("U1"), id("U2"));

        let first = store.create(Some(&u1), NewEntry::new("A", "x", "1")).unwrap();
        store.create(Some(&u2), NewEntry::new("B", "y", "2")).unwrap();
        let third = store.create(Some(&u1), NewEntry::new("C", "z", "3")).unwrap();

        let listing = store.list(Some(&u1), &EntryFilter::new()).unwrap();
        let ids: Vec<Uuid> = listing.entries.iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![first, third]);
        assert!(!listing.is_partial());
    }

    #[test]
    fn test_tags_are_deduplicated_in_insertion_order() {
        let db = Database::open_in_memory().unwrap();
        let crypto = crypto();
        let store = SqliteEntryStore::new(&db, &crypto);
        let u1 = id("U1");

        let entry_id = store
            .create(
                Some(&u1),
                NewEntry::new("t", "u", "s").with_tags(["b", "a", "b", " ", "c"]),
            )
            .unwrap();
        let entry = store.get(Some(&u1), &entry_id).unwrap();
        assert_eq!(entry.tags, vec!["b", "a", "c"]);
    }

    #[test]
    fn test_blank_optional_fields_are_stored_as_none() {
        let db = Database::open_in_memory().unwrap();
        let crypto = crypto();
        let store = SqliteEntryStore::new(&db, &crypto);
        let u1 = id("U1");

        let entry_id = store
            .create(Some(&u1), NewEntry::new("t", "u", "s").with_notes("").with_folder(" "))
            .unwrap();
        let entry = store.get(Some(&u1), &entry_id).unwrap();
        assert!(entry.notes.is_none());
        assert!(entry.folder.is_none());
        assert!(entry.domain.is_none());
    }

    #[test]
    fn test_corrupted_secret_fails_get_with_crypto_error() {
        let db = Database::open_in_memory().unwrap();
        let crypto = crypto();
        let store = SqliteEntryStore::new(&db, &crypto);
        let u1 = id("U1");

        let entry_id = store.create(Some(&u1), NewEntry::new("t", "u", "s")).unwrap();
        db.conn()
            .unwrap()
            .execute(
                "UPDATE entries SET secret = x'00112233445566778899aabbccddeeff' WHERE id = ?1",
                params![entry_id.to_string()],
            )
            .unwrap();

        assert!(matches!(store.get(Some(&u1), &entry_id), Err(StoreError::Crypto(_))));
    }

    #[test]
    fn test_list_flags_undecryptable_rows_instead_of_dropping_them() {
        let db = Database::open_in_memory().unwrap();
        let crypto = crypto();
        let store = SqliteEntryStore::new(&db, &crypto);
        let u1 = id("U1");

        let good = store.create(Some(&u1), NewEntry::new("ok", "u", "fine")).unwrap();

        // Sealed under a different key: authentication will fail.
        let foreign = CryptoProvider::new(&MasterKey::from_bytes(&[9u8; 32]).unwrap());
        let bad = SqliteEntryStore::new(&db, &foreign)
            .create(Some(&u1), NewEntry::new("broken", "u", "lost"))
            .unwrap();

        let listing = store.list(Some(&u1), &EntryFilter::new()).unwrap();
        assert_eq!(listing.entries.len(), 2, "No row may be silently dropped");
        assert!(listing.is_partial());
        assert_eq!(listing.undecryptable, vec![bad]);

        let good_entry = listing.entries.iter().find(|e| e.id == good).unwrap();
        assert_eq!(good_entry.secret.reveal(), Some("fine"));
        let bad_entry = listing.entries.iter().find(|e| e.id == bad).unwrap();
        assert!(!bad_entry.secret.is_available());
    }

    #[test]
    fn test_abort_during_list_is_cancelled() {
        let db = Database::open_in_memory().unwrap();
        let crypto = crypto();
        db.conn()
            .unwrap()
            .execute(
                "WITH RECURSIVE seq(n) AS (SELECT 1 UNION ALL SELECT n + 1 FROM seq LIMIT 200000)
                 INSERT INTO entries
                    (id, owner, title, username, secret, tags, created_at, updated_at)
                 SELECT 'row-' || n, 'U1', 't', 'u', randomblob(40), '[\"a\",\"b\",\"c\"]',
                        '2024-01-01T00:00:00+00:00', '2024-01-01T00:00:00+00:00'
                 FROM seq",
                [],
            )
            .unwrap();

        let signal = AbortSignal::new();
        let raiser = {
            let signal = signal.clone();
            std::thread::spawn(move || {
                std::thread::sleep(std::time::Duration::from_millis(5));
                signal.abort();
            })
        };

        let store = SqliteEntryStore::new(&db, &crypto).with_abort(&signal);
        let result = store.list(
            Some(&id("U1")),
            &EntryFilter::new().tags(["a", "b", "missing"]),
        );
        raiser.join().unwrap();

        let err = result.unwrap_err();
        assert!(matches!(err, StoreError::Cancelled), "got {err}");
        assert!(!err.is_internal());
    }

    #[test]
    fn test_raised_abort_cancels_store_calls() {
        let db = Database::open_in_memory().unwrap();
        let crypto = crypto();
        let signal = AbortSignal::new();
        signal.abort();
        let store = SqliteEntryStore::new(&db, &crypto).with_abort(&signal);

        assert!(matches!(
            store.create(Some(&id("U1")), NewEntry::new("t", "u", "s")),
            Err(StoreError::Cancelled)
        ));
        assert_eq!(count_rows(&db), 0);
    }
}
