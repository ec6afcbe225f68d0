// Vaultkeep - Entry and user data models
//
// SECURITY: secret-bearing fields never appear in Debug or Display output and
// are never serialized. Plaintext secrets live in `Zeroizing` buffers.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use zeroize::Zeroizing;

// ─── Entries ─────────────────────────────────────────────────────────────────

/// The decrypted secret of an entry as returned to its owner.
pub enum SecretField {
    /// The secret decrypted successfully.
    Revealed(Zeroizing<String>),
    /// The stored ciphertext failed authentication. Only produced by listings,
    /// which report the entry id in `EntryListing::undecryptable`.
    Unavailable,
}

impl SecretField {
    /// The plaintext secret, if it could be decrypted.
    pub fn reveal(&self) -> Option<&str> {
        match self {
            SecretField::Revealed(secret) => Some(secret.as_str()),
            SecretField::Unavailable => None,
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, SecretField::Revealed(_))
    }
}

impl fmt::Debug for SecretField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SecretField::Revealed(_) => f.write_str("[REDACTED]"),
            SecretField::Unavailable => f.write_str("[UNAVAILABLE]"),
        }
    }
}

/// A stored credential entry, as seen by its owner.
#[derive(Debug)]
pub struct Entry {
    pub id: Uuid,
    pub owner: String,
    pub title: String,
    pub username: String,
    pub secret: SecretField,
    pub notes: Option<String>,
    pub folder: Option<String>,
    pub domain: Option<String>,
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Entry {
    /// Metadata-only view, safe to serialize.
    pub fn summary(&self) -> EntrySummary {
        EntrySummary {
            id: self.id,
            title: self.title.clone(),
            username: self.username.clone(),
            notes: self.notes.clone(),
            folder: self.folder.clone(),
            domain: self.domain.clone(),
            tags: self.tags.clone(),
            secret_available: self.secret.is_available(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

impl fmt::Display for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {} ({})", self.id, self.title, self.username)
    }
}

/// A lightweight, serializable view of an entry. Never contains the secret.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntrySummary {
    pub id: Uuid,
    pub title: String,
    pub username: String,
    pub notes: Option<String>,
    pub folder: Option<String>,
    pub domain: Option<String>,
    pub tags: Vec<String>,
    pub secret_available: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating an entry. The owner is never part of the input; it is
/// always taken from the caller identity.
pub struct NewEntry {
    pub title: String,
    pub username: String,
    pub secret: String,
    pub notes: Option<String>,
    pub folder: Option<String>,
    pub domain: Option<String>,
    pub tags: Vec<String>,
}

impl NewEntry {
    pub fn new(
        title: impl Into<String>,
        username: impl Into<String>,
        secret: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            username: username.into(),
            secret: secret.into(),
            notes: None,
            folder: None,
            domain: None,
            tags: Vec::new(),
        }
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    pub fn with_folder(mut self, folder: impl Into<String>) -> Self {
        self.folder = Some(folder.into());
        self
    }

    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }
}

impl fmt::Debug for NewEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NewEntry")
            .field("title", &self.title)
            .field("username", &self.username)
            .field("secret", &"[REDACTED]")
            .field("notes", &self.notes)
            .field("folder", &self.folder)
            .field("domain", &self.domain)
            .field("tags", &self.tags)
            .finish()
    }
}

/// Optional list filters. All present filters must match.
#[derive(Debug, Clone, Default)]
pub struct EntryFilter {
    /// Substring of the entry domain.
    pub domain: Option<String>,
    /// Exact folder name.
    pub folder: Option<String>,
    /// Every listed tag must be present on the entry.
    pub tags: Vec<String>,
}

impl EntryFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    pub fn folder(mut self, folder: impl Into<String>) -> Self {
        self.folder = Some(folder.into());
        self
    }

    pub fn tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }
}

/// Result of a list call.
#[derive(Debug, Default)]
pub struct EntryListing {
    pub entries: Vec<Entry>,
    /// Ids of returned entries whose secret failed to decrypt.
    pub undecryptable: Vec<Uuid>,
}

impl EntryListing {
    /// True when at least one returned entry carries `SecretField::Unavailable`.
    pub fn is_partial(&self) -> bool {
        !self.undecryptable.is_empty()
    }
}

// ─── Users ───────────────────────────────────────────────────────────────────

/// An account record with its credential blob decrypted.
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub username: String,
    /// The upstream password hash, decrypted for comparison.
    pub credential: Zeroizing<Vec<u8>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl fmt::Debug for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("User")
            .field("id", &self.id)
            .field("email", &self.email)
            .field("username", &self.username)
            .field("credential", &"[REDACTED]")
            .field("created_at", &self.created_at)
            .field("updated_at", &self.updated_at)
            .finish()
    }
}

/// Input for registering a user.
pub struct NewUser {
    pub email: String,
    pub username: String,
    /// Output of upstream password hashing.
    pub credential: Vec<u8>,
}

impl fmt::Debug for NewUser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NewUser")
            .field("email", &self.email)
            .field("username", &self.username)
            .field("credential", &"[REDACTED]")
            .finish()
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_entry(secret: SecretField) -> Entry {
        Entry {
            id: Uuid::new_v4(),
            owner: "u1".to_string(),
            title: "Gmail".to_string(),
            username: "bob".to_string(),
            secret,
            notes: Some("personal".to_string()),
            folder: None,
            domain: Some("mail.google.com".to_string()),
            tags: vec!["email".to_string()],
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_entry_debug_redacts_secret() {
        let entry = sample_entry(SecretField::Revealed(Zeroizing::new("p@ss-123".to_string())));
        let debug_output = format!("{:?}", entry);
        assert!(debug_output.contains("[REDACTED]"));
        assert!(
            !debug_output.contains("p@ss-123"),
            "Debug output must NEVER contain the raw secret"
        );
    }

    #[test]
    fn test_entry_display_does_not_contain_secret() {
        let entry = sample_entry(SecretField::Revealed(Zeroizing::new("hunter2".to_string())));
        let display_output = format!("{}", entry);
        assert!(!display_output.contains("hunter2"));
        assert!(display_output.contains("Gmail"));
    }

    #[test]
    fn test_summary_serializes_without_secret() {
        let entry = sample_entry(SecretField::Revealed(Zeroizing::new("topsecret".to_string())));
        let json = serde_json::to_string(&entry.summary()).unwrap();
        assert!(!json.contains("topsecret"));
        assert!(json.contains("\"secret_available\":true"));

        let unavailable = sample_entry(SecretField::Unavailable).summary();
        assert!(!unavailable.secret_available);
    }

    #[test]
    fn test_new_entry_and_user_debug_redact() {
        let entry = NewEntry::new("t", "u", "raw-secret").with_tags(["a"]);
        assert!(!format!("{:?}", entry).contains("raw-secret"));

        let user = NewUser {
            email: "a@b.c".to_string(),
            username: "alice".to_string(),
            credential: b"$argon2id$hash".to_vec(),
        };
        assert!(!format!("{:?}", user).contains("argon2id"));
    }

    #[test]
    fn test_secret_field_reveal() {
        let revealed = SecretField::Revealed(Zeroizing::new("x".to_string()));
        assert_eq!(revealed.reveal(), Some("x"));
        assert!(SecretField::Unavailable.reveal().is_none());
    }

    #[test]
    fn test_listing_partial_indicator() {
        let mut listing = EntryListing::default();
        assert!(!listing.is_partial());
        listing.undecryptable.push(Uuid::new_v4());
        assert!(listing.is_partial());
    }
}
