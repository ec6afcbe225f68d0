// Vaultkeep - Store Module
//
// Ownership-scoped persistence for credential entries and user accounts on
// SQLite. Secret columns are sealed by the CryptoProvider before they are
// written and opened only for their owner.

mod db;
mod entries;
mod error;
mod models;
mod users;

pub use db::{AbortSignal, Database};
pub use entries::{EntryStore, SqliteEntryStore};
pub use error::StoreError;
pub use models::{
    Entry, EntryFilter, EntryListing, EntrySummary, NewEntry, NewUser, SecretField, User,
};
pub use users::{SqliteUserStore, UserStore};
