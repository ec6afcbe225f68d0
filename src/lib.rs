// Vaultkeep - Library root
//
// Re-exports the crypto, store, auth, service, config, and CLI modules.

pub mod auth;
pub mod cli;
pub mod config;
pub mod crypto;
pub mod error;
pub mod service;
pub mod store;

pub use error::{Result, VaultError};
