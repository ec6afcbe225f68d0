// Vaultkeep - Process configuration
//
// Everything is read from the environment once at start-up. The master key is
// decoded here so a malformed key stops the process before any store opens.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::crypto::{CryptoError, CryptoProvider, MasterKey};

/// Base64-encoded 32-byte master key.
pub const MASTER_KEY_ENV: &str = "VAULT_MASTER_KEY";

/// Path of the SQLite database file.
pub const DATABASE_PATH_ENV: &str = "VAULT_DATABASE_PATH";

/// Per-operation deadline in milliseconds. Unset or 0 disables it.
pub const OP_TIMEOUT_ENV: &str = "VAULT_OP_TIMEOUT_MS";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable {0}")]
    Missing(&'static str),

    #[error("Invalid value for {name}: {reason}")]
    Invalid { name: &'static str, reason: String },

    #[error(transparent)]
    Key(#[from] CryptoError),
}

pub struct Config {
    pub database_path: PathBuf,
    pub op_timeout: Option<Duration>,
    master_key: MasterKey,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let encoded_key = lookup(MASTER_KEY_ENV)
            .filter(|v| !v.trim().is_empty())
            .ok_or(ConfigError::Missing(MASTER_KEY_ENV))?;
        let master_key = MasterKey::from_base64(&encoded_key)?;

        let database_path = lookup(DATABASE_PATH_ENV)
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(default_database_path);

        let op_timeout = match lookup(OP_TIMEOUT_ENV).filter(|v| !v.trim().is_empty()) {
            None => None,
            Some(raw) => {
                let millis: u64 = raw.trim().parse().map_err(|e| ConfigError::Invalid {
                    name: OP_TIMEOUT_ENV,
                    reason: format!("{}", e),
                })?;
                (millis > 0).then(|| Duration::from_millis(millis))
            }
        };

        Ok(Self {
            database_path,
            op_timeout,
            master_key,
        })
    }

    pub fn with_database_path(mut self, path: PathBuf) -> Self {
        self.database_path = path;
        self
    }

    pub fn crypto_provider(&self) -> CryptoProvider {
        CryptoProvider::new(&self.master_key)
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("database_path", &self.database_path)
            .field("op_timeout", &self.op_timeout)
            .field("master_key", &self.master_key)
            .finish()
    }
}

/// Default location for the database file.
pub fn default_database_path() -> PathBuf {
    dirs_next::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("vaultkeep")
        .join("vault.db")
}
