// Vaultkeep - CLI Module
//
// Command-line interface using clap derive macros.
// Subcommands: gen-key, init, register, login, delete-user, add, get, list,
// delete, authorize.

mod commands;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

pub use commands::execute;

/// Environment variable consulted when `--as` is not given.
pub const IDENTITY_ENV: &str = "VAULT_IDENTITY";

/// Vaultkeep: an encrypted, per-owner credential vault.
#[derive(Parser, Debug)]
#[command(name = "vaultkeep")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Database file (overrides VAULT_DATABASE_PATH).
    #[arg(long, global = true)]
    pub database: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// The acting identity for entry commands.
#[derive(Args, Debug, Clone, Default)]
pub struct CallerArgs {
    /// Identity to act as (falls back to VAULT_IDENTITY).
    #[arg(long = "as", value_name = "IDENTITY")]
    pub identity: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print a fresh base64 master key for VAULT_MASTER_KEY.
    GenKey,

    /// Create the database file and schema.
    Init,

    /// Register a user account.
    Register {
        #[arg(long)]
        email: String,

        #[arg(long)]
        username: String,

        /// For production use, prefer a prompt to avoid shell history exposure.
        #[arg(long)]
        password: String,
    },

    /// Check a username/password and print the identity that owns entries.
    Login {
        #[arg(long)]
        username: String,

        #[arg(long)]
        password: String,
    },

    /// Remove a user account by id.
    DeleteUser {
        /// The UUID of the user.
        id: String,
    },

    /// Store a new entry owned by the acting identity.
    Add {
        #[command(flatten)]
        caller: CallerArgs,

        #[arg(long)]
        title: String,

        #[arg(long)]
        username: String,

        /// The secret value (password, token, etc.).
        #[arg(long)]
        secret: String,

        #[arg(long)]
        notes: Option<String>,

        #[arg(long)]
        folder: Option<String>,

        /// Domain or URL the entry belongs to (e.g., "mail.google.com").
        #[arg(long)]
        domain: Option<String>,

        /// Comma-separated tags (e.g., "email,personal").
        #[arg(long, default_value = "")]
        tags: String,
    },

    /// Show one entry. The secret is hidden unless --reveal is given.
    Get {
        #[command(flatten)]
        caller: CallerArgs,

        /// The UUID of the entry.
        id: String,

        #[arg(long, default_value = "false")]
        reveal: bool,
    },

    /// List the acting identity's entries (metadata only).
    List {
        #[command(flatten)]
        caller: CallerArgs,

        /// Substring of the entry domain.
        #[arg(long)]
        domain: Option<String>,

        /// Exact folder name.
        #[arg(long)]
        folder: Option<String>,

        /// Comma-separated tags; every tag must be present.
        #[arg(long, default_value = "")]
        tags: String,

        /// Emit JSON instead of a table.
        #[arg(long, default_value = "false")]
        json: bool,
    },

    /// Delete an entry by id.
    Delete {
        #[command(flatten)]
        caller: CallerArgs,

        /// The UUID of the entry.
        id: String,
    },

    /// Check whether the acting identity owns an entry.
    Authorize {
        #[command(flatten)]
        caller: CallerArgs,

        /// The UUID of the entry.
        id: String,
    },
}
