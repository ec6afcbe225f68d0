// Vaultkeep - CLI Command Handlers
//
// Each function handles one CLI subcommand. They load configuration, open the
// database and go through VaultService, so Ctrl-C and VAULT_OP_TIMEOUT_MS
// interrupt long-running calls the same way they would for any other caller.

use std::path::PathBuf;
use std::sync::Arc;

use uuid::Uuid;

use crate::auth::Identity;
use crate::config::Config;
use crate::crypto::MasterKey;
use crate::error::VaultError;
use crate::service::{RequestScope, VaultService};
use crate::store::{Database, EntryFilter, NewEntry, StoreError};

use super::{CallerArgs, Cli, Commands, IDENTITY_ENV};

/// Execute the parsed CLI command.
pub async fn execute(cli: Cli) -> Result<(), VaultError> {
    if let Commands::GenKey = cli.command {
        return cmd_gen_key();
    }

    let config = load_config(cli.database)?;
    if let Commands::Init = cli.command {
        return cmd_init(&config);
    }

    let svc = open_service(&config)?;
    let scope = request_scope();

    match cli.command {
        Commands::GenKey | Commands::Init => Ok(()),
        Commands::Register {
            email,
            username,
            password,
        } => cmd_register(&svc, &scope, email, username, password).await,
        Commands::Login { username, password } => cmd_login(&svc, &scope, username, password).await,
        Commands::DeleteUser { id } => cmd_delete_user(&svc, &scope, id).await,
        Commands::Add {
            caller,
            title,
            username,
            secret,
            notes,
            folder,
            domain,
            tags,
        } => {
            let mut entry = NewEntry::new(title, username, secret).with_tags(split_tags(&tags));
            if let Some(notes) = notes {
                entry = entry.with_notes(notes);
            }
            if let Some(folder) = folder {
                entry = entry.with_folder(folder);
            }
            if let Some(domain) = domain {
                entry = entry.with_domain(domain);
            }
            cmd_add(&svc, &scope, resolve_caller(&caller), entry).await
        }
        Commands::Get { caller, id, reveal } => {
            cmd_get(&svc, &scope, resolve_caller(&caller), id, reveal).await
        }
        Commands::List {
            caller,
            domain,
            folder,
            tags,
            json,
        } => {
            let mut filter = EntryFilter::new().tags(split_tags(&tags));
            filter.domain = domain;
            filter.folder = folder;
            cmd_list(&svc, &scope, resolve_caller(&caller), filter, json).await
        }
        Commands::Delete { caller, id } => {
            cmd_delete(&svc, &scope, resolve_caller(&caller), id).await
        }
        Commands::Authorize { caller, id } => {
            cmd_authorize(&svc, &scope, resolve_caller(&caller), id).await
        }
    }
}

// ─── Keys & Init ─────────────────────────────────────────────────────────────

fn cmd_gen_key() -> Result<(), VaultError> {
    let key = MasterKey::generate();
    println!("{}", key.to_base64().as_str());
    eprintln!("Export it as VAULT_MASTER_KEY. Losing it makes every stored secret unreadable.");
    Ok(())
}

fn cmd_init(config: &Config) -> Result<(), VaultError> {
    if let Some(dir) = config.database_path.parent() {
        if !dir.as_os_str().is_empty() {
            std::fs::create_dir_all(dir)?;
        }
    }

    Database::open(&config.database_path)?;

    println!("✓ Vault initialized");
    println!("  Database: {}", config.database_path.display());
    println!();
    println!("Next: register an account with `vaultkeep register --email <addr> --username <name> --password <pw>`");

    Ok(())
}

// ─── Users ───────────────────────────────────────────────────────────────────

async fn cmd_register(
    svc: &VaultService,
    scope: &RequestScope,
    email: String,
    username: String,
    password: String,
) -> Result<(), VaultError> {
    let id = svc
        .register_user(scope, email, username.clone(), password)
        .await?;

    println!("✓ User registered");
    println!("  ID:       {}", id);
    println!("  Username: {}", username);
    println!();
    println!("Act as this user with `--as {}` or VAULT_IDENTITY={}", id, id);

    Ok(())
}

async fn cmd_login(
    svc: &VaultService,
    scope: &RequestScope,
    username: String,
    password: String,
) -> Result<(), VaultError> {
    let identity = svc.login(scope, username, password).await?;
    println!("{}", identity);
    Ok(())
}

async fn cmd_delete_user(
    svc: &VaultService,
    scope: &RequestScope,
    id_str: String,
) -> Result<(), VaultError> {
    let id = parse_id(&id_str)?;

    if !svc.delete_user(scope, id).await? {
        return Err(StoreError::NotFound(format!("user {}", id)).into());
    }
    println!("✓ User {} deleted", id);

    Ok(())
}

// ─── Entries ─────────────────────────────────────────────────────────────────

async fn cmd_add(
    svc: &VaultService,
    scope: &RequestScope,
    caller: Option<Identity>,
    entry: NewEntry,
) -> Result<(), VaultError> {
    let title = entry.title.clone();
    let id = svc.create_entry(scope, caller, entry).await?;

    println!("✓ Entry stored");
    println!("  ID:    {}", id);
    println!("  Title: {}", title);

    Ok(())
}

async fn cmd_get(
    svc: &VaultService,
    scope: &RequestScope,
    caller: Option<Identity>,
    id_str: String,
    reveal: bool,
) -> Result<(), VaultError> {
    let id = parse_id(&id_str)?;

    let entry = svc.get_entry(scope, caller, id).await?;

    println!("Entry details:\n");
    println!("  ID:       {}", entry.id);
    println!("  Title:    {}", entry.title);
    println!("  Username: {}", entry.username);
    match (reveal, entry.secret.reveal()) {
        (true, Some(secret)) => println!("  Secret:   {}", secret),
        (false, Some(_)) => println!("  Secret:   [REDACTED] (use --reveal)"),
        (_, None) => println!("  Secret:   [UNAVAILABLE]"),
    }
    if let Some(ref domain) = entry.domain {
        println!("  Domain:   {}", domain);
    }
    if let Some(ref folder) = entry.folder {
        println!("  Folder:   {}", folder);
    }
    if !entry.tags.is_empty() {
        println!("  Tags:     {}", entry.tags.join(", "));
    }
    if let Some(ref notes) = entry.notes {
        println!("  Notes:    {}", notes);
    }
    println!("  Created:  {}", entry.created_at.format("%Y-%m-%d %H:%M:%S UTC"));
    println!("  Updated:  {}", entry.updated_at.format("%Y-%m-%d %H:%M:%S UTC"));

    Ok(())
}

async fn cmd_list(
    svc: &VaultService,
    scope: &RequestScope,
    caller: Option<Identity>,
    filter: EntryFilter,
    json: bool,
) -> Result<(), VaultError> {
    let listing = svc.list_entries(scope, caller, filter).await?;
    let summaries: Vec<_> = listing.entries.iter().map(|e| e.summary()).collect();

    if json {
        let out = serde_json::to_string_pretty(&summaries).map_err(StoreError::from)?;
        println!("{}", out);
    } else if summaries.is_empty() {
        println!("No entries found.");
        println!("Add one with: vaultkeep add --title <name> --username <user> --secret <value>");
        return Ok(());
    } else {
        println!("Entries ({}):\n", summaries.len());
        for summary in &summaries {
            println!(
                "  {} │ {:16} │ {:16} │ {:20} │ {}",
                summary.id,
                summary.title,
                summary.username,
                summary.domain.as_deref().unwrap_or("-"),
                summary.tags.join(","),
            );
        }
    }

    if listing.is_partial() {
        eprintln!(
            "Warning: {} entr{} could not be decrypted with the current master key",
            listing.undecryptable.len(),
            if listing.undecryptable.len() == 1 { "y" } else { "ies" }
        );
    }

    Ok(())
}

async fn cmd_delete(
    svc: &VaultService,
    scope: &RequestScope,
    caller: Option<Identity>,
    id_str: String,
) -> Result<(), VaultError> {
    let id = parse_id(&id_str)?;

    svc.delete_entry(scope, caller, id).await?;
    println!("✓ Entry {} deleted", id);

    Ok(())
}

async fn cmd_authorize(
    svc: &VaultService,
    scope: &RequestScope,
    caller: Option<Identity>,
    id_str: String,
) -> Result<(), VaultError> {
    let id = parse_id(&id_str)?;
    svc.authorize_entry(scope, caller, id).await?;
    println!("✓ Access to {} granted", id);
    Ok(())
}

// ─── Helpers ─────────────────────────────────────────────────────────────────

fn load_config(database: Option<PathBuf>) -> Result<Config, VaultError> {
    let config = Config::from_env()?;
    Ok(match database {
        Some(path) => config.with_database_path(path),
        None => config,
    })
}

fn open_service(config: &Config) -> Result<VaultService, VaultError> {
    let path = &config.database_path;
    if !path.exists() {
        return Err(VaultError::Other(format!(
            "Database not found at {}. Run `vaultkeep init` first.",
            path.display()
        )));
    }

    let db = Database::open(path)?;
    Ok(VaultService::new(Arc::new(db), Arc::new(config.crypto_provider()))
        .with_default_timeout(config.op_timeout))
}

/// A request scope cancelled by Ctrl-C.
fn request_scope() -> RequestScope {
    let scope = RequestScope::new();
    let token = scope.token().clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, cancelling");
            token.cancel();
        }
    });
    scope
}

fn resolve_caller(args: &CallerArgs) -> Option<Identity> {
    match args.identity.as_deref() {
        Some(raw) => Identity::parse(raw),
        None => Identity::from_optional(std::env::var(IDENTITY_ENV).ok().as_deref()),
    }
}

fn parse_id(raw: &str) -> Result<Uuid, VaultError> {
    Uuid::parse_str(raw).map_err(|e| VaultError::Other(format!("Invalid UUID: {}", e)))
}

fn split_tags(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
