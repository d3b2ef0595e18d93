//! CLI module — Clap argument parser, output helpers, and command implementations.

pub mod commands;
pub mod output;

use std::path::{Path, PathBuf};

use clap::Parser;
use zeroize::Zeroizing;

use crate::config::Settings;
use crate::context::EncryptionContext;
use crate::errors::{CredVaultError, Result};
use crate::kms::LocalKeyService;
use crate::storage::SqliteBackend;
use crate::store::CredentialStore;
use crate::version::Version;

/// Minimum passphrase length for a new keyring.
const MIN_PASSPHRASE_LEN: usize = 8;

/// The store type every command works against.
pub type LocalStore = CredentialStore<LocalKeyService, SqliteBackend>;

/// CredVault CLI: versioned, tamper-evident secret store.
#[derive(Parser)]
#[command(
    name = "credvault",
    about = "Versioned, tamper-evident secret store",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Store directory (default: .credvault, or `store_dir` in .credvault.toml)
    #[arg(long, global = true)]
    pub store_dir: Option<String>,

    /// Table holding the secret records (default: credential-store)
    #[arg(long, global = true)]
    pub table: Option<String>,

    /// Master key id used for new secrets (default: alias/credstash)
    #[arg(short = 'k', long, env = "CREDVAULT_KEY_ID", global = true)]
    pub key_id: Option<String>,
}

/// All available subcommands.
#[derive(clap::Subcommand)]
pub enum Commands {
    /// Create the keyring, the master key and the secrets table
    Setup,

    /// Store a new version of a secret
    Put {
        /// Secret name (e.g. db.password)
        name: String,
        /// Secret value; `-` reads piped stdin or prompts on a terminal
        value: String,
        /// Encryption context as key=value pairs
        context: Vec<String>,
        /// Explicit version number (default: one above the highest stored)
        #[arg(short, long)]
        version: Option<String>,
        /// HMAC digest: MD5, SHA1, SHA256, SHA384 or SHA512
        #[arg(short, long)]
        digest: Option<String>,
    },

    /// Print a secret's value
    Get {
        /// Secret name
        name: String,
        /// Encryption context as key=value pairs
        context: Vec<String>,
        /// Version to fetch (default: highest)
        #[arg(short, long)]
        version: Option<String>,
    },

    /// Print every secret's value
    Getall {
        /// Encryption context as key=value pairs
        context: Vec<String>,
        /// Fetch this version of each secret (default: highest)
        #[arg(short, long)]
        version: Option<String>,
        /// Only secrets whose name starts with this prefix
        #[arg(long)]
        starts_with: Option<String>,
        /// Output format: json (default), env or dotenv
        #[arg(short, long, default_value = "json")]
        format: String,
    },

    /// Print every version of a secret
    Versions {
        /// Secret name
        name: String,
        /// Encryption context as key=value pairs
        context: Vec<String>,
        /// Only the newest N versions
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// List secret names and versions
    List,

    /// Delete a secret version, or every version
    Delete {
        /// Secret name
        name: String,
        /// Version to delete (default: all versions)
        #[arg(short, long)]
        version: Option<String>,
        /// Skip confirmation prompt
        #[arg(short, long)]
        force: bool,
    },

    /// Show the configuration in use
    Config,

    /// Generate shell completion scripts
    Completions {
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },

    /// View the audit log of store operations
    Audit {
        /// Only entries about this secret
        name: Option<String>,
        /// Number of entries to show (default: 50)
        #[arg(long, default_value = "50")]
        last: usize,
        /// Show entries since a duration ago (e.g. 7d, 24h, 30m)
        #[arg(long, value_parser = commands::audit_cmd::parse_since)]
        since: Option<chrono::Duration>,
    },
}

// ---------------------------------------------------------------------------
// Shared helpers used by multiple commands
// ---------------------------------------------------------------------------

/// Settings resolved for one invocation: config file plus CLI overrides.
pub struct Session {
    pub project_dir: PathBuf,
    pub settings: Settings,
}

impl Session {
    /// Load `.credvault.toml` from the working directory and apply flags.
    pub fn load(cli: &Cli) -> Result<Self> {
        let project_dir = std::env::current_dir()?;
        Self::load_from(cli, &project_dir)
    }

    pub fn load_from(cli: &Cli, project_dir: &Path) -> Result<Self> {
        let mut settings = Settings::load(project_dir)?;
        if let Some(dir) = &cli.store_dir {
            settings.store_dir = dir.clone();
        }
        if let Some(table) = &cli.table {
            settings.table = table.clone();
        }
        if let Some(key_id) = &cli.key_id {
            settings.key_id = key_id.clone();
        }
        Ok(Self {
            project_dir: project_dir.to_path_buf(),
            settings,
        })
    }

    pub fn store_dir(&self) -> PathBuf {
        self.settings.store_path(&self.project_dir)
    }

    /// Open the keyring and the database, prompting for the passphrase.
    pub fn open_store(&self) -> Result<LocalStore> {
        let keyring_path = self.settings.keyring_path(&self.project_dir);
        if !keyring_path.exists() {
            return Err(CredVaultError::Keyring(format!(
                "no keyring at {} — run `credvault setup` first",
                keyring_path.display()
            )));
        }

        let passphrase = prompt_passphrase()?;
        let kms = LocalKeyService::open(&keyring_path, passphrase.as_bytes())?;
        let backend =
            SqliteBackend::open(&self.settings.db_path(&self.project_dir), &self.settings.table)?;

        Ok(CredentialStore::new(kms, backend, &self.settings.key_id)
            .with_digest(self.settings.digest))
    }

    /// Record an operation in `<store_dir>/audit.db`.
    pub fn audit(&self, op: &str, name: Option<&str>, version: Option<&Version>, details: Option<&str>) {
        let version = version.map(Version::as_str);
        crate::audit::log_audit(&self.store_dir(), op, name, version, details);
    }
}

/// Get the keyring passphrase, trying in order:
/// 1. `CREDVAULT_PASSPHRASE` env var (CI/CD)
/// 2. Interactive prompt
pub fn prompt_passphrase() -> Result<Zeroizing<String>> {
    if let Ok(pw) = std::env::var("CREDVAULT_PASSPHRASE") {
        if !pw.is_empty() {
            return Ok(Zeroizing::new(pw));
        }
    }

    let pw = dialoguer::Password::new()
        .with_prompt("Enter keyring passphrase")
        .interact()
        .map_err(|e| CredVaultError::CommandFailed(format!("passphrase prompt: {e}")))?;
    Ok(Zeroizing::new(pw))
}

/// Prompt for a new passphrase with confirmation (used during `setup`).
///
/// Also respects `CREDVAULT_PASSPHRASE`.  Enforces a minimum length.
pub fn prompt_new_passphrase() -> Result<Zeroizing<String>> {
    if let Ok(pw) = std::env::var("CREDVAULT_PASSPHRASE") {
        if !pw.is_empty() {
            if pw.len() < MIN_PASSPHRASE_LEN {
                return Err(CredVaultError::CommandFailed(format!(
                    "passphrase must be at least {MIN_PASSPHRASE_LEN} characters"
                )));
            }
            return Ok(Zeroizing::new(pw));
        }
    }

    loop {
        let passphrase = dialoguer::Password::new()
            .with_prompt("Choose keyring passphrase")
            .with_confirmation(
                "Confirm keyring passphrase",
                "Passphrases do not match, try again",
            )
            .interact()
            .map_err(|e| CredVaultError::CommandFailed(format!("passphrase prompt: {e}")))?;

        if passphrase.len() < MIN_PASSPHRASE_LEN {
            output::warning(&format!(
                "Passphrase must be at least {MIN_PASSPHRASE_LEN} characters. Try again."
            ));
            continue;
        }

        return Ok(Zeroizing::new(passphrase));
    }
}

/// Parse `key=value` context arguments.
pub fn parse_context(args: &[String]) -> Result<EncryptionContext> {
    EncryptionContext::from_pairs(args)
}

/// Parse an optional `--version` argument.
pub fn parse_version(raw: Option<&str>) -> Result<Option<Version>> {
    raw.map(str::parse).transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn cli(args: &[&str]) -> Cli {
        let mut argv = vec!["credvault"];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).unwrap()
    }

    #[test]
    fn put_parses_value_and_context() {
        let parsed = cli(&["put", "db.pass", "hunter2", "env=prod", "app=api", "-d", "SHA512"]);
        match parsed.command {
            Commands::Put {
                name,
                value,
                context,
                digest,
                ..
            } => {
                assert_eq!(name, "db.pass");
                assert_eq!(value, "hunter2");
                assert_eq!(context, ["env=prod", "app=api"]);
                assert_eq!(digest.as_deref(), Some("SHA512"));
            }
            _ => panic!("expected put"),
        }
    }

    #[test]
    fn put_first_positional_after_name_is_always_the_value() {
        let parsed = cli(&["put", "db.pass", "env=prod"]);
        match parsed.command {
            Commands::Put { value, context, .. } => {
                assert_eq!(value, "env=prod");
                assert!(context.is_empty());
            }
            _ => panic!("expected put"),
        }
        assert!(Cli::try_parse_from(["credvault", "put", "db.pass"]).is_err());
        assert!(Cli::try_parse_from(["credvault", "put", "n", "v", "-a"]).is_err());
    }

    #[test]
    fn completions_and_audit_arguments_are_typed() {
        assert!(Cli::try_parse_from(["credvault", "completions", "zsh"]).is_ok());
        assert!(Cli::try_parse_from(["credvault", "completions", "csh"]).is_err());

        let parsed = cli(&["audit", "db.pass", "--since", "2h"]);
        match parsed.command {
            Commands::Audit { name, since, last } => {
                assert_eq!(name.as_deref(), Some("db.pass"));
                assert_eq!(since, Some(chrono::Duration::hours(2)));
                assert_eq!(last, 50);
            }
            _ => panic!("expected audit"),
        }
        assert!(Cli::try_parse_from(["credvault", "audit", "--since", "2w"]).is_err());
    }

    #[test]
    fn flags_override_settings() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(
            tmp.path().join(".credvault.toml"),
            "table = \"from-file\"\nstore_dir = \"file-dir\"\n",
        )
        .unwrap();

        let parsed = cli(&["--table", "from-flag", "-k", "alias/other", "list"]);
        let session = Session::load_from(&parsed, tmp.path()).unwrap();
        assert_eq!(session.settings.table, "from-flag");
        assert_eq!(session.settings.store_dir, "file-dir");
        assert_eq!(session.settings.key_id, "alias/other");
        assert_eq!(session.store_dir(), tmp.path().join("file-dir"));
    }

    #[test]
    fn parse_version_normalises() {
        let v = parse_version(Some("3")).unwrap().unwrap();
        assert_eq!(v.as_str(), "0000000000000000003");
        assert!(parse_version(None).unwrap().is_none());
        assert!(parse_version(Some("three")).is_err());
    }

    #[test]
    fn parse_context_rejects_bare_words() {
        assert!(parse_context(&["env=prod".to_string()]).is_ok());
        assert!(parse_context(&["prod".to_string()]).is_err());
    }
}
