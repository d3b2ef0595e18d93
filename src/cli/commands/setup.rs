//! `credvault setup` — create the keyring, master key and secrets table.

use crate::cli::output;
use crate::cli::{prompt_new_passphrase, Cli, Session};
use crate::errors::Result;
use crate::kms::LocalKeyService;
use crate::storage::{SecretBackend, SqliteBackend};

/// Execute the `setup` command.
pub fn execute(cli: &Cli) -> Result<()> {
    let session = Session::load(cli)?;
    let settings = &session.settings;
    let keyring_path = settings.keyring_path(&session.project_dir);

    // 1. Keyring: create on first run, otherwise unlock the existing one.
    let created = !keyring_path.exists();
    let passphrase = if created {
        prompt_new_passphrase()?
    } else {
        crate::cli::prompt_passphrase()?
    };
    let mut kms = LocalKeyService::open_or_create(
        &keyring_path,
        passphrase.as_bytes(),
        &settings.argon2_params(),
    )?;

    // 2. Master key id.
    let new_key = kms.create_key(&settings.key_id)?;

    // 3. Secrets table.
    let backend = SqliteBackend::open(&settings.db_path(&session.project_dir), &settings.table)?;
    backend.bootstrap()?;

    session.audit("setup", None, None, Some(&settings.table));

    if created {
        output::success(&format!("Created keyring at {}", keyring_path.display()));
    }
    if new_key {
        output::success(&format!("Created master key '{}'", settings.key_id));
    } else {
        output::info(&format!("Master key '{}' already exists", settings.key_id));
    }
    output::success(&format!("Table '{}' is ready", settings.table));
    output::tip("Store a secret: credvault put <name> <value>");

    Ok(())
}
