//! `credvault delete` — remove one version of a secret, or all of them.

use dialoguer::Confirm;

use crate::cli::output;
use crate::cli::{parse_version, Cli, Session};
use crate::errors::{CredVaultError, Result};

/// Execute the `delete` command.
pub fn execute(cli: &Cli, name: &str, version: Option<&str>, force: bool) -> Result<()> {
    let version = parse_version(version)?;

    // Unless --force is set, ask for confirmation before deleting.
    if !force {
        let prompt = match &version {
            Some(v) => format!("Delete '{name}' version {}?", v.value()),
            None => format!("Delete every version of '{name}'?"),
        };
        let confirmed = Confirm::new()
            .with_prompt(prompt)
            .default(false)
            .interact()
            .map_err(|e| CredVaultError::CommandFailed(format!("confirm prompt: {e}")))?;

        if !confirmed {
            output::info("Cancelled.");
            return Ok(());
        }
    }

    let session = Session::load(cli)?;
    let store = session.open_store()?;

    let outcomes = match &version {
        Some(v) => vec![store.delete_secret(name, Some(v))?],
        None => store.delete_secrets(name)?,
    };

    let deleted: Vec<_> = outcomes.iter().filter(|o| o.existed).collect();
    if deleted.is_empty() {
        return Err(CredVaultError::SecretNotFound {
            name: name.to_string(),
            version,
        });
    }

    for outcome in &deleted {
        session.audit("delete", Some(name), Some(&outcome.version), None);
        output::success(&format!(
            "Deleted '{}' version {}",
            name,
            outcome.version.value()
        ));
    }

    Ok(())
}
