//! `credvault versions` — print every version of one secret.

use crate::cli::output;
use crate::cli::{parse_context, Cli, Session};
use crate::errors::{CredVaultError, Result};

/// Execute the `versions` command.
pub fn execute(cli: &Cli, name: &str, context: &[String], limit: Option<usize>) -> Result<()> {
    let context = parse_context(context)?;

    let session = Session::load(cli)?;
    let store = session.open_store()?;
    let versions = store.get_all_versions(name, &context, limit)?;

    if versions.is_empty() {
        return Err(CredVaultError::SecretNotFound {
            name: name.to_string(),
            version: None,
        });
    }

    session.audit("versions", Some(name), None, None);
    output::print_versions_table(&versions);

    Ok(())
}
