//! `credvault get` — print a single secret's value.

use crate::cli::{parse_context, parse_version, Cli, Session};
use crate::errors::Result;

/// Execute the `get` command.
pub fn execute(cli: &Cli, name: &str, context: &[String], version: Option<&str>) -> Result<()> {
    let context = parse_context(context)?;
    let version = parse_version(version)?;

    let session = Session::load(cli)?;
    let store = session.open_store()?;
    let found = store.get_versioned_secret(name, &context, version.as_ref())?;

    // Log the version actually read, even when the caller asked for "latest".
    session.audit("get", Some(name), Some(&found.version), None);
    println!("{}", found.secret);

    Ok(())
}
