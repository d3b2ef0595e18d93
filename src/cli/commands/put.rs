//! `credvault put` — store a new version of a secret.

use std::io::{self, IsTerminal, Read};

use zeroize::Zeroizing;

use crate::cli::output;
use crate::cli::{parse_context, parse_version, Cli, Session};
use crate::crypto::DigestAlgorithm;
use crate::errors::{CredVaultError, Result};

/// Arguments of the `put` command.
pub struct PutArgs<'a> {
    pub name: &'a str,
    pub value: &'a str,
    pub context: &'a [String],
    pub version: Option<&'a str>,
    pub digest: Option<&'a str>,
}

/// Execute the `put` command.
pub fn execute(cli: &Cli, args: PutArgs<'_>) -> Result<()> {
    // Validate everything before touching the keyring.
    let context = parse_context(args.context)?;
    let version = parse_version(args.version)?;
    let digest = args
        .digest
        .map(str::parse::<DigestAlgorithm>)
        .transpose()?;

    let secret = read_value(args.name, args.value)?;

    let session = Session::load(cli)?;
    let store = session.open_store()?;
    let version = store.put_secret(args.name, &secret, &context, digest, version)?;

    session.audit("put", Some(args.name), Some(&version), None);
    output::success(&format!(
        "Stored '{}' version {}",
        args.name,
        version.value()
    ));

    Ok(())
}

/// `-` reads piped stdin, or prompts when stdin is a terminal.
fn read_value(name: &str, value: &str) -> Result<Zeroizing<String>> {
    if value != "-" {
        output::warning("Value provided on command line — it may appear in shell history.");
        return Ok(Zeroizing::new(value.to_string()));
    }
    if !io::stdin().is_terminal() {
        return read_stdin();
    }
    let v = dialoguer::Password::new()
        .with_prompt(format!("Enter value for {name}"))
        .interact()
        .map_err(|e| CredVaultError::CommandFailed(format!("input prompt: {e}")))?;
    Ok(Zeroizing::new(v))
}

fn read_stdin() -> Result<Zeroizing<String>> {
    let mut buf = Zeroizing::new(String::new());
    io::stdin().read_to_string(&mut buf)?;
    let trimmed = buf.trim_end_matches(['\n', '\r']).len();
    buf.truncate(trimmed);
    Ok(buf)
}
