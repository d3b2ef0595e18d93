//! Colored terminal output helpers.
//!
//! All user-facing output goes through these functions so we get
//! consistent styling across every command.

use std::collections::BTreeMap;

use comfy_table::{ContentArrangement, Table};
use console::style;

use crate::errors::{CredVaultError, Result};
use crate::record::SecretListing;
use crate::store::VersionedSecret;

/// Print a green success message: "check_mark {msg}"
pub fn success(msg: &str) {
    println!("{} {}", style("\u{2713}").green().bold(), msg);
}

/// Print a red error message: "x_mark {msg}"
pub fn error(msg: &str) {
    eprintln!("{} {}", style("\u{2717}").red().bold(), msg);
}

/// Print a yellow warning: "warning_sign {msg}"
pub fn warning(msg: &str) {
    eprintln!("{} {}", style("\u{26a0}").yellow().bold(), msg);
}

/// Print a blue info message: "info_sign {msg}"
pub fn info(msg: &str) {
    println!("{} {}", style("\u{2139}").blue().bold(), msg);
}

/// Print a dim tip/hint: "arrow {msg}"
pub fn tip(msg: &str) {
    println!("{} {}", style("\u{2192}").dim(), style(msg).dim());
}

/// Print a table of stored secrets (Name, Version).
pub fn print_listing_table(listings: &[SecretListing]) {
    if listings.is_empty() {
        info("No secrets in this store yet.");
        tip("Run `credvault put <name> <value>` to add your first secret.");
        return;
    }

    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Name", "Version"]);

    for l in listings {
        table.add_row(vec![l.name.clone(), l.version.value().to_string()]);
    }

    println!("{table}");
}

/// Print every version of one secret (Version, Value).
pub fn print_versions_table(versions: &[VersionedSecret]) {
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Version", "Value"]);

    for v in versions {
        table.add_row(vec![v.version.value().to_string(), v.secret.clone()]);
    }

    println!("{table}");
}

// ---------------------------------------------------------------------------
// getall formats
// ---------------------------------------------------------------------------

/// Output format for `credvault getall`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecretsFormat {
    Json,
    Env,
    Dotenv,
}

impl std::str::FromStr for SecretsFormat {
    type Err = CredVaultError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "json" => Ok(SecretsFormat::Json),
            "env" => Ok(SecretsFormat::Env),
            "dotenv" => Ok(SecretsFormat::Dotenv),
            other => Err(CredVaultError::CommandFailed(format!(
                "unknown format '{other}' — supported: json, env, dotenv"
            ))),
        }
    }
}

/// Render decrypted secrets in the requested format.
pub fn render_secrets(secrets: &BTreeMap<String, String>, format: SecretsFormat) -> Result<String> {
    match format {
        SecretsFormat::Json => serde_json::to_string_pretty(secrets)
            .map_err(|e| CredVaultError::SerializationError(format!("json: {e}"))),
        SecretsFormat::Env => Ok(secrets
            .iter()
            .map(|(k, v)| format!("{}={}\n", env_name(k), v))
            .collect()),
        SecretsFormat::Dotenv => Ok(secrets
            .iter()
            .map(|(k, v)| format!("{}=\"{}\"\n", env_name(k), escape_dotenv(v)))
            .collect()),
    }
}

/// `db.pass-word` -> `DB_PASS_WORD`
fn env_name(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '.' | '-' => '_',
            c => c.to_ascii_uppercase(),
        })
        .collect()
}

fn escape_dotenv(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secrets() -> BTreeMap<String, String> {
        let mut m = BTreeMap::new();
        m.insert("db.pass".to_string(), "p\"w".to_string());
        m.insert("api-key".to_string(), "abc".to_string());
        m
    }

    #[test]
    fn env_format_uppercases_names() {
        let out = render_secrets(&secrets(), SecretsFormat::Env).unwrap();
        assert_eq!(out, "API_KEY=abc\nDB_PASS=p\"w\n");
    }

    #[test]
    fn dotenv_format_quotes_values() {
        let out = render_secrets(&secrets(), SecretsFormat::Dotenv).unwrap();
        assert_eq!(out, "API_KEY=\"abc\"\nDB_PASS=\"p\\\"w\"\n");
    }

    #[test]
    fn json_format_is_sorted() {
        let out = render_secrets(&secrets(), SecretsFormat::Json).unwrap();
        assert!(out.find("api-key").unwrap() < out.find("db.pass").unwrap());
    }

    #[test]
    fn format_parsing() {
        assert_eq!("JSON".parse::<SecretsFormat>().unwrap(), SecretsFormat::Json);
        assert_eq!("dotenv".parse::<SecretsFormat>().unwrap(), SecretsFormat::Dotenv);
        assert!("yaml".parse::<SecretsFormat>().is_err());
    }
}
