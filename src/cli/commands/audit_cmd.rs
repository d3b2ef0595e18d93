//! `credvault audit` — show which secret versions were written, read or removed.
//!
//! Usage:
//!   credvault audit                      # last 50 entries
//!   credvault audit db.pass              # history of one secret
//!   credvault audit --since 7d --last 20

use chrono::{Duration, Utc};
use comfy_table::{ContentArrangement, Table};
use console::style;

use crate::audit::{AuditEntry, AuditFilter, AuditLog};
use crate::cli::output;
use crate::cli::{Cli, Session};
use crate::errors::{CredVaultError, Result};

/// Execute the `audit` command.
pub fn execute(cli: &Cli, name: Option<&str>, last: usize, since: Option<Duration>) -> Result<()> {
    let session = Session::load(cli)?;
    let audit = AuditLog::open(&session.store_dir())
        .ok_or_else(|| CredVaultError::AuditError("failed to open audit database".into()))?;

    let since = since
        .map(|d| {
            Utc::now()
                .checked_sub_signed(d)
                .ok_or_else(|| CredVaultError::CommandFailed("--since reaches too far back".into()))
        })
        .transpose()?;

    let entries = audit.query(&AuditFilter {
        limit: last,
        since,
        name: name.map(str::to_owned),
    })?;

    match (entries.is_empty(), name) {
        (true, Some(name)) => output::info(&format!("No audit entries for '{name}'.")),
        (true, None) => output::info("No audit entries found."),
        (false, _) => print_audit_table(&entries),
    }

    Ok(())
}

/// `clap` value parser for `--since`: a count followed by `d`, `h` or `m`.
pub fn parse_since(input: &str) -> std::result::Result<Duration, String> {
    let input = input.trim();
    let Some(unit) = input.chars().last() else {
        return Err("empty duration; use e.g. 7d, 24h or 30m".into());
    };
    let amount: i64 = input[..input.len() - unit.len_utf8()]
        .parse()
        .map_err(|_| format!("'{input}' does not start with a whole number"))?;

    let duration = match unit {
        'd' => Duration::try_days(amount),
        'h' => Duration::try_hours(amount),
        'm' => Duration::try_minutes(amount),
        other => return Err(format!("unknown unit '{other}'; use d, h or m")),
    };
    duration.ok_or_else(|| format!("'{input}' is too long a duration"))
}

/// `db.pass@2`, `db.pass`, or `-` for store-wide operations.
fn secret_label(entry: &AuditEntry) -> String {
    match (&entry.name, entry.parsed_version()) {
        (Some(name), Some(version)) => format!("{name}@{}", version.value()),
        (Some(name), None) => name.clone(),
        (None, _) => "-".into(),
    }
}

fn print_audit_table(entries: &[AuditEntry]) {
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Time", "Operation", "Secret", "Details"]);

    for entry in entries {
        let op = match entry.operation.as_str() {
            "put" => style(&entry.operation).green(),
            "delete" => style(&entry.operation).red(),
            _ => style(&entry.operation).cyan(),
        };
        table.add_row(vec![
            entry.timestamp.format("%Y-%m-%d %H:%M:%S").to_string(),
            op.to_string(),
            secret_label(entry),
            entry.details.clone().unwrap_or_default(),
        ]);
    }

    println!("{}", style(format!("{} audit entries:", entries.len())).bold());
    println!("{table}");
}
