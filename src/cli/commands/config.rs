//! `credvault config` — show the settings in effect.

use console::style;

use crate::cli::{Cli, Session};
use crate::errors::Result;

/// Execute the `config` command.
///
/// Does not need the passphrase: only resolved settings are shown.
pub fn execute(cli: &Cli) -> Result<()> {
    let session = Session::load(cli)?;
    let s = &session.settings;

    let rows = [
        ("store_dir", session.store_dir().display().to_string()),
        ("database", s.db_path(&session.project_dir).display().to_string()),
        ("keyring", s.keyring_path(&session.project_dir).display().to_string()),
        ("table", s.table.clone()),
        ("key_id", s.key_id.clone()),
        ("digest", s.digest.to_string()),
        ("skip_failures", s.skip_failures.to_string()),
        (
            "argon2",
            format!(
                "m={} KiB, t={}, p={}",
                s.argon2_memory_kib, s.argon2_iterations, s.argon2_parallelism
            ),
        ),
    ];

    for (key, value) in rows {
        println!("{:>14}  {}", style(key).bold(), value);
    }

    Ok(())
}
