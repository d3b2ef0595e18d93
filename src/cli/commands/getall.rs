//! `credvault getall` — print every secret in json, env or dotenv form.

use crate::cli::output::{self, SecretsFormat};
use crate::cli::{parse_context, parse_version, Cli, Session};
use crate::errors::Result;
use crate::store::{FailurePolicy, GetAllOptions};

/// Arguments of the `getall` command.
pub struct GetAllArgs<'a> {
    pub context: &'a [String],
    pub version: Option<&'a str>,
    pub starts_with: Option<&'a str>,
    pub format: &'a str,
}

/// Execute the `getall` command.
pub fn execute(cli: &Cli, args: GetAllArgs<'_>) -> Result<()> {
    let format: SecretsFormat = args.format.parse()?;
    let session = Session::load(cli)?;

    let options = GetAllOptions {
        version: parse_version(args.version)?,
        context: parse_context(args.context)?,
        starts_with: args.starts_with.map(str::to_string),
        on_failure: if session.settings.skip_failures {
            FailurePolicy::Skip
        } else {
            FailurePolicy::Abort
        },
    };

    let store = session.open_store()?;
    let all = store.get_all_secrets(&options)?;

    session.audit(
        "getall",
        args.starts_with,
        options.version.as_ref(),
        Some(&format!("{} secret(s)", all.secrets.len())),
    );

    for skipped in &all.skipped {
        output::warning(&format!(
            "Skipped '{}' version {}: {}",
            skipped.name,
            skipped.version.value(),
            skipped.error
        ));
    }

    print!("{}", output::render_secrets(&all.secrets, format)?);
    if format == SecretsFormat::Json {
        println!();
    }

    Ok(())
}
