//! `credvault list` — display stored names and versions in a table.

use crate::cli::output;
use crate::cli::{Cli, Session};
use crate::errors::Result;

/// Execute the `list` command.
pub fn execute(cli: &Cli) -> Result<()> {
    let session = Session::load(cli)?;
    let store = session.open_store()?;

    let listings = store.list_secrets()?;

    output::info(&format!(
        "{} — {} record(s)",
        store.get_configuration().backend,
        listings.len()
    ));
    output::print_listing_table(&listings);

    Ok(())
}
