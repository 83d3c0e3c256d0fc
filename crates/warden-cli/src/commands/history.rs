//! History command implementation.

use crate::cli::HistoryArgs;
use crate::error::Result;
use crate::output::Formatter;
use std::path::Path;
use warden_domain::traits::PunishmentStore;
use warden_store::SqliteStore;

/// Execute the history command.
pub async fn execute_history(args: HistoryArgs, store: &Path, formatter: &Formatter) -> Result<()> {
    let store = SqliteStore::new(store)?;
    let runs = store.list_runs(args.limit)?;
    println!("{}", formatter.format_runs(&runs)?);
    Ok(())
}
