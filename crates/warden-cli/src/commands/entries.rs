//! Entries command implementation.

use crate::cli::EntriesArgs;
use crate::error::{CliError, Result};
use crate::output::Formatter;
use std::path::Path;
use warden_domain::traits::{EntryQuery, PunishmentStore};
use warden_store::SqliteStore;

/// Execute the entries command.
pub async fn execute_entries(args: EntriesArgs, store: &Path, formatter: &Formatter) -> Result<()> {
    let query = build_query(&args)?;
    let store = SqliteStore::new(store)?;
    let entries = store.list_entries(&query)?;

    println!("{}", formatter.format_entries(&entries)?);
    if entries.len() == args.limit {
        println!(
            "{}",
            formatter.info(&format!("Showing the first {} entries; use --limit for more", args.limit))
        );
    }
    Ok(())
}

fn build_query(args: &EntriesArgs) -> Result<EntryQuery> {
    let victim_uuid = args
        .victim
        .as_deref()
        .map(|v| {
            uuid::Uuid::parse_str(v).map_err(|e| CliError::InvalidInput(format!("Invalid victim UUID '{}': {}", v, e)))
        })
        .transpose()?;

    Ok(EntryQuery {
        kind: args.kind.map(Into::into),
        victim_uuid,
        source: args.source.map(Into::into),
        limit: Some(args.limit),
    })
}
