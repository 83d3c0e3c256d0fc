//! Import command implementation.

use crate::cli::{ImportArgs, PresetArg};
use crate::error::{CliError, Result};
use crate::output::Formatter;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::{info, warn};
use warden_domain::SourceKind;
use warden_import::{ConfigWatcher, ImportConfig, ImportJob, ImportReport};
use warden_sources::open_adapter;
use warden_store::SqliteStore;

/// Execute the import command.
pub async fn execute_import(
    args: ImportArgs,
    store: &Path,
    import_config: &Path,
    formatter: &Formatter,
) -> Result<()> {
    let source: SourceKind = args.source.into();
    println!(
        "{}",
        formatter.info(&format!("Importing {} from {}", source, args.path.display()))
    );

    let report = run_import(args, store, import_config).await?;
    println!("{}", formatter.format_report(&report)?);

    if report.is_completed() {
        Ok(())
    } else {
        Err(CliError::JobFailed(report.outcome.label()))
    }
}

/// Run one import job and return its report.
///
/// Ctrl-C cancels the job after the batch in progress; everything committed
/// before that stays in the store.
pub async fn run_import(args: ImportArgs, store: &Path, import_config: &Path) -> Result<ImportReport> {
    let config = Arc::new(job_config(&args, import_config)?);
    let resolver = config.resolution.build_resolver()?;
    let store = Arc::new(Mutex::new(SqliteStore::new(store)?));
    let adapter = open_adapter(args.source.into(), &args.path, resolver, config.page_size);

    let handle = ImportJob::new(store, config).spawn(adapter);
    let cancel = handle.cancel_handle();
    let signal = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, stopping after the current batch");
            cancel.cancel();
        }
    });

    let result = handle.wait().await;
    signal.abort();

    let report = result?;
    info!(
        accepted = report.accepted,
        replaced = report.replaced,
        rejected = report.rejected,
        failed = report.permanently_failed,
        "Import finished"
    );
    Ok(report)
}

/// The configuration file's settings with the command-line overrides applied.
fn job_config(args: &ImportArgs, path: &Path) -> Result<ImportConfig> {
    let watcher = ConfigWatcher::open(path)?;
    let mut config = (*watcher.snapshot()).clone();

    if let Some(preset) = args.preset {
        let sizes = match preset {
            PresetArg::Small => ImportConfig::small_batches(),
            PresetArg::Default => ImportConfig::default(),
            PresetArg::Bulk => ImportConfig::bulk(),
        };
        config.batch_size = sizes.batch_size;
        config.queue_capacity = sizes.queue_capacity;
        config.page_size = sizes.page_size;
    }
    if let Some(batch_size) = args.batch_size {
        config.batch_size = batch_size;
    }
    if args.no_retry {
        config.retry_failed_batches = false;
    }

    config.validate().map_err(CliError::InvalidInput)?;
    Ok(config)
}
