//! End-to-end runs of the import command against temporary files

use std::path::{Path, PathBuf};
use warden_cli::cli::{ImportArgs, SourceArg};
use warden_cli::commands::run_import;
use warden_domain::traits::PunishmentStore;
use warden_import::JobOutcome;
use warden_store::SqliteStore;

fn write_legacy_lists(dir: &Path) {
    std::fs::write(
        dir.join("banned-players.txt"),
        "# Updated 1/1/20 10:00 AM by Minecraft 1.6.4\n\
         # victim name | ban date | banned by | banned until | reason\n\
         \n\
         Griefer|2020-01-01 10:00:00 +0000|Server|Forever|lava\n",
    )
    .unwrap();
    std::fs::write(
        dir.join("banned-ips.txt"),
        "# victim name | ban date | banned by | banned until | reason\n\
         10.0.0.9|2020-01-02 10:00:00 +0000|Server|Forever|proxy\n",
    )
    .unwrap();
}

fn args(path: PathBuf) -> ImportArgs {
    ImportArgs {
        source: SourceArg::VanillaLegacy,
        path,
        preset: None,
        batch_size: Some(1),
        no_retry: false,
    }
}

#[tokio::test]
async fn test_import_then_rerun() {
    let dir = tempfile::tempdir().unwrap();
    let server = dir.path().join("server");
    std::fs::create_dir(&server).unwrap();
    write_legacy_lists(&server);
    let store = dir.path().join("warden.db");
    let config = dir.path().join("import.toml");

    let report = run_import(args(server.clone()), &store, &config).await.unwrap();
    assert_eq!(report.outcome, JobOutcome::Completed);
    assert_eq!(report.accepted, 2);
    assert_eq!(report.unresolved_identities.len(), 1);
    assert!(config.exists());

    let report = run_import(args(server), &store, &config).await.unwrap();
    assert_eq!(report.accepted, 0);
    assert_eq!(report.rejected, 2);
    assert!(report.unresolved_identities.is_empty());

    let store = SqliteStore::new(&store).unwrap();
    assert_eq!(store.entry_count().unwrap(), 2);
    assert_eq!(store.list_runs(10).unwrap().len(), 2);
}

#[tokio::test]
async fn test_missing_source_reports_failure() {
    let dir = tempfile::tempdir().unwrap();
    let report = run_import(
        args(dir.path().join("nowhere")),
        &dir.path().join("warden.db"),
        &dir.path().join("import.toml"),
    )
    .await
    .unwrap();

    assert!(matches!(report.outcome, JobOutcome::Failed(_)));
    assert_eq!(report.total(), 0);
}
