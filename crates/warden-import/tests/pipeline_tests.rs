//! End-to-end tests of import jobs against an in-memory store
//!
//! Each test builds a source from fixed records, runs a job and checks both
//! the report and what the store ends up holding.

mod common;

use common::{ban, config, import, player, punishment, MemoryStore, VecAdapter};
use proptest::prelude::*;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use warden_domain::{NativeId, Operator, PunishmentType, SourceKind, UniquenessPolicy, Victim};
use warden_import::{cancellation, FailureReason, ImportConfig, ImportError, ImportJob, JobOutcome};
use warden_sources::{SourceError, SourceItem, SourceRecord};

fn distinct_bans(prefix: &str, n: usize) -> Vec<SourceRecord> {
    (0..n)
        .map(|i| ban(&format!("{}:{}", prefix, i), player(100 + i as u128), "grief", 10 + i as i64))
        .collect()
}

// Later record (victim, operator, type) collides with an earlier one and
// overwrites its details

#[tokio::test]
async fn test_quirk_collapses_within_one_batch() {
    let store = MemoryStore::new().shared();
    let records = vec![
        ban("history:1", player(1), "spam", 100),
        ban("history:2", player(1), "spam again", 200),
    ];

    let report = import(&store, config(10), VecAdapter::new(SourceKind::AdvancedBan, records)).await;

    assert_eq!(report.outcome, JobOutcome::Completed);
    assert_eq!(report.accepted, 1);
    assert_eq!(report.replaced, 1);
    assert_eq!(report.rejected, 0);

    let store = store.lock().unwrap();
    let entries = store.entries();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].punishment.details.reason, "spam again");
    assert_eq!(entries[0].punishment.start(), 200);
    assert_eq!(entries[0].origin.native_id, NativeId::new("history:2"));

    let a = store.provenance(SourceKind::AdvancedBan, "history:1").unwrap();
    let b = store.provenance(SourceKind::AdvancedBan, "history:2").unwrap();
    assert_eq!(a.entry_id, entries[0].id);
    assert_eq!(b.entry_id, entries[0].id);
}

#[tokio::test]
async fn test_quirk_collapses_across_batches() {
    let store = MemoryStore::new().shared();
    let records = vec![
        ban("history:1", player(1), "spam", 100),
        ban("history:2", player(1), "spam again", 200),
    ];

    let report = import(&store, config(1), VecAdapter::new(SourceKind::AdvancedBan, records)).await;

    assert_eq!(report.accepted, 1);
    assert_eq!(report.replaced, 1);
    assert_eq!(report.batches_committed, 2);

    let entries = store.lock().unwrap().entries();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].punishment.details.reason, "spam again");
}

#[tokio::test]
async fn test_quirk_keeps_later_start_regardless_of_order() {
    let store = MemoryStore::new().shared();
    let records = vec![
        ban("history:1", player(1), "spam again", 200),
        ban("history:2", player(1), "spam", 100),
    ];

    let report = import(&store, config(10), VecAdapter::new(SourceKind::AdvancedBan, records)).await;

    assert_eq!(report.accepted, 1);
    assert_eq!(report.rejected, 1);

    let store = store.lock().unwrap();
    let entries = store.entries();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].punishment.start(), 200);
    // The loser still resolves to the entry on later runs
    assert!(store.provenance(SourceKind::AdvancedBan, "history:2").is_some());
}

#[tokio::test]
async fn test_different_operators_stay_separate_under_quirk() {
    let store = MemoryStore::new().shared();
    let mut by_mod = ban("history:2", player(1), "spam", 100);
    by_mod.punishment.operator = Operator::Player(uuid::Uuid::from_u128(50));
    let records = vec![ban("history:1", player(1), "spam", 100), by_mod];

    let report = import(&store, config(10), VecAdapter::new(SourceKind::AdvancedBan, records)).await;

    assert_eq!(report.accepted, 2);
    assert_eq!(store.lock().unwrap().entries().len(), 2);
}

#[tokio::test]
async fn test_unresolved_victim_is_imported_with_placeholder() {
    let store = MemoryStore::new().shared();
    let records = vec![ban("player:steve", Victim::UnresolvedName("Steve".into()), "grief", 50)];

    let report = import(&store, config(10), VecAdapter::new(SourceKind::Vanilla, records)).await;

    assert_eq!(report.accepted, 1);
    assert_eq!(report.unresolved_identities, vec![NativeId::new("player:steve")]);

    let entries = store.lock().unwrap().entries();
    assert_eq!(entries[0].punishment.victim, Victim::UnresolvedName("Steve".into()));
}

#[tokio::test]
async fn test_placeholder_is_reported_once() {
    let store = MemoryStore::new().shared();
    let records = vec![
        ban("player:steve", Victim::UnresolvedName("Steve".into()), "grief", 50),
        ban("player:alex", Victim::UnresolvedName("Alex".into()), "grief", 40),
        ban("player:alex2", Victim::UnresolvedName("Alex".into()), "grief again", 60),
    ];

    let first = import(&store, config(10), VecAdapter::new(SourceKind::Vanilla, records.clone())).await;
    // Alex's first ban was overwritten, only the entries' records count
    assert_eq!(
        first.unresolved_identities,
        vec![NativeId::new("player:steve"), NativeId::new("player:alex2")]
    );

    let second = import(&store, config(10), VecAdapter::new(SourceKind::Vanilla, records)).await;
    assert_eq!(second.rejected, 3);
    assert!(second.unresolved_identities.is_empty());
}

#[tokio::test]
async fn test_repeated_native_id_is_batch_size_independent() {
    let records = || {
        vec![
            ban("player:steve", Victim::UnresolvedName("Steve".into()), "first", 100),
            ban("player:steve", Victim::UnresolvedName("Steve".into()), "second", 200),
        ]
    };

    for batch_size in [100, 1] {
        let store = MemoryStore::new().shared();
        let report = import(&store, config(batch_size), VecAdapter::new(SourceKind::VanillaLegacy, records())).await;

        assert_eq!(report.accepted, 1, "batch size {}", batch_size);
        assert_eq!(report.replaced, 1, "batch size {}", batch_size);
        let entries = store.lock().unwrap().entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].punishment.details.reason, "second");
        assert_eq!(entries[0].origin.native_id, NativeId::new("player:steve#2"));
        assert!(store.lock().unwrap().provenance(SourceKind::VanillaLegacy, "player:steve").is_some());

        let rerun = import(&store, config(batch_size), VecAdapter::new(SourceKind::VanillaLegacy, records())).await;
        assert_eq!(rerun.accepted, 0);
        assert_eq!(rerun.replaced, 0);
        assert_eq!(rerun.rejected, 2);
        assert_eq!(store.lock().unwrap().entries(), entries);
    }
}

#[tokio::test]
async fn test_repeated_native_id_with_earlier_start_loses() {
    let store = MemoryStore::new().shared();
    let records = vec![
        ban("player:1", player(1), "later", 300),
        ban("player:1", player(1), "earlier", 100),
    ];

    let report = import(&store, config(10), VecAdapter::new(SourceKind::Vanilla, records)).await;

    assert_eq!(report.accepted, 1);
    assert_eq!(report.rejected, 1);
    let entries = store.lock().unwrap().entries();
    assert_eq!(entries[0].punishment.details.reason, "later");
}

#[tokio::test]
async fn test_second_run_changes_nothing() {
    let store = MemoryStore::new().shared();
    let records = vec![
        ban("history:1", player(1), "spam", 100),
        ban("history:2", player(1), "spam again", 200),
        ban("history:3", player(2), "hacks", 150),
    ];

    let first = import(&store, config(2), VecAdapter::new(SourceKind::AdvancedBan, records.clone())).await;
    assert_eq!(first.total(), 3);
    let entries_before = store.lock().unwrap().entries();
    let commits_before = store.lock().unwrap().commits();

    let second = import(&store, config(2), VecAdapter::new(SourceKind::AdvancedBan, records)).await;

    assert_eq!(second.accepted, 0);
    assert_eq!(second.replaced, 0);
    assert_eq!(second.rejected, 3);
    assert_eq!(second.batches_committed, 0);

    let store = store.lock().unwrap();
    assert_eq!(store.entries(), entries_before);
    assert_eq!(store.commits(), commits_before);
}

#[tokio::test]
async fn test_edited_record_replaces_its_own_entry() {
    let store = MemoryStore::new().shared();
    let original = vec![
        ban("bans:1", player(1), "spam", 100),
        ban("bans:2", player(2), "hacks", 100),
    ];
    import(&store, config(10), VecAdapter::new(SourceKind::LiteBans, original)).await;

    let edited = vec![
        ban("bans:1", player(1), "spam (appealed, shortened)", 100),
        ban("bans:2", player(2), "hacks", 100),
    ];
    let report = import(&store, config(10), VecAdapter::new(SourceKind::LiteBans, edited)).await;

    assert_eq!(report.accepted, 0);
    assert_eq!(report.replaced, 1);
    assert_eq!(report.rejected, 1);

    let store = store.lock().unwrap();
    let entries = store.entries();
    assert_eq!(entries.len(), 2);
    assert!(entries
        .iter()
        .any(|e| e.punishment.details.reason == "spam (appealed, shortened)"));
    let provenance = store.provenance(SourceKind::LiteBans, "bans:1").unwrap();
    assert_eq!(provenance.imported.details.reason, "spam (appealed, shortened)");
}

#[tokio::test]
async fn test_exact_policy_keeps_concurrent_punishments() {
    let store = MemoryStore::new().shared();
    let mute = |native: &str, reason: &str| {
        SourceRecord::new(
            NativeId::new(native),
            punishment(PunishmentType::Mute, player(1), Operator::Console, reason, 100),
        )
    };
    let records = vec![mute("mutes:1", "caps"), mute("mutes:2", "spam"), mute("mutes:3", "caps")];

    let report = import(&store, config(10), VecAdapter::new(SourceKind::LiteBans, records)).await;

    assert_eq!(report.accepted, 2);
    assert_eq!(report.rejected, 1);

    let store = store.lock().unwrap();
    assert_eq!(store.entries().len(), 2);
    assert_eq!(store.provenance_count(), 3);
}

#[tokio::test]
async fn test_vanilla_keeps_one_ban_per_victim() {
    let store = MemoryStore::new().shared();
    let mut by_console = ban("player:1", player(1), "old", 100);
    by_console.punishment.operator = Operator::Unknown;
    let records = vec![by_console, ban("player:2", player(1), "new", 300)];

    let report = import(&store, config(10), VecAdapter::new(SourceKind::Vanilla, records)).await;

    assert_eq!(report.accepted, 1);
    assert_eq!(report.replaced, 1);
    let entries = store.lock().unwrap().entries();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].punishment.details.reason, "new");
}

#[tokio::test]
async fn test_allow_concurrent_vanilla_variant_keeps_both() {
    let store = MemoryStore::new().shared();
    let records = vec![
        ban("player:1", player(1), "old", 100),
        ban("player:2", player(1), "new", 300),
    ];
    let adapter = VecAdapter::new(SourceKind::Vanilla, records)
        .with_policy(UniquenessPolicy::VictimAndKind { allow_concurrent: true });

    let report = import(&store, config(10), adapter).await;

    assert_eq!(report.accepted, 2);
    assert_eq!(store.lock().unwrap().entries().len(), 2);
}

#[tokio::test]
async fn test_failed_batch_is_contained() {
    let store = MemoryStore::new().fail_writes_of("poison").shared();
    let mut records = distinct_bans("bans", 6);
    records[2].punishment.details.reason = "poison".to_string();

    let report = import(&store, config(2), VecAdapter::new(SourceKind::LiteBans, records)).await;

    assert_eq!(report.outcome, JobOutcome::Completed);
    assert_eq!(report.accepted, 4);
    assert_eq!(report.permanently_failed, 2);
    assert_eq!(report.batches_committed, 2);
    assert_eq!(report.total(), 6);

    let failed: Vec<_> = report.failures.iter().map(|f| f.native_id.as_str()).collect();
    assert_eq!(failed, vec!["bans:2", "bans:3"]);
    assert!(report.failures[0].error.contains("injected failure"));

    let store = store.lock().unwrap();
    assert_eq!(store.entries().len(), 4);
    // The failed batch left nothing behind, not even its healthy record
    assert!(store.provenance(SourceKind::LiteBans, "bans:3").is_none());
    assert!(store.provenance(SourceKind::LiteBans, "bans:4").is_some());
}

#[tokio::test]
async fn test_failed_records_are_retried_on_next_run() {
    let store = MemoryStore::new().fail_writes_of_times("flaky", 2).shared();
    let mut records = distinct_bans("bans", 2);
    records[1].punishment.details.reason = "flaky".to_string();

    let first = import(&store, config(10), VecAdapter::new(SourceKind::LiteBans, records.clone())).await;
    assert_eq!(first.permanently_failed, 2);

    let second = import(&store, config(10), VecAdapter::new(SourceKind::LiteBans, records)).await;
    assert_eq!(second.accepted, 2);
    assert_eq!(second.permanently_failed, 0);
}

#[tokio::test]
async fn test_retry_recovers_transient_failure() {
    let store = MemoryStore::new().fail_writes_of_times("flaky", 1).shared();
    let mut records = distinct_bans("bans", 4);
    records[1].punishment.details.reason = "flaky".to_string();

    let report = import(&store, config(2), VecAdapter::new(SourceKind::LiteBans, records)).await;

    assert_eq!(report.accepted, 4);
    assert_eq!(report.permanently_failed, 0);
    assert!(report.failures.is_empty());
    assert_eq!(store.lock().unwrap().commits(), 2);
}

#[tokio::test]
async fn test_retry_can_be_disabled() {
    let store = MemoryStore::new().fail_writes_of_times("flaky", 1).shared();
    let mut records = distinct_bans("bans", 4);
    records[1].punishment.details.reason = "flaky".to_string();
    let config = Arc::new(ImportConfig {
        batch_size: 2,
        retry_failed_batches: false,
        ..ImportConfig::default()
    });

    let report = import(&store, config, VecAdapter::new(SourceKind::LiteBans, records)).await;

    assert_eq!(report.accepted, 2);
    assert_eq!(report.permanently_failed, 2);
}

#[tokio::test]
async fn test_malformed_records_are_skipped() {
    let store = MemoryStore::new().shared();
    let items = vec![
        Ok(SourceItem::Record(ban("bans:1", player(1), "a", 1))),
        Ok(SourceItem::malformed(Some(NativeId::new("bans:2")), "bad uuid")),
        Ok(SourceItem::Record(ban("bans:3", player(3), "c", 3))),
    ];

    let report = import(&store, config(10), VecAdapter::from_items(SourceKind::LiteBans, items)).await;

    assert_eq!(report.outcome, JobOutcome::Completed);
    assert_eq!(report.malformed, 1);
    assert_eq!(report.accepted, 2);
    assert_eq!(report.total(), 2);
}

#[tokio::test]
async fn test_source_failure_keeps_committed_progress() {
    let store = MemoryStore::new().shared();
    let items = vec![
        Ok(SourceItem::Record(ban("bans:1", player(1), "a", 1))),
        Ok(SourceItem::Record(ban("bans:2", player(2), "b", 2))),
        Ok(SourceItem::Record(ban("bans:3", player(3), "c", 3))),
        Err(SourceError::Interrupted("connection reset".into())),
        Ok(SourceItem::Record(ban("bans:4", player(4), "d", 4))),
    ];

    let report = import(&store, config(2), VecAdapter::from_items(SourceKind::LiteBans, items)).await;

    match &report.outcome {
        JobOutcome::Failed(FailureReason::Source(message)) => assert!(message.contains("connection reset")),
        other => panic!("unexpected outcome {:?}", other),
    }
    // The partial batch read before the failure is still committed
    assert_eq!(report.accepted, 3);
    assert_eq!(store.lock().unwrap().entries().len(), 3);
}

#[tokio::test]
async fn test_cancel_before_start() {
    let store = MemoryStore::new().shared();
    let (cancel, token) = cancellation();
    cancel.cancel();

    let report = ImportJob::new(Arc::clone(&store), config(2))
        .run(VecAdapter::new(SourceKind::LiteBans, distinct_bans("bans", 4)).boxed(), token)
        .await
        .unwrap();

    assert_eq!(report.outcome, JobOutcome::Failed(FailureReason::Cancelled));
    assert_eq!(report.total(), 0);
    assert!(store.lock().unwrap().entries().is_empty());
}

#[tokio::test]
async fn test_cancel_between_batches_keeps_committed() {
    let (cancel, token) = cancellation();
    let store = MemoryStore::new()
        .on_commit(move |commits| {
            if commits == 1 {
                cancel.cancel();
            }
        })
        .shared();

    let report = ImportJob::new(Arc::clone(&store), config(2))
        .run(VecAdapter::new(SourceKind::LiteBans, distinct_bans("bans", 6)).boxed(), token)
        .await
        .unwrap();

    assert_eq!(report.outcome, JobOutcome::Failed(FailureReason::Cancelled));
    assert_eq!(report.accepted, 2);
    assert_eq!(report.batches_committed, 1);

    let store = store.lock().unwrap();
    assert_eq!(store.entries().len(), 2);
    assert_eq!(store.runs()[0].outcome, "failed: cancelled");
}

#[tokio::test]
async fn test_unreadable_destination_fails_to_start() {
    let store = MemoryStore::new().fail_reads().shared();
    let (_cancel, token) = cancellation();

    let result = ImportJob::new(store, config(2))
        .run(VecAdapter::new(SourceKind::LiteBans, distinct_bans("bans", 1)).boxed(), token)
        .await;

    assert!(matches!(result, Err(ImportError::Store(_))));
}

#[tokio::test]
async fn test_run_is_recorded() {
    let store = MemoryStore::new().shared();
    let report = import(&store, config(3), VecAdapter::new(SourceKind::LiteBans, distinct_bans("bans", 5))).await;

    let store = store.lock().unwrap();
    let runs = store.runs();
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0].source, SourceKind::LiteBans);
    assert_eq!(runs[0].outcome, "completed");
    assert_eq!(runs[0].accepted, report.accepted);
    assert!(runs[0].finished_at >= runs[0].started_at);
}

#[tokio::test]
async fn test_spawned_job_reports_through_handle() {
    let store = MemoryStore::new().shared();
    let handle = ImportJob::new(Arc::clone(&store), config(4))
        .spawn(VecAdapter::new(SourceKind::LiteBans, distinct_bans("bans", 10)).boxed());

    let report = handle.wait().await.unwrap();

    assert!(report.is_completed());
    assert_eq!(report.accepted, 10);
    assert_eq!(report.batches_committed, 3);
}

#[tokio::test]
async fn test_jobs_for_different_sources_share_a_store() {
    let store = MemoryStore::new().shared();
    let litebans = ImportJob::new(Arc::clone(&store), config(3))
        .spawn(VecAdapter::new(SourceKind::LiteBans, distinct_bans("bans", 9)).boxed());
    let advancedban = ImportJob::new(Arc::clone(&store), config(3))
        .spawn(VecAdapter::new(SourceKind::AdvancedBan, distinct_bans("history", 9)).boxed());

    let (a, b) = (litebans.wait().await.unwrap(), advancedban.wait().await.unwrap());

    // Each source deduplicates only against itself
    assert_eq!(a.accepted, 9);
    assert_eq!(b.accepted, 9);
    assert_eq!(store.lock().unwrap().entries().len(), 18);
}

fn build_records(specs: &[(u8, u8, u8, i64, u8)]) -> Vec<SourceRecord> {
    specs
        .iter()
        .enumerate()
        .map(|(i, (victim, operator, kind, start, reason))| {
            let operator = match operator {
                0 => Operator::Console,
                n => Operator::Player(uuid::Uuid::from_u128(1000 + *n as u128)),
            };
            let kind = if *kind == 0 { PunishmentType::Ban } else { PunishmentType::Mute };
            SourceRecord::new(
                NativeId::row("rows", i as i64),
                punishment(kind, player(*victim as u128), operator, &format!("r{}", reason), *start),
            )
        })
        .collect()
}

fn source_strategy() -> impl Strategy<Value = SourceKind> {
    prop_oneof![
        Just(SourceKind::AdvancedBan),
        Just(SourceKind::LiteBans),
        Just(SourceKind::Vanilla),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_every_record_is_accounted_for_and_reruns_are_noops(
        specs in prop::collection::vec((0u8..3, 0u8..2, 0u8..2, 0i64..4, 0u8..2), 0..30),
        batch_size in 1usize..6,
        source in source_strategy(),
    ) {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let records = build_records(&specs);
        let policy = source.policy();
        let store = MemoryStore::new().shared();

        let first = runtime.block_on(import(&store, config(batch_size), VecAdapter::new(source, records.clone())));
        prop_assert_eq!(first.total(), records.len());
        prop_assert_eq!(first.permanently_failed, 0);

        let entries = store.lock().unwrap().entries();
        prop_assert_eq!(entries.len(), first.accepted);

        // One entry per distinct punishment under the policy
        let keys: HashSet<_> = records.iter().filter_map(|r| policy.key(&r.punishment)).collect();
        let values: HashSet<_> = records.iter().map(|r| &r.punishment).collect();
        let expected = if keys.is_empty() { values.len() } else { keys.len() };
        prop_assert_eq!(entries.len(), expected);

        // Under a key, the surviving details carry the latest start
        let mut latest = HashMap::new();
        for r in &records {
            if let Some(key) = policy.key(&r.punishment) {
                let start = latest.entry(key).or_insert(i64::MIN);
                *start = (*start).max(r.punishment.start());
            }
        }
        for entry in &entries {
            if let Some(key) = policy.key(&entry.punishment) {
                prop_assert_eq!(latest.get(&key).copied(), Some(entry.punishment.start()));
            }
        }

        let second = runtime.block_on(import(&store, config(batch_size), VecAdapter::new(source, records.clone())));
        prop_assert_eq!(second.accepted, 0);
        prop_assert_eq!(second.replaced, 0);
        prop_assert_eq!(second.rejected, records.len());
        prop_assert_eq!(store.lock().unwrap().entries(), entries);
    }
}

/// Native ids drawn from a small pool, so lists hand-edited into repeating
/// an id are covered
fn build_records_with_repeats(specs: &[(u8, u8, i64, u8)]) -> Vec<SourceRecord> {
    specs
        .iter()
        .map(|(native, victim, start, reason)| {
            SourceRecord::new(
                NativeId::new(format!("player:{}", native)),
                punishment(PunishmentType::Ban, player(*victim as u128), Operator::Console, &format!("r{}", reason), *start),
            )
        })
        .collect()
}

fn contents(entries: &[warden_domain::PunishmentEntry]) -> HashMap<(warden_domain::PortablePunishment, NativeId), usize> {
    let mut counts = HashMap::new();
    for entry in entries {
        *counts
            .entry((entry.punishment.clone(), entry.origin.native_id.clone()))
            .or_insert(0) += 1;
    }
    counts
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_repeated_native_ids_do_not_depend_on_batch_size(
        specs in prop::collection::vec((0u8..3, 0u8..3, 0i64..4, 0u8..3), 0..25),
        source in prop_oneof![Just(SourceKind::Vanilla), Just(SourceKind::VanillaLegacy), Just(SourceKind::LiteBans)],
    ) {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let records = build_records_with_repeats(&specs);

        let one_by_one = MemoryStore::new().shared();
        let all_at_once = MemoryStore::new().shared();
        let small = runtime.block_on(import(&one_by_one, config(1), VecAdapter::new(source, records.clone())));
        let large = runtime.block_on(import(&all_at_once, config(64), VecAdapter::new(source, records.clone())));

        prop_assert_eq!(small.total(), records.len());
        prop_assert_eq!(small.accepted, large.accepted);
        prop_assert_eq!(small.replaced, large.replaced);
        prop_assert_eq!(small.rejected, large.rejected);
        let entries = one_by_one.lock().unwrap().entries();
        prop_assert_eq!(contents(&entries), contents(&all_at_once.lock().unwrap().entries()));

        for (store, batch_size) in [(&one_by_one, 1), (&all_at_once, 64)] {
            let before = store.lock().unwrap().entries();
            let rerun = runtime.block_on(import(store, config(batch_size), VecAdapter::new(source, records.clone())));
            prop_assert_eq!(rerun.accepted, 0);
            prop_assert_eq!(rerun.replaced, 0);
            prop_assert_eq!(rerun.rejected, records.len());
            prop_assert_eq!(store.lock().unwrap().entries(), before);
        }
    }
}
