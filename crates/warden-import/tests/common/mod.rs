//! Shared fixtures for import pipeline tests

#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};
use uuid::Uuid;
use warden_domain::traits::{EntryQuery, PunishmentStore, StoreTransaction};
use warden_domain::{
    EntryId, Expiration, KnownDetails, NativeId, Operator, Origin, PortablePunishment,
    ProvenanceRecord, PunishmentEntry, PunishmentType, RunSummary, SourceKind, UniquenessPolicy,
    Victim,
};
use warden_import::{cancellation, ImportConfig, ImportJob, ImportReport};
use warden_sources::{stop_at_first_error, RecordStream, SourceAdapter, SourceError, SourceItem, SourceRecord};

#[derive(Debug, Clone, Default)]
struct Data {
    entries: BTreeMap<EntryId, PunishmentEntry>,
    provenance: HashMap<(SourceKind, NativeId), ProvenanceRecord>,
    next_id: u128,
}

/// Writes touching a punishment with this reason fail
struct Fault {
    reason: String,
    remaining: Option<usize>,
}

/// In-memory store with transactional staging and injectable write failures
#[derive(Default)]
pub struct MemoryStore {
    data: Data,
    faults: Vec<Fault>,
    fail_reads: bool,
    commits: usize,
    runs: Vec<RunSummary>,
    on_commit: Option<Box<dyn FnMut(usize) + Send>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every write of a punishment with `reason` fails
    pub fn fail_writes_of(mut self, reason: &str) -> Self {
        self.faults.push(Fault {
            reason: reason.to_string(),
            remaining: None,
        });
        self
    }

    /// The next `times` writes of a punishment with `reason` fail
    pub fn fail_writes_of_times(mut self, reason: &str, times: usize) -> Self {
        self.faults.push(Fault {
            reason: reason.to_string(),
            remaining: Some(times),
        });
        self
    }

    /// Snapshot reads fail
    pub fn fail_reads(mut self) -> Self {
        self.fail_reads = true;
        self
    }

    /// Called with the commit count after every commit
    pub fn on_commit(mut self, hook: impl FnMut(usize) + Send + 'static) -> Self {
        self.on_commit = Some(Box::new(hook));
        self
    }

    pub fn shared(self) -> Arc<Mutex<Self>> {
        Arc::new(Mutex::new(self))
    }

    pub fn commits(&self) -> usize {
        self.commits
    }

    pub fn entries(&self) -> Vec<PunishmentEntry> {
        self.data.entries.values().cloned().collect()
    }

    pub fn provenance(&self, source: SourceKind, native_id: &str) -> Option<ProvenanceRecord> {
        self.data.provenance.get(&(source, NativeId::new(native_id))).cloned()
    }

    pub fn provenance_count(&self) -> usize {
        self.data.provenance.len()
    }

    pub fn runs(&self) -> &[RunSummary] {
        &self.runs
    }

    fn check_fault(&mut self, punishment: &PortablePunishment) -> Result<(), String> {
        for fault in &mut self.faults {
            if fault.reason != punishment.details.reason {
                continue;
            }
            match &mut fault.remaining {
                None => return Err(format!("injected failure for {:?}", fault.reason)),
                Some(0) => {}
                Some(n) => {
                    *n -= 1;
                    return Err(format!("injected failure for {:?}", fault.reason));
                }
            }
        }
        Ok(())
    }
}

pub struct MemoryTransaction<'a> {
    staged: Data,
    store: &'a mut MemoryStore,
}

impl StoreTransaction for MemoryTransaction<'_> {
    type Error = String;

    fn lookup_provenance(
        &self,
        source: SourceKind,
        native_id: &NativeId,
    ) -> Result<Option<ProvenanceRecord>, String> {
        Ok(self.staged.provenance.get(&(source, native_id.clone())).cloned())
    }

    fn insert(&mut self, punishment: &PortablePunishment, origin: &Origin) -> Result<EntryId, String> {
        self.store.check_fault(punishment)?;
        self.staged.next_id += 1;
        let id = EntryId::from_value(self.staged.next_id);
        self.staged.entries.insert(
            id,
            PunishmentEntry {
                id,
                punishment: punishment.clone(),
                origin: origin.clone(),
                updated_at: 0,
            },
        );
        Ok(id)
    }

    fn replace(&mut self, id: EntryId, punishment: &PortablePunishment, origin: &Origin) -> Result<(), String> {
        self.store.check_fault(punishment)?;
        let entry = self
            .staged
            .entries
            .get_mut(&id)
            .ok_or_else(|| format!("no entry {}", id.value()))?;
        entry.punishment = punishment.clone();
        entry.origin = origin.clone();
        Ok(())
    }

    fn record_provenance(&mut self, record: &ProvenanceRecord) -> Result<(), String> {
        self.staged
            .provenance
            .insert((record.source, record.native_id.clone()), record.clone());
        Ok(())
    }

    fn commit(self) -> Result<(), String> {
        let MemoryTransaction { staged, store } = self;
        store.data = staged;
        store.commits += 1;
        let commits = store.commits;
        if let Some(hook) = store.on_commit.as_mut() {
            hook(commits);
        }
        Ok(())
    }
}

impl PunishmentStore for MemoryStore {
    type Error = String;
    type Transaction<'a> = MemoryTransaction<'a>;

    fn begin(&mut self) -> Result<MemoryTransaction<'_>, String> {
        Ok(MemoryTransaction {
            staged: self.data.clone(),
            store: self,
        })
    }

    fn get_entry(&self, id: EntryId) -> Result<Option<PunishmentEntry>, String> {
        Ok(self.data.entries.get(&id).cloned())
    }

    fn list_entries(&self, query: &EntryQuery) -> Result<Vec<PunishmentEntry>, String> {
        let entries = self
            .data
            .entries
            .values()
            .filter(|e| query.kind.map_or(true, |k| e.punishment.kind() == k))
            .filter(|e| query.victim_uuid.map_or(true, |u| e.punishment.victim.uuid() == Some(u)))
            .filter(|e| query.source.map_or(true, |s| e.origin.source == s))
            .take(query.limit.unwrap_or(usize::MAX))
            .cloned()
            .collect();
        Ok(entries)
    }

    fn entry_count(&self) -> Result<usize, String> {
        Ok(self.data.entries.len())
    }

    fn provenance_for_source(&self, source: SourceKind) -> Result<Vec<ProvenanceRecord>, String> {
        if self.fail_reads {
            return Err("injected read failure".to_string());
        }
        Ok(self
            .data
            .provenance
            .values()
            .filter(|p| p.source == source)
            .cloned()
            .collect())
    }

    fn entries_for_source(&self, source: SourceKind) -> Result<Vec<PunishmentEntry>, String> {
        if self.fail_reads {
            return Err("injected read failure".to_string());
        }
        Ok(self
            .data
            .entries
            .values()
            .filter(|e| {
                self.data
                    .provenance
                    .values()
                    .any(|p| p.source == source && p.entry_id == e.id)
            })
            .cloned()
            .collect())
    }

    fn record_run(&mut self, run: &RunSummary) -> Result<(), String> {
        self.runs.push(run.clone());
        Ok(())
    }

    fn list_runs(&self, limit: usize) -> Result<Vec<RunSummary>, String> {
        Ok(self.runs.iter().rev().take(limit).cloned().collect())
    }
}

/// Adapter over a fixed list of items
pub struct VecAdapter {
    kind: SourceKind,
    policy: Option<UniquenessPolicy>,
    items: Vec<Result<SourceItem, SourceError>>,
}

impl VecAdapter {
    pub fn new(kind: SourceKind, records: Vec<SourceRecord>) -> Self {
        Self::from_items(kind, records.into_iter().map(|r| Ok(SourceItem::Record(r))).collect())
    }

    pub fn from_items(kind: SourceKind, items: Vec<Result<SourceItem, SourceError>>) -> Self {
        Self {
            kind,
            policy: None,
            items,
        }
    }

    pub fn with_policy(mut self, policy: UniquenessPolicy) -> Self {
        self.policy = Some(policy);
        self
    }

    pub fn boxed(self) -> Box<dyn SourceAdapter> {
        Box::new(self)
    }
}

impl SourceAdapter for VecAdapter {
    fn kind(&self) -> SourceKind {
        self.kind
    }

    fn policy(&self) -> UniquenessPolicy {
        self.policy.unwrap_or_else(|| self.kind.policy())
    }

    fn into_stream(self: Box<Self>) -> Result<RecordStream, SourceError> {
        Ok(stop_at_first_error(self.items.into_iter()))
    }
}

pub fn player(n: u128) -> Victim {
    Victim::Player(Uuid::from_u128(n))
}

pub fn punishment(kind: PunishmentType, victim: Victim, operator: Operator, reason: &str, start: i64) -> PortablePunishment {
    PortablePunishment::new(KnownDetails::new(kind, reason, start, Expiration::Permanent), victim, operator)
}

/// A console ban on `victim`
pub fn ban(native: &str, victim: Victim, reason: &str, start: i64) -> SourceRecord {
    SourceRecord::new(
        NativeId::new(native),
        punishment(PunishmentType::Ban, victim, Operator::Console, reason, start),
    )
}

pub fn config(batch_size: usize) -> Arc<ImportConfig> {
    Arc::new(ImportConfig {
        batch_size,
        queue_capacity: 4,
        ..ImportConfig::default()
    })
}

/// Run one job to its end
pub async fn import(store: &Arc<Mutex<MemoryStore>>, config: Arc<ImportConfig>, adapter: VecAdapter) -> ImportReport {
    let (_cancel, token) = cancellation();
    ImportJob::new(Arc::clone(store), config)
        .run(adapter.boxed(), token)
        .await
        .expect("job should start")
}
