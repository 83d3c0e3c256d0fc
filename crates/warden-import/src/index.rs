//! What the destination already holds for one source
//!
//! Built once from a snapshot of the destination when a job starts, then
//! brought up to date after every committed batch, so later batches see the
//! writes of earlier ones without reading the store again.

use crate::batch::WriteOp;
use crate::writer::OpOutcome;
use std::collections::HashMap;
use tracing::debug;
use warden_domain::{
    EntryId, NativeId, PortablePunishment, ProvenanceRecord, PunishmentEntry, SourceKind,
    UniquenessKey, UniquenessPolicy,
};

/// Provenance of one native record as last imported
#[derive(Debug, Clone, PartialEq)]
pub struct Imported {
    /// Entry the record resolved to
    pub entry_id: EntryId,
    /// The record as it was when imported
    pub punishment: PortablePunishment,
}

/// A destination entry as seen by the resolver
#[derive(Debug, Clone, PartialEq)]
pub struct IndexedEntry {
    /// Current content
    pub punishment: PortablePunishment,
    /// Native id whose details the entry currently holds, if from this source
    pub origin: Option<NativeId>,
}

/// Lookup tables over the destination state of one source
#[derive(Debug)]
pub struct ReconciliationIndex {
    source: SourceKind,
    policy: UniquenessPolicy,
    provenance: HashMap<NativeId, Imported>,
    entries: HashMap<EntryId, IndexedEntry>,
    by_key: HashMap<UniquenessKey, EntryId>,
    exact: HashMap<PortablePunishment, EntryId>,
    seen: HashMap<NativeId, usize>,
}

impl ReconciliationIndex {
    /// Index for a source with nothing imported yet
    pub fn empty(source: SourceKind, policy: UniquenessPolicy) -> Self {
        Self {
            source,
            policy,
            provenance: HashMap::new(),
            entries: HashMap::new(),
            by_key: HashMap::new(),
            exact: HashMap::new(),
            seen: HashMap::new(),
        }
    }

    /// Build from the destination's provenance and entries for `source`
    pub fn from_snapshot(
        source: SourceKind,
        policy: UniquenessPolicy,
        provenance: Vec<ProvenanceRecord>,
        entries: Vec<PunishmentEntry>,
    ) -> Self {
        let mut index = Self::empty(source, policy);
        for record in provenance.into_iter().filter(|r| r.source == source) {
            index.provenance.insert(
                record.native_id,
                Imported {
                    entry_id: record.entry_id,
                    punishment: record.imported,
                },
            );
        }
        for entry in entries {
            let origin = (entry.origin.source == source).then_some(entry.origin.native_id);
            index.set_entry(entry.id, entry.punishment, origin);
        }
        debug!(
            source = %source,
            provenance = index.provenance.len(),
            entries = index.entries.len(),
            "Built reconciliation index"
        );
        index
    }

    /// Source this index belongs to
    pub fn source(&self) -> SourceKind {
        self.source
    }

    /// Number of native records with provenance
    pub fn provenance_count(&self) -> usize {
        self.provenance.len()
    }

    /// Number of known entries
    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }

    /// Provenance of a native record
    pub fn imported(&self, native_id: &NativeId) -> Option<&Imported> {
        self.provenance.get(native_id)
    }

    /// Whether `native_id` was imported before with exactly this content
    pub fn is_unchanged(&self, native_id: &NativeId, punishment: &PortablePunishment) -> bool {
        self.imported(native_id)
            .is_some_and(|imported| &imported.punishment == punishment)
    }

    /// Native id to resolve a record under, unique within this run
    ///
    /// A source that emits the same id again (a name listed twice, say)
    /// gets the repeat renamed by occurrence, so every record has its own
    /// provenance and batch boundaries cannot change the outcome.
    pub fn distinct_native(&mut self, native_id: NativeId) -> NativeId {
        let count = self.seen.entry(native_id.clone()).or_insert(0);
        *count += 1;
        if *count == 1 {
            native_id
        } else {
            native_id.occurrence(*count)
        }
    }

    /// A known entry
    pub fn entry(&self, entry_id: EntryId) -> Option<&IndexedEntry> {
        self.entries.get(&entry_id)
    }

    /// Entry whose content equals `punishment`
    pub fn by_exact(&self, punishment: &PortablePunishment) -> Option<EntryId> {
        self.exact.get(punishment).copied()
    }

    /// Entry whose content shares the policy key
    pub fn by_key(&self, key: &UniquenessKey) -> Option<EntryId> {
        self.by_key.get(key).copied()
    }

    /// Fold a committed batch in
    ///
    /// `outcomes` holds one element per operation, in order.
    pub fn apply(&mut self, ops: &[WriteOp], outcomes: &[OpOutcome]) {
        for (op, outcome) in ops.iter().zip(outcomes) {
            let entry_id = outcome.entry_id();
            let (native_id, punishment) = op.primary();

            if matches!(outcome, OpOutcome::Inserted(_) | OpOutcome::Replaced(_)) {
                self.set_entry(entry_id, punishment.clone(), Some(native_id.clone()));
            }

            self.provenance.insert(
                native_id.clone(),
                Imported {
                    entry_id,
                    punishment: punishment.clone(),
                },
            );
            for absorbed in op.absorbed() {
                self.provenance.insert(
                    absorbed.native_id.clone(),
                    Imported {
                        entry_id,
                        punishment: absorbed.punishment.clone(),
                    },
                );
            }
        }
    }

    fn set_entry(&mut self, entry_id: EntryId, punishment: PortablePunishment, origin: Option<NativeId>) {
        if let Some(old) = self.entries.remove(&entry_id) {
            if let Some(key) = self.policy.key(&old.punishment) {
                if self.by_key.get(&key) == Some(&entry_id) {
                    self.by_key.remove(&key);
                }
            }
            if self.exact.get(&old.punishment) == Some(&entry_id) {
                self.exact.remove(&old.punishment);
            }
        }

        if let Some(key) = self.policy.key(&punishment) {
            self.by_key.insert(key, entry_id);
        }
        self.exact.insert(punishment.clone(), entry_id);
        self.entries.insert(entry_id, IndexedEntry { punishment, origin });
    }
}
