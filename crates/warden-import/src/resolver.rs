//! Uniqueness resolution
//!
//! Decides, for one incoming record, whether it is new, a duplicate of
//! something already known, or a newer version of it. Source-specific
//! behavior comes only from the [`UniquenessPolicy`]; nothing here looks at
//! which source a record came from.

use crate::batch::PendingBatch;
use crate::index::ReconciliationIndex;
use warden_domain::{EntryId, PortablePunishment, UniquenessPolicy};
use warden_sources::SourceRecord;

/// A record the candidate was matched against
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Existing {
    /// An operation of the batch being built
    Pending(usize),

    /// A committed destination entry
    Entry(EntryId),
}

/// Outcome of resolving one candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// New punishment
    Accept,

    /// Same punishment as `existing`, which stays as it is
    RejectAsDuplicate(Existing),

    /// Same punishment as `existing`, whose details the candidate overwrites
    ReplaceExisting(Existing),
}

/// Resolve `candidate` against the current batch and the destination
///
/// In order: provenance from an earlier import; structural equality; the
/// policy key. A destination entry the batch is already rewriting is only
/// matched through the batch. Native ids must be unique within a run (see
/// [`ReconciliationIndex::distinct_native`]).
pub fn resolve(
    candidate: &SourceRecord,
    policy: UniquenessPolicy,
    pending: &PendingBatch,
    index: &ReconciliationIndex,
) -> Resolution {
    let record = &candidate.punishment;

    if let Some(imported) = index.imported(&candidate.native_id) {
        let entry_id = imported.entry_id;
        if &imported.punishment == record {
            return Resolution::RejectAsDuplicate(Existing::Entry(entry_id));
        }
        if let Some(op) = pending.for_entry(entry_id) {
            return against_pending(record, pending, op);
        }
        if let Some(entry) = index.entry(entry_id) {
            if entry.origin.as_ref() == Some(&candidate.native_id) {
                // The legacy system edited a record that still owns its entry
                return Resolution::ReplaceExisting(Existing::Entry(entry_id));
            }
            if policy.collides(record, &entry.punishment) {
                return tie_break(record, &entry.punishment, Existing::Entry(entry_id));
            }
        }
        // Edited out of its old entry's identity, or provenance without a
        // known entry: resolve as a fresh record
    }

    if let Some(op) = pending.by_exact(record) {
        return Resolution::RejectAsDuplicate(Existing::Pending(op));
    }
    if let Some(entry_id) = index.by_exact(record).filter(|id| pending.for_entry(*id).is_none()) {
        return Resolution::RejectAsDuplicate(Existing::Entry(entry_id));
    }

    if let Some(key) = policy.key(record) {
        if let Some(op) = pending.by_key(&key) {
            return against_pending(record, pending, op);
        }
        if let Some(entry_id) = index.by_key(&key).filter(|id| pending.for_entry(*id).is_none()) {
            if let Some(entry) = index.entry(entry_id) {
                return tie_break(record, &entry.punishment, Existing::Entry(entry_id));
            }
        }
    }

    Resolution::Accept
}

fn against_pending(record: &PortablePunishment, pending: &PendingBatch, op: usize) -> Resolution {
    match pending.primary(op) {
        Some(existing) => tie_break(record, existing, Existing::Pending(op)),
        None => Resolution::RejectAsDuplicate(Existing::Pending(op)),
    }
}

/// Later start wins; on equal starts the candidate wins, being later in
/// native order
fn tie_break(candidate: &PortablePunishment, existing: &PortablePunishment, target: Existing) -> Resolution {
    if candidate.start() >= existing.start() {
        Resolution::ReplaceExisting(target)
    } else {
        Resolution::RejectAsDuplicate(target)
    }
}
