//! Destination writer
//!
//! Applies one batch of [`WriteOp`]s in a single store transaction. Either
//! every operation of the batch becomes visible or none does.

use crate::batch::WriteOp;
use crate::ImportError;
use std::fmt::Display;
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::debug;
use warden_domain::traits::{PunishmentStore, StoreTransaction};
use warden_domain::{EntryId, NativeId, Origin, PortablePunishment, ProvenanceRecord, SourceKind};

/// What one operation did to the destination
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpOutcome {
    /// A new entry was created
    Inserted(EntryId),

    /// An existing entry was overwritten
    Replaced(EntryId),

    /// Only provenance was written, linking to an existing entry
    Absorbed(EntryId),
}

impl OpOutcome {
    /// The entry the operation resolved to
    pub fn entry_id(&self) -> EntryId {
        match self {
            OpOutcome::Inserted(id) | OpOutcome::Replaced(id) | OpOutcome::Absorbed(id) => *id,
        }
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Apply a batch to `store` in one transaction
///
/// An insert whose native record another job imported in the meantime is
/// turned into an absorb, so concurrent jobs never duplicate an entry.
pub fn apply_batch<S: PunishmentStore>(
    store: &mut S,
    source: SourceKind,
    ops: &[WriteOp],
) -> Result<Vec<OpOutcome>, S::Error> {
    let now = unix_now();
    let mut tx = store.begin()?;
    let mut outcomes = Vec::with_capacity(ops.len());

    for op in ops {
        let outcome = match op {
            WriteOp::Insert {
                native_id,
                punishment,
                ..
            } => match tx.lookup_provenance(source, native_id)? {
                Some(existing) if existing.matches(punishment) => {
                    debug!(native_id = %native_id, entry = %existing.entry_id, "Already imported by another job");
                    OpOutcome::Absorbed(existing.entry_id)
                }
                _ => OpOutcome::Inserted(tx.insert(punishment, &Origin::new(source, native_id.clone()))?),
            },
            WriteOp::Replace {
                entry_id,
                native_id,
                punishment,
                ..
            } => {
                tx.replace(*entry_id, punishment, &Origin::new(source, native_id.clone()))?;
                OpOutcome::Replaced(*entry_id)
            }
            WriteOp::Absorb { entry_id, .. } => OpOutcome::Absorbed(*entry_id),
        };

        let entry_id = outcome.entry_id();
        let (native_id, punishment) = op.primary();
        record_provenance(&mut tx, source, native_id, entry_id, punishment, now)?;
        for absorbed in op.absorbed() {
            record_provenance(&mut tx, source, &absorbed.native_id, entry_id, &absorbed.punishment, now)?;
        }
        outcomes.push(outcome);
    }

    tx.commit()?;
    Ok(outcomes)
}

fn record_provenance<T: StoreTransaction>(
    tx: &mut T,
    source: SourceKind,
    native_id: &NativeId,
    entry_id: EntryId,
    punishment: &PortablePunishment,
    now: u64,
) -> Result<(), T::Error> {
    tx.record_provenance(&ProvenanceRecord::new(
        source,
        native_id.clone(),
        entry_id,
        punishment.clone(),
        now,
    ))
}

/// Commits batches to a store shared between jobs
pub struct DestinationWriter<S> {
    store: Arc<Mutex<S>>,
    source: SourceKind,
}

impl<S> DestinationWriter<S>
where
    S: PunishmentStore + Send + 'static,
    S::Error: Display,
{
    /// Create a writer for records of `source`
    pub fn new(store: Arc<Mutex<S>>, source: SourceKind) -> Self {
        Self { store, source }
    }

    /// Commit a batch on a blocking thread
    pub async fn commit(&self, ops: Arc<Vec<WriteOp>>) -> Result<Vec<OpOutcome>, ImportError> {
        let store = Arc::clone(&self.store);
        let source = self.source;
        tokio::task::spawn_blocking(move || {
            let mut guard = store
                .lock()
                .map_err(|_| ImportError::Store("store mutex poisoned".to_string()))?;
            apply_batch(&mut *guard, source, &ops).map_err(|e| ImportError::Store(e.to_string()))
        })
        .await?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::{AbsorbedRecord, Disposition};

    #[test]
    fn test_outcome_entry_id() {
        let id = EntryId::from_value(4);
        assert_eq!(OpOutcome::Inserted(id).entry_id(), id);
        assert_eq!(OpOutcome::Absorbed(id).entry_id(), id);
    }

    #[test]
    fn test_absorbed_records_are_listed_for_provenance() {
        use uuid::Uuid;
        use warden_domain::{Expiration, KnownDetails, Operator, PunishmentType, Victim};

        let punishment = PortablePunishment::new(
            KnownDetails::new(PunishmentType::Kick, "afk", 1, Expiration::Permanent),
            Victim::Player(Uuid::from_u128(1)),
            Operator::Unknown,
        );
        let op = WriteOp::Insert {
            native_id: NativeId::new("kicks:2"),
            punishment: punishment.clone(),
            absorbed: vec![AbsorbedRecord {
                native_id: NativeId::new("kicks:1"),
                punishment,
                disposition: Disposition::Superseded,
            }],
        };
        let ids: Vec<_> = op.native_ids().map(|n| n.as_str().to_string()).collect();
        assert_eq!(ids, vec!["kicks:2", "kicks:1"]);
    }
}
