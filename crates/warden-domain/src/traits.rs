//! Trait definitions for external interactions
//!
//! These traits define the boundaries between the reconciliation engine and
//! infrastructure. Infrastructure implementations live in other crates.

use crate::{
    EntryId, NativeId, Origin, PortablePunishment, ProvenanceRecord, PunishmentEntry,
    PunishmentType, RunSummary, SourceKind,
};
use uuid::Uuid;

/// Trait for the unified punishment store
///
/// Implemented by the infrastructure layer (warden-store). Reads go straight
/// to the store; writes happen inside a [`StoreTransaction`] obtained from
/// [`PunishmentStore::begin`].
pub trait PunishmentStore {
    /// Error type for store operations
    type Error;

    /// Transaction handle; dropping it without commit rolls back
    type Transaction<'a>: StoreTransaction<Error = Self::Error>
    where
        Self: 'a;

    /// Open a write transaction
    fn begin(&mut self) -> Result<Self::Transaction<'_>, Self::Error>;

    /// Get an entry by id
    fn get_entry(&self, id: EntryId) -> Result<Option<PunishmentEntry>, Self::Error>;

    /// Query entries matching criteria
    fn list_entries(&self, query: &EntryQuery) -> Result<Vec<PunishmentEntry>, Self::Error>;

    /// Total number of entries
    fn entry_count(&self) -> Result<usize, Self::Error>;

    /// Every provenance record of one source
    fn provenance_for_source(&self, source: SourceKind) -> Result<Vec<ProvenanceRecord>, Self::Error>;

    /// Every entry that at least one record of `source` was imported into
    fn entries_for_source(&self, source: SourceKind) -> Result<Vec<PunishmentEntry>, Self::Error>;

    /// Append a finished job to the run history
    fn record_run(&mut self, run: &RunSummary) -> Result<(), Self::Error>;

    /// Most recent runs first
    fn list_runs(&self, limit: usize) -> Result<Vec<RunSummary>, Self::Error>;
}

/// A write transaction against the punishment store
pub trait StoreTransaction {
    /// Error type for store operations
    type Error;

    /// Find the provenance of a legacy record, if it was imported before
    fn lookup_provenance(
        &self,
        source: SourceKind,
        native_id: &NativeId,
    ) -> Result<Option<ProvenanceRecord>, Self::Error>;

    /// Create a new entry
    fn insert(&mut self, punishment: &PortablePunishment, origin: &Origin) -> Result<EntryId, Self::Error>;

    /// Overwrite all details of an existing entry, keeping its id
    fn replace(&mut self, id: EntryId, punishment: &PortablePunishment, origin: &Origin) -> Result<(), Self::Error>;

    /// Create or update the provenance of one legacy record
    fn record_provenance(&mut self, record: &ProvenanceRecord) -> Result<(), Self::Error>;

    /// Make every write of this transaction visible at once
    fn commit(self) -> Result<(), Self::Error>;
}

/// Query criteria for listing entries
#[derive(Debug, Clone, Default)]
pub struct EntryQuery {
    /// Filter by punishment type
    pub kind: Option<PunishmentType>,

    /// Filter by victim identity
    pub victim_uuid: Option<Uuid>,

    /// Filter by the source the current details came from
    pub source: Option<SourceKind>,

    /// Maximum results to return
    pub limit: Option<usize>,
}

/// Trait for turning a legacy display name into a stable identity
///
/// Implemented by the infrastructure layer (warden-sources). Returning `None`
/// means unresolved; adapters then emit the unresolved-name placeholder.
pub trait IdentityResolver: Send + Sync {
    /// Resolve a player name
    fn resolve(&self, name: &str) -> Option<Uuid>;
}
