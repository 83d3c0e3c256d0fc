//! Import provenance tracking

use crate::{EntryId, NativeId, PortablePunishment, SourceKind};

/// Links one legacy record to the destination entry it was imported into
///
/// Keeps the record exactly as it was imported, so a later run can tell an
/// unchanged legacy record (already imported) from one the legacy system has
/// since edited, even when the entry itself now holds another record's details.
#[derive(Debug, Clone, PartialEq)]
pub struct ProvenanceRecord {
    /// Source family
    pub source: SourceKind,

    /// Native id within that source
    pub native_id: NativeId,

    /// Destination entry the record was absorbed into
    pub entry_id: EntryId,

    /// The record as imported
    pub imported: PortablePunishment,

    /// When this provenance was recorded (Unix seconds)
    pub imported_at: u64,
}

impl ProvenanceRecord {
    /// Create a new provenance record
    pub fn new(
        source: SourceKind,
        native_id: NativeId,
        entry_id: EntryId,
        imported: PortablePunishment,
        imported_at: u64,
    ) -> Self {
        Self {
            source,
            native_id,
            entry_id,
            imported,
            imported_at,
        }
    }

    /// Whether the legacy record is unchanged since it was imported
    pub fn matches(&self, record: &PortablePunishment) -> bool {
        &self.imported == record
    }
}
