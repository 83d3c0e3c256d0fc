//! Entry module - rows of the unified punishment store

use crate::{NativeId, PortablePunishment, SourceKind};
use std::fmt;

/// Stable destination identifier for a punishment entry, based on UUIDv7
///
/// UUIDv7 keeps entries chronologically sortable by creation and needs no
/// coordination between concurrent import jobs. The id never changes when an
/// entry's details are replaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EntryId(u128);

impl EntryId {
    /// Generate a new UUIDv7-based EntryId
    ///
    /// # Examples
    ///
    /// ```
    /// use warden_domain::EntryId;
    ///
    /// let id = EntryId::new();
    /// assert!(id.value() > 0);
    /// ```
    pub fn new() -> Self {
        Self(uuid::Uuid::now_v7().as_u128())
    }

    /// Create an EntryId from a raw u128 value
    ///
    /// This is primarily for storage layer deserialization.
    pub fn from_value(value: u128) -> Self {
        Self(value)
    }

    /// Parse an EntryId from its UUID string form
    ///
    /// # Examples
    ///
    /// ```
    /// use warden_domain::EntryId;
    ///
    /// let id = EntryId::new();
    /// let parsed = EntryId::from_string(&id.to_string()).unwrap();
    /// assert_eq!(id, parsed);
    /// ```
    pub fn from_string(s: &str) -> Result<Self, String> {
        uuid::Uuid::parse_str(s)
            .map(|u| Self(u.as_u128()))
            .map_err(|e| format!("Invalid entry id: {}", e))
    }

    /// Get the raw u128 value
    pub fn value(&self) -> u128 {
        self.0
    }

    /// Get the creation time encoded in the UUIDv7 (milliseconds since Unix epoch)
    pub fn timestamp(&self) -> u64 {
        // UUIDv7: top 48 bits are Unix millisecond timestamp
        (self.0 >> 80) as u64
    }
}

impl Default for EntryId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", uuid::Uuid::from_u128(self.0))
    }
}

/// The legacy record whose details an entry currently holds
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Origin {
    /// Source family
    pub source: SourceKind,

    /// Native id within that source
    pub native_id: NativeId,
}

impl Origin {
    /// Create an origin
    pub fn new(source: SourceKind, native_id: NativeId) -> Self {
        Self { source, native_id }
    }
}

/// A punishment as stored in the unified store
#[derive(Debug, Clone, PartialEq)]
pub struct PunishmentEntry {
    /// Stable destination id
    pub id: EntryId,

    /// Current details
    pub punishment: PortablePunishment,

    /// Where the current details came from
    pub origin: Origin,

    /// When the entry was last written (Unix seconds)
    pub updated_at: u64,
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Property: ordering matches u128 ordering
        #[test]
        fn test_entry_id_ordering_property(a: u128, b: u128) {
            let id_a = EntryId::from_value(a);
            let id_b = EntryId::from_value(b);

            prop_assert_eq!(id_a < id_b, a < b);
            prop_assert_eq!(id_a == id_b, a == b);
        }

        /// Property: round-trip through string representation preserves the id
        #[test]
        fn test_entry_id_string_roundtrip(value: u128) {
            let id = EntryId::from_value(value);

            match EntryId::from_string(&id.to_string()) {
                Ok(parsed) => prop_assert_eq!(id, parsed),
                Err(e) => return Err(TestCaseError::fail(e)),
            }
        }
    }
}
