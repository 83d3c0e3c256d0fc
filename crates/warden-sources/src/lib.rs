//! Warden Source Adapters
//!
//! Each adapter reads one legacy punishment storage format and yields its
//! records, translated into [`PortablePunishment`]s, as a lazy stream.
//!
//! # Architecture
//!
//! - **Adapters**: [`AdvancedBanAdapter`], [`LiteBansAdapter`], [`VanillaAdapter`]
//!   and [`LegacyVanillaAdapter`], all behind the [`SourceAdapter`] trait
//! - **Streams**: adapters never materialize a whole source; databases are
//!   paged, files are read element by element
//! - **Identity**: display names are resolved through an
//!   [`IdentityResolver`](warden_domain::traits::IdentityResolver); failures
//!   become the unresolved-name placeholder instead of being dropped
//!
//! # Stream contract
//!
//! A stream yields records in the source's native order. A record that cannot
//! be translated is yielded as [`SourceItem::Malformed`] and the stream goes
//! on. A fatal read error is yielded once as `Err` and ends the stream.

#![warn(missing_docs)]

pub mod advancedban;
pub mod error;
pub mod identity;
pub mod legacy_vanilla;
pub mod litebans;
mod paging;
pub mod vanilla;

pub use advancedban::AdvancedBanAdapter;
pub use error::SourceError;
pub use identity::{ChainResolver, MapResolver, NoResolver, ResolutionConfig, UserCacheResolver};
pub use legacy_vanilla::LegacyVanillaAdapter;
pub use litebans::LiteBansAdapter;
pub use vanilla::VanillaAdapter;

use std::path::Path;
use std::sync::Arc;
use warden_domain::traits::IdentityResolver;
use warden_domain::{NativeId, Operator, PortablePunishment, SourceKind, UniquenessPolicy};

/// A translated legacy record
#[derive(Debug, Clone, PartialEq)]
pub struct SourceRecord {
    /// The record's identifier inside its source
    pub native_id: NativeId,

    /// The translated record
    pub punishment: PortablePunishment,
}

impl SourceRecord {
    /// Create a new record
    pub fn new(native_id: NativeId, punishment: PortablePunishment) -> Self {
        Self {
            native_id,
            punishment,
        }
    }
}

/// One element of a source stream
#[derive(Debug, Clone, PartialEq)]
pub enum SourceItem {
    /// A record that translated cleanly
    Record(SourceRecord),

    /// A record that could not be translated
    Malformed {
        /// Identifier, when the record got far enough to have one
        native_id: Option<NativeId>,
        /// What was wrong with it
        reason: String,
    },
}

impl SourceItem {
    /// Shorthand for a malformed item
    pub fn malformed(native_id: Option<NativeId>, reason: impl Into<String>) -> Self {
        SourceItem::Malformed {
            native_id,
            reason: reason.into(),
        }
    }
}

/// Lazy stream of source items
pub type RecordStream = Box<dyn Iterator<Item = Result<SourceItem, SourceError>> + Send>;

/// A legacy punishment source
pub trait SourceAdapter: Send {
    /// Which legacy format this adapter reads
    fn kind(&self) -> SourceKind;

    /// The source's definition of "the same punishment"
    fn policy(&self) -> UniquenessPolicy {
        self.kind().policy()
    }

    /// Start reading
    ///
    /// Fails only if the source cannot be opened at all.
    fn into_stream(self: Box<Self>) -> Result<RecordStream, SourceError>;
}

/// Stop a stream right after its first error
pub fn stop_at_first_error<I>(items: I) -> RecordStream
where
    I: Iterator<Item = Result<SourceItem, SourceError>> + Send + 'static,
{
    let mut failed = false;
    Box::new(items.take_while(move |item| {
        if failed {
            return false;
        }
        failed = item.is_err();
        true
    }))
}

/// Build the adapter for `kind` reading from `path`
///
/// Database sources expect a SQLite file; file sources expect the server
/// directory holding the ban lists.
pub fn open_adapter(
    kind: SourceKind,
    path: &Path,
    resolver: Arc<dyn IdentityResolver>,
    page_size: usize,
) -> Box<dyn SourceAdapter> {
    match kind {
        SourceKind::AdvancedBan => Box::new(AdvancedBanAdapter::new(path, resolver, page_size)),
        SourceKind::LiteBans => Box::new(LiteBansAdapter::new(path, resolver, page_size)),
        SourceKind::Vanilla => Box::new(VanillaAdapter::new(path, resolver)),
        SourceKind::VanillaLegacy => Box::new(LegacyVanillaAdapter::new(path, resolver)),
    }
}

/// Operator from a recorded name, shared by every adapter
///
/// A missing name means the console issued it. `console_names` are compared
/// case-insensitively; a name nobody can resolve is an unknown operator.
pub(crate) fn operator_from_name(
    name: Option<&str>,
    console_names: &[&str],
    resolver: &dyn IdentityResolver,
) -> Operator {
    let Some(name) = name.map(str::trim).filter(|n| !n.is_empty()) else {
        return Operator::Console;
    };
    if console_names.iter().any(|c| c.eq_ignore_ascii_case(name)) {
        return Operator::Console;
    }
    resolver
        .resolve(name)
        .map(Operator::Player)
        .unwrap_or(Operator::Unknown)
}
