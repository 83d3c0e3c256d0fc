//! AdvancedBan source
//!
//! AdvancedBan keeps every punishment ever issued in `PunishmentHistory` and
//! the ones still in force in `Punishments`. Both tables are read, history
//! first, so an active punishment shows up twice: once as history, once as
//! active. The source's uniqueness quirk (victim, operator and kind) folds
//! the pair into one entry.

use crate::paging::{column_i64, column_text, millis_to_secs, open_read_only, PagedRows, Segment};
use crate::{
    operator_from_name, stop_at_first_error, RecordStream, SourceAdapter, SourceError,
    SourceItem, SourceRecord,
};
use rusqlite::Row;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;
use warden_domain::traits::IdentityResolver;
use warden_domain::{
    EnforcementState, Expiration, KnownDetails, NativeId, NetworkAddress, PortablePunishment,
    PunishmentType, SourceKind, Victim,
};

const COLUMNS: &str = "name, uuid, reason, operator, punishmentType, start, \"end\"";

/// Reads an AdvancedBan SQLite database
pub struct AdvancedBanAdapter {
    path: PathBuf,
    resolver: Arc<dyn IdentityResolver>,
    page_size: usize,
}

impl AdvancedBanAdapter {
    /// Create an adapter for the database at `path`
    pub fn new(path: &Path, resolver: Arc<dyn IdentityResolver>, page_size: usize) -> Self {
        Self {
            path: path.to_path_buf(),
            resolver,
            page_size,
        }
    }
}

impl SourceAdapter for AdvancedBanAdapter {
    fn kind(&self) -> SourceKind {
        SourceKind::AdvancedBan
    }

    fn into_stream(self: Box<Self>) -> Result<RecordStream, SourceError> {
        let Self {
            path,
            resolver,
            page_size,
        } = *self;
        let conn = open_read_only(&path)?;
        info!(path = %path.display(), "Reading AdvancedBan database");

        let segments = vec![
            Segment::new("PunishmentHistory", "history", COLUMNS),
            Segment::new("Punishments", "active", COLUMNS),
        ];
        let rows = PagedRows::new(
            conn,
            segments,
            page_size,
            Box::new(move |segment: &Segment, id: i64, row: &Row<'_>| {
                map_row(segment.label, id, row, resolver.as_ref())
            }),
        )?;
        Ok(stop_at_first_error(rows))
    }
}

/// The columns of one row, before interpretation
struct RawPunishment {
    name: Option<String>,
    uuid: Option<String>,
    reason: Option<String>,
    operator: Option<String>,
    kind: Option<String>,
    start: Option<i64>,
    end: Option<i64>,
}

fn map_row(
    label: &str,
    id: i64,
    row: &Row<'_>,
    resolver: &dyn IdentityResolver,
) -> rusqlite::Result<Option<SourceItem>> {
    let raw = RawPunishment {
        name: column_text(row, 1)?,
        uuid: column_text(row, 2)?,
        reason: column_text(row, 3)?,
        operator: column_text(row, 4)?,
        kind: column_text(row, 5)?,
        start: column_i64(row, 6)?,
        end: column_i64(row, 7)?,
    };
    Ok(translate(label, id, raw, resolver))
}

/// Punishment type names AdvancedBan writes, mapped to the portable kind
///
/// `Ok(None)` for notes, which are not punishments.
fn parse_kind(raw: &str) -> Result<Option<(PunishmentType, bool)>, String> {
    let kind = match raw.to_ascii_uppercase().as_str() {
        "BAN" | "TEMP_BAN" => (PunishmentType::Ban, false),
        "IP_BAN" | "TEMP_IP_BAN" => (PunishmentType::Ban, true),
        "MUTE" | "TEMP_MUTE" => (PunishmentType::Mute, false),
        "WARNING" | "TEMP_WARNING" => (PunishmentType::Warn, false),
        "KICK" => (PunishmentType::Kick, false),
        "NOTE" => return Ok(None),
        other => return Err(format!("unknown punishment type {}", other)),
    };
    Ok(Some(kind))
}

fn translate(
    label: &str,
    id: i64,
    raw: RawPunishment,
    resolver: &dyn IdentityResolver,
) -> Option<SourceItem> {
    let native_id = NativeId::row(label, id);
    let malformed = |reason: String| Some(SourceItem::malformed(Some(native_id.clone()), reason));

    let Some(kind_name) = raw.kind else {
        return malformed("missing punishment type".to_string());
    };
    let (kind, by_address) = match parse_kind(&kind_name) {
        Ok(Some(kind)) => kind,
        Ok(None) => return None,
        Err(reason) => return malformed(reason),
    };
    let Some(start) = raw.start else {
        return malformed("missing start time".to_string());
    };

    let victim = if by_address {
        // IP bans keep the address in the uuid column
        match raw.uuid.as_deref().and_then(NetworkAddress::parse) {
            Some(address) => Victim::Address(address),
            None => return malformed(format!("invalid address {:?}", raw.uuid)),
        }
    } else {
        match raw.uuid.as_deref().and_then(|u| Uuid::parse_str(u).ok()) {
            Some(uuid) => Victim::Player(uuid),
            None => match raw.name.as_deref() {
                Some(name) => resolver
                    .resolve(name)
                    .map(Victim::Player)
                    .unwrap_or_else(|| Victim::UnresolvedName(name.to_string())),
                None => return malformed("no victim identity or name".to_string()),
            },
        }
    };

    let operator = operator_from_name(raw.operator.as_deref(), &["CONSOLE"], resolver);
    let expiration = Expiration::from_sentinel(raw.end.map(millis_to_secs));
    // A temporary punishment gone from the active table either ran out or
    // was lifted; the database does not say which
    let state = if label == "active" {
        Some(EnforcementState::Active)
    } else if expiration.is_permanent() {
        Some(EnforcementState::Undone)
    } else {
        None
    };

    let mut details = KnownDetails::new(kind, raw.reason.unwrap_or_default(), millis_to_secs(start), expiration);
    details.state = state;
    Some(SourceItem::Record(SourceRecord::new(
        native_id,
        PortablePunishment::new(details, victim, operator),
    )))
}
