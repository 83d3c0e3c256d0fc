//! LiteBans source
//!
//! One table per punishment kind, all sharing the same column layout.
//! LiteBans treats every row as its own punishment, so its policy is exact.

use crate::paging::{
    column_bool, column_i64, column_text, millis_to_secs, open_read_only, PagedRows, Segment,
};
use crate::{
    operator_from_name, stop_at_first_error, RecordStream, SourceAdapter, SourceError, SourceItem,
    SourceRecord,
};
use rusqlite::Row;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;
use warden_domain::traits::IdentityResolver;
use warden_domain::{
    EnforcementState, Expiration, KnownDetails, NativeId, NetworkAddress, Operator,
    PortablePunishment, PunishmentType, Scope, SourceKind, Victim,
};

const COLUMNS: &str = "uuid, ip, reason, banned_by_uuid, banned_by_name, removed_by_uuid, \
     removed_by_name, time, until, server_scope, ipban, active";

/// Default table prefix of a LiteBans install
pub const DEFAULT_TABLE_PREFIX: &str = "litebans_";

/// Reads a LiteBans SQLite database
pub struct LiteBansAdapter {
    path: PathBuf,
    resolver: Arc<dyn IdentityResolver>,
    page_size: usize,
    table_prefix: String,
}

impl LiteBansAdapter {
    /// Create an adapter for the database at `path`
    pub fn new(path: &Path, resolver: Arc<dyn IdentityResolver>, page_size: usize) -> Self {
        Self {
            path: path.to_path_buf(),
            resolver,
            page_size,
            table_prefix: DEFAULT_TABLE_PREFIX.to_string(),
        }
    }

    /// Use a non-default table prefix
    pub fn with_table_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.table_prefix = prefix.into();
        self
    }
}

impl SourceAdapter for LiteBansAdapter {
    fn kind(&self) -> SourceKind {
        SourceKind::LiteBans
    }

    fn into_stream(self: Box<Self>) -> Result<RecordStream, SourceError> {
        let Self {
            path,
            resolver,
            page_size,
            table_prefix,
        } = *self;
        let conn = open_read_only(&path)?;
        info!(path = %path.display(), prefix = %table_prefix, "Reading LiteBans database");

        let segments = ["bans", "mutes", "warnings", "kicks"]
            .into_iter()
            .map(|label| Segment::new(format!("{}{}", table_prefix, label), label, COLUMNS))
            .collect();
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

struct RawPunishment {
    uuid: Option<String>,
    ip: Option<String>,
    reason: Option<String>,
    banned_by_uuid: Option<String>,
    banned_by_name: Option<String>,
    removed: bool,
    time: Option<i64>,
    until: Option<i64>,
    server_scope: Option<String>,
    ipban: bool,
    active: bool,
}

fn map_row(
    label: &'static str,
    id: i64,
    row: &Row<'_>,
    resolver: &dyn IdentityResolver,
) -> rusqlite::Result<Option<SourceItem>> {
    let raw = RawPunishment {
        uuid: column_text(row, 1)?,
        ip: column_text(row, 2)?,
        reason: column_text(row, 3)?,
        banned_by_uuid: column_text(row, 4)?,
        banned_by_name: column_text(row, 5)?,
        removed: column_text(row, 6)?.is_some() || column_text(row, 7)?.is_some(),
        time: column_i64(row, 8)?,
        until: column_i64(row, 9)?,
        server_scope: column_text(row, 10)?,
        ipban: column_bool(row, 11)?,
        active: column_bool(row, 12)?,
    };
    Ok(Some(translate(label, id, raw, resolver)))
}

fn kind_of(label: &str) -> PunishmentType {
    match label {
        "mutes" => PunishmentType::Mute,
        "warnings" => PunishmentType::Warn,
        "kicks" => PunishmentType::Kick,
        _ => PunishmentType::Ban,
    }
}

/// `*` and `global` both mean network-wide
fn parse_scope(scope: Option<&str>) -> Scope {
    match scope {
        None => Scope::Global,
        Some(s) if s == "*" || s.eq_ignore_ascii_case("global") => Scope::Global,
        Some(s) => Scope::Server(s.to_string()),
    }
}

fn translate(label: &'static str, id: i64, raw: RawPunishment, resolver: &dyn IdentityResolver) -> SourceItem {
    let native_id = NativeId::row(label, id);

    let uuid = raw.uuid.as_deref().and_then(|u| Uuid::parse_str(u).ok());
    let address = raw.ip.as_deref().and_then(NetworkAddress::parse);
    let victim = match (raw.ipban, uuid, address) {
        (true, Some(uuid), Some(address)) => Victim::Composite(uuid, address),
        (true, None, Some(address)) => Victim::Address(address),
        (true, _, None) => {
            return SourceItem::malformed(Some(native_id), format!("ip ban with invalid address {:?}", raw.ip))
        }
        (false, Some(uuid), _) => Victim::Player(uuid),
        (false, None, _) => {
            return SourceItem::malformed(Some(native_id), format!("invalid victim uuid {:?}", raw.uuid))
        }
    };

    let Some(time) = raw.time else {
        return SourceItem::malformed(Some(native_id), "missing time");
    };

    let operator = match raw.banned_by_uuid.as_deref() {
        Some(u) if u.eq_ignore_ascii_case("CONSOLE") => Operator::Console,
        Some(u) => match Uuid::parse_str(u) {
            Ok(uuid) => Operator::Player(uuid),
            Err(_) => operator_from_name(raw.banned_by_name.as_deref(), &["CONSOLE"], resolver),
        },
        None => operator_from_name(raw.banned_by_name.as_deref(), &["CONSOLE"], resolver),
    };

    let kind = kind_of(label);
    let mut details = KnownDetails::new(
        kind,
        raw.reason.unwrap_or_default(),
        millis_to_secs(time),
        Expiration::from_sentinel(raw.until.map(millis_to_secs)),
    )
    .with_scope(parse_scope(raw.server_scope.as_deref()));

    // Kicks are instantaneous and carry no state
    if kind != PunishmentType::Kick {
        details = details.with_state(if raw.active {
            EnforcementState::Active
        } else if raw.removed {
            EnforcementState::Undone
        } else {
            EnforcementState::Expired
        });
    }

    SourceItem::Record(SourceRecord::new(
        native_id,
        PortablePunishment::new(details, victim, operator),
    ))
}
