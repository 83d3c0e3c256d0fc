//! Vanilla server source
//!
//! Reads `banned-players.json` then `banned-ips.json` from a server
//! directory. Each file is one JSON array; elements are deserialized one at a
//! time on a reader thread and handed over through a bounded channel, so a
//! large ban list is never held in memory as a whole.

use crate::{
    operator_from_name, stop_at_first_error, RecordStream, SourceAdapter, SourceError,
    SourceItem, SourceRecord,
};
use chrono::DateTime;
use serde::de::{DeserializeSeed, SeqAccess, Visitor};
use serde::{Deserialize, Deserializer};
use std::fmt;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{sync_channel, Receiver, SyncSender};
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;
use warden_domain::traits::IdentityResolver;
use warden_domain::{
    EnforcementState, Expiration, KnownDetails, NativeId, NetworkAddress, Operator,
    PortablePunishment, PunishmentType, SourceKind, Victim,
};

/// Player ban list file name
pub const PLAYERS_FILE: &str = "banned-players.json";

/// Address ban list file name
pub const ADDRESSES_FILE: &str = "banned-ips.json";

/// Date format of the `created` and `expires` fields
pub const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S %z";

/// Reason the server records when none was given
pub const DEFAULT_REASON: &str = "Banned by an operator.";

/// `source` values that mean the server itself issued the ban
pub(crate) const CONSOLE_SOURCES: &[&str] = &["Server", "Console", "Rcon", "Server Console"];

const CHANNEL_CAPACITY: usize = 64;

/// Which ban list an element came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BanList {
    Players,
    Addresses,
}

/// Reads the JSON ban lists of a vanilla server
pub struct VanillaAdapter {
    dir: PathBuf,
    resolver: Arc<dyn IdentityResolver>,
}

impl VanillaAdapter {
    /// Create an adapter for the server directory `dir`
    pub fn new(dir: &Path, resolver: Arc<dyn IdentityResolver>) -> Self {
        Self {
            dir: dir.to_path_buf(),
            resolver,
        }
    }
}

impl SourceAdapter for VanillaAdapter {
    fn kind(&self) -> SourceKind {
        SourceKind::Vanilla
    }

    fn into_stream(self: Box<Self>) -> Result<RecordStream, SourceError> {
        let Self { dir, resolver } = *self;

        let mut files = Vec::new();
        for (name, list) in [(PLAYERS_FILE, BanList::Players), (ADDRESSES_FILE, BanList::Addresses)] {
            let path = dir.join(name);
            if path.exists() {
                files.push((path, list));
            } else {
                warn!(path = %path.display(), "Ban list not found, skipping");
            }
        }
        if files.is_empty() {
            return Err(SourceError::NotFound(format!(
                "no {} or {} in {}",
                PLAYERS_FILE,
                ADDRESSES_FILE,
                dir.display()
            )));
        }
        info!(dir = %dir.display(), files = files.len(), "Reading vanilla ban lists");

        let (tx, rx) = sync_channel(CHANNEL_CAPACITY);
        std::thread::Builder::new()
            .name("vanilla-reader".to_string())
            .spawn(move || read_files(files, tx))?;

        let items = ElementStream { rx, done: false }
            .map(move |element| element.map(|(list, value)| translate(list, value, resolver.as_ref())));
        Ok(stop_at_first_error(items))
    }
}

type Element = Result<(BanList, serde_json::Value), SourceError>;

/// Receiving end of the reader thread
struct ElementStream {
    rx: Receiver<Element>,
    done: bool,
}

impl Iterator for ElementStream {
    type Item = Element;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.rx.recv() {
            Ok(element) => Some(element),
            // The reader hangs up after the last element
            Err(_) => {
                self.done = true;
                None
            }
        }
    }
}

fn read_files(files: Vec<(PathBuf, BanList)>, tx: SyncSender<Element>) {
    for (path, list) in files {
        let result = File::open(&path)
            .map_err(SourceError::from)
            .and_then(|file| {
                let mut de = serde_json::Deserializer::from_reader(BufReader::new(file));
                let forwarded = ArraySink { list, tx: &tx }.deserialize(&mut de)?;
                de.end()?;
                Ok(forwarded)
            });

        match result {
            Ok(Some(count)) => debug!(path = %path.display(), elements = count, "Finished ban list"),
            // Receiver dropped, nobody is listening any more
            Ok(None) => return,
            Err(e) => {
                let _ = tx.send(Err(e));
                return;
            }
        }
    }
}

/// Forwards each element of a top-level array into the channel
///
/// Yields the element count, or `None` if the receiver went away.
struct ArraySink<'a> {
    list: BanList,
    tx: &'a SyncSender<Element>,
}

impl<'de> DeserializeSeed<'de> for ArraySink<'_> {
    type Value = Option<usize>;

    fn deserialize<D: Deserializer<'de>>(self, deserializer: D) -> Result<Self::Value, D::Error> {
        deserializer.deserialize_seq(self)
    }
}

impl<'de> Visitor<'de> for ArraySink<'_> {
    type Value = Option<usize>;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a JSON array of ban entries")
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
        let mut count = 0;
        while let Some(value) = seq.next_element::<serde_json::Value>()? {
            if self.tx.send(Ok((self.list, value))).is_err() {
                return Ok(None);
            }
            count += 1;
        }
        Ok(Some(count))
    }
}

/// An element of either ban list
#[derive(Debug, Deserialize)]
struct BanEntry {
    uuid: Option<String>,
    name: Option<String>,
    ip: Option<String>,
    created: Option<String>,
    source: Option<String>,
    expires: Option<String>,
    reason: Option<String>,
}

/// Parse a vanilla date; `None` for missing, `Err` for unreadable
pub(crate) fn parse_date(value: Option<&str>) -> Result<Option<i64>, String> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        None => Ok(None),
        Some(v) => DateTime::parse_from_str(v, DATE_FORMAT)
            .map(|dt| Some(dt.timestamp()))
            .map_err(|e| format!("invalid date {:?}: {}", v, e)),
    }
}

/// `forever` or a date
pub(crate) fn parse_expires(value: Option<&str>) -> Result<Expiration, String> {
    match value.map(str::trim) {
        None => Ok(Expiration::Permanent),
        Some(v) if v.is_empty() || v.eq_ignore_ascii_case("forever") => Ok(Expiration::Permanent),
        Some(v) => parse_date(Some(v)).map(Expiration::from_sentinel),
    }
}

/// Operator from the vanilla `source` field
pub(crate) fn parse_source(source: Option<&str>, resolver: &dyn IdentityResolver) -> Operator {
    match source.map(str::trim) {
        Some("(Unknown)") => Operator::Unknown,
        other => operator_from_name(other, CONSOLE_SOURCES, resolver),
    }
}

pub(crate) fn ban_details(
    created: Option<&str>,
    expires: Option<&str>,
    reason: Option<String>,
) -> Result<KnownDetails, String> {
    let start = parse_date(created)?.unwrap_or(0);
    let expiration = parse_expires(expires)?;
    let reason = reason
        .filter(|r| !r.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_REASON.to_string());
    // Listed means in force as far as the file goes; expiry is left to
    // whoever enforces it
    Ok(KnownDetails::new(PunishmentType::Ban, reason, start, expiration).with_state(EnforcementState::Active))
}

fn translate(list: BanList, value: serde_json::Value, resolver: &dyn IdentityResolver) -> SourceItem {
    let entry: BanEntry = match serde_json::from_value(value) {
        Ok(entry) => entry,
        Err(e) => return SourceItem::malformed(None, format!("unreadable ban entry: {}", e)),
    };

    let (native_id, victim) = match list {
        BanList::Players => {
            let Some(raw) = entry.uuid.as_deref() else {
                return SourceItem::malformed(None, "player ban without uuid");
            };
            let native_id = NativeId::new(format!("player:{}", raw.to_lowercase()));
            match Uuid::parse_str(raw) {
                Ok(uuid) => (native_id, Victim::Player(uuid)),
                Err(_) => {
                    // Some servers wrote broken uuids; fall back to the name
                    match entry.name.as_deref().and_then(|n| resolver.resolve(n)) {
                        Some(uuid) => (native_id, Victim::Player(uuid)),
                        None => match entry.name.as_deref() {
                            Some(name) => (native_id, Victim::UnresolvedName(name.to_string())),
                            None => {
                                return SourceItem::malformed(Some(native_id), format!("invalid uuid {:?}", raw))
                            }
                        },
                    }
                }
            }
        }
        BanList::Addresses => {
            let Some(raw) = entry.ip.as_deref() else {
                return SourceItem::malformed(None, "address ban without ip");
            };
            let native_id = NativeId::new(format!("ip:{}", raw));
            match NetworkAddress::parse(raw) {
                Some(address) => (native_id, Victim::Address(address)),
                None => return SourceItem::malformed(Some(native_id), format!("invalid address {:?}", raw)),
            }
        }
    };

    let details = match ban_details(entry.created.as_deref(), entry.expires.as_deref(), entry.reason) {
        Ok(details) => details,
        Err(reason) => return SourceItem::malformed(Some(native_id), reason),
    };
    let operator = parse_source(entry.source.as_deref(), resolver);

    SourceItem::Record(SourceRecord::new(
        native_id,
        PortablePunishment::new(details, victim, operator),
    ))
}
