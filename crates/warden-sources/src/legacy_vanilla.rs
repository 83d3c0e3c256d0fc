//! Pre-JSON vanilla server source
//!
//! Old servers kept bans in `banned-players.txt` and `banned-ips.txt`, one
//! `target|created|source|expires|reason` line per ban. Only the target is
//! mandatory. Players are recorded by name only.

use crate::vanilla::{ban_details, parse_source};
use crate::{stop_at_first_error, RecordStream, SourceAdapter, SourceError, SourceItem, SourceRecord};
use std::fs::File;
use std::io::{BufRead, BufReader, Lines};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};
use warden_domain::traits::IdentityResolver;
use warden_domain::{NativeId, NetworkAddress, PortablePunishment, SourceKind, Victim};

/// Player ban list file name
pub const PLAYERS_FILE: &str = "banned-players.txt";

/// Address ban list file name
pub const ADDRESSES_FILE: &str = "banned-ips.txt";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BanList {
    Players,
    Addresses,
}

/// Reads the text ban lists of an old vanilla server
pub struct LegacyVanillaAdapter {
    dir: PathBuf,
    resolver: Arc<dyn IdentityResolver>,
}

impl LegacyVanillaAdapter {
    /// Create an adapter for the server directory `dir`
    pub fn new(dir: &Path, resolver: Arc<dyn IdentityResolver>) -> Self {
        Self {
            dir: dir.to_path_buf(),
            resolver,
        }
    }
}

impl SourceAdapter for LegacyVanillaAdapter {
    fn kind(&self) -> SourceKind {
        SourceKind::VanillaLegacy
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
        info!(dir = %dir.display(), files = files.len(), "Reading legacy vanilla ban lists");

        let lines = BanLines {
            files: files.into_iter(),
            current: None,
        };
        let items = lines.filter_map(move |line| match line {
            Ok((list, text)) => translate(list, &text, resolver.as_ref()).map(Ok),
            Err(e) => Some(Err(e)),
        });
        Ok(stop_at_first_error(items))
    }
}

/// Lines of each file in turn
struct BanLines {
    files: std::vec::IntoIter<(PathBuf, BanList)>,
    current: Option<(BanList, Lines<BufReader<File>>)>,
}

impl Iterator for BanLines {
    type Item = Result<(BanList, String), SourceError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some((list, lines)) = self.current.as_mut() {
                match lines.next() {
                    Some(Ok(line)) => return Some(Ok((*list, line))),
                    Some(Err(e)) => return Some(Err(e.into())),
                    None => self.current = None,
                }
            }
            let (path, list) = self.files.next()?;
            match File::open(&path) {
                Ok(file) => self.current = Some((list, BufReader::new(file).lines())),
                Err(e) => return Some(Err(e.into())),
            }
        }
    }
}

/// `None` for comments and blank lines
fn translate(list: BanList, line: &str, resolver: &dyn IdentityResolver) -> Option<SourceItem> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return None;
    }

    let mut fields = line.split('|').map(str::trim);
    let target = fields.next().filter(|t| !t.is_empty())?;
    let created = fields.next();
    let source = fields.next();
    let expires = fields.next();
    // The reason may itself contain the separator
    let reason = fields.collect::<Vec<_>>().join("|");
    let reason = if reason.is_empty() { None } else { Some(reason) };

    let (native_id, victim) = match list {
        BanList::Players => {
            let native_id = NativeId::new(format!("player:{}", target.to_lowercase()));
            let victim = resolver
                .resolve(target)
                .map(Victim::Player)
                .unwrap_or_else(|| Victim::UnresolvedName(target.to_string()));
            (native_id, victim)
        }
        BanList::Addresses => {
            let native_id = NativeId::new(format!("ip:{}", target));
            match NetworkAddress::parse(target) {
                Some(address) => (native_id, Victim::Address(address)),
                None => {
                    return Some(SourceItem::malformed(
                        Some(native_id),
                        format!("invalid address {:?}", target),
                    ))
                }
            }
        }
    };

    let details = match ban_details(created, expires, reason) {
        Ok(details) => details,
        Err(reason) => return Some(SourceItem::malformed(Some(native_id), reason)),
    };
    let operator = parse_source(source, resolver);

    Some(SourceItem::Record(SourceRecord::new(
        native_id,
        PortablePunishment::new(details, victim, operator),
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{MapResolver, NoResolver};
    use uuid::Uuid;
    use warden_domain::{Expiration, Operator};

    #[test]
    fn test_comments_and_blank_lines_skipped() {
        assert!(translate(BanList::Players, "# Updated 2013", &NoResolver).is_none());
        assert!(translate(BanList::Players, "   ", &NoResolver).is_none());
    }

    #[test]
    fn test_full_line() {
        let uuid = Uuid::from_u128(5);
        let resolver = MapResolver::new().with("Notch", uuid);
        let item = translate(
            BanList::Players,
            "Notch|2012-06-01 12:00:00 +0000|Console|Forever|Too | many | pipes",
            &resolver,
        );
        match item {
            Some(SourceItem::Record(r)) => {
                assert_eq!(r.native_id.as_str(), "player:notch");
                assert_eq!(r.punishment.victim, Victim::Player(uuid));
                assert_eq!(r.punishment.operator, Operator::Console);
                assert_eq!(r.punishment.details.expiration, Expiration::Permanent);
                assert_eq!(r.punishment.details.reason, "Too|many|pipes");
            }
            other => panic!("expected record, got {:?}", other),
        }
    }

    #[test]
    fn test_name_only_line() {
        match translate(BanList::Players, "Steve", &NoResolver) {
            Some(SourceItem::Record(r)) => {
                assert_eq!(r.punishment.victim, Victim::UnresolvedName("Steve".into()));
                assert_eq!(r.punishment.start(), 0);
                assert_eq!(r.punishment.operator, Operator::Console);
            }
            other => panic!("expected record, got {:?}", other),
        }
    }

    #[test]
    fn test_bad_address_is_malformed() {
        assert!(matches!(
            translate(BanList::Addresses, "not-an-ip|2012-06-01 12:00:00 +0000", &NoResolver),
            Some(SourceItem::Malformed { native_id: Some(_), .. })
        ));
    }
}
