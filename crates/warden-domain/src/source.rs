//! Legacy source identification

use crate::UniquenessPolicy;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A legacy punishment plugin family
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SourceKind {
    /// AdvancedBan `Punishments` / `PunishmentHistory` tables
    AdvancedBan,

    /// LiteBans `litebans_*` tables
    LiteBans,

    /// Vanilla `banned-players.json` / `banned-ips.json`
    Vanilla,

    /// Pre-UUID vanilla `banned-players.txt` / `banned-ips.txt`, names only
    VanillaLegacy,
}

impl SourceKind {
    /// Get the source name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::AdvancedBan => "advancedban",
            SourceKind::LiteBans => "litebans",
            SourceKind::Vanilla => "vanilla",
            SourceKind::VanillaLegacy => "vanilla-legacy",
        }
    }

    /// Parse a source name (internal use)
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "advancedban" => Some(SourceKind::AdvancedBan),
            "litebans" => Some(SourceKind::LiteBans),
            "vanilla" => Some(SourceKind::Vanilla),
            "vanilla-legacy" | "vanilla_legacy" => Some(SourceKind::VanillaLegacy),
            _ => None,
        }
    }

    /// The uniqueness policy fixed by this source's format
    ///
    /// - AdvancedBan keys punishments by (victim, operator, type) and ignores
    ///   timestamp and reason, so a later record overwrites an earlier one.
    /// - LiteBans keeps every row; only exact copies collide.
    /// - Vanilla lists hold at most one ban per victim.
    pub fn policy(&self) -> UniquenessPolicy {
        match self {
            SourceKind::AdvancedBan => UniquenessPolicy::VictimOperatorKind,
            SourceKind::LiteBans => UniquenessPolicy::Exact,
            SourceKind::Vanilla | SourceKind::VanillaLegacy => UniquenessPolicy::VictimAndKind {
                allow_concurrent: false,
            },
        }
    }
}

impl std::str::FromStr for SourceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| format!("Unknown source: {}", s))
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A source-native record identifier (e.g. `history:42`, `bans:7`, `player:<uuid>`)
///
/// Opaque to everything except the adapter that produced it. Stable across
/// runs as long as the legacy data is unchanged.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NativeId(String);

impl NativeId {
    /// Create a native id from an adapter-chosen string
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Create a `table:row` style id
    pub fn row(table: &str, id: i64) -> Self {
        Self(format!("{}:{}", table, id))
    }

    /// The id of the `n`th record (counting from 1) a source emitted
    /// under this id
    ///
    /// The first occurrence keeps the id unchanged; later ones get a
    /// `#n` suffix, so a source listing one key twice still yields ids that
    /// are unique within a run and stable across runs.
    ///
    /// # Examples
    ///
    /// ```
    /// use warden_domain::NativeId;
    ///
    /// let id = NativeId::new("player:steve");
    /// assert_eq!(id.occurrence(1), id);
    /// assert_eq!(id.occurrence(2).as_str(), "player:steve#2");
    /// ```
    pub fn occurrence(&self, n: usize) -> Self {
        if n <= 1 {
            self.clone()
        } else {
            Self(format!("{}#{}", self.0, n))
        }
    }

    /// The raw identifier
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NativeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
