//! Punishment module - the intermediate record every legacy format is translated into

use crate::{Operator, Victim};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of punishment
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PunishmentType {
    /// Victim may not join
    Ban,

    /// Victim may not chat
    Mute,

    /// Recorded warning, no enforcement
    Warn,

    /// One-off disconnect
    Kick,
}

impl PunishmentType {
    /// Get the punishment type name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            PunishmentType::Ban => "ban",
            PunishmentType::Mute => "mute",
            PunishmentType::Warn => "warn",
            PunishmentType::Kick => "kick",
        }
    }

    /// Parse a punishment type from a string (internal use)
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "ban" => Some(PunishmentType::Ban),
            "mute" => Some(PunishmentType::Mute),
            "warn" | "warning" => Some(PunishmentType::Warn),
            "kick" => Some(PunishmentType::Kick),
            _ => None,
        }
    }

    /// All punishment types, in declaration order
    pub fn all() -> [PunishmentType; 4] {
        [
            PunishmentType::Ban,
            PunishmentType::Mute,
            PunishmentType::Warn,
            PunishmentType::Kick,
        ]
    }
}

impl std::str::FromStr for PunishmentType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| format!("Invalid punishment type: {}", s))
    }
}

impl fmt::Display for PunishmentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a punishment applies
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "scope", content = "name", rename_all = "lowercase")]
pub enum Scope {
    /// Every server on the network
    Global,

    /// A single named server
    Server(String),

    /// A named category (group) of servers
    Category(String),
}

impl Scope {
    /// Encode the scope as a single storage label
    ///
    /// # Examples
    ///
    /// ```
    /// use warden_domain::Scope;
    ///
    /// assert_eq!(Scope::Global.to_label(), "global");
    /// assert_eq!(Scope::Server("lobby".into()).to_label(), "server:lobby");
    /// assert_eq!(Scope::parse_label("category:survival"), Some(Scope::Category("survival".into())));
    /// ```
    pub fn to_label(&self) -> String {
        match self {
            Scope::Global => "global".to_string(),
            Scope::Server(name) => format!("server:{}", name),
            Scope::Category(name) => format!("category:{}", name),
        }
    }

    /// Decode a storage label produced by [`Scope::to_label`]
    pub fn parse_label(label: &str) -> Option<Self> {
        if label == "global" {
            return Some(Scope::Global);
        }
        match label.split_once(':') {
            Some(("server", name)) if !name.is_empty() => Some(Scope::Server(name.to_string())),
            Some(("category", name)) if !name.is_empty() => Some(Scope::Category(name.to_string())),
            _ => None,
        }
    }
}

impl Default for Scope {
    fn default() -> Self {
        Scope::Global
    }
}

/// When a punishment ends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Expiration {
    /// Never expires
    Permanent,

    /// Expires at the given Unix timestamp (seconds)
    At(i64),
}

impl Expiration {
    /// Interpret a legacy end time where zero, negative or absent means permanent
    ///
    /// # Examples
    ///
    /// ```
    /// use warden_domain::Expiration;
    ///
    /// assert_eq!(Expiration::from_sentinel(None), Expiration::Permanent);
    /// assert_eq!(Expiration::from_sentinel(Some(-1)), Expiration::Permanent);
    /// assert_eq!(Expiration::from_sentinel(Some(0)), Expiration::Permanent);
    /// assert_eq!(Expiration::from_sentinel(Some(1700000000)), Expiration::At(1700000000));
    /// ```
    pub fn from_sentinel(end: Option<i64>) -> Self {
        match end {
            Some(end) if end > 0 => Expiration::At(end),
            _ => Expiration::Permanent,
        }
    }

    /// Whether this expiration is the permanent marker
    pub fn is_permanent(&self) -> bool {
        matches!(self, Expiration::Permanent)
    }

    /// The end timestamp, `None` when permanent
    pub fn end(&self) -> Option<i64> {
        match self {
            Expiration::Permanent => None,
            Expiration::At(end) => Some(*end),
        }
    }

    /// Whether the punishment has run out at `now`
    pub fn has_passed(&self, now: i64) -> bool {
        match self {
            Expiration::Permanent => false,
            Expiration::At(end) => *end <= now,
        }
    }
}

/// Enforcement state, for sources that track it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnforcementState {
    /// Currently enforced
    Active,

    /// Ran out on its own
    Expired,

    /// Lifted by a staff member
    Undone,
}

impl EnforcementState {
    /// Get the state name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            EnforcementState::Active => "active",
            EnforcementState::Expired => "expired",
            EnforcementState::Undone => "undone",
        }
    }

    /// Parse a state from a string (internal use)
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "active" => Some(EnforcementState::Active),
            "expired" => Some(EnforcementState::Expired),
            "undone" => Some(EnforcementState::Undone),
            _ => None,
        }
    }
}

/// Everything a source records about the punishment itself
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KnownDetails {
    /// Ban, mute, warn or kick
    pub kind: PunishmentType,

    /// Free-form reason text
    pub reason: String,

    /// Where the punishment applies
    pub scope: Scope,

    /// Start time (Unix seconds)
    pub start: i64,

    /// End time or permanent marker
    pub expiration: Expiration,

    /// Enforcement state, `None` if the source does not track it
    pub state: Option<EnforcementState>,
}

impl KnownDetails {
    /// Create details for a global punishment with no tracked state
    pub fn new(kind: PunishmentType, reason: impl Into<String>, start: i64, expiration: Expiration) -> Self {
        Self {
            kind,
            reason: reason.into(),
            scope: Scope::Global,
            start,
            expiration,
            state: None,
        }
    }

    /// Set the scope
    pub fn with_scope(mut self, scope: Scope) -> Self {
        self.scope = scope;
        self
    }

    /// Set the enforcement state
    pub fn with_state(mut self, state: EnforcementState) -> Self {
        self.state = Some(state);
        self
    }
}

/// The intermediate punishment record
///
/// Source adapters produce these; the reconciliation engine compares them;
/// the destination store persists them. Two records are equal iff their
/// details, victim and operator are all field-wise equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PortablePunishment {
    /// What, why, where and when
    pub details: KnownDetails,

    /// Who was punished
    pub victim: Victim,

    /// Who issued it
    pub operator: Operator,
}

impl PortablePunishment {
    /// Create a new record
    pub fn new(details: KnownDetails, victim: Victim, operator: Operator) -> Self {
        Self {
            details,
            victim,
            operator,
        }
    }

    /// Punishment kind
    pub fn kind(&self) -> PunishmentType {
        self.details.kind
    }

    /// Start time (Unix seconds)
    pub fn start(&self) -> i64 {
        self.details.start
    }
}
