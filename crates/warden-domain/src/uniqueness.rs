//! Uniqueness policies - each legacy source's definition of "the same punishment"

use crate::{Operator, PortablePunishment, PunishmentType, Victim};

/// A source's uniqueness semantics
///
/// A small closed set; every legacy source maps onto exactly one variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UniquenessPolicy {
    /// Only structurally equal records are the same punishment.
    /// Concurrent punishments of the same type stay separate.
    Exact,

    /// Records for the same victim and type are the same punishment,
    /// unless the source allows concurrent punishments of one type.
    VictimAndKind {
        /// Keep concurrent punishments of the same type apart
        allow_concurrent: bool,
    },

    /// Records for the same victim, operator and type are the same
    /// punishment; timestamp and reason are ignored.
    VictimOperatorKind,
}

/// The fields a policy compares, derived per run and never persisted
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum UniquenessKey {
    /// Keyed by victim and type
    VictimKind {
        /// Victim
        victim: Victim,
        /// Punishment type
        kind: PunishmentType,
    },

    /// Keyed by victim, operator and type
    VictimOperatorKind {
        /// Victim
        victim: Victim,
        /// Operator
        operator: Operator,
        /// Punishment type
        kind: PunishmentType,
    },
}

impl UniquenessPolicy {
    /// Derive the uniqueness key of a record under this policy
    ///
    /// `None` means the policy only recognises exact duplicates.
    ///
    /// # Examples
    ///
    /// ```
    /// use warden_domain::*;
    /// use uuid::Uuid;
    ///
    /// let record = |reason: &str, start| PortablePunishment::new(
    ///     KnownDetails::new(PunishmentType::Ban, reason, start, Expiration::Permanent),
    ///     Victim::Player(Uuid::from_u128(1)),
    ///     Operator::Console,
    /// );
    /// let policy = UniquenessPolicy::VictimOperatorKind;
    /// assert_eq!(policy.key(&record("spam", 100)), policy.key(&record("spam again", 200)));
    /// assert_eq!(UniquenessPolicy::Exact.key(&record("spam", 100)), None);
    /// ```
    pub fn key(&self, record: &PortablePunishment) -> Option<UniquenessKey> {
        match self {
            UniquenessPolicy::Exact => None,
            UniquenessPolicy::VictimAndKind { allow_concurrent: true } => None,
            UniquenessPolicy::VictimAndKind { allow_concurrent: false } => {
                Some(UniquenessKey::VictimKind {
                    victim: record.victim.clone(),
                    kind: record.kind(),
                })
            }
            UniquenessPolicy::VictimOperatorKind => Some(UniquenessKey::VictimOperatorKind {
                victim: record.victim.clone(),
                operator: record.operator,
                kind: record.kind(),
            }),
        }
    }

    /// Whether two records are the same logical punishment under this policy
    pub fn collides(&self, a: &PortablePunishment, b: &PortablePunishment) -> bool {
        if a == b {
            return true;
        }
        match (self.key(a), self.key(b)) {
            (Some(ka), Some(kb)) => ka == kb,
            _ => false,
        }
    }
}
