//! Operator module - who issued a punishment

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Who issued a punishment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operator {
    /// A staff member with a stable identity
    Player(Uuid),

    /// The server console or an automated system
    Console,

    /// The source recorded an operator that could not be identified
    Unknown,
}

impl Operator {
    /// Storage label for the operator variant
    pub fn type_label(&self) -> &'static str {
        match self {
            Operator::Player(_) => "player",
            Operator::Console => "console",
            Operator::Unknown => "unknown",
        }
    }

    /// The staff member's identity, if any
    pub fn uuid(&self) -> Option<Uuid> {
        match self {
            Operator::Player(uuid) => Some(*uuid),
            _ => None,
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operator::Player(uuid) => write!(f, "{}", uuid),
            Operator::Console => f.write_str("console"),
            Operator::Unknown => f.write_str("unknown"),
        }
    }
}
