//! Warden Domain Layer
//!
//! This crate contains the canonical punishment model shared by every legacy
//! source adapter, the reconciliation engine and the destination store. It
//! depends only on `uuid` and `serde`, and defines the value objects and trait
//! interfaces that all other layers depend upon.
//!
//! ## Key Concepts
//!
//! - **PortablePunishment**: The intermediate record every legacy format is translated into
//! - **Victim / Operator**: Who was punished, and by whom
//! - **UniquenessPolicy**: A legacy source's definition of "the same punishment"
//! - **ProvenanceRecord**: Links a destination entry back to the legacy record it came from
//! - **PunishmentEntry**: A row of the unified punishment store, with a stable [`EntryId`]
//!
//! ## Architecture
//!
//! - Pure data and pure functions only
//! - Infrastructure implementations live in other crates
//! - Trait definitions for all external interactions

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod entry;
pub mod operator;
pub mod provenance;
pub mod punishment;
pub mod run;
pub mod source;
pub mod traits;
pub mod uniqueness;
pub mod victim;

// Re-exports for convenience
pub use entry::{EntryId, Origin, PunishmentEntry};
pub use operator::Operator;
pub use provenance::ProvenanceRecord;
pub use punishment::{
    EnforcementState, Expiration, KnownDetails, PortablePunishment, PunishmentType, Scope,
};
pub use run::RunSummary;
pub use source::{NativeId, SourceKind};
pub use uniqueness::{UniquenessKey, UniquenessPolicy};
pub use victim::{NetworkAddress, Victim};
