//! Warden Import Pipeline
//!
//! Moves punishments from a legacy plugin's storage into the unified store,
//! collapsing records that mean the same punishment.
//!
//! # Overview
//!
//! An [`ImportJob`] pulls records from one
//! [`SourceAdapter`](warden_sources::SourceAdapter), resolves each against
//! the batch being built and everything already imported from that source,
//! and commits batches in source order, one transaction each.
//!
//! # Architecture
//!
//! ```text
//! Adapter thread → bounded queue → resolve → PendingBatch → DestinationWriter → store
//!                                     ↑                                          |
//!                                     +----------- ReconciliationIndex ←---------+
//! ```
//!
//! # Key Features
//!
//! - **Per-source policies**: what counts as "the same punishment" comes from
//!   the source's [`UniquenessPolicy`](warden_domain::UniquenessPolicy) alone
//! - **Idempotent**: provenance of every imported record makes re-runs no-ops
//! - **Bounded**: memory on the source side is capped by the batch size and
//!   queue capacity
//! - **Contained failures**: a batch that fails twice marks only its own
//!   records failed; the job goes on
//! - **Cancellable**: between batches, keeping everything committed
//!
//! # Example Usage
//!
//! ```no_run
//! use std::sync::{Arc, Mutex};
//! use warden_import::{ImportConfig, ImportJob};
//! use warden_sources::{open_adapter, NoResolver};
//! use warden_domain::SourceKind;
//! use warden_store::SqliteStore;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = Arc::new(Mutex::new(SqliteStore::new("warden.db")?));
//! let config = Arc::new(ImportConfig::default());
//! let adapter = open_adapter(
//!     SourceKind::LiteBans,
//!     "litebans.db".as_ref(),
//!     Arc::new(NoResolver),
//!     config.page_size,
//! );
//!
//! let handle = ImportJob::new(store, config).spawn(adapter);
//! let report = handle.wait().await?;
//!
//! println!("Accepted: {}", report.accepted);
//! println!("Replaced: {}", report.replaced);
//! println!("Rejected: {}", report.rejected);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

pub mod batch;
pub mod config;
pub mod error;
pub mod index;
pub mod job;
pub mod report;
pub mod resolver;
pub mod state;
pub mod writer;

pub use config::{ConfigWatcher, ImportConfig, CONFIG_VERSION};
pub use error::ImportError;
pub use job::{cancellation, CancelHandle, CancelToken, ImportJob, JobHandle};
pub use report::{FailedRecord, FailureReason, ImportReport, JobOutcome};
pub use resolver::{resolve, Existing, Resolution};
pub use state::{JobState, StateMachine};
