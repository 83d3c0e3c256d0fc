//! Import jobs
//!
//! A job moves one source into the destination store. The adapter runs on a
//! blocking thread and feeds a bounded queue; the job drains the queue into
//! batches, resolves every record against the batch and the reconciliation
//! index, and commits each batch in its own transaction.

use crate::batch::{Disposition, PendingBatch, WriteOp};
use crate::index::ReconciliationIndex;
use crate::report::{FailedRecord, FailureReason, ImportReport, JobOutcome};
use crate::resolver::{resolve, Existing, Resolution};
use crate::state::{JobState, StateMachine};
use crate::writer::{DestinationWriter, OpOutcome};
use crate::{ImportConfig, ImportError};
use std::fmt::Display;
use std::sync::{Arc, Mutex};
use std::time::{Instant, SystemTime, UNIX_EPOCH};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use warden_domain::traits::PunishmentStore;
use warden_domain::{SourceKind, UniquenessPolicy};
use warden_sources::{SourceAdapter, SourceError, SourceItem, SourceRecord};

type QueueItem = Result<SourceItem, SourceError>;

/// Create a linked cancellation handle and token
pub fn cancellation() -> (CancelHandle, CancelToken) {
    let (tx, rx) = watch::channel(false);
    (CancelHandle { tx: Arc::new(tx) }, CancelToken { rx })
}

/// Requests cancellation of a running job
#[derive(Debug, Clone)]
pub struct CancelHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl CancelHandle {
    /// Ask the job to stop after the batch in progress
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }
}

/// Observed by a job to learn it should stop
#[derive(Debug, Clone)]
pub struct CancelToken {
    rx: watch::Receiver<bool>,
}

impl CancelToken {
    /// Whether cancellation was requested
    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once cancellation is requested
    ///
    /// Never resolves if every handle was dropped without cancelling.
    pub async fn cancelled(&mut self) {
        loop {
            if *self.rx.borrow_and_update() {
                return;
            }
            if self.rx.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }
}

/// A job running in the background
pub struct JobHandle {
    cancel: CancelHandle,
    task: JoinHandle<Result<ImportReport, ImportError>>,
}

impl JobHandle {
    /// Ask the job to stop after the batch in progress
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// A handle that cancels this job, e.g. from a signal handler
    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    /// Wait for the job to finish
    pub async fn wait(self) -> Result<ImportReport, ImportError> {
        self.task.await?
    }
}

/// How a batch fill ended
enum Fill {
    /// The batch reached its size limit
    Full,
    /// The job must stop once the batch is committed
    Stop(JobOutcome),
}

/// Imports one source into a shared destination store
///
/// # Examples
///
/// ```no_run
/// use std::sync::{Arc, Mutex};
/// use warden_import::{cancellation, ImportConfig, ImportJob};
/// use warden_sources::{open_adapter, NoResolver};
/// use warden_domain::SourceKind;
/// use warden_store::SqliteStore;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let store = Arc::new(Mutex::new(SqliteStore::new("warden.db")?));
///     let config = Arc::new(ImportConfig::default());
///     let adapter = open_adapter(
///         SourceKind::AdvancedBan,
///         "advancedban.db".as_ref(),
///         Arc::new(NoResolver),
///         config.page_size,
///     );
///
///     let (_cancel, token) = cancellation();
///     let report = ImportJob::new(store, config).run(adapter, token).await?;
///     println!("{}", report.summary());
///     Ok(())
/// }
/// ```
pub struct ImportJob<S> {
    store: Arc<Mutex<S>>,
    config: Arc<ImportConfig>,
}

impl<S> ImportJob<S>
where
    S: PunishmentStore + Send + 'static,
    S::Error: Display,
{
    /// Create a job writing to `store` with a configuration snapshot
    pub fn new(store: Arc<Mutex<S>>, config: Arc<ImportConfig>) -> Self {
        Self { store, config }
    }

    /// Run in the background
    pub fn spawn(self, adapter: Box<dyn SourceAdapter>) -> JobHandle {
        let (cancel, token) = cancellation();
        let task = tokio::spawn(async move { self.run(adapter, token).await });
        JobHandle { cancel, task }
    }

    /// Run to the end of the source, a source failure, or cancellation
    ///
    /// Returns `Err` only if the job could not start or broke its own
    /// lifecycle; every other problem is reported in the [`ImportReport`].
    pub async fn run(&self, adapter: Box<dyn SourceAdapter>, mut cancel: CancelToken) -> Result<ImportReport, ImportError> {
        let started = Instant::now();
        let started_at = unix_now();
        let source = adapter.kind();
        let policy = adapter.policy();
        let mut state = StateMachine::new();
        let mut report = ImportReport::new(source);

        let mut index = match self.load_index(source, policy).await {
            Ok(index) => index,
            Err(e) => {
                error!(source = %source, error = %e, "Could not read destination state");
                state.transition(JobState::Failed)?;
                return Err(e);
            }
        };

        info!(
            source = %source,
            policy = ?policy,
            batch_size = self.config.batch_size,
            known = index.provenance_count(),
            "Import started"
        );
        state.transition(JobState::Streaming)?;

        let (tx, mut rx) = mpsc::channel::<QueueItem>(self.config.queue_capacity);
        let producer = tokio::task::spawn_blocking(move || produce(adapter, tx));
        let writer = DestinationWriter::new(Arc::clone(&self.store), source);
        let mut pending = PendingBatch::new(policy);

        let outcome = loop {
            if cancel.is_cancelled() {
                break JobOutcome::Failed(FailureReason::Cancelled);
            }

            let fill = loop {
                if pending.record_count() >= self.config.batch_size {
                    break Fill::Full;
                }
                let item = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => break Fill::Stop(JobOutcome::Failed(FailureReason::Cancelled)),
                    item = rx.recv() => item,
                };
                match item {
                    None => break Fill::Stop(JobOutcome::Completed),
                    Some(Err(e)) => {
                        error!(source = %source, error = %e, "Source failed mid-stream");
                        break Fill::Stop(JobOutcome::Failed(FailureReason::Source(e.to_string())));
                    }
                    Some(Ok(SourceItem::Malformed { native_id, reason })) => {
                        warn!(source = %source, native_id = ?native_id, reason = %reason, "Skipping malformed record");
                        report.malformed += 1;
                    }
                    Some(Ok(SourceItem::Record(mut record))) => {
                        record.native_id = index.distinct_native(record.native_id);
                        stage(record, policy, &mut pending, &index, &mut report);
                    }
                }
            };

            self.commit(&writer, &mut pending, &mut index, &mut report, &mut state)
                .await?;

            if let Fill::Stop(outcome) = fill {
                break outcome;
            }
        };

        drop(rx);
        if let Err(e) = producer.await {
            warn!(source = %source, error = %e, "Source reader did not shut down cleanly");
        }

        match &outcome {
            JobOutcome::Completed => state.transition(JobState::Completed)?,
            JobOutcome::Failed(_) => state.transition(JobState::Failed)?,
        }
        report.outcome = outcome;
        report.elapsed = started.elapsed();

        info!(
            source = %source,
            outcome = %report.outcome.label(),
            accepted = report.accepted,
            replaced = report.replaced,
            rejected = report.rejected,
            failed = report.permanently_failed,
            malformed = report.malformed,
            "Import finished"
        );

        let run = report.to_run_summary(started_at, unix_now());
        let store = Arc::clone(&self.store);
        let recorded = tokio::task::spawn_blocking(move || with_store(&store, |s| s.record_run(&run))).await;
        match recorded {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(source = %source, error = %e, "Failed to record run history"),
            Err(e) => warn!(source = %source, error = %e, "Failed to record run history"),
        }

        Ok(report)
    }

    async fn load_index(&self, source: SourceKind, policy: UniquenessPolicy) -> Result<ReconciliationIndex, ImportError> {
        let store = Arc::clone(&self.store);
        tokio::task::spawn_blocking(move || {
            let provenance = with_store(&store, |s| s.provenance_for_source(source))?;
            let entries = with_store(&store, |s| s.entries_for_source(source))?;
            Ok::<_, ImportError>(ReconciliationIndex::from_snapshot(source, policy, provenance, entries))
        })
        .await?
    }

    /// Commit the pending batch, retrying once if configured
    async fn commit(
        &self,
        writer: &DestinationWriter<S>,
        pending: &mut PendingBatch,
        index: &mut ReconciliationIndex,
        report: &mut ImportReport,
        state: &mut StateMachine,
    ) -> Result<(), ImportError> {
        if pending.is_empty() {
            pending.take();
            return Ok(());
        }

        state.transition(JobState::Committing)?;
        let records = pending.record_count();
        let ops = Arc::new(pending.take());
        let attempts = self.config.attempts_per_batch();
        let mut last_error = String::new();

        for attempt in 1..=attempts {
            match writer.commit(Arc::clone(&ops)).await {
                Ok(outcomes) => {
                    tally(report, &ops, &outcomes);
                    index.apply(&ops, &outcomes);
                    report.batches_committed += 1;
                    debug!(
                        batch = report.batches_committed,
                        ops = ops.len(),
                        records,
                        "Batch committed"
                    );
                    return state.transition(JobState::Streaming);
                }
                Err(e) => {
                    warn!(attempt, attempts, ops = ops.len(), error = %e, "Batch commit failed");
                    last_error = e.to_string();
                }
            }
        }

        error!(ops = ops.len(), error = %last_error, "Batch failed permanently");
        for native_id in ops.iter().flat_map(|op| op.native_ids()) {
            report.permanently_failed += 1;
            report.failures.push(FailedRecord {
                native_id: native_id.clone(),
                error: last_error.clone(),
            });
        }
        state.transition(JobState::Streaming)
    }
}

/// Fold one record into the pending batch
///
/// Records that need no write at all are counted straight away.
fn stage(
    record: SourceRecord,
    policy: UniquenessPolicy,
    pending: &mut PendingBatch,
    index: &ReconciliationIndex,
    report: &mut ImportReport,
) {
    let resolution = resolve(&record, policy, pending, index);
    let SourceRecord {
        native_id,
        punishment,
    } = record;

    match resolution {
        Resolution::Accept => {
            pending.push_insert(native_id, punishment);
        }
        Resolution::RejectAsDuplicate(Existing::Pending(op)) => {
            pending.absorb_into(op, native_id, punishment);
        }
        Resolution::RejectAsDuplicate(Existing::Entry(entry_id)) => {
            if index.is_unchanged(&native_id, &punishment) {
                pending.count_skipped();
                report.rejected += 1;
            } else {
                pending.push_absorb(entry_id, native_id, punishment);
            }
        }
        Resolution::ReplaceExisting(Existing::Pending(op)) => {
            pending.supersede(op, native_id, punishment);
        }
        Resolution::ReplaceExisting(Existing::Entry(entry_id)) => {
            pending.push_replace(entry_id, native_id, punishment);
        }
    }
}

/// Count a committed batch into the report
///
/// Only records whose details an entry now holds are listed as unresolved;
/// a placeholder that lost to another record needs no follow-up.
fn tally(report: &mut ImportReport, ops: &[WriteOp], outcomes: &[OpOutcome]) {
    for (op, outcome) in ops.iter().zip(outcomes) {
        match outcome {
            OpOutcome::Inserted(_) => report.accepted += 1,
            OpOutcome::Replaced(_) => report.replaced += 1,
            OpOutcome::Absorbed(_) => report.rejected += 1,
        }
        let (native_id, punishment) = op.primary();
        if !matches!(outcome, OpOutcome::Absorbed(_)) && punishment.victim.is_unresolved() {
            warn!(
                source = %report.source,
                native_id = %native_id,
                victim = %punishment.victim,
                "Victim identity unresolved, imported with placeholder"
            );
            report.unresolved_identities.push(native_id.clone());
        }
        for absorbed in op.absorbed() {
            match absorbed.disposition {
                Disposition::Rejected => report.rejected += 1,
                Disposition::Superseded => report.replaced += 1,
            }
        }
    }
}

/// Feed the adapter's stream into the queue until it ends or the job stops
fn produce(adapter: Box<dyn SourceAdapter>, tx: mpsc::Sender<QueueItem>) {
    let kind = adapter.kind();
    let stream = match adapter.into_stream() {
        Ok(stream) => stream,
        Err(e) => {
            let _ = tx.blocking_send(Err(e));
            return;
        }
    };

    for item in stream {
        let failed = item.is_err();
        if tx.blocking_send(item).is_err() {
            debug!(source = %kind, "Import stopped, closing source");
            return;
        }
        if failed {
            return;
        }
    }
}

fn with_store<S, T>(store: &Mutex<S>, f: impl FnOnce(&mut S) -> Result<T, S::Error>) -> Result<T, ImportError>
where
    S: PunishmentStore,
    S::Error: Display,
{
    let mut guard = store
        .lock()
        .map_err(|_| ImportError::Store("store mutex poisoned".to_string()))?;
    f(&mut guard).map_err(|e| ImportError::Store(e.to_string()))
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
