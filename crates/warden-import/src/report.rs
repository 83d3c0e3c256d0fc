//! Import job results

use serde::Serialize;
use std::time::Duration;
use warden_domain::{NativeId, RunSummary, SourceKind};

/// Why a job stopped early
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", content = "detail", rename_all = "snake_case")]
pub enum FailureReason {
    /// The source could not be read to the end
    Source(String),

    /// The job was cancelled
    Cancelled,
}

/// How a job ended
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "failure", rename_all = "snake_case")]
pub enum JobOutcome {
    /// Source exhausted, every batch resolved
    Completed,

    /// Stopped early; committed batches are kept
    Failed(FailureReason),
}

impl JobOutcome {
    /// Short label for run history
    pub fn label(&self) -> String {
        match self {
            JobOutcome::Completed => "completed".to_string(),
            JobOutcome::Failed(FailureReason::Cancelled) => "failed: cancelled".to_string(),
            JobOutcome::Failed(FailureReason::Source(e)) => format!("failed: {}", e),
        }
    }
}

/// A record that could not be written even after retrying
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedRecord {
    /// The record's native id
    pub native_id: NativeId,
    /// The last write error of its batch
    pub error: String,
}

/// Result of one import job
///
/// Every translated record ends up in exactly one of `accepted`, `replaced`,
/// `rejected` or `permanently_failed`.
#[derive(Debug, Clone, Serialize)]
pub struct ImportReport {
    /// Source imported from
    pub source: SourceKind,

    /// How the job ended
    pub outcome: JobOutcome,

    /// Records that created a new entry
    pub accepted: usize,

    /// Records whose details were overwritten by a newer record, or that
    /// overwrote a committed entry
    pub replaced: usize,

    /// Records found to duplicate something already known
    pub rejected: usize,

    /// Records whose batch failed twice
    pub permanently_failed: usize,

    /// The permanently failed records
    pub failures: Vec<FailedRecord>,

    /// Records imported with the unresolved-name placeholder
    pub unresolved_identities: Vec<NativeId>,

    /// Source records that could not be translated
    pub malformed: usize,

    /// Batches written to the destination
    pub batches_committed: usize,

    /// Wall-clock run time
    pub elapsed: Duration,
}

impl ImportReport {
    /// Empty report for a job on `source`
    pub fn new(source: SourceKind) -> Self {
        Self {
            source,
            outcome: JobOutcome::Completed,
            accepted: 0,
            replaced: 0,
            rejected: 0,
            permanently_failed: 0,
            failures: Vec::new(),
            unresolved_identities: Vec::new(),
            malformed: 0,
            batches_committed: 0,
            elapsed: Duration::ZERO,
        }
    }

    /// Translated records accounted for
    pub fn total(&self) -> usize {
        self.accepted + self.replaced + self.rejected + self.permanently_failed
    }

    /// Whether the job ran to the end of the source
    pub fn is_completed(&self) -> bool {
        self.outcome == JobOutcome::Completed
    }

    /// Condense into a run history row
    pub fn to_run_summary(&self, started_at: u64, finished_at: u64) -> RunSummary {
        RunSummary {
            source: self.source,
            started_at,
            finished_at,
            outcome: self.outcome.label(),
            accepted: self.accepted,
            replaced: self.replaced,
            rejected: self.rejected,
            failed: self.permanently_failed,
        }
    }

    /// Generate a summary report
    pub fn summary(&self) -> String {
        let mut lines = vec![
            format!("Import from {}: {}", self.source, self.outcome.label()),
            format!("  Accepted: {}", self.accepted),
            format!("  Replaced: {}", self.replaced),
            format!("  Rejected: {}", self.rejected),
            format!("  Failed: {}", self.permanently_failed),
        ];
        if self.malformed > 0 {
            lines.push(format!("  Malformed (skipped): {}", self.malformed));
        }
        if !self.unresolved_identities.is_empty() {
            lines.push(format!("  Unresolved identities: {}", self.unresolved_identities.len()));
        }
        lines.push(format!(
            "  Batches: {} in {:.2}s",
            self.batches_committed,
            self.elapsed.as_secs_f64()
        ));
        lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_labels() {
        assert_eq!(JobOutcome::Completed.label(), "completed");
        assert_eq!(JobOutcome::Failed(FailureReason::Cancelled).label(), "failed: cancelled");
        assert_eq!(
            JobOutcome::Failed(FailureReason::Source("disk gone".into())).label(),
            "failed: disk gone"
        );
    }

    #[test]
    fn test_run_summary_copies_counts() {
        let mut report = ImportReport::new(SourceKind::LiteBans);
        report.accepted = 4;
        report.replaced = 1;
        report.rejected = 2;
        report.permanently_failed = 3;

        let run = report.to_run_summary(10, 20);
        assert_eq!(run.accepted, 4);
        assert_eq!(run.failed, 3);
        assert_eq!(run.outcome, "completed");
        assert_eq!(report.total(), 10);
    }

    #[test]
    fn test_report_serializes_to_json() {
        let mut report = ImportReport::new(SourceKind::Vanilla);
        report.outcome = JobOutcome::Failed(FailureReason::Cancelled);
        report.unresolved_identities.push(NativeId::new("player:steve"));

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["source"], "vanilla");
        assert_eq!(json["outcome"]["outcome"], "failed");
        assert_eq!(json["outcome"]["failure"]["reason"], "cancelled");
        assert_eq!(json["unresolved_identities"][0], "player:steve");
    }
}
