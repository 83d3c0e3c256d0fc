//! Output formatting for the CLI.

use crate::config::OutputFormat;
use crate::error::Result;
use chrono::{DateTime, Utc};
use colored::*;
use tabled::{
    builder::Builder,
    settings::{object::Rows, Alignment, Modify, Style},
};
use warden_domain::{EnforcementState, Expiration, KnownDetails, PunishmentEntry, RunSummary};
use warden_import::ImportReport;

/// Output formatter.
pub struct Formatter {
    format: OutputFormat,
    color_enabled: bool,
}

impl Formatter {
    /// Create a new formatter.
    pub fn new(format: OutputFormat, color_enabled: bool) -> Self {
        Self {
            format,
            color_enabled,
        }
    }

    /// Format store entries.
    pub fn format_entries(&self, entries: &[PunishmentEntry]) -> Result<String> {
        match self.format {
            OutputFormat::Json => self.format_entries_json(entries),
            OutputFormat::Table => self.format_entries_table(entries),
            OutputFormat::Quiet => Ok(entries
                .iter()
                .map(|e| e.id.to_string())
                .collect::<Vec<_>>()
                .join("\n")),
        }
    }

    fn format_entries_json(&self, entries: &[PunishmentEntry]) -> Result<String> {
        let json: Vec<serde_json::Value> = entries
            .iter()
            .map(|e| {
                let details = &e.punishment.details;
                serde_json::json!({
                    "id": e.id.to_string(),
                    "kind": details.kind.as_str(),
                    "victim": e.punishment.victim.to_string(),
                    "operator": e.punishment.operator.to_string(),
                    "reason": details.reason,
                    "scope": details.scope.to_label(),
                    "start": details.start,
                    "end": details.expiration.end(),
                    "state": details.state.map(|s| s.as_str()),
                    "source": e.origin.source.as_str(),
                    "native_id": e.origin.native_id.as_str(),
                    "updated_at": e.updated_at,
                })
            })
            .collect();

        Ok(serde_json::to_string_pretty(&json)?)
    }

    fn format_entries_table(&self, entries: &[PunishmentEntry]) -> Result<String> {
        if entries.is_empty() {
            return Ok(self.colorize("No entries found.", "yellow"));
        }

        let mut builder = Builder::default();
        builder.push_record(["ID", "Kind", "Victim", "Operator", "Reason", "Start", "Ends", "State", "Origin"]);

        let now = Utc::now().timestamp();
        for entry in entries {
            let details = &entry.punishment.details;
            let ends = match details.expiration {
                Expiration::Permanent => "never".to_string(),
                Expiration::At(end) => format_time(end),
            };
            let mut id = entry.id.to_string();
            id.truncate(8);
            builder.push_record([
                id,
                details.kind.to_string(),
                entry.punishment.victim.to_string(),
                entry.punishment.operator.to_string(),
                details.reason.clone(),
                format_time(details.start),
                ends,
                state_label(details, now).to_string(),
                format!("{}/{}", entry.origin.source, entry.origin.native_id),
            ]);
        }

        let mut table = builder.build();
        table
            .with(Style::rounded())
            .with(Modify::new(Rows::first()).with(Alignment::center()));

        Ok(table.to_string())
    }

    /// Format the result of an import job.
    pub fn format_report(&self, report: &ImportReport) -> Result<String> {
        match self.format {
            OutputFormat::Json => Ok(serde_json::to_string_pretty(report)?),
            OutputFormat::Table => {
                let mut out = report.summary();
                for failure in &report.failures {
                    out.push('\n');
                    out.push_str(&self.warning(&format!("{}: {}", failure.native_id, failure.error)));
                }
                Ok(out)
            }
            OutputFormat::Quiet => Ok(format!(
                "{} {} {} {}",
                report.accepted, report.replaced, report.rejected, report.permanently_failed
            )),
        }
    }

    /// Format the run history.
    pub fn format_runs(&self, runs: &[RunSummary]) -> Result<String> {
        match self.format {
            OutputFormat::Json => {
                let json: Vec<serde_json::Value> = runs
                    .iter()
                    .map(|r| {
                        serde_json::json!({
                            "source": r.source.as_str(),
                            "started_at": r.started_at,
                            "finished_at": r.finished_at,
                            "outcome": r.outcome,
                            "accepted": r.accepted,
                            "replaced": r.replaced,
                            "rejected": r.rejected,
                            "failed": r.failed,
                        })
                    })
                    .collect();
                Ok(serde_json::to_string_pretty(&json)?)
            }
            OutputFormat::Table => {
                if runs.is_empty() {
                    return Ok(self.colorize("No import runs recorded.", "yellow"));
                }

                let mut builder = Builder::default();
                builder.push_record(["Started", "Source", "Outcome", "Accepted", "Replaced", "Rejected", "Failed"]);
                for run in runs {
                    builder.push_record([
                        format_time(run.started_at as i64),
                        run.source.to_string(),
                        run.outcome.clone(),
                        run.accepted.to_string(),
                        run.replaced.to_string(),
                        run.rejected.to_string(),
                        run.failed.to_string(),
                    ]);
                }

                let mut table = builder.build();
                table
                    .with(Style::rounded())
                    .with(Modify::new(Rows::first()).with(Alignment::center()));
                Ok(table.to_string())
            }
            OutputFormat::Quiet => Ok(runs
                .iter()
                .map(|r| format!("{} {}", r.source, r.outcome))
                .collect::<Vec<_>>()
                .join("\n")),
        }
    }

    /// Format a success message.
    pub fn success(&self, message: &str) -> String {
        self.colorize(&format!("✓ {}", message), "green")
    }

    /// Format an error message.
    pub fn error(&self, message: &str) -> String {
        self.colorize(&format!("✗ {}", message), "red")
    }

    /// Format an info message.
    pub fn info(&self, message: &str) -> String {
        self.colorize(&format!("ℹ {}", message), "blue")
    }

    /// Format a warning message.
    pub fn warning(&self, message: &str) -> String {
        self.colorize(&format!("⚠ {}", message), "yellow")
    }

    /// Colorize text if color is enabled.
    fn colorize(&self, text: &str, color: &str) -> String {
        if !self.color_enabled {
            return text.to_string();
        }

        match color {
            "red" => text.red().to_string(),
            "green" => text.green().to_string(),
            "blue" => text.blue().to_string(),
            "yellow" => text.yellow().to_string(),
            _ => text.to_string(),
        }
    }
}

/// Enforcement state as of `now`.
///
/// Stored states come from the legacy data; a punishment whose expiry has
/// since passed shows as expired unless it was lifted.
fn state_label(details: &KnownDetails, now: i64) -> &'static str {
    match details.state {
        Some(EnforcementState::Undone) => EnforcementState::Undone.as_str(),
        _ if details.expiration.has_passed(now) => EnforcementState::Expired.as_str(),
        Some(state) => state.as_str(),
        None => "-",
    }
}

/// Render Unix seconds as a UTC timestamp.
fn format_time(secs: i64) -> String {
    DateTime::from_timestamp(secs, 0)
        .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| secs.to_string())
}
