//! Import run history

use crate::SourceKind;

/// Summary of one finished import job, kept in the store's run history
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    /// Source family imported
    pub source: SourceKind,

    /// Job start (Unix seconds)
    pub started_at: u64,

    /// Job end (Unix seconds)
    pub finished_at: u64,

    /// `completed`, or `failed: <reason>`
    pub outcome: String,

    /// Records inserted as new entries
    pub accepted: usize,

    /// Records that replaced an existing entry's details
    pub replaced: usize,

    /// Records rejected as duplicates
    pub rejected: usize,

    /// Records that could not be written
    pub failed: usize,
}
