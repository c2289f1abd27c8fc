//! Aggregated outcome of a backfill pass.

use crate::engine::{RecordOutcome, SkipReason};
use std::fmt;

const RULE_WIDTH: usize = 60;

/// Outcome of one candidate, keyed by job id when the record had one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordReport {
    pub job_id: Option<String>,
    pub outcome: RecordOutcome,
}

/// Counts for a completed pass.
///
/// `migrated + skipped + errors == total`, and `total` is the size of the
/// candidate set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MigrationSummary {
    pub migrated: usize,
    pub skipped: usize,
    pub errors: usize,
    pub total: usize,
    pub records: Vec<RecordReport>,
}

impl MigrationSummary {
    pub fn from_outcomes(
        outcomes: impl IntoIterator<Item = (Option<String>, RecordOutcome)>,
    ) -> Self {
        let mut summary = Self::default();
        for (job_id, outcome) in outcomes {
            match &outcome {
                RecordOutcome::Migrated { .. } => summary.migrated += 1,
                RecordOutcome::Skipped(_) => summary.skipped += 1,
                RecordOutcome::Error(_) => summary.errors += 1,
            }
            summary.total += 1;
            summary.records.push(RecordReport { job_id, outcome });
        }
        summary
    }

    pub fn skipped_by_reason(&self, reason: SkipReason) -> usize {
        self.records
            .iter()
            .filter(|r| r.outcome == RecordOutcome::Skipped(reason))
            .count()
    }

    /// Job ids that ended in an error, in processing order.
    pub fn failed_jobs(&self) -> impl Iterator<Item = &str> {
        self.records.iter().filter_map(|r| match r.outcome {
            RecordOutcome::Error(_) => Some(r.job_id.as_deref().unwrap_or("<missing job_id>")),
            _ => None,
        })
    }
}

impl fmt::Display for MigrationSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rule = "=".repeat(RULE_WIDTH);
        writeln!(f, "{}", rule)?;
        writeln!(f, "Migration Summary:")?;
        writeln!(f, "  Successfully migrated: {}", self.migrated)?;
        writeln!(
            f,
            "  Skipped: {} ({} without metadata file, {} not modified)",
            self.skipped,
            self.skipped_by_reason(SkipReason::MetadataFileNotFound),
            self.skipped_by_reason(SkipReason::NotModified)
        )?;
        writeln!(f, "  Errors: {}", self.errors)?;
        let failed: Vec<&str> = self.failed_jobs().collect();
        if !failed.is_empty() {
            writeln!(f, "    Failed jobs: {}", failed.join(", "))?;
        }
        writeln!(f, "  Total processed: {}", self.total)?;
        write!(f, "{}", rule)
    }
}
