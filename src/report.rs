//! Migration counters and the end-of-run summary.

use crate::migrator::BookOutcome;
use chrono::{DateTime, Utc};
use log::info;
use serde::Serialize;
use std::fmt;

/// Counters accumulated over one migration run.
///
/// Counts only ever increase. Every book that passes the author filter adds
/// one to `total` and one to exactly one of the outcome counters.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MigrationStats {
    pub total: usize,
    pub migrated: usize,
    pub skipped: usize,
    pub errors: usize,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl Default for MigrationStats {
    fn default() -> Self {
        Self::new()
    }
}

impl MigrationStats {
    /// Starts a new run at the current time.
    pub fn new() -> Self {
        Self {
            total: 0,
            migrated: 0,
            skipped: 0,
            errors: 0,
            started_at: Utc::now(),
            finished_at: None,
        }
    }

    /// Counts one considered book and its outcome.
    pub fn record(&mut self, outcome: &BookOutcome) {
        self.total += 1;
        match outcome {
            BookOutcome::Migrated(_) => self.migrated += 1,
            BookOutcome::Skipped(_) => self.skipped += 1,
            BookOutcome::Errored(_) => self.errors += 1,
        }
    }

    /// Marks the run as finished.
    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }

    /// Percentage of considered books that were migrated, or `None` if no
    /// book was considered.
    pub fn success_rate(&self) -> Option<f64> {
        if self.total == 0 {
            None
        } else {
            Some(self.migrated as f64 / self.total as f64 * 100.0)
        }
    }
}

/// Rendered view of a run's statistics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub total: usize,
    pub migrated: usize,
    pub skipped: usize,
    pub errors: usize,
    /// `None` when no books were processed.
    pub success_rate: Option<f64>,
    /// Wall-clock duration in seconds, once the run has finished.
    pub elapsed_seconds: Option<f64>,
}

/// Builds the summary for a set of statistics.
pub fn summarize(stats: &MigrationStats) -> Summary {
    Summary {
        total: stats.total,
        migrated: stats.migrated,
        skipped: stats.skipped,
        errors: stats.errors,
        success_rate: stats.success_rate(),
        elapsed_seconds: stats
            .finished_at
            .map(|end| (end - stats.started_at).num_milliseconds() as f64 / 1000.0),
    }
}

impl Summary {
    /// The success-rate line, explicit about the empty case.
    pub fn success_rate_line(&self) -> String {
        match self.success_rate {
            Some(rate) => format!("Success rate: {:.1}%", rate),
            None => "Success rate: n/a (no books processed)".to_string(),
        }
    }

    /// Summary body without the heading, one entry per line.
    pub fn lines(&self) -> Vec<String> {
        let mut lines = vec![
            format!("Total books found: {}", self.total),
            format!("Books migrated: {}", self.migrated),
            format!("Books skipped: {}", self.skipped),
            format!("Errors: {}", self.errors),
            self.success_rate_line(),
        ];
        if let Some(secs) = self.elapsed_seconds {
            lines.push(format!("Elapsed: {:.1}s", secs));
        }
        lines
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Migration Summary:")?;
        for line in self.lines() {
            writeln!(f, "  {}", line)?;
        }
        Ok(())
    }
}

/// Writes the summary to the log at info level.
pub fn log_summary(stats: &MigrationStats) {
    let summary = summarize(stats);
    info!("Migration Summary:");
    for line in summary.lines() {
        info!("  {}", line);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::migrator::{BookMigration, MigrateError, SkipReason};
    use std::path::PathBuf;

    fn migrated() -> BookOutcome {
        BookOutcome::Migrated(BookMigration {
            group_dir: PathBuf::from("/dest/A"),
            placements: Vec::new(),
        })
    }

    #[test]
    fn test_record_counts_each_outcome() {
        let mut stats = MigrationStats::new();
        stats.record(&migrated());
        stats.record(&BookOutcome::Skipped(SkipReason::NoSupportedFiles(
            PathBuf::from("/src/A/T (1)"),
        )));
        stats.record(&BookOutcome::Errored(MigrateError::FileCopy {
            source_path: PathBuf::from("a"),
            destination: PathBuf::from("b"),
            source: std::io::Error::other("disk full"),
        }));

        assert_eq!(stats.total, 3);
        assert_eq!(stats.migrated, 1);
        assert_eq!(stats.skipped, 1);
        assert_eq!(stats.errors, 1);
    }

    #[test]
    fn test_success_rate_zero_total() {
        let stats = MigrationStats::new();
        assert_eq!(stats.success_rate(), None);

        let summary = summarize(&stats);
        assert_eq!(
            summary.success_rate_line(),
            "Success rate: n/a (no books processed)"
        );
    }

    #[test]
    fn test_success_rate_one_decimal() {
        let mut stats = MigrationStats::new();
        stats.record(&migrated());
        stats.record(&migrated());
        stats.record(&BookOutcome::Skipped(SkipReason::MissingSourceDirectory(
            PathBuf::from("/src/gone"),
        )));

        let summary = summarize(&stats);
        assert_eq!(summary.success_rate_line(), "Success rate: 66.7%");
    }

    #[test]
    fn test_display_renders_all_counters() {
        let mut stats = MigrationStats::new();
        stats.record(&migrated());
        let rendered = summarize(&stats).to_string();

        assert!(rendered.starts_with("Migration Summary:\n"));
        assert!(rendered.contains("  Total books found: 1\n"));
        assert!(rendered.contains("  Books migrated: 1\n"));
        assert!(rendered.contains("  Books skipped: 0\n"));
        assert!(rendered.contains("  Errors: 0\n"));
        assert!(rendered.contains("  Success rate: 100.0%\n"));
        assert!(!rendered.contains("Elapsed"));
    }

    #[test]
    fn test_elapsed_reported_after_finish() {
        let mut stats = MigrationStats::new();
        stats.finish();
        let summary = summarize(&stats);
        assert!(summary.elapsed_seconds.is_some());
        assert!(summary.lines().iter().any(|l| l.starts_with("Elapsed: ")));
    }

    #[test]
    fn test_summary_serializes_to_json() {
        let summary = summarize(&MigrationStats::new());
        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["total"], 0);
        assert!(json["success_rate"].is_null());
    }
}
