//! Console output for the command-line front end.
//!
//! Diagnostics go through the `log` facade; this module covers what the user
//! reads directly: colored status lines, the progress bar and the final
//! summary table.

use crate::report::Summary;
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};

/// Manages CLI output with consistent styling.
pub struct OutputFormatter;

impl OutputFormatter {
    /// Prints a success message in green with a checkmark.
    ///
    /// ```no_run
    /// use calibre2komga::output::OutputFormatter;
    /// OutputFormatter::success("Migration complete");
    /// ```
    pub fn success(message: &str) {
        println!("{} {}", "✓".green(), message);
    }

    /// Prints an error message in red with an X mark.
    pub fn error(message: &str) {
        eprintln!("{} {}", "✗".red(), message);
    }

    /// Prints a warning message in yellow with a warning symbol.
    pub fn warning(message: &str) {
        println!("{} {}", "⚠".yellow(), message);
    }

    /// Prints an info message in cyan.
    pub fn info(message: &str) {
        println!("{}", message.cyan());
    }

    /// Prints a section header.
    pub fn header(header: &str) {
        println!("\n{}", header.bold());
    }

    /// Creates a progress bar for `total` books.
    pub fn create_progress_bar(total: u64) -> ProgressBar {
        let pb = ProgressBar::new(total);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.cyan} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .expect("Invalid progress bar template")
                .progress_chars("█▓░"),
        );
        pb
    }

    /// Prints the end-of-run summary as an aligned table.
    pub fn summary_table(summary: &Summary) {
        Self::header("MIGRATION SUMMARY");

        let rows = [
            ("Total books", summary.total.to_string().normal()),
            ("Migrated", summary.migrated.to_string().green()),
            ("Skipped", Self::highlight_nonzero(summary.skipped, |s| s.yellow())),
            ("Errors", Self::highlight_nonzero(summary.errors, |s| s.red())),
        ];

        let width = rows
            .iter()
            .map(|(label, _)| label.len())
            .max()
            .unwrap_or(0)
            .max("Success rate".len());

        println!("{}", "-".repeat(width + 12));
        for (label, value) in &rows {
            println!("{:<width$} | {}", label, value, width = width);
        }
        println!("{}", "-".repeat(width + 12));

        let rate = match summary.success_rate {
            Some(rate) => format!("{:.1}%", rate).bold(),
            None => "n/a (no books processed)".dimmed(),
        };
        println!("{:<width$} | {}", "Success rate".bold(), rate, width = width);

        if let Some(secs) = summary.elapsed_seconds {
            println!("{:<width$} | {:.1}s", "Elapsed", secs, width = width);
        }
    }

    /// Prints a dry-run notice message.
    pub fn dry_run_notice(message: &str) {
        println!("{}", format!("[DRY RUN] {}", message).yellow());
    }

    fn highlight_nonzero(count: usize, style: fn(ColoredString) -> ColoredString) -> ColoredString {
        let text = count.to_string().normal();
        if count > 0 { style(text) } else { text }
    }
}
