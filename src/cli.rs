//! Command-line interface module for calibre2komga.
//!
//! This module handles all CLI-related functionality including:
//! - Argument parsing
//! - Logger setup
//! - Running the migration and presenting its summary
//! - Mapping failures to process exit codes

use crate::config::{ConfigError, MigrationConfig};
use crate::migrator::{MigrateError, Migrator};
use crate::output::OutputFormatter;
use crate::report::{MigrationStats, summarize};
use clap::Parser;
use log::LevelFilter;
use std::path::PathBuf;
use thiserror::Error;

const EXAMPLES: &str = "\
Examples:
  # Basic migration
  calibre2komga /path/to/calibre/library /path/to/komga/library

  # Dry run to see what would be migrated
  calibre2komga /path/to/calibre/library /path/to/komga/library --dry-run

  # Migrate only a specific author
  calibre2komga /path/to/calibre/library /path/to/komga/library --author \"Isaac Asimov\"

  # Enable debug logging
  calibre2komga /path/to/calibre/library /path/to/komga/library --verbose";

/// Command-line arguments.
#[derive(Parser, Debug, Clone)]
#[command(name = "calibre2komga")]
#[command(about = "Migrate ebooks from Calibre to Komga folder structure")]
#[command(version, after_help = EXAMPLES)]
pub struct Cli {
    /// Path to the Calibre library directory
    pub source_path: PathBuf,

    /// Path to the Komga library directory (created if it does not exist)
    pub destination_path: PathBuf,

    /// Show what would be migrated without copying files
    #[arg(long)]
    pub dry_run: bool,

    /// Only migrate authors whose name contains this text (case insensitive)
    #[arg(long, value_name = "NAME")]
    pub author: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Path to a TOML configuration file
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Print the summary as JSON instead of a table
    #[arg(long)]
    pub json: bool,

    /// Show a progress bar while migrating
    #[arg(long)]
    pub progress: bool,
}

/// Failures that end the program with a non-zero exit code.
#[derive(Error, Debug)]
pub enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Migrate(#[from] MigrateError),

    #[error("failed to render summary: {0}")]
    Output(#[from] serde_json::Error),
}

impl CliError {
    /// Process exit code: 3 invalid source, 4 catalog failure, 5 bad
    /// configuration, 1 anything else.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) => 5,
            Self::Migrate(e) => e.exit_code(),
            Self::Output(_) => 1,
        }
    }
}

/// Installs the global logger. `--verbose` raises the level to debug.
///
/// The level comes from the flag alone; environment variables are not read.
pub fn init_logging(verbose: bool) {
    let level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    // A second initialisation (e.g. from tests) keeps the first logger
    let _ = env_logger::Builder::new()
        .filter_level(level)
        .format_timestamp_secs()
        .format_target(false)
        .try_init();
}

/// Runs a migration as described by the parsed arguments.
///
/// # Examples
///
/// ```no_run
/// use calibre2komga::cli::{Cli, run_cli};
/// use clap::Parser;
///
/// let cli = Cli::parse_from(["calibre2komga", "/calibre", "/komga", "--dry-run"]);
/// match run_cli(&cli) {
///     Ok(stats) => println!("Migrated {} books", stats.migrated),
///     Err(e) => eprintln!("Error: {}", e),
/// }
/// ```
pub fn run_cli(cli: &Cli) -> Result<MigrationStats, CliError> {
    let config = MigrationConfig::load(cli.config.as_deref())?;

    if cli.dry_run && !cli.json {
        OutputFormatter::dry_run_notice("No files will be copied and no directories created.");
    }

    let migrator = Migrator::new(&cli.source_path, &cli.destination_path, cli.dry_run)
        .with_config(config)
        .with_progress(cli.progress);

    let stats = migrator.migrate_library(cli.author.as_deref())?;
    let summary = summarize(&stats);

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(stats);
    }

    OutputFormatter::summary_table(&summary);
    if stats.total == 0 {
        OutputFormatter::info("No matching books were found in the catalog.");
    } else if stats.errors > 0 {
        OutputFormatter::warning("Some books could not be migrated. Please review errors above.");
    } else if cli.dry_run {
        OutputFormatter::success("Dry run complete. No files were modified.");
    } else {
        OutputFormatter::success("Migration complete!");
    }

    Ok(stats)
}
