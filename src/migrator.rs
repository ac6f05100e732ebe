/// Migration of Calibre book directories into Komga group folders.
///
/// Calibre stores each book in its own directory (`Author/Title (id)/`).
/// Komga expects the files of a series side by side in one folder. The
/// [`Migrator`] walks the catalog index, finds each book's EPUB/KEPUB files
/// and copies them into the group folder computed by the [`PathResolver`].
///
/// Copies are idempotent: a destination file that already exists is left
/// alone, so re-running a migration only fills in what is missing.
use crate::catalog::{BookRecord, CatalogError, CatalogIndex};
use crate::config::MigrationConfig;
use crate::formats::{EbookFile, EbookFormat, find_ebook_files};
use crate::naming::PathResolver;
use crate::output::OutputFormatter;
use crate::report::{self, MigrationStats};
use crate::sanitize::sanitize_with_limit;
use indicatif::ProgressBar;
use log::{debug, error, info, warn};
use std::cell::RefCell;
use std::collections::HashSet;
use std::fmt;
use std::fs::{self, FileTimes, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur during migration.
///
/// The first five variants abort a run. The rest end a single book as
/// errored and the run continues with the next book.
#[derive(Error, Debug)]
pub enum MigrateError {
    /// The Calibre library root does not exist.
    #[error("Calibre library path does not exist: {}", .0.display())]
    SourceNotFound(PathBuf),

    /// The Calibre library root is not a directory.
    #[error("Calibre library path is not a directory: {}", .0.display())]
    SourceNotDirectory(PathBuf),

    /// No catalog file in the library root.
    #[error("No catalog found at {}; this does not appear to be a Calibre library", .0.display())]
    CatalogNotFound(PathBuf),

    /// The Komga library root could not be created.
    #[error("Failed to create destination {}: {source}", .path.display())]
    DestinationCreation { path: PathBuf, source: io::Error },

    /// The catalog could not be loaded.
    #[error("Failed to load Calibre metadata: {0}")]
    Catalog(#[from] CatalogError),

    /// A book directory exists but could not be listed.
    #[error("Failed to read directory {}: {source}", .path.display())]
    ReadDirectory { path: PathBuf, source: io::Error },

    /// A group folder could not be created.
    #[error("Failed to create directory {}: {source}", .path.display())]
    DirectoryCreation { path: PathBuf, source: io::Error },

    /// A file could not be copied into its group folder.
    #[error(
        "Failed to copy {} to {}: {source}",
        .source_path.display(),
        .destination.display()
    )]
    FileCopy {
        source_path: PathBuf,
        destination: PathBuf,
        source: io::Error,
    },
}

impl MigrateError {
    /// Process exit code for a run that failed with this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::SourceNotFound(_) | Self::SourceNotDirectory(_) | Self::CatalogNotFound(_) => 3,
            Self::Catalog(_) => 4,
            _ => 1,
        }
    }
}

/// Result type for migration operations.
pub type MigrateResult<T> = Result<T, MigrateError>;

/// Why a book was skipped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// The catalog path does not resolve to a directory under the library.
    MissingSourceDirectory(PathBuf),
    /// The directory holds no EPUB or KEPUB file.
    NoSupportedFiles(PathBuf),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingSourceDirectory(path) => {
                write!(f, "book path does not exist: {}", path.display())
            }
            Self::NoSupportedFiles(path) => {
                write!(f, "no supported ebook files found in {}", path.display())
            }
        }
    }
}

/// What happened to one source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlacementStatus {
    /// The file was copied.
    Copied,
    /// A file already existed at the destination and was left untouched.
    AlreadyExists,
    /// Dry run: the file would have been copied.
    Planned,
}

/// The destination chosen for one source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilePlacement {
    pub source: PathBuf,
    pub destination: PathBuf,
    pub format: EbookFormat,
    pub status: PlacementStatus,
}

/// Result of migrating one book's files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookMigration {
    /// Group folder the files were placed in.
    pub group_dir: PathBuf,
    /// One entry per discovered source file.
    pub placements: Vec<FilePlacement>,
}

impl BookMigration {
    /// Number of placements with the given status.
    pub fn count(&self, status: PlacementStatus) -> usize {
        self.placements.iter().filter(|p| p.status == status).count()
    }
}

/// Terminal state of a single book.
#[derive(Debug)]
pub enum BookOutcome {
    Migrated(BookMigration),
    Skipped(SkipReason),
    Errored(MigrateError),
}

/// Copies books from a Calibre library into a Komga library.
pub struct Migrator {
    source_root: PathBuf,
    destination_root: PathBuf,
    dry_run: bool,
    config: MigrationConfig,
    resolver: PathResolver,
    show_progress: bool,
    /// Destinations already claimed by a dry run, which never creates them.
    planned: RefCell<HashSet<PathBuf>>,
}

impl Migrator {
    /// Creates a migrator with the default configuration.
    pub fn new(
        source_root: impl Into<PathBuf>,
        destination_root: impl Into<PathBuf>,
        dry_run: bool,
    ) -> Self {
        let config = MigrationConfig::default();
        Self {
            source_root: source_root.into(),
            destination_root: destination_root.into(),
            dry_run,
            resolver: PathResolver::new(config.naming.max_length),
            config,
            show_progress: false,
            planned: RefCell::default(),
        }
    }

    /// Replaces the configuration.
    pub fn with_config(mut self, config: MigrationConfig) -> Self {
        self.resolver = PathResolver::new(config.naming.max_length);
        self.config = config;
        self
    }

    /// Shows a progress bar over the catalog while migrating.
    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    /// Location of the Calibre catalog.
    pub fn catalog_path(&self) -> PathBuf {
        self.source_root.join(&self.config.library.catalog_file)
    }

    /// Checks the library roots before anything is read or written.
    ///
    /// The destination root is created when missing, except in dry-run mode
    /// where nothing on disk may change.
    pub fn validate_paths(&self) -> MigrateResult<()> {
        if !self.source_root.exists() {
            return Err(MigrateError::SourceNotFound(self.source_root.clone()));
        }
        if !self.source_root.is_dir() {
            return Err(MigrateError::SourceNotDirectory(self.source_root.clone()));
        }

        let catalog_path = self.catalog_path();
        if !catalog_path.is_file() {
            return Err(MigrateError::CatalogNotFound(catalog_path));
        }

        if !self.dry_run {
            fs::create_dir_all(&self.destination_root).map_err(|e| {
                MigrateError::DestinationCreation {
                    path: self.destination_root.clone(),
                    source: e,
                }
            })?;
        }

        Ok(())
    }

    /// Migrates every catalog book whose author matches `author_filter`.
    ///
    /// The filter is a case-insensitive substring of the author name; books
    /// it rejects are left out of the statistics entirely. Per-book failures
    /// are counted and logged. Setup failures are returned unlogged; the
    /// caller reports them.
    pub fn migrate_library(&self, author_filter: Option<&str>) -> MigrateResult<MigrationStats> {
        info!(
            "Starting migration from {} to {}",
            self.source_root.display(),
            self.destination_root.display()
        );
        info!("Dry run: {}", self.dry_run);

        self.validate_paths()?;
        let index = CatalogIndex::load(&self.catalog_path(), &self.config.naming.unknown_author)?;
        self.planned.borrow_mut().clear();

        let filter = author_filter
            .filter(|f| !f.is_empty())
            .map(str::to_lowercase);

        let progress = if self.show_progress {
            OutputFormatter::create_progress_bar(index.len() as u64)
        } else {
            ProgressBar::hidden()
        };

        let mut stats = MigrationStats::new();
        for (path, record) in index.iter() {
            progress.inc(1);

            if let Some(filter) = &filter
                && !record.author.to_lowercase().contains(filter.as_str())
            {
                debug!("Author filter excludes {} ({})", path, record.author);
                continue;
            }

            let outcome = progress.suspend(|| self.migrate_book(record));
            stats.record(&outcome);
        }
        progress.finish_and_clear();

        stats.finish();
        report::log_summary(&stats);
        Ok(stats)
    }

    /// Migrates a single book.
    ///
    /// Never fails: problems are logged and reported through the outcome.
    pub fn migrate_book(&self, record: &BookRecord) -> BookOutcome {
        let book_dir = self.source_root.join(&record.source_relative_path);
        if !book_dir.is_dir() {
            let reason = SkipReason::MissingSourceDirectory(book_dir);
            warn!("Skipping book {}: {}", record.id, reason);
            return BookOutcome::Skipped(reason);
        }

        let files = match find_ebook_files(&book_dir) {
            Ok(files) => files,
            Err(e) => {
                let err = MigrateError::ReadDirectory {
                    path: book_dir,
                    source: e,
                };
                error!("Error migrating book {}: {}", record.id, err);
                return BookOutcome::Errored(err);
            }
        };

        if files.is_empty() {
            if EbookFormat::ALL
                .iter()
                .any(|format| record.has_format(format.catalog_tag()))
            {
                debug!(
                    "Catalog lists {:?} for book {} but no matching file is on disk",
                    record.formats, record.id
                );
            }
            let reason = SkipReason::NoSupportedFiles(book_dir);
            warn!("Skipping book {}: {}", record.id, reason);
            return BookOutcome::Skipped(reason);
        }

        let group_name = self.group_name(record);
        let group_dir = self.destination_root.join(&group_name);

        info!(
            "Migrating: {}/{}{} -> {}/",
            record.author,
            record.title,
            series_info(record),
            group_name
        );

        match self.place_files(record, &files, &group_dir) {
            Ok(placements) => BookOutcome::Migrated(BookMigration {
                group_dir,
                placements,
            }),
            Err(e) => {
                error!("Error migrating {}: {}", book_dir.display(), e);
                BookOutcome::Errored(e)
            }
        }
    }

    fn group_name(&self, record: &BookRecord) -> String {
        let name = self.resolver.group_name(record);
        if name.is_empty() {
            sanitize_with_limit(
                &self.config.naming.unknown_author,
                self.config.naming.max_length,
            )
        } else {
            name
        }
    }

    fn place_files(
        &self,
        record: &BookRecord,
        files: &[EbookFile],
        group_dir: &Path,
    ) -> MigrateResult<Vec<FilePlacement>> {
        if !self.dry_run {
            fs::create_dir_all(group_dir).map_err(|e| MigrateError::DirectoryCreation {
                path: group_dir.to_path_buf(),
                source: e,
            })?;
        }

        let mut placements = Vec::with_capacity(files.len());
        for file in files {
            let destination = group_dir.join(self.resolver.file_name(record, &file.file_name()));

            let status = if destination.exists()
                || self.planned.borrow().contains(&destination)
            {
                warn!("File already exists, skipping: {}", destination.display());
                PlacementStatus::AlreadyExists
            } else if self.dry_run {
                info!("[DRY RUN] Would create: {}", destination.display());
                self.planned.borrow_mut().insert(destination.clone());
                PlacementStatus::Planned
            } else {
                copy_preserving_times(&file.path, &destination)?;
                debug!(
                    "Copied: {} -> {}",
                    file.path.display(),
                    destination.display()
                );
                PlacementStatus::Copied
            };

            placements.push(FilePlacement {
                source: file.path.clone(),
                destination,
                format: file.format,
                status,
            });
        }

        Ok(placements)
    }
}

fn series_info(record: &BookRecord) -> String {
    match (&record.series, record.series_index) {
        (Some(series), Some(index)) => format!(" (Series: {}, Index: {})", series, index),
        (Some(series), None) => format!(" (Series: {})", series),
        _ => String::new(),
    }
}

/// Copies `source` to `destination`, then carries over the source's access
/// and modification times.
///
/// Failing to set the times is only logged; some filesystems do not support
/// it.
fn copy_preserving_times(source: &Path, destination: &Path) -> MigrateResult<()> {
    let copy_error = |e: io::Error| MigrateError::FileCopy {
        source_path: source.to_path_buf(),
        destination: destination.to_path_buf(),
        source: e,
    };

    fs::copy(source, destination).map_err(copy_error)?;
    let metadata = fs::metadata(source).map_err(copy_error)?;

    let mut times = FileTimes::new();
    if let Ok(modified) = metadata.modified() {
        times = times.set_modified(modified);
    }
    if let Ok(accessed) = metadata.accessed() {
        times = times.set_accessed(accessed);
    }

    let result = OpenOptions::new()
        .write(true)
        .open(destination)
        .and_then(|file| file.set_times(times));
    if let Err(e) = result {
        warn!(
            "Could not preserve timestamps on {}: {}",
            destination.display(),
            e
        );
    }

    Ok(())
}
