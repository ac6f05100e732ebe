//! calibre2komga - migrate a Calibre ebook library to Komga's layout
//!
//! This library reads Calibre's metadata catalog, derives Komga series
//! folders and volume file names from it, and copies each book's EPUB and
//! KEPUB files into place without touching the source library.

pub mod catalog;
pub mod cli;
pub mod config;
pub mod formats;
pub mod migrator;
pub mod naming;
pub mod output;
pub mod report;
pub mod sanitize;

pub use catalog::{BookRecord, CatalogError, CatalogIndex};
pub use config::{ConfigError, MigrationConfig};
pub use formats::EbookFormat;
pub use migrator::{BookOutcome, MigrateError, Migrator};
pub use naming::{PathResolver, resolve_file_name, resolve_group_name};
pub use report::{MigrationStats, Summary, summarize};
pub use sanitize::{sanitize, strip_disambiguation_suffix};

pub use cli::{Cli, run_cli};
