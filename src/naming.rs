//! Komga destination names derived from catalog metadata.
//!
//! Komga treats every folder directly under a library root as a series, so
//! books are grouped into one folder per author (standalone books) or per
//! author and series. Inside a series folder files are named
//! `Volume NN - Title.ext` so Komga sorts them by series index.

use crate::catalog::BookRecord;
use crate::sanitize::{MAX_NAME_LENGTH, sanitize_with_limit, strip_disambiguation_suffix};
use std::path::Path;

/// Title used when a book's title leaves nothing after cleanup.
pub const UNKNOWN_TITLE: &str = "Unknown Title";

/// Computes group folder and file names with a configurable length limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PathResolver {
    max_length: usize,
}

impl Default for PathResolver {
    fn default() -> Self {
        Self::new(MAX_NAME_LENGTH)
    }
}

impl PathResolver {
    pub fn new(max_length: usize) -> Self {
        Self { max_length }
    }

    /// Name of the destination folder for a book.
    ///
    /// `"{author} - {series}"` for books in a series, `"{author}"` otherwise.
    pub fn group_name(&self, record: &BookRecord) -> String {
        let raw = match &record.series {
            Some(series) => format!("{} - {}", record.author, series),
            None => record.author.clone(),
        };
        sanitize_with_limit(&raw, self.max_length)
    }

    /// Destination file name for one of a book's files.
    ///
    /// The extension of `original_file_name` is appended unchanged, including
    /// its case. The length limit applies to the name before the extension.
    pub fn file_name(&self, record: &BookRecord, original_file_name: &str) -> String {
        let mut title = strip_disambiguation_suffix(&record.title);
        if sanitize_with_limit(&title, self.max_length).is_empty() {
            title = UNKNOWN_TITLE.to_string();
        }

        let stem = match (&record.series, record.series_index) {
            (Some(_), Some(index)) => format!("Volume {} - {}", volume_token(index), title),
            _ => title,
        };

        let extension = Path::new(original_file_name)
            .extension()
            .map(|ext| format!(".{}", ext.to_string_lossy()))
            .unwrap_or_default();

        format!("{}{}", sanitize_with_limit(&stem, self.max_length), extension)
    }
}

/// Formats a series index as the volume token used in file names.
///
/// Whole numbers are zero-padded to two digits (`7` → `07`, `112` → `112`).
/// Fractional indices keep one decimal, are zero-padded to five characters
/// and use `_` instead of the decimal point (`3.5` → `003_5`).
pub fn volume_token(index: f64) -> String {
    if index.is_finite() && index.fract() == 0.0 {
        format!("{:02}", index as i64)
    } else {
        format!("{:05.1}", index).replace('.', "_")
    }
}

/// [`PathResolver::group_name`] with the default length limit.
pub fn resolve_group_name(record: &BookRecord) -> String {
    PathResolver::default().group_name(record)
}

/// [`PathResolver::file_name`] with the default length limit.
pub fn resolve_file_name(record: &BookRecord, original_file_name: &str) -> String {
    PathResolver::default().file_name(record, original_file_name)
}
