/// Supported ebook formats and discovery of candidate files.
///
/// Komga reads plain EPUB and Kobo's KEPUB variant, so those are the only
/// files picked out of a Calibre book directory. Detection is by extension,
/// case-insensitively.
///
/// # Examples
///
/// ```
/// use calibre2komga::formats::EbookFormat;
///
/// assert_eq!(EbookFormat::from_extension("EPUB"), Some(EbookFormat::Epub));
/// assert_eq!(EbookFormat::from_extension("kepub"), Some(EbookFormat::Kepub));
/// assert_eq!(EbookFormat::from_extension("pdf"), None);
/// ```
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// An ebook format that can be migrated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EbookFormat {
    /// Standard EPUB (`.epub`)
    Epub,
    /// Kobo EPUB (`.kepub`)
    Kepub,
}

impl EbookFormat {
    /// Every supported format.
    pub const ALL: [EbookFormat; 2] = [EbookFormat::Epub, EbookFormat::Kepub];

    /// Returns the canonical lower-case extension, without the dot.
    pub fn extension(&self) -> &'static str {
        match self {
            EbookFormat::Epub => "epub",
            EbookFormat::Kepub => "kepub",
        }
    }

    /// Returns the tag Calibre stores for this format in its `data` table.
    pub fn catalog_tag(&self) -> &'static str {
        match self {
            EbookFormat::Epub => "EPUB",
            EbookFormat::Kepub => "KEPUB",
        }
    }

    /// Maps a file extension (without the dot, any case) to a format.
    pub fn from_extension(ext: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|format| format.extension().eq_ignore_ascii_case(ext))
    }

    /// Determines the format of a path from its extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
    }
}

/// A supported file found in a book directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EbookFile {
    /// Full path of the file.
    pub path: PathBuf,
    /// Detected format.
    pub format: EbookFormat,
}

impl EbookFile {
    /// The file's name as a string, lossily converted.
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// Lists the supported ebook files directly inside `dir`.
///
/// Subdirectories are not descended into. Results are sorted by file name so
/// that processing and logging order is stable across platforms.
///
/// # Errors
///
/// Returns the underlying I/O error if the directory cannot be read.
pub fn find_ebook_files(dir: &Path) -> io::Result<Vec<EbookFile>> {
    let mut files: Vec<EbookFile> = fs::read_dir(dir)?
        .flatten()
        .filter(|entry| entry.path().is_file())
        .filter_map(|entry| {
            let path = entry.path();
            EbookFormat::from_path(&path).map(|format| EbookFile { path, format })
        })
        .collect();

    files.sort_by(|a, b| a.path.file_name().cmp(&b.path.file_name()));
    Ok(files)
}
