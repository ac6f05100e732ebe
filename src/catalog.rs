//! Read-only access to the Calibre metadata catalog.
//!
//! Calibre keeps every book's metadata in an SQLite file (`metadata.db`) at
//! the library root. This module runs a single aggregate query against it and
//! builds a [`CatalogIndex`]: an ordered arena of [`BookRecord`]s keyed by the
//! book's directory relative to the library root.

use log::{debug, info, warn};
use rusqlite::{Connection, OpenFlags, Row};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Author name used when a book has no linked author.
pub const UNKNOWN_AUTHOR: &str = "Unknown Author";

/// One row per book. Author and series are the first linked rows by link id,
/// which is the order Calibre itself displays them in.
const BOOKS_QUERY: &str = "
    SELECT
        b.id,
        b.title,
        b.path,
        b.series_index,
        (SELECT a.name
           FROM books_authors_link bal
           JOIN authors a ON a.id = bal.author
          WHERE bal.book = b.id
          ORDER BY bal.id
          LIMIT 1) AS author_name,
        (SELECT s.name
           FROM books_series_link bsl
           JOIN series s ON s.id = bsl.series
          WHERE bsl.book = b.id
          ORDER BY bsl.id
          LIMIT 1) AS series_name,
        (SELECT GROUP_CONCAT(d.format, ',')
           FROM data d
          WHERE d.book = b.id) AS formats
    FROM books b
    GROUP BY b.id
";

/// Errors raised while loading the catalog. Both are fatal for a run.
#[derive(Error, Debug)]
pub enum CatalogError {
    /// The catalog file could not be opened.
    #[error("cannot open catalog {path}: {source}")]
    Unavailable {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// The query could not be prepared or executed, usually because the
    /// file is not a Calibre catalog.
    #[error("catalog query failed: {0}")]
    Query(#[from] rusqlite::Error),
}

/// Result type for catalog operations.
pub type CatalogResult<T> = Result<T, CatalogError>;

/// Metadata for one catalog book.
#[derive(Debug, Clone, PartialEq)]
pub struct BookRecord {
    /// Catalog primary key.
    pub id: i64,
    /// Title as stored, possibly with a trailing ` (N)` counter.
    pub title: String,
    /// Primary author, or the unknown-author sentinel.
    pub author: String,
    /// Series name; `None` for standalone books.
    pub series: Option<String>,
    /// Position in the series; may be fractional.
    pub series_index: Option<f64>,
    /// Format tags recorded in the catalog (e.g. `EPUB`).
    pub formats: Vec<String>,
    /// Book directory relative to the library root, `/`-separated.
    pub source_relative_path: String,
}

impl BookRecord {
    /// Returns true if the catalog lists the given format tag for this book.
    pub fn has_format(&self, tag: &str) -> bool {
        self.formats.iter().any(|f| f.eq_ignore_ascii_case(tag))
    }

    fn from_row(row: &Row<'_>, unknown_author: &str) -> rusqlite::Result<Self> {
        let author: Option<String> = row.get("author_name")?;
        let formats: Option<String> = row.get("formats")?;

        Ok(Self {
            id: row.get("id")?,
            title: row.get("title")?,
            source_relative_path: row.get("path")?,
            series_index: row.get("series_index")?,
            author: author
                .map(|a| a.trim().to_string())
                .filter(|a| !a.is_empty())
                .unwrap_or_else(|| unknown_author.to_string()),
            series: row
                .get::<_, Option<String>>("series_name")?
                .filter(|s| !s.trim().is_empty()),
            formats: formats
                .map(|f| {
                    f.split(',')
                        .map(|tag| tag.trim().to_string())
                        .filter(|tag| !tag.is_empty())
                        .collect()
                })
                .unwrap_or_default(),
        })
    }
}

fn cmp_nocase(a: &str, b: &str) -> Ordering {
    a.bytes()
        .map(|c| c.to_ascii_lowercase())
        .cmp(b.bytes().map(|c| c.to_ascii_lowercase()))
}

/// In-memory lookup of catalog books in processing order.
#[derive(Debug, Clone, Default)]
pub struct CatalogIndex {
    records: Vec<BookRecord>,
    by_path: HashMap<String, usize>,
}

impl CatalogIndex {
    /// Loads every book from the catalog at `catalog_path`.
    ///
    /// The database is opened read-only and closed before this returns, so
    /// no catalog access overlaps later file I/O.
    ///
    /// # Errors
    ///
    /// [`CatalogError::Unavailable`] if the file cannot be opened,
    /// [`CatalogError::Query`] if the schema does not match.
    pub fn load(catalog_path: &Path, unknown_author: &str) -> CatalogResult<Self> {
        let conn = Connection::open_with_flags(
            catalog_path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(|e| CatalogError::Unavailable {
            path: catalog_path.to_path_buf(),
            source: e,
        })?;

        let records = Self::query_books(&conn, unknown_author)?;
        conn.close().map_err(|(_, e)| CatalogError::Query(e))?;

        let index = Self::from_records(records);
        info!(
            "Loaded metadata for {} books from {}",
            index.len(),
            catalog_path.display()
        );
        Ok(index)
    }

    fn query_books(conn: &Connection, unknown_author: &str) -> CatalogResult<Vec<BookRecord>> {
        let mut stmt = conn.prepare(BOOKS_QUERY)?;
        let records = stmt
            .query_map([], |row| BookRecord::from_row(row, unknown_author))?
            .collect::<Result<Vec<_>, _>>()?;
        debug!("Catalog query returned {} rows", records.len());
        Ok(records)
    }

    /// Builds an index from already-resolved records.
    ///
    /// Records are stably sorted by author, series, series index, title and
    /// id. Names compare like Calibre's `NOCASE` columns, folding ASCII case
    /// only. When two records share a path the first one in that order wins.
    pub fn from_records(mut records: Vec<BookRecord>) -> Self {
        records.sort_by(|a, b| {
            cmp_nocase(&a.author, &b.author)
                .then_with(|| match (&a.series, &b.series) {
                    (Some(x), Some(y)) => cmp_nocase(x, y),
                    (x, y) => x.is_some().cmp(&y.is_some()),
                })
                .then_with(|| {
                    a.series_index
                        .unwrap_or(f64::NEG_INFINITY)
                        .total_cmp(&b.series_index.unwrap_or(f64::NEG_INFINITY))
                })
                .then_with(|| cmp_nocase(&a.title, &b.title))
                .then_with(|| a.id.cmp(&b.id))
        });

        let mut index = Self::default();
        for record in records {
            if index.by_path.contains_key(&record.source_relative_path) {
                warn!(
                    "Duplicate catalog path {}, ignoring book {}",
                    record.source_relative_path, record.id
                );
                continue;
            }
            index
                .by_path
                .insert(record.source_relative_path.clone(), index.records.len());
            index.records.push(record);
        }
        index
    }

    /// Number of books in the index.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Looks up a book by its library-relative path.
    pub fn get(&self, relative_path: &str) -> Option<&BookRecord> {
        self.by_path.get(relative_path).map(|&i| &self.records[i])
    }

    /// Iterates `(path, record)` pairs in processing order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &BookRecord)> {
        self.records
            .iter()
            .map(|r| (r.source_relative_path.as_str(), r))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const SCHEMA: &str = "
        CREATE TABLE books (
            id INTEGER PRIMARY KEY,
            title TEXT NOT NULL,
            path TEXT NOT NULL,
            series_index REAL NOT NULL DEFAULT 1.0
        );
        CREATE TABLE authors (id INTEGER PRIMARY KEY, name TEXT NOT NULL);
        CREATE TABLE books_authors_link (id INTEGER PRIMARY KEY, book INTEGER, author INTEGER);
        CREATE TABLE series (id INTEGER PRIMARY KEY, name TEXT NOT NULL);
        CREATE TABLE books_series_link (id INTEGER PRIMARY KEY, book INTEGER, series INTEGER);
        CREATE TABLE data (id INTEGER PRIMARY KEY, book INTEGER, format TEXT, name TEXT);
    ";

    fn create_catalog(dir: &Path, seed: &str) -> PathBuf {
        let path = dir.join("metadata.db");
        let conn = Connection::open(&path).expect("Failed to create catalog");
        conn.execute_batch(SCHEMA).expect("Failed to create schema");
        conn.execute_batch(seed).expect("Failed to seed catalog");
        path
    }

    fn record(id: i64, author: &str, series: Option<&str>, index: Option<f64>, title: &str) -> BookRecord {
        BookRecord {
            id,
            title: title.to_string(),
            author: author.to_string(),
            series: series.map(str::to_string),
            series_index: index,
            formats: Vec::new(),
            source_relative_path: format!("{}/{} ({})", author, title, id),
        }
    }

    #[test]
    fn test_load_resolves_joins_and_formats() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let path = create_catalog(
            temp_dir.path(),
            "
            INSERT INTO authors VALUES (1, 'Isaac Asimov');
            INSERT INTO series VALUES (1, 'Foundation');
            INSERT INTO books VALUES (84, 'Foundation (84)', 'Isaac Asimov/Foundation (84)', 1.0);
            INSERT INTO books_authors_link VALUES (1, 84, 1);
            INSERT INTO books_series_link VALUES (1, 84, 1);
            INSERT INTO data VALUES (1, 84, 'EPUB', 'Foundation - Isaac Asimov');
            INSERT INTO data VALUES (2, 84, 'KEPUB', 'Foundation - Isaac Asimov');
            ",
        );

        let index = CatalogIndex::load(&path, UNKNOWN_AUTHOR).expect("Failed to load catalog");
        assert_eq!(index.len(), 1);

        let book = index
            .get("Isaac Asimov/Foundation (84)")
            .expect("Book should be indexed");
        assert_eq!(book.id, 84);
        assert_eq!(book.author, "Isaac Asimov");
        assert_eq!(book.series.as_deref(), Some("Foundation"));
        assert_eq!(book.series_index, Some(1.0));
        assert_eq!(book.formats.len(), 2);
        assert!(book.has_format("epub"));
        assert!(book.has_format("KEPUB"));
    }

    #[test]
    fn test_load_defaults_missing_author_and_series() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let path = create_catalog(
            temp_dir.path(),
            "INSERT INTO books VALUES (1, 'Orphan', 'Unknown/Orphan (1)', 1.0);",
        );

        let index = CatalogIndex::load(&path, UNKNOWN_AUTHOR).expect("Failed to load catalog");
        let book = index.get("Unknown/Orphan (1)").expect("Book should be indexed");
        assert_eq!(book.author, UNKNOWN_AUTHOR);
        assert_eq!(book.series, None);
        assert!(book.formats.is_empty());
    }

    #[test]
    fn test_load_uses_custom_unknown_author() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let path = create_catalog(
            temp_dir.path(),
            "INSERT INTO books VALUES (1, 'Orphan', 'x/Orphan (1)', 1.0);",
        );

        let index = CatalogIndex::load(&path, "Anonymous").expect("Failed to load catalog");
        assert_eq!(index.get("x/Orphan (1)").map(|b| b.author.as_str()), Some("Anonymous"));
    }

    #[test]
    fn test_load_first_linked_author_wins() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let path = create_catalog(
            temp_dir.path(),
            "
            INSERT INTO authors VALUES (1, 'Aaron Alpha');
            INSERT INTO authors VALUES (2, 'Zed Zulu');
            INSERT INTO books VALUES (1, 'Joint Work', 'Zed Zulu/Joint Work (1)', 1.0);
            INSERT INTO books_authors_link VALUES (10, 1, 2);
            INSERT INTO books_authors_link VALUES (11, 1, 1);
            ",
        );

        let index = CatalogIndex::load(&path, UNKNOWN_AUTHOR).expect("Failed to load catalog");
        let book = index.get("Zed Zulu/Joint Work (1)").expect("Book should be indexed");
        assert_eq!(book.author, "Zed Zulu");
    }

    #[test]
    fn test_load_one_record_per_book() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let path = create_catalog(
            temp_dir.path(),
            "
            INSERT INTO authors VALUES (1, 'A'), (2, 'B');
            INSERT INTO books VALUES (1, 'T', 'A/T (1)', 1.0);
            INSERT INTO books_authors_link VALUES (1, 1, 1), (2, 1, 2);
            INSERT INTO data VALUES (1, 1, 'EPUB', 'x'), (2, 1, 'PDF', 'x'), (3, 1, 'MOBI', 'x');
            ",
        );

        let index = CatalogIndex::load(&path, UNKNOWN_AUTHOR).expect("Failed to load catalog");
        assert_eq!(index.len(), 1);
        assert_eq!(index.iter().next().map(|(_, b)| b.formats.len()), Some(3));
    }

    #[test]
    fn test_load_missing_file_is_unavailable() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let result = CatalogIndex::load(&temp_dir.path().join("metadata.db"), UNKNOWN_AUTHOR);
        assert!(matches!(result, Err(CatalogError::Unavailable { .. })));
    }

    #[test]
    fn test_load_wrong_schema_is_query_error() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let path = temp_dir.path().join("metadata.db");
        let conn = Connection::open(&path).expect("Failed to create database");
        conn.execute_batch("CREATE TABLE unrelated (id INTEGER);")
            .expect("Failed to create table");
        drop(conn);

        let result = CatalogIndex::load(&path, UNKNOWN_AUTHOR);
        assert!(matches!(result, Err(CatalogError::Query(_))));
    }

    #[test]
    fn test_from_records_orders_by_author_series_index_title() {
        let index = CatalogIndex::from_records(vec![
            record(1, "B", None, Some(1.0), "Zeta"),
            record(2, "A", Some("S"), Some(2.0), "Second"),
            record(3, "A", Some("S"), Some(1.5), "Novella"),
            record(4, "A", None, Some(1.0), "Alone"),
            record(5, "B", None, Some(1.0), "Alpha"),
        ]);

        let ids: Vec<i64> = index.iter().map(|(_, r)| r.id).collect();
        assert_eq!(ids, vec![4, 3, 2, 5, 1]);
    }

    #[test]
    fn test_from_records_ignores_ascii_case() {
        let index = CatalogIndex::from_records(vec![
            record(1, "Bob", None, None, "x"),
            record(2, "alice", Some("zeta"), Some(1.0), "y"),
            record(3, "alice", Some("Alpha"), Some(1.0), "b"),
            record(4, "alice", None, None, "Beta"),
            record(5, "alice", None, None, "alpha"),
        ]);

        let ids: Vec<i64> = index.iter().map(|(_, r)| r.id).collect();
        assert_eq!(ids, vec![5, 4, 3, 2, 1]);
    }

    #[test]
    fn test_from_records_keeps_first_of_duplicate_paths() {
        let mut first = record(1, "A", None, None, "T");
        let mut second = record(2, "A", None, None, "U");
        first.source_relative_path = "same".to_string();
        second.source_relative_path = "same".to_string();

        let index = CatalogIndex::from_records(vec![second, first]);
        assert_eq!(index.len(), 1);
        assert_eq!(index.get("same").map(|r| r.id), Some(1));
    }

    #[test]
    fn test_empty_index() {
        let index = CatalogIndex::default();
        assert!(index.is_empty());
        assert_eq!(index.get("anything"), None);
    }
}
