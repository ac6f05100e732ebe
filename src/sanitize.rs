//! Filesystem-safe name construction.
//!
//! Calibre metadata can contain characters that are illegal in file names on
//! at least one common platform, and Calibre itself appends `(N)` counters to
//! titles it considers duplicates. The helpers here turn catalog strings into
//! names that can be used verbatim as Komga folder and file names.
//!
//! # Examples
//!
//! ```
//! use calibre2komga::sanitize::{sanitize, strip_disambiguation_suffix};
//!
//! assert_eq!(sanitize("What If?: Answers"), "What If__ Answers");
//! assert_eq!(strip_disambiguation_suffix("Foundation (84)"), "Foundation");
//! ```

use regex::Regex;
use std::sync::LazyLock;

/// Default upper bound on the length of a generated name, in characters.
pub const MAX_NAME_LENGTH: usize = 100;

/// Characters replaced with `_` by [`sanitize`].
pub const INVALID_CHARS: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

static DISAMBIGUATION_SUFFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\s*\([0-9]+\)\s*$").expect("disambiguation suffix pattern is valid")
});

fn is_trimmed_char(c: char) -> bool {
    c.is_whitespace() || c == '.'
}

/// Sanitizes a name for cross-platform use as a file or directory name.
///
/// Replaces every character in [`INVALID_CHARS`] with `_`, trims leading and
/// trailing whitespace and dots, and truncates to [`MAX_NAME_LENGTH`]
/// characters.
///
/// The function is total and idempotent: `sanitize(&sanitize(x)) == sanitize(x)`.
pub fn sanitize(name: &str) -> String {
    sanitize_with_limit(name, MAX_NAME_LENGTH)
}

/// Same as [`sanitize`] with an explicit character limit.
///
/// Truncation counts Unicode scalar values, so multi-byte characters are never
/// split. Anything the cut leaves dangling at the end (a space or a dot) is
/// trimmed as well.
pub fn sanitize_with_limit(name: &str, max_len: usize) -> String {
    let replaced: String = name
        .chars()
        .map(|c| if INVALID_CHARS.contains(&c) { '_' } else { c })
        .collect();

    let trimmed = replaced.trim_matches(is_trimmed_char);
    if trimmed.chars().count() <= max_len {
        return trimmed.to_string();
    }

    let truncated: String = trimmed.chars().take(max_len).collect();
    truncated.trim_end_matches(is_trimmed_char).to_string()
}

/// Removes a trailing Calibre disambiguation counter such as ` (84)`.
///
/// Only a parenthesized run of ASCII digits at the very end of the title is
/// removed, along with the whitespace around it. Titles without such a
/// suffix are returned unchanged.
pub fn strip_disambiguation_suffix(title: &str) -> String {
    match DISAMBIGUATION_SUFFIX.find(title) {
        Some(m) => title[..m.start()].trim_end().to_string(),
        None => title.to_string(),
    }
}
