//! Object path matching
//!
//! Decides whether a newly created object follows the upload naming
//! convention and, if it does, which dataset and table it belongs to.
//!
//! Pattern contract, by number of capture groups:
//! - 1 group: the captured segment names both the dataset and the table
//! - 2 groups: dataset, table
//! - 3 groups: two dataset components (joined with `_`), table
//!
//! Patterns are always applied case-insensitively and anchored at the
//! start of the path. Captured components are lower-cased and hyphens
//! become underscores.

use regex::{Regex, RegexBuilder};

use crate::utils::normalize_identifier;
use crate::{Error, Result, MAX_PATTERN_GROUPS, MIN_PATTERN_GROUPS, PATH_SEPARATOR};

/// Monthly ACEP CSV drops: `YYYY/MM/<dataset>/<table>_YYYY-MM-DD.csv`
pub const DEFAULT_CSV_PATTERN: &str =
    r"^\d{4}/\d{2}/(uaf-acep-[\w-]+)/(uaf-acep-[\w-]+)_\d{4}-\d{2}-\d{2}\.csv$";

/// Strip trailing separators so a directory marker and the resource it
/// names compare equal.
pub fn normalize_object_path(path: &str) -> &str {
    path.trim_end_matches(PATH_SEPARATOR)
}

/// Identifiers derived from a matching path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathMatch {
    pub dataset_name: String,
    pub table_name: String,
}

/// Compiled object path pattern
#[derive(Debug, Clone)]
pub struct PathMatcher {
    pattern: String,
    regex: Regex,
    groups: usize,
}

impl PathMatcher {
    /// Compile a pattern, checking its capture-group arity
    pub fn new(pattern: &str) -> Result<Self> {
        let build = |source: &str| {
            RegexBuilder::new(source)
                .case_insensitive(true)
                .build()
                .map_err(|e| Error::Configuration(format!("Invalid path pattern: {}", e)))
        };

        // Validate the pattern on its own before wrapping it
        let groups = build(pattern)?.captures_len() - 1;
        let regex = build(&format!("^(?:{})", pattern))?;

        if !(MIN_PATTERN_GROUPS..=MAX_PATTERN_GROUPS).contains(&groups) {
            return Err(Error::Configuration(format!(
                "Path pattern must have between {} and {} capture groups, found {}",
                MIN_PATTERN_GROUPS, MAX_PATTERN_GROUPS, groups
            )));
        }

        Ok(Self {
            pattern: pattern.to_string(),
            regex,
            groups,
        })
    }

    /// The pattern as configured
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn group_count(&self) -> usize {
        self.groups
    }

    /// Match an object path.
    ///
    /// Returns `None` when the path does not follow the convention,
    /// including a bare directory marker that normalizes to nothing.
    pub fn match_path(&self, path: &str) -> Option<PathMatch> {
        let path = normalize_object_path(path);
        if path.is_empty() {
            return None;
        }

        let captures = self.regex.captures(path)?;

        let mut parts = Vec::with_capacity(self.groups);
        for index in 1..=self.groups {
            match captures.get(index).map(|m| normalize_identifier(m.as_str())) {
                Some(part) if !part.is_empty() => parts.push(part),
                // Optional group that did not participate
                _ => return None,
            }
        }

        let (dataset_name, table_name) = match parts.as_slice() {
            [only] => (only.clone(), only.clone()),
            [dataset, table] => (dataset.clone(), table.clone()),
            [first, second, table] => (format!("{}_{}", first, second), table.clone()),
            _ => return None,
        };

        Some(PathMatch {
            dataset_name,
            table_name,
        })
    }
}
