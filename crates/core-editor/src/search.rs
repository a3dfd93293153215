//! Incremental search over buffer lines.
//!
//! A search scans forward (or backward) from the cursor, wrapping once
//! around the buffer. Long scans poll an interrupt flag between lines so
//! Ctrl-C can unwind to the main loop.

use regex::RegexBuilder;
use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;

#[derive(Debug, Clone, Default)]
pub struct SearchSpec {
    pub term: String,
    pub case_sensitive: bool,
    pub backwards: bool,
    pub regex: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchOutcome {
    /// Cursor should move to `(line, column)` (character units).
    Found {
        line: usize,
        column: usize,
        wrapped: bool,
    },
    /// The single match in the buffer is the one the cursor is on.
    OnlyOccurrence,
    NotFound,
}

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("bad pattern: {0}")]
    BadPattern(#[from] regex::Error),
    #[error("interrupted")]
    Interrupted,
}

/// All match columns (character units) of `spec.term` within one line.
fn line_matches(line: &str, spec: &SearchSpec) -> Result<Vec<usize>, SearchError> {
    if spec.term.is_empty() {
        return Ok(Vec::new());
    }
    if spec.regex {
        let re = RegexBuilder::new(&spec.term)
            .case_insensitive(!spec.case_sensitive)
            .build()?;
        Ok(re
            .find_iter(line)
            .map(|m| line[..m.start()].chars().count())
            .collect())
    } else {
        let (haystack, needle) = if spec.case_sensitive {
            (line.to_string(), spec.term.clone())
        } else {
            (line.to_lowercase(), spec.term.to_lowercase())
        };
        let mut out = Vec::new();
        let mut from = 0;
        while let Some(at) = haystack[from..].find(&needle) {
            let byte = from + at;
            out.push(haystack[..byte].chars().count());
            from = byte + needle.len().max(1);
        }
        Ok(out)
    }
}

/// Wrapping scan from `(start_line, start_column)`.
pub fn search(
    lines: &[String],
    start_line: usize,
    start_column: usize,
    spec: &SearchSpec,
    interrupted: &AtomicBool,
) -> Result<SearchOutcome, SearchError> {
    let n = lines.len();
    let mut wrapped = false;
    for step in 0..=n {
        if interrupted.load(Ordering::Relaxed) {
            return Err(SearchError::Interrupted);
        }
        let line = if spec.backwards {
            (start_line + n - step % n) % n
        } else {
            (start_line + step) % n
        };
        let wrap_line = if spec.backwards { n - 1 } else { 0 };
        if step > 0 && line == wrap_line {
            wrapped = true;
        }
        let matches = line_matches(&lines[line], spec)?;
        let candidate = if spec.backwards {
            let before = |c: &&usize| step == 0 && **c < start_column || step > 0;
            matches.iter().rev().find(|c| before(c)).copied()
        } else {
            let after = |c: &&usize| step == 0 && **c > start_column || step > 0;
            matches.iter().find(|c| after(c)).copied()
        };
        if let Some(column) = candidate {
            if step == n && line == start_line && column == start_column {
                return Ok(SearchOutcome::OnlyOccurrence);
            }
            // Landing back exactly where we started means nothing else
            // matched.
            if wrapped && line == start_line && column == start_column {
                return Ok(SearchOutcome::OnlyOccurrence);
            }
            return Ok(SearchOutcome::Found {
                line,
                column,
                wrapped,
            });
        }
    }
    Ok(SearchOutcome::NotFound)
}
