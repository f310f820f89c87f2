//! Free-text search over display rows
//!
//! A query is split into tokens; a row matches when every token matches
//! at least one of its tablets or pens, either by id or by name. Tokens may
//! use `*` (any run of characters) and `?` (exactly one character).

use regex::{Regex, RegexBuilder};
use thiserror::Error;

use crate::dataset::{Dataset, DefTable};
use crate::view::DisplayRow;

#[derive(Error, Debug)]
pub enum SearchError {
    #[error("Invalid search token {token:?}: {source}")]
    Pattern {
        token: String,
        #[source]
        source: regex::Error,
    },
}

/// Split a query on whitespace; a double-quoted span is a single token.
///
/// Quotes are consumed, whitespace inside them is kept, and an unterminated
/// quote runs to the end of the query.
pub fn tokenize(query: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut quoted = false;

    for c in query.chars() {
        if c == '"' {
            in_quotes = !in_quotes;
            quoted = true;
        } else if c.is_whitespace() && !in_quotes {
            if !current.is_empty() || quoted {
                tokens.push(std::mem::take(&mut current));
            }
            quoted = false;
        } else {
            current.push(c);
        }
    }
    if !current.is_empty() || quoted {
        tokens.push(current);
    }

    tokens.retain(|t| !t.is_empty());
    tokens
}

/// Compile one glob token into a case-insensitive matcher.
///
/// A token without wildcards matches anywhere inside a candidate. A token
/// containing `*` or `?` must match the whole candidate, so `abc*` matches
/// `abcdef` but not `xabc`.
pub fn compile_token(token: &str) -> Result<Regex, SearchError> {
    let has_wildcard = token.contains(['*', '?']);
    let mut pattern = String::with_capacity(token.len() + 8);
    if has_wildcard {
        pattern.push('^');
    }

    let mut buf = [0u8; 4];
    for c in token.chars() {
        match c {
            '*' => pattern.push_str(".*"),
            '?' => pattern.push('.'),
            other => pattern.push_str(&regex::escape(other.encode_utf8(&mut buf))),
        }
    }

    if has_wildcard {
        pattern.push('$');
    }

    RegexBuilder::new(&pattern)
        .case_insensitive(true)
        .dot_matches_new_line(true)
        .build()
        .map_err(|source| SearchError::Pattern {
            token: token.to_string(),
            source,
        })
}

/// A compiled query
#[derive(Debug, Clone, Default)]
pub struct SearchFilter {
    patterns: Vec<Regex>,
}

impl SearchFilter {
    /// Compile every token of a query
    pub fn new(query: &str) -> Result<Self, SearchError> {
        let patterns = tokenize(query)
            .iter()
            .map(|token| compile_token(token))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { patterns })
    }

    /// True when the query had no tokens and therefore accepts every row
    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    fn item_matches(pattern: &Regex, id: &str, defs: &DefTable) -> bool {
        pattern.is_match(id) || defs.get(id).is_some_and(|def| pattern.is_match(&def.name))
    }

    /// AND across tokens, OR across the row's tablets and pens
    pub fn matches(&self, row: &DisplayRow, dataset: &Dataset) -> bool {
        self.patterns.iter().all(|pattern| {
            row.tablets
                .iter()
                .any(|id| Self::item_matches(pattern, id, &dataset.tablet_defs))
                || row
                    .pens
                    .iter()
                    .any(|id| Self::item_matches(pattern, id, &dataset.pen_defs))
        })
    }
}

/// Keep the rows matching a query. An empty query keeps everything.
pub fn filter_rows(
    rows: &[DisplayRow],
    query: &str,
    dataset: &Dataset,
) -> Result<Vec<DisplayRow>, SearchError> {
    let filter = SearchFilter::new(query)?;
    if filter.is_empty() {
        return Ok(rows.to_vec());
    }
    Ok(rows
        .iter()
        .filter(|row| filter.matches(row, dataset))
        .cloned()
        .collect())
}
