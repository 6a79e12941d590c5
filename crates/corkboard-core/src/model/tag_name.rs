//! Normalized tag names.
//!
//! Every tag name in the vocabulary is stored in one canonical form:
//! ASCII-lowercased, with runs of whitespace collapsed to single
//! underscores. Comparisons, graph edges, and post tag strings all operate
//! on the canonical form, so `Rain Coat`, `rain coat`, and `rain_coat` are
//! the same tag.

use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// Maximum length of a tag name after normalization, in bytes.
pub const MAX_TAG_NAME_LEN: usize = 170;

/// A validated, canonical tag name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct TagName(String);

impl TagName {
    /// Normalize and validate `raw` into a canonical tag name.
    ///
    /// # Errors
    ///
    /// Returns [`ParseTagNameError`] when the normalized form is empty, too
    /// long, starts with a query operator (`-`, `~`), or contains a
    /// wildcard (`*`) or comma.
    pub fn new(raw: &str) -> Result<Self, ParseTagNameError> {
        let normalized = normalize(raw);

        if normalized.is_empty() {
            return Err(ParseTagNameError::Empty);
        }
        if normalized.len() > MAX_TAG_NAME_LEN {
            return Err(ParseTagNameError::TooLong {
                len: normalized.len(),
            });
        }
        if normalized.starts_with('-') || normalized.starts_with('~') {
            return Err(ParseTagNameError::LeadingOperator {
                got: normalized.chars().next().unwrap_or('-'),
            });
        }
        if let Some(bad) = normalized.chars().find(|c| matches!(c, '*' | ',')) {
            return Err(ParseTagNameError::ForbiddenChar { got: bad });
        }

        Ok(Self(normalized))
    }

    /// The canonical string form.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Canonical form: trimmed, ASCII-lowercased, whitespace runs collapsed to
/// a single underscore.
fn normalize(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut pending_gap = false;

    for c in raw.trim().chars() {
        if c.is_whitespace() {
            pending_gap = true;
            continue;
        }
        if pending_gap && !out.is_empty() {
            out.push('_');
        }
        pending_gap = false;
        out.push(c.to_ascii_lowercase());
    }

    out
}

/// Reason a raw string is not a valid tag name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ParseTagNameError {
    #[error("tag name is empty")]
    Empty,
    #[error("tag name is {len} bytes, longer than the {MAX_TAG_NAME_LEN}-byte limit")]
    TooLong { len: usize },
    #[error("tag name starts with the query operator '{got}'")]
    LeadingOperator { got: char },
    #[error("tag name contains forbidden character '{got}'")]
    ForbiddenChar { got: char },
}

impl fmt::Display for TagName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for TagName {
    type Err = ParseTagNameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl<'de> Deserialize<'de> for TagName {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Self::new(&raw).map_err(serde::de::Error::custom)
    }
}
