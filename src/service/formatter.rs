//! Identifier rendering and validation.

use dashmap::DashMap;
use regex::Regex;

use crate::domain::MAX_ID_LENGTH;
use crate::service::pattern::{ResolvedPattern, Segment};

/// Why a rendered identifier was rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FormatError {
    /// Nothing was left after cleanup.
    #[error("rendered identifier is empty")]
    Empty {
        /// Text before cleanup.
        result: String,
    },

    /// The identifier exceeds the length limit.
    #[error("rendered identifier is {length} characters, limit is {max}")]
    TooLong {
        /// The cleaned identifier.
        result: String,
        /// Its length in characters.
        length: usize,
        /// The limit.
        max: usize,
    },

    /// The separator could not be turned into a pattern.
    #[error("invalid separator {separator:?}: {reason}")]
    InvalidSeparator {
        /// Configured separator.
        separator: String,
        /// Regex error.
        reason: String,
    },
}

impl FormatError {
    /// The string that failed validation.
    #[must_use]
    pub fn result(&self) -> &str {
        match self {
            Self::Empty { result } | Self::TooLong { result, .. } => result,
            Self::InvalidSeparator { .. } => "",
        }
    }
}

/// Renders identifiers and enforces the length limit.
///
/// Compiled separator patterns are cached per separator.
#[derive(Default)]
pub struct Formatter {
    separators: DashMap<String, Regex>,
}

impl Formatter {
    /// Create a formatter.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Render `sequence` into the resolved pattern.
    ///
    /// Runs of two or more separators collapse to one, and leading/trailing
    /// separators and whitespace are trimmed.
    ///
    /// # Errors
    ///
    /// Returns a `FormatError` if the result is empty or longer than
    /// `MAX_ID_LENGTH` characters.
    pub fn format(&self, resolved: &ResolvedPattern, sequence: u64) -> Result<String, FormatError> {
        let width = resolved.format.sequence_length;
        let separator = resolved.format.separator.as_str();

        let mut raw = String::new();
        for segment in resolved.template.segments() {
            match segment {
                Segment::Literal(text) => raw.push_str(text),
                Segment::Placeholder(placeholder) => {
                    raw.push_str(&resolved.values.value(*placeholder, sequence, width));
                }
            }
        }

        let collapsed = self.collapse_separators(&raw, separator)?;
        let cleaned = trim_separators(&collapsed, separator).to_string();

        if cleaned.is_empty() {
            return Err(FormatError::Empty { result: raw });
        }

        let length = cleaned.chars().count();
        if length > MAX_ID_LENGTH {
            return Err(FormatError::TooLong {
                result: cleaned,
                length,
                max: MAX_ID_LENGTH,
            });
        }

        Ok(cleaned)
    }

    fn collapse_separators(&self, text: &str, separator: &str) -> Result<String, FormatError> {
        if separator.is_empty() {
            return Ok(text.to_string());
        }

        let regex = self.separator_regex(separator)?;
        Ok(regex.replace_all(text, regex::NoExpand(separator)).into_owned())
    }

    fn separator_regex(&self, separator: &str) -> Result<Regex, FormatError> {
        if let Some(regex) = self.separators.get(separator) {
            return Ok(regex.clone());
        }

        let regex = Regex::new(&format!("(?:{}){{2,}}", regex::escape(separator))).map_err(
            |e| FormatError::InvalidSeparator {
                separator: separator.to_string(),
                reason: e.to_string(),
            },
        )?;

        self.separators
            .insert(separator.to_string(), regex.clone());
        Ok(regex)
    }
}

/// Strip whitespace and whole separators from both ends.
fn trim_separators<'a>(text: &'a str, separator: &str) -> &'a str {
    let mut text = text.trim();
    if separator.is_empty() {
        return text;
    }

    loop {
        let before = text.len();
        if let Some(rest) = text.strip_prefix(separator) {
            text = rest.trim_start();
        }
        if let Some(rest) = text.strip_suffix(separator) {
            text = rest.trim_end();
        }
        if text.len() == before {
            return text;
        }
    }
}
