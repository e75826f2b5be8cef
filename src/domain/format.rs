//! Identifier format settings.

use serde::{Deserialize, Serialize};

/// Pattern used when neither tenant nor global settings define a format.
pub const DEFAULT_PATTERN: &str = "{PREFIX}-{SEQUENCE}";

/// Zero-padding width used when a format does not specify one.
pub const DEFAULT_SEQUENCE_LENGTH: usize = 6;

/// Separator used when a format does not specify one.
pub const DEFAULT_SEPARATOR: &str = "-";

/// Widest sequence padding a stored format may request.
pub const MAX_SEQUENCE_LENGTH: usize = 20;

/// Longest identifier the formatter will hand out.
pub const MAX_ID_LENGTH: usize = 50;

/// Format of one kind of identifier (`student_id`, `invoice_no`, ...).
///
/// Placeholders:
/// - `{PREFIX}` - prefix for the ID type
/// - `{SCHOOL}` - tenant code, or an abbreviation of the tenant name
/// - `{YEAR}` - 4-digit year
/// - `{SEQUENCE}` - zero-padded counter value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdFormat {
    /// Pattern template.
    #[serde(default = "default_pattern")]
    pub pattern: String,

    /// Zero-padding width for `{SEQUENCE}`.
    #[serde(default = "default_sequence_length")]
    pub sequence_length: usize,

    /// Separator collapsed and trimmed after substitution.
    #[serde(default = "default_separator")]
    pub separator: String,
}

fn default_pattern() -> String {
    DEFAULT_PATTERN.to_string()
}

const fn default_sequence_length() -> usize {
    DEFAULT_SEQUENCE_LENGTH
}

fn default_separator() -> String {
    DEFAULT_SEPARATOR.to_string()
}

impl Default for IdFormat {
    fn default() -> Self {
        Self {
            pattern: default_pattern(),
            sequence_length: DEFAULT_SEQUENCE_LENGTH,
            separator: default_separator(),
        }
    }
}

impl IdFormat {
    /// Validate a stored format.
    ///
    /// # Errors
    ///
    /// Returns a description of the first problem found.
    pub fn validate(&self) -> Result<(), String> {
        if self.pattern.trim().is_empty() {
            return Err("pattern cannot be empty".to_string());
        }
        if !self.pattern.contains("{SEQUENCE}") {
            return Err("pattern must contain {SEQUENCE}".to_string());
        }
        if self.sequence_length == 0 || self.sequence_length > MAX_SEQUENCE_LENGTH {
            return Err(format!(
                "sequence_length must be 1-{MAX_SEQUENCE_LENGTH}, got {}",
                self.sequence_length
            ));
        }
        if self.separator.is_empty() {
            return Err("separator cannot be empty".to_string());
        }
        Ok(())
    }
}
