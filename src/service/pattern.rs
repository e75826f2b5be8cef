//! Pattern resolution for human-readable IDs.
//!
//! Parses templates like `"{PREFIX}-{SCHOOL}-{YEAR}-{SEQUENCE}"` and works out
//! the value of every placeholder for one generation request.

use std::borrow::Cow;

use chrono::{Datelike, Utc};

use crate::domain::{IdFormat, TenantRef, TenantSettings};

/// `{SCHOOL}` value when no tenant code or name is available.
pub const FALLBACK_SCHOOL_CODE: &str = "SCH";

/// A placeholder the generator knows how to fill.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placeholder {
    /// `{PREFIX}`
    Prefix,
    /// `{SCHOOL}`
    School,
    /// `{YEAR}`
    Year,
    /// `{SEQUENCE}`
    Sequence,
}

impl Placeholder {
    fn from_name(name: &str) -> Option<Self> {
        match name {
            "PREFIX" => Some(Self::Prefix),
            "SCHOOL" => Some(Self::School),
            "YEAR" => Some(Self::Year),
            "SEQUENCE" => Some(Self::Sequence),
            _ => None,
        }
    }
}

/// Piece of a parsed template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// Literal text, including any unrecognised `{...}`.
    Literal(String),
    /// Known placeholder.
    Placeholder(Placeholder),
}

/// Parsed pattern template.
#[derive(Debug, Clone)]
pub struct PatternTemplate {
    segments: Vec<Segment>,
}

impl PatternTemplate {
    /// Parse a pattern string.
    ///
    /// Parsing never fails: unknown placeholders and a trailing unclosed `{`
    /// are kept as literal text.
    #[must_use]
    pub fn parse(pattern: &str) -> Self {
        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut rest = pattern;

        while let Some(open) = rest.find('{') {
            literal.push_str(&rest[..open]);
            let after = &rest[open + 1..];

            let Some(close) = after.find('}') else {
                literal.push_str(&rest[open..]);
                rest = "";
                break;
            };

            let name = &after[..close];
            if let Some(placeholder) = Placeholder::from_name(name) {
                if !literal.is_empty() {
                    segments.push(Segment::Literal(std::mem::take(&mut literal)));
                }
                segments.push(Segment::Placeholder(placeholder));
            } else {
                literal.push('{');
                literal.push_str(name);
                literal.push('}');
            }

            rest = &after[close + 1..];
        }

        literal.push_str(rest);
        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }

        Self { segments }
    }

    /// Check if this template contains `{SEQUENCE}`.
    #[must_use]
    pub fn has_sequence(&self) -> bool {
        self.segments
            .contains(&Segment::Placeholder(Placeholder::Sequence))
    }

    /// Template segments in order.
    #[must_use]
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }
}

/// Values substituted for `{PREFIX}`, `{SCHOOL}` and `{YEAR}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaceholderValues {
    /// `{PREFIX}` value.
    pub prefix: String,
    /// `{SCHOOL}` value.
    pub school: String,
    /// `{YEAR}` value.
    pub year: i32,
}

impl PlaceholderValues {
    /// Value of a placeholder. `{SEQUENCE}` is rendered from `sequence` padded to `width`.
    #[must_use]
    pub fn value(&self, placeholder: Placeholder, sequence: u64, width: usize) -> Cow<'_, str> {
        match placeholder {
            Placeholder::Prefix => Cow::Borrowed(&self.prefix),
            Placeholder::School => Cow::Borrowed(&self.school),
            Placeholder::Year => Cow::Owned(self.year.to_string()),
            Placeholder::Sequence => Cow::Owned(format!("{sequence:0width$}")),
        }
    }
}

/// Everything needed to render one identifier except the sequence value.
#[derive(Debug, Clone)]
pub struct ResolvedPattern {
    /// Effective format (tenant, global, or default).
    pub format: IdFormat,
    /// Parsed `format.pattern`.
    pub template: PatternTemplate,
    /// Placeholder values.
    pub values: PlaceholderValues,
}

/// Resolve the effective pattern and placeholder values for one request.
///
/// `settings` are the settings that apply to `tenant` (or the global settings
/// when there is no tenant); `None` means nothing is configured.
#[must_use]
pub fn resolve(
    id_type: &str,
    tenant: Option<&TenantRef>,
    settings: Option<&TenantSettings>,
    year: Option<i32>,
) -> ResolvedPattern {
    let format = settings
        .and_then(|s| s.id_formats.get(id_type))
        .cloned()
        .unwrap_or_default();

    let values = PlaceholderValues {
        prefix: prefix_for(id_type, settings),
        school: school_code(tenant),
        year: year.unwrap_or_else(current_year),
    };

    ResolvedPattern {
        template: PatternTemplate::parse(&format.pattern),
        format,
        values,
    }
}

/// `{PREFIX}` for an ID type.
///
/// Looks up `prefixes[id_type without "_id"]`, falling back to the first three
/// characters of the ID type, uppercased.
#[must_use]
pub fn prefix_for(id_type: &str, settings: Option<&TenantSettings>) -> String {
    let key = id_type.strip_suffix("_id").unwrap_or(id_type);

    settings
        .and_then(|s| s.prefixes.get(key))
        .cloned()
        .unwrap_or_else(|| abbreviate(id_type))
}

/// `{SCHOOL}` for a tenant.
///
/// An explicit code is used verbatim, even when empty.
#[must_use]
pub fn school_code(tenant: Option<&TenantRef>) -> String {
    let Some(tenant) = tenant else {
        return FALLBACK_SCHOOL_CODE.to_string();
    };

    if let Some(code) = &tenant.code {
        return code.clone();
    }

    let name = tenant.name.trim();
    if name.is_empty() {
        FALLBACK_SCHOOL_CODE.to_string()
    } else {
        abbreviate(name)
    }
}

/// Current calendar year (UTC).
#[must_use]
pub fn current_year() -> i32 {
    Utc::now().year()
}

fn abbreviate(text: &str) -> String {
    text.chars().take(3).collect::<String>().to_uppercase()
}
