//! Domain models for detected spans, annotations, and file records.

use std::fmt;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

/// Name given to a definition whose identifier could not be extracted.
pub const ANONYMOUS: &str = "<anonymous>";

/// Category of a detected definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpanKind {
    Function,
    Class,
}

impl SpanKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SpanKind::Function => "function",
            SpanKind::Class => "class",
        }
    }
}

impl fmt::Display for SpanKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A detected function or class definition.
///
/// Line numbers are 1-based and inclusive. `full_text` holds the exact source lines of the
/// range joined by `\n`, without carriage returns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Span {
    pub kind: SpanKind,
    pub name: String,
    pub line_start: usize,
    pub line_end: usize,
    pub full_text: String,
}

impl Span {
    /// Composite identity used for deduplication and selection checks.
    pub fn key(&self) -> SpanKey<'_> {
        SpanKey {
            kind: self.kind,
            name: &self.name,
            line_start: self.line_start,
            line_end: self.line_end,
        }
    }

    pub fn is_anonymous(&self) -> bool {
        self.name == ANONYMOUS
    }

    pub fn contains_line(&self, line: usize) -> bool {
        line >= self.line_start && line <= self.line_end
    }

    pub fn line_count(&self) -> usize {
        self.line_end - self.line_start + 1
    }
}

/// Borrowed `(kind, name, line_start, line_end)` identity of a [`Span`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SpanKey<'a> {
    pub kind: SpanKind,
    pub name: &'a str,
    pub line_start: usize,
    pub line_end: usize,
}

impl SpanKey<'_> {
    pub fn to_owned_key(&self) -> (SpanKind, String, usize, usize) {
        (
            self.kind,
            self.name.to_owned(),
            self.line_start,
            self.line_end,
        )
    }
}

/// Annotation text associated with one definition name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnotationEntry {
    pub name: String,
    pub text: String,
}

/// An annotation as returned by the remote service for a file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnotationRecord {
    pub name: String,
    pub text: String,
}

/// A source file stored by the remote service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    pub id: String,
    pub name: String,
    pub file_name: Option<String>,
    pub created_at: Option<String>,
}

impl FileRecord {
    /// Parse the service-provided creation time when it is RFC 3339.
    pub fn created_at_utc(&self) -> Option<OffsetDateTime> {
        self.created_at
            .as_deref()
            .and_then(|raw| OffsetDateTime::parse(raw.trim(), &Rfc3339).ok())
    }
}
