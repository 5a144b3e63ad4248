//! Structure detection: finds function and class definitions in raw source text.

pub mod language;
pub mod matcher;
mod recognizers;

use serde::{Deserialize, Serialize};

use crate::app::registry::SpanRegistry;
use crate::domain::model::Span;

pub use language::{LanguageHint, LanguageParseError};
pub use matcher::{BlockMatcher, BraceCounting, BraceCountingParseError};

/// Tunables shared by the block matchers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectorOptions {
    /// Columns a tab expands to when comparing indentation.
    pub tab_width: usize,
    pub brace_counting: BraceCounting,
}

impl Default for DetectorOptions {
    fn default() -> Self {
        Self {
            tab_width: 4,
            brace_counting: BraceCounting::default(),
        }
    }
}

/// Detects definition spans. Stateless apart from its options, so one instance can be shared
/// freely across threads.
#[derive(Debug, Clone, Default)]
pub struct StructureDetector {
    options: DetectorOptions,
}

impl StructureDetector {
    pub fn new(options: DetectorOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &DetectorOptions {
        &self.options
    }

    /// Detect spans ordered by starting line and free of duplicates.
    pub fn detect(&self, source: &str, hint: LanguageHint) -> Vec<Span> {
        self.detect_registry(source, hint).into_spans()
    }

    pub fn detect_registry(&self, source: &str, hint: LanguageHint) -> SpanRegistry {
        if source.trim().is_empty() {
            return SpanRegistry::default();
        }

        let lines = split_lines(source);
        let mut candidates = Vec::new();

        for (index, line) in lines.iter().enumerate() {
            let Some(header) = recognizers::recognize(line, hint) else {
                continue;
            };
            let Some(end) = header.matcher.block_end(&lines, index, &self.options) else {
                tracing::trace!(line = index + 1, name = %header.name, "declaration without body");
                continue;
            };

            candidates.push(Span {
                kind: header.kind,
                name: header.name,
                line_start: index + 1,
                line_end: end + 1,
                full_text: lines[index..=end].join("\n"),
            });
        }

        let registry = SpanRegistry::register(candidates);
        tracing::debug!(
            lines = lines.len(),
            spans = registry.len(),
            language = %hint,
            "detected definitions"
        );
        registry
    }
}

/// Detect with default options.
pub fn detect(source: &str, hint: LanguageHint) -> Vec<Span> {
    StructureDetector::default().detect(source, hint)
}

/// Split on `\n`, dropping a trailing `\r` from every line.
pub fn split_lines(source: &str) -> Vec<&str> {
    source
        .split('\n')
        .map(|line| line.strip_suffix('\r').unwrap_or(line))
        .collect()
}
