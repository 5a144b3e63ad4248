//! Ordered, deduplicated collection of detected spans.

use std::collections::HashSet;

use crate::domain::model::{Span, SpanKind};

/// Spans from one detection pass, unique by `(kind, name, line_start, line_end)` and ordered
/// by starting line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SpanRegistry {
    spans: Vec<Span>,
}

impl SpanRegistry {
    /// Build a registry from raw candidates.
    ///
    /// Duplicates keep their first occurrence; the sort is stable, so spans sharing a start
    /// line stay in candidate order.
    pub fn register(candidates: impl IntoIterator<Item = Span>) -> Self {
        let mut seen: HashSet<(SpanKind, String, usize, usize)> = HashSet::new();
        let mut spans: Vec<Span> = candidates
            .into_iter()
            .filter(|span| seen.insert(span.key().to_owned_key()))
            .collect();
        spans.sort_by_key(|span| span.line_start);
        Self { spans }
    }

    pub fn spans(&self) -> &[Span] {
        &self.spans
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Span> {
        self.spans.iter()
    }

    pub fn len(&self) -> usize {
        self.spans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Span> {
        self.spans.get(index)
    }

    /// Span starting on `line` (1-based).
    pub fn lookup_line(&self, line: usize) -> Option<&Span> {
        self.spans.iter().find(|span| span.line_start == line)
    }

    /// First span, by ascending start line, with the given name.
    pub fn lookup_name(&self, name: &str) -> Option<&Span> {
        self.spans.iter().find(|span| span.name == name)
    }

    /// Index of `span` in the registry, compared by composite key.
    pub fn position(&self, span: &Span) -> Option<usize> {
        let key = span.key();
        self.spans.iter().position(|candidate| candidate.key() == key)
    }

    pub fn contains(&self, span: &Span) -> bool {
        self.position(span).is_some()
    }

    /// Innermost span covering `line`, used when a click lands inside a body.
    pub fn innermost_at(&self, line: usize) -> Option<&Span> {
        self.spans
            .iter()
            .filter(|span| span.contains_line(line))
            .min_by_key(|span| span.line_count())
    }

    pub fn into_spans(self) -> Vec<Span> {
        self.spans
    }
}

impl<'a> IntoIterator for &'a SpanRegistry {
    type Item = &'a Span;
    type IntoIter = std::slice::Iter<'a, Span>;

    fn into_iter(self) -> Self::IntoIter {
        self.spans.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn span(kind: SpanKind, name: &str, start: usize, end: usize) -> Span {
        Span {
            kind,
            name: name.into(),
            line_start: start,
            line_end: end,
            full_text: format!("{name}:{start}"),
        }
    }

    #[test]
    fn deduplicates_on_composite_key_keeping_first() {
        let mut duplicate = span(SpanKind::Function, "f", 1, 3);
        duplicate.full_text = "second".into();
        let registry = SpanRegistry::register(vec![
            span(SpanKind::Function, "f", 1, 3),
            duplicate,
            span(SpanKind::Class, "f", 1, 3),
        ]);

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.spans()[0].full_text, "f:1");
        assert_eq!(registry.spans()[1].kind, SpanKind::Class);
    }

    #[test]
    fn sorts_by_start_line_stably() {
        let registry = SpanRegistry::register(vec![
            span(SpanKind::Function, "late", 9, 10),
            span(SpanKind::Function, "b", 2, 4),
            span(SpanKind::Class, "a", 2, 8),
        ]);
        let names: Vec<&str> = registry.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["b", "a", "late"]);
    }

    #[test]
    fn lookups() {
        let registry = SpanRegistry::register(vec![
            span(SpanKind::Class, "Outer", 1, 10),
            span(SpanKind::Function, "run", 3, 5),
            span(SpanKind::Function, "run", 7, 9),
        ]);

        assert_eq!(registry.lookup_line(3).map(|s| s.line_end), Some(5));
        assert!(registry.lookup_line(4).is_none());
        assert_eq!(registry.lookup_name("run").map(|s| s.line_start), Some(3));
        assert!(registry.lookup_name("missing").is_none());
        assert_eq!(registry.innermost_at(8).map(|s| s.line_start), Some(7));
        assert_eq!(registry.innermost_at(2).map(|s| s.name.as_str()), Some("Outer"));
        assert!(registry.contains(&span(SpanKind::Function, "run", 7, 9)));
        assert!(!registry.contains(&span(SpanKind::Function, "run", 7, 8)));
        assert_eq!(registry.position(&span(SpanKind::Function, "run", 7, 9)), Some(2));
    }
}
