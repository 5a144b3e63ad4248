//! Tracking the selected span across re-detections.

use crate::app::registry::SpanRegistry;
use crate::domain::errors::DomainError;
use crate::domain::model::Span;

/// The currently selected span, always a member of the latest registry.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SelectionState {
    selected: Option<Span>,
}

impl SelectionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn selected(&self) -> Option<&Span> {
        self.selected.as_ref()
    }

    pub fn is_empty(&self) -> bool {
        self.selected.is_none()
    }

    /// Select the span starting on `line`.
    pub fn select_line(
        &mut self,
        registry: &SpanRegistry,
        line: usize,
    ) -> Result<&Span, DomainError> {
        let span = registry
            .lookup_line(line)
            .ok_or(DomainError::NoSpanOnLine(line))?;
        Ok(self.selected.insert(span.clone()))
    }

    /// Select the first span with `name`.
    pub fn select_name(
        &mut self,
        registry: &SpanRegistry,
        name: &str,
    ) -> Result<&Span, DomainError> {
        let span = registry
            .lookup_name(name)
            .ok_or_else(|| DomainError::UnknownSpan(name.to_string()))?;
        Ok(self.selected.insert(span.clone()))
    }

    /// Select the span at `index` in the registry; out-of-range indexes clear the selection.
    pub fn select_index(&mut self, registry: &SpanRegistry, index: usize) -> Option<&Span> {
        self.selected = registry.get(index).cloned();
        self.selected.as_ref()
    }

    pub fn clear(&mut self) {
        self.selected = None;
    }

    /// Re-check the selection after spans were recomputed. A surviving selection is
    /// replaced by the registry's copy so its text follows the edit. Returns `true` when the
    /// selection had to be cleared because its span no longer exists.
    pub fn revalidate(&mut self, registry: &SpanRegistry) -> bool {
        let Some(span) = &self.selected else {
            return false;
        };
        match registry.position(span).and_then(|index| registry.get(index)) {
            Some(current) => {
                self.selected = Some(current.clone());
                false
            }
            None => {
                tracing::debug!(name = %span.name, "selection invalidated by re-detection");
                self.selected = None;
                true
            }
        }
    }

    pub fn is_selected(&self, span: &Span) -> bool {
        self.selected
            .as_ref()
            .is_some_and(|selected| selected.key() == span.key())
    }

    /// Inclusive 1-based line range to highlight.
    pub fn highlight_range(&self) -> Option<(usize, usize)> {
        self.selected
            .as_ref()
            .map(|span| (span.line_start, span.line_end))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::detect::{LanguageHint, StructureDetector};

    fn registry(source: &str) -> SpanRegistry {
        StructureDetector::default().detect_registry(source, LanguageHint::Auto)
    }

    #[test]
    fn selects_by_line_and_name() {
        let spans = registry("def a():\n    pass\n\ndef b():\n    pass\n");
        let mut selection = SelectionState::new();

        assert_eq!(selection.select_line(&spans, 4).unwrap().name, "b");
        assert_eq!(selection.highlight_range(), Some((4, 5)));
        assert_eq!(selection.select_name(&spans, "a").unwrap().line_start, 1);
        assert!(matches!(
            selection.select_line(&spans, 2),
            Err(DomainError::NoSpanOnLine(2))
        ));
        assert!(matches!(
            selection.select_name(&spans, "zzz"),
            Err(DomainError::UnknownSpan(_))
        ));
        // Failed lookups leave the previous selection in place.
        assert_eq!(selection.selected().map(|s| s.name.as_str()), Some("a"));
    }

    #[test]
    fn selection_survives_unrelated_edits() {
        let mut selection = SelectionState::new();
        let before = registry("def a():\n    pass\n");
        selection.select_line(&before, 1).unwrap();

        let after = registry("def a():\n    pass\ndef b():\n    pass\n");
        assert!(!selection.revalidate(&after));
        assert!(selection.selected().is_some());
    }

    #[test]
    fn surviving_selection_takes_the_new_text() {
        let mut selection = SelectionState::new();
        selection
            .select_line(&registry("def a():\n    return 1\n"), 1)
            .unwrap();

        let edited = registry("def a():\n    return 2\n");
        assert!(!selection.revalidate(&edited));
        assert_eq!(selection.selected(), edited.get(0));
        assert_eq!(
            selection.selected().map(|span| span.full_text.as_str()),
            Some("def a():\n    return 2")
        );
    }

    #[test]
    fn selection_clears_when_span_moves_or_disappears() {
        let mut selection = SelectionState::new();
        let before = registry("def a():\n    pass\n");
        selection.select_line(&before, 1).unwrap();

        let moved = registry("\ndef a():\n    pass\n");
        assert!(selection.revalidate(&moved));
        assert!(selection.is_empty());

        selection.select_line(&moved, 2).unwrap();
        assert!(selection.revalidate(&registry("x = 1\n")));
        assert!(selection.highlight_range().is_none());
    }

    #[test]
    fn index_selection_and_membership() {
        let spans = registry("def a():\n    pass\ndef b():\n    pass\n");
        let mut selection = SelectionState::new();
        let b = spans.get(1).cloned().unwrap();

        selection.select_index(&spans, 1);
        assert!(selection.is_selected(&b));
        assert!(selection.select_index(&spans, 5).is_none());
        assert!(!selection.is_selected(&b));
    }
}
