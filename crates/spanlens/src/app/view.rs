//! Line rows binding highlighted source to detected spans.

use std::ops::Range;
use std::path::Path;

use crate::app::detect::{LanguageHint, split_lines};
use crate::app::registry::SpanRegistry;
use crate::app::selection::SelectionState;
use crate::infra::highlight::{HighlightMode, HighlightSpan, Highlighter, SyntaxHint};

/// Marks a line where a span starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpanMarker {
    /// Index of the span in the registry.
    pub span_index: usize,
    /// Byte range of the span's name on the line, absent for anonymous spans.
    pub name_range: Option<Range<usize>>,
    pub selected: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewLine {
    /// 1-based line number.
    pub number: usize,
    pub segments: Vec<HighlightSpan>,
    pub marker: Option<SpanMarker>,
    /// Whether the line falls inside the selected span.
    pub in_selection: bool,
}

impl ViewLine {
    pub fn text(&self) -> String {
        self.segments.iter().map(|segment| segment.content.as_str()).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceView {
    pub lines: Vec<ViewLine>,
    pub language: Option<String>,
    pub theme: String,
    pub mode: HighlightMode,
}

impl SourceView {
    /// Line number of the first line of each span, in registry order.
    pub fn marker_lines(&self) -> impl Iterator<Item = usize> + '_ {
        self.lines
            .iter()
            .filter(|line| line.marker.is_some())
            .map(|line| line.number)
    }
}

/// Inputs describing what to render.
#[derive(Debug, Clone, Copy)]
pub struct ViewRequest<'a> {
    pub text: &'a str,
    pub registry: &'a SpanRegistry,
    pub selection: &'a SelectionState,
    pub language: LanguageHint,
    pub path: Option<&'a Path>,
    pub theme: &'a str,
}

/// Builds [`SourceView`]s for the code pane.
#[derive(Debug, Default, Clone)]
pub struct ViewService {
    highlighter: Highlighter,
}

impl ViewService {
    pub fn new() -> Self {
        Self {
            highlighter: Highlighter::new(),
        }
    }

    pub fn build(&self, request: ViewRequest<'_>) -> SourceView {
        let mut lines = split_lines(request.text);
        // A terminating newline does not start another line.
        if lines.len() > 1 && lines.last().is_some_and(|line| line.is_empty()) {
            lines.pop();
        }
        if request.text.is_empty() {
            lines.clear();
        }

        let hint = SyntaxHint {
            path: request.path,
            language: request.language,
        };
        let highlighted = self.highlighter.highlight(hint, &lines, request.theme);
        let selected_range = request.selection.highlight_range();

        let rows = highlighted
            .lines
            .into_iter()
            .zip(lines.iter())
            .enumerate()
            .map(|(index, (highlighted, raw))| {
                let number = index + 1;
                let marker = request
                    .registry
                    .iter()
                    .position(|span| span.line_start == number)
                    .map(|span_index| {
                        let span = &request.registry.spans()[span_index];
                        SpanMarker {
                            span_index,
                            name_range: (!span.is_anonymous())
                                .then(|| raw.find(span.name.as_str()))
                                .flatten()
                                .map(|start| start..start + span.name.len()),
                            selected: request.selection.is_selected(span),
                        }
                    });
                ViewLine {
                    number,
                    segments: highlighted.spans,
                    marker,
                    in_selection: selected_range
                        .is_some_and(|(start, end)| number >= start && number <= end),
                }
            })
            .collect();

        SourceView {
            lines: rows,
            language: highlighted.language,
            theme: highlighted.theme,
            mode: highlighted.mode,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::detect::StructureDetector;
    use crate::infra::highlight::DEFAULT_THEME;

    const SOURCE: &str = "class Greeter:\n    def greet(self):\n        return 'hi'\n\nx = Greeter()\n";

    fn build(selection: &SelectionState, registry: &SpanRegistry) -> SourceView {
        ViewService::new().build(ViewRequest {
            text: SOURCE,
            registry,
            selection,
            language: LanguageHint::Python,
            path: None,
            theme: DEFAULT_THEME,
        })
    }

    #[test]
    fn rows_mark_span_starts_and_names() {
        let registry = StructureDetector::default().detect_registry(SOURCE, LanguageHint::Python);
        let view = build(&SelectionState::new(), &registry);

        assert_eq!(view.lines.len(), 5);
        assert_eq!(view.marker_lines().collect::<Vec<_>>(), vec![1, 2]);
        assert_eq!(view.lines[2].text(), "        return 'hi'");

        let greet = view.lines[1].marker.as_ref().unwrap();
        assert_eq!(greet.span_index, 1);
        assert_eq!(greet.name_range, Some(8..13));
        assert!(!greet.selected);
        assert!(view.lines.iter().all(|line| !line.in_selection));
    }

    #[test]
    fn selection_marks_its_range() {
        let registry = StructureDetector::default().detect_registry(SOURCE, LanguageHint::Python);
        let mut selection = SelectionState::new();
        selection.select_line(&registry, 2).unwrap();
        let view = build(&selection, &registry);

        let covered: Vec<usize> = view
            .lines
            .iter()
            .filter(|line| line.in_selection)
            .map(|line| line.number)
            .collect();
        assert_eq!(covered, vec![2, 3]);
        assert!(view.lines[1].marker.as_ref().unwrap().selected);
        assert!(!view.lines[0].marker.as_ref().unwrap().selected);
    }

    #[test]
    fn anonymous_spans_have_no_name_range() {
        let text = "export default function () {\n  go();\n}\n";
        let registry = StructureDetector::default().detect_registry(text, LanguageHint::JavaScript);
        let view = ViewService::new().build(ViewRequest {
            text,
            registry: &registry,
            selection: &SelectionState::new(),
            language: LanguageHint::JavaScript,
            path: None,
            theme: DEFAULT_THEME,
        });

        assert_eq!(view.lines.len(), 3);
        let marker = view.lines[0].marker.as_ref().unwrap();
        assert_eq!(marker.name_range, None);
    }

    #[test]
    fn empty_text_has_no_rows() {
        let view = ViewService::new().build(ViewRequest {
            text: "",
            registry: &SpanRegistry::default(),
            selection: &SelectionState::new(),
            language: LanguageHint::Auto,
            path: None,
            theme: DEFAULT_THEME,
        });
        assert!(view.lines.is_empty());
    }
}
