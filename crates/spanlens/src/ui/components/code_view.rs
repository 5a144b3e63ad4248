//! Code pane rendering highlighted source with span markers.

use std::ops::Range;

use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph};

use crate::app::view::{SourceView, ViewLine};
use crate::infra::highlight::HighlightSpan;

/// Ratatui component that draws a [`SourceView`] with line numbers.
///
/// Lines are never wrapped so that screen rows map one-to-one onto source lines.
#[derive(Debug, Default)]
pub struct CodeView;

impl CodeView {
    pub fn render(
        &self,
        view: &SourceView,
        title: &str,
        scroll: usize,
        has_focus: bool,
        area: Rect,
        buf: &mut Buffer,
    ) {
        let border_color = if has_focus {
            Color::Cyan
        } else {
            Color::DarkGray
        };
        let block = Block::default()
            .title(title.to_string())
            .borders(Borders::ALL)
            .border_style(Style::default().fg(border_color));
        let inner = block.inner(area);
        block.render(area, buf);

        let mut lines: Vec<Line<'_>> = view
            .lines
            .iter()
            .skip(scroll)
            .take(inner.height as usize)
            .map(render_line)
            .collect();

        if lines.is_empty() {
            lines.push(Line::styled(
                "(empty file)",
                Style::default().fg(Color::DarkGray),
            ));
        }

        Paragraph::new(lines).render(inner, buf);
    }

    /// Source line under the screen `row`, given the pane `area` and `scroll` offset.
    pub fn line_at(view: &SourceView, area: Rect, scroll: usize, row: u16) -> Option<usize> {
        let top = area.y.saturating_add(1);
        let bottom = area.y.saturating_add(area.height).saturating_sub(1);
        if row < top || row >= bottom {
            return None;
        }
        let index = scroll + usize::from(row - top);
        view.lines.get(index).map(|line| line.number)
    }
}

fn render_line(line: &ViewLine) -> Line<'_> {
    let selected = line.in_selection;
    let gutter_style = Style::default()
        .fg(Color::DarkGray)
        .bg(selection_background(selected));
    let marker = match &line.marker {
        Some(marker) if marker.selected => {
            Span::styled("▶ ", gutter_style.fg(Color::Yellow))
        }
        Some(_) => Span::styled("▸ ", gutter_style.fg(Color::Cyan)),
        None => Span::styled("  ", gutter_style),
    };

    let mut spans = vec![
        Span::styled(format!("{:>4} │ ", line.number), gutter_style),
        marker,
    ];
    let emphasis = line
        .marker
        .as_ref()
        .and_then(|marker| marker.name_range.clone());
    let mut offset = 0;
    for segment in &line.segments {
        spans.extend(split_segment(segment, offset, emphasis.as_ref(), selected));
        offset += segment.content.len();
    }
    Line::from(spans)
}

/// Style a highlighted segment, emphasising the part that overlaps the span name.
fn split_segment<'a>(
    segment: &'a HighlightSpan,
    offset: usize,
    emphasis: Option<&Range<usize>>,
    selected: bool,
) -> Vec<Span<'a>> {
    let base = segment_style(segment, selected);
    let content = segment.content.as_str();
    let end = offset + content.len();

    let Some(range) = emphasis.filter(|range| range.start < end && range.end > offset) else {
        return vec![Span::styled(content, base)];
    };

    let from = range.start.saturating_sub(offset);
    let to = range.end.min(end) - offset;
    let strong = base.add_modifier(Modifier::BOLD | Modifier::UNDERLINED);
    [
        (&content[..from], base),
        (&content[from..to], strong),
        (&content[to..], base),
    ]
    .into_iter()
    .filter(|(text, _)| !text.is_empty())
    .map(|(text, style)| Span::styled(text, style))
    .collect()
}

fn segment_style(span: &HighlightSpan, selected: bool) -> Style {
    let mut style = Style::default().bg(selection_background(selected));

    if let Some(color) = span.style.foreground {
        style = style.fg(Color::Rgb(color.r, color.g, color.b));
    }
    if !selected && let Some(color) = span.style.background {
        style = style.bg(Color::Rgb(color.r, color.g, color.b));
    }

    if span.style.attributes.bold {
        style = style.add_modifier(Modifier::BOLD);
    }
    if span.style.attributes.italic {
        style = style.add_modifier(Modifier::ITALIC);
    }
    if span.style.attributes.underline {
        style = style.add_modifier(Modifier::UNDERLINED);
    }
    style
}

fn selection_background(selected: bool) -> Color {
    if selected {
        Color::Rgb(32, 52, 70)
    } else {
        Color::Reset
    }
}
