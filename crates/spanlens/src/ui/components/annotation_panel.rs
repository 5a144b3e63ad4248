//! Annotation pane showing the selected span and its explanation.

use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};

use crate::domain::model::Span as SourceSpan;

/// What the pane knows about one piece of annotation text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum PanelText {
    #[default]
    Empty,
    Loading,
    Ready(String),
    Failed(String),
}

impl PanelText {
    pub fn is_ready(&self) -> bool {
        matches!(self, PanelText::Ready(_))
    }

    pub fn ready_text(&self) -> Option<&str> {
        match self {
            PanelText::Ready(text) => Some(text),
            _ => None,
        }
    }
}

/// Displays the selected span header, its annotation, and an optional detailed follow-up.
#[derive(Debug, Default)]
pub struct AnnotationPanel {
    span: Option<SourceSpan>,
    annotation: PanelText,
    detail: PanelText,
}

impl AnnotationPanel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Show `span` with no annotation yet. Any previous detail is dropped.
    pub fn show_span(&mut self, span: &SourceSpan) {
        self.span = Some(span.clone());
        self.annotation = PanelText::Empty;
        self.detail = PanelText::Empty;
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub fn span(&self) -> Option<&SourceSpan> {
        self.span.as_ref()
    }

    pub fn annotation(&self) -> &PanelText {
        &self.annotation
    }

    pub fn detail(&self) -> &PanelText {
        &self.detail
    }

    pub fn set_annotation(&mut self, text: PanelText) {
        self.annotation = text;
    }

    pub fn set_detail(&mut self, text: PanelText) {
        self.detail = text;
    }

    pub fn render(&self, frame: &mut Frame<'_>, area: Rect, has_focus: bool) {
        let border_color = if has_focus {
            Color::Cyan
        } else {
            Color::DarkGray
        };
        let block = Block::default()
            .title("Annotation")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(border_color));
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let Some(span) = &self.span else {
            let placeholder = Paragraph::new("Click a definition or press enter to annotate it")
                .style(
                    Style::default()
                        .fg(Color::DarkGray)
                        .add_modifier(Modifier::ITALIC),
                )
                .wrap(Wrap { trim: true });
            frame.render_widget(placeholder, inner);
            return;
        };

        let mut lines = vec![header_line(span), Line::raw("")];
        lines.extend(text_lines(&self.annotation, "press enter to annotate"));
        if self.detail != PanelText::Empty {
            lines.push(Line::raw(""));
            lines.push(Line::styled(
                "More detail",
                Style::default()
                    .fg(Color::Gray)
                    .add_modifier(Modifier::BOLD),
            ));
            lines.extend(text_lines(&self.detail, ""));
        }

        frame.render_widget(Paragraph::new(lines).wrap(Wrap { trim: false }), inner);
    }
}

fn header_line(span: &SourceSpan) -> Line<'static> {
    Line::from(vec![
        Span::styled(
            span.kind.as_str().to_string(),
            Style::default().fg(Color::Gray),
        ),
        Span::raw(" "),
        Span::styled(
            span.name.clone(),
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled(
            format!("  lines {}-{}", span.line_start, span.line_end),
            Style::default().fg(Color::DarkGray),
        ),
    ])
}

fn text_lines(text: &PanelText, idle_hint: &str) -> Vec<Line<'static>> {
    match text {
        PanelText::Empty if idle_hint.is_empty() => Vec::new(),
        PanelText::Empty => vec![Line::styled(
            idle_hint.to_string(),
            Style::default().fg(Color::DarkGray),
        )],
        PanelText::Loading => vec![Line::styled(
            "Loading…",
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::ITALIC),
        )],
        PanelText::Ready(text) => text.lines().map(|line| Line::raw(line.to_string())).collect(),
        PanelText::Failed(message) => vec![Line::styled(
            format!("Failed: {message}"),
            Style::default().fg(Color::Red),
        )],
    }
}
