//! Syntax highlighting utilities built on top of syntect.

use std::borrow::Cow;
use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use once_cell::sync::Lazy;
use syntect::easy::HighlightLines;
use syntect::highlighting::{FontStyle, Style as SyntectStyle, Theme, ThemeSet};
use syntect::parsing::{SyntaxReference, SyntaxSet};

use crate::app::detect::LanguageHint;

pub const DEFAULT_THEME: &str = "base16-ocean.dark";

static DEFAULT_ASSETS: Lazy<(Arc<SyntaxSet>, Arc<ThemeSet>)> = Lazy::new(|| {
    (
        Arc::new(SyntaxSet::load_defaults_newlines()),
        Arc::new(ThemeSet::load_defaults()),
    )
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RgbColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HighlightAttributes {
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HighlightStyle {
    pub foreground: Option<RgbColor>,
    pub background: Option<RgbColor>,
    pub attributes: HighlightAttributes,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HighlightSpan {
    pub content: String,
    pub style: HighlightStyle,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HighlightLine {
    pub spans: Vec<HighlightSpan>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HighlightMode {
    Highlighted,
    Plain,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HighlightResult {
    pub lines: Vec<HighlightLine>,
    pub language: Option<String>,
    pub theme: String,
    pub mode: HighlightMode,
}

impl HighlightResult {
    pub fn plain(lines: &[&str], theme: String) -> Self {
        HighlightResult {
            lines: lines
                .iter()
                .map(|line| HighlightLine {
                    spans: vec![HighlightSpan {
                        content: (*line).to_string(),
                        style: HighlightStyle::default(),
                    }],
                })
                .collect(),
            language: None,
            theme,
            mode: HighlightMode::Plain,
        }
    }
}

/// How to pick a grammar for a piece of source text.
#[derive(Debug, Clone, Copy, Default)]
pub struct SyntaxHint<'a> {
    pub path: Option<&'a Path>,
    pub language: LanguageHint,
}

#[derive(Debug, Clone)]
pub struct Highlighter {
    syntax_set: Arc<SyntaxSet>,
    theme_set: Arc<ThemeSet>,
}

impl Default for Highlighter {
    fn default() -> Self {
        Self::new()
    }
}

impl Highlighter {
    pub fn new() -> Self {
        let assets = &*DEFAULT_ASSETS;
        Self {
            syntax_set: Arc::clone(&assets.0),
            theme_set: Arc::clone(&assets.1),
        }
    }

    pub fn available_themes(&self) -> Vec<String> {
        let mut themes: Vec<_> = self.theme_set.themes.keys().cloned().collect();
        themes.sort();
        themes
    }

    /// Highlight `lines` (without line terminators). Grammar lookup tries the path, then the
    /// language hint, then the first line; sources nothing recognizes render as plain text.
    pub fn highlight(&self, hint: SyntaxHint<'_>, lines: &[&str], theme: &str) -> HighlightResult {
        let resolved_theme = self.resolve_theme(theme);
        let theme_name = resolved_theme.name.to_string();

        let Some(syntax) = self.syntax_for(hint, lines) else {
            return HighlightResult::plain(lines, theme_name);
        };

        match self.highlight_with_syntax(lines, resolved_theme.theme, syntax) {
            Ok(highlighted) => HighlightResult {
                lines: highlighted,
                language: Some(syntax.name.clone()),
                theme: theme_name,
                mode: HighlightMode::Highlighted,
            },
            Err(err) => {
                tracing::warn!(error = %err, syntax = %syntax.name, "highlight failed");
                HighlightResult::plain(lines, theme_name)
            }
        }
    }

    fn highlight_with_syntax(
        &self,
        lines: &[&str],
        theme: &Theme,
        syntax: &SyntaxReference,
    ) -> Result<Vec<HighlightLine>> {
        let mut highlighter = HighlightLines::new(syntax, theme);
        let mut result = Vec::with_capacity(lines.len());
        let mut buffer = String::new();
        for line in lines {
            // The newline grammars expect terminated lines.
            buffer.clear();
            buffer.push_str(line);
            buffer.push('\n');
            let segments = highlighter.highlight_line(&buffer, &self.syntax_set)?;
            let spans = segments
                .into_iter()
                .filter_map(|(style, text)| {
                    let content = text.strip_suffix('\n').unwrap_or(text);
                    (!content.is_empty()).then(|| HighlightSpan {
                        content: content.to_string(),
                        style: convert_style(style),
                    })
                })
                .collect();
            result.push(HighlightLine { spans });
        }
        Ok(result)
    }

    fn syntax_for(&self, hint: SyntaxHint<'_>, lines: &[&str]) -> Option<&SyntaxReference> {
        let by_path = hint.path.and_then(|path| match self.syntax_set.find_syntax_for_file(path) {
            Ok(found) => found,
            Err(err) => {
                tracing::debug!(path = %path.display(), error = %err, "syntax lookup failed");
                None
            }
        });

        by_path
            .filter(|syntax| syntax.name != "Plain Text")
            .or_else(|| {
                hint.language
                    .syntax_token()
                    .and_then(|token| self.syntax_set.find_syntax_by_token(token))
            })
            .or_else(|| {
                lines
                    .first()
                    .and_then(|line| self.syntax_set.find_syntax_by_first_line(line))
            })
            .or(by_path)
    }

    fn resolve_theme<'a>(&'a self, requested: &'a str) -> ResolvedTheme<'a> {
        if let Some(theme) = self.theme_set.themes.get(requested) {
            return ResolvedTheme {
                name: Cow::Borrowed(requested),
                theme,
            };
        }

        if let Some((name, theme)) = self
            .theme_set
            .themes
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(requested))
        {
            return ResolvedTheme {
                name: Cow::Owned(name.clone()),
                theme,
            };
        }

        // The syntect defaults always ship the default theme.
        let (fallback_name, theme) = self
            .theme_set
            .themes
            .get_key_value(DEFAULT_THEME)
            .or_else(|| self.theme_set.themes.iter().next())
            .expect("bundled theme set is never empty");

        tracing::warn!(
            requested,
            fallback = %fallback_name,
            "theme not found"
        );

        ResolvedTheme {
            name: Cow::Owned(fallback_name.clone()),
            theme,
        }
    }
}

#[derive(Debug, Clone)]
struct ResolvedTheme<'a> {
    name: Cow<'a, str>,
    theme: &'a Theme,
}

fn convert_style(style: SyntectStyle) -> HighlightStyle {
    let attributes = HighlightAttributes {
        bold: style.font_style.contains(FontStyle::BOLD),
        italic: style.font_style.contains(FontStyle::ITALIC),
        underline: style.font_style.contains(FontStyle::UNDERLINE),
    };

    HighlightStyle {
        foreground: convert_color(style.foreground),
        background: convert_color(style.background),
        attributes,
    }
}

fn convert_color(color: syntect::highlighting::Color) -> Option<RgbColor> {
    if color.a == 0 {
        None
    } else {
        Some(RgbColor {
            r: color.r,
            g: color.g,
            b: color.b,
        })
    }
}
