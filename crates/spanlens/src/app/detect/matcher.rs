//! Block matchers computing where a definition's body ends.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::DetectorOptions;

/// Strategy used to find the last line of a definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlockMatcher {
    /// Whitespace-significant bodies: the block lasts while lines are indented deeper than
    /// the definition line.
    Indent,
    /// Delimiter-significant bodies: the block lasts until the body's `{` is balanced.
    Brace,
}

impl BlockMatcher {
    /// Zero-based index of the last line of the block opened at `start`.
    ///
    /// Returns `None` when a brace-delimited declaration turns out to have no body (a
    /// prototype, an abstract member, or a statement that only looked like a definition).
    pub fn block_end(self, lines: &[&str], start: usize, options: &DetectorOptions) -> Option<usize> {
        match self {
            BlockMatcher::Indent => Some(indent_end(lines, start, options.tab_width)),
            BlockMatcher::Brace => brace_end(lines, start, options),
        }
    }
}

/// How `{`/`}` inside string and comment literals are treated by the brace matcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BraceCounting {
    /// Skip delimiters inside quoted literals and comments.
    #[default]
    LiteralAware,
    /// Count every delimiter character.
    Naive,
}

impl BraceCounting {
    pub fn as_str(&self) -> &'static str {
        match self {
            BraceCounting::LiteralAware => "literal-aware",
            BraceCounting::Naive => "naive",
        }
    }
}

impl fmt::Display for BraceCounting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BraceCounting {
    type Err = BraceCountingParseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "literal-aware" | "literal_aware" | "aware" => Ok(BraceCounting::LiteralAware),
            "naive" => Ok(BraceCounting::Naive),
            other => Err(BraceCountingParseError::Unknown(other.to_string())),
        }
    }
}

#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum BraceCountingParseError {
    #[error("unknown brace counting policy '{0}'")]
    Unknown(String),
}

/// Width of the leading whitespace with tabs expanded to `tab_width` columns.
pub fn indent_width(line: &str, tab_width: usize) -> usize {
    line.chars()
        .take_while(|ch| ch.is_whitespace())
        .map(|ch| if ch == '\t' { tab_width } else { 1 })
        .sum()
}

fn indent_end(lines: &[&str], start: usize, tab_width: usize) -> usize {
    let base = indent_width(lines[start], tab_width);
    let mut committed = start;

    for (index, line) in lines.iter().enumerate().skip(start + 1) {
        // Blank lines never end the block but only count once a deeper line follows.
        if line.trim().is_empty() {
            continue;
        }
        if indent_width(line, tab_width) > base {
            committed = index;
        } else {
            break;
        }
    }

    committed
}

fn brace_end(lines: &[&str], start: usize, options: &DetectorOptions) -> Option<usize> {
    let mut lexer = LiteralLexer::new(options.brace_counting);
    let base = indent_width(lines[start], options.tab_width);
    // Parentheses and brackets seen before the body opens, so `fn f(x: [u8; 4])` and
    // `function f(opts = {})` do not end or open the declaration early.
    let mut nesting = 0usize;
    let mut depth = 0usize;
    let mut opened = false;
    let mut continued = false;
    let mut where_clause = false;

    for (index, line) in lines.iter().enumerate().skip(start) {
        // Outside any parameter list the body must open on the header line or the next
        // non-blank one, and a shallower line there may only be the opening brace itself.
        // A `where` clause may take several lines before the brace.
        if !opened && nesting == 0 && index > start && !lexer.in_literal() {
            let trimmed = line.trim_start();
            if trimmed.is_empty() {
                continue;
            }
            let shallow =
                indent_width(line, options.tab_width) <= base && !trimmed.starts_with('{');
            if trimmed.split_whitespace().next() == Some("where") {
                where_clause = true;
            } else if shallow || (continued && !where_clause) {
                return None;
            }
            continued = true;
        }

        for (offset, ch) in line.char_indices() {
            if !lexer.is_code(ch, &line[offset + ch.len_utf8()..]) {
                continue;
            }

            if opened {
                match ch {
                    '{' => depth += 1,
                    '}' => {
                        depth -= 1;
                        if depth == 0 {
                            return Some(index);
                        }
                    }
                    _ => {}
                }
                continue;
            }

            match ch {
                '(' | '[' => nesting += 1,
                ')' | ']' => nesting = nesting.saturating_sub(1),
                '{' if nesting == 0 => {
                    opened = true;
                    depth = 1;
                }
                ';' | '}' if nesting == 0 => return None,
                _ => {}
            }
        }
        lexer.end_line();
    }

    // Unterminated bodies run to the end of the input.
    opened.then(|| lines.len() - 1)
}

/// Whether an apostrophe followed by `rest` starts a quoted literal. A word that does not
/// close right away (`'a`, `'static`, `'outer:`) is a lifetime or label and stays code.
fn opens_quote(rest: &str) -> bool {
    let word = rest
        .find(|ch: char| !(ch.is_alphanumeric() || ch == '_'))
        .unwrap_or(rest.len());
    if word > 0 {
        return rest[word..].starts_with('\'');
    }
    rest.contains('\'')
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LexState {
    Code,
    LineComment,
    BlockComment { star: bool },
    Quoted { quote: char, escaped: bool },
}

/// Tracks whether each character sits in code or inside a literal/comment.
#[derive(Debug)]
struct LiteralLexer {
    counting: BraceCounting,
    state: LexState,
    pending_slash: bool,
}

impl LiteralLexer {
    fn new(counting: BraceCounting) -> Self {
        Self {
            counting,
            state: LexState::Code,
            pending_slash: false,
        }
    }

    /// Feed one character; returns `true` when it is structural code. `rest` is the remainder
    /// of the current line after `ch`.
    fn is_code(&mut self, ch: char, rest: &str) -> bool {
        if self.counting == BraceCounting::Naive {
            return true;
        }

        match self.state {
            LexState::Code => {
                let after_slash = std::mem::take(&mut self.pending_slash);
                match ch {
                    '/' if after_slash => {
                        self.state = LexState::LineComment;
                        false
                    }
                    '*' if after_slash => {
                        self.state = LexState::BlockComment { star: false };
                        false
                    }
                    '/' => {
                        self.pending_slash = true;
                        false
                    }
                    '"' | '`' => {
                        self.state = LexState::Quoted {
                            quote: ch,
                            escaped: false,
                        };
                        false
                    }
                    '\'' if opens_quote(rest) => {
                        self.state = LexState::Quoted {
                            quote: ch,
                            escaped: false,
                        };
                        false
                    }
                    _ => true,
                }
            }
            LexState::LineComment => false,
            LexState::BlockComment { star } => {
                self.state = if star && ch == '/' {
                    LexState::Code
                } else {
                    LexState::BlockComment { star: ch == '*' }
                };
                false
            }
            LexState::Quoted { quote, escaped } => {
                self.state = if escaped {
                    LexState::Quoted {
                        quote,
                        escaped: false,
                    }
                } else if ch == '\\' {
                    LexState::Quoted {
                        quote,
                        escaped: true,
                    }
                } else if ch == quote {
                    LexState::Code
                } else {
                    LexState::Quoted {
                        quote,
                        escaped: false,
                    }
                };
                false
            }
        }
    }

    /// Whether a multi-line literal or comment is still open.
    fn in_literal(&self) -> bool {
        self.state != LexState::Code
    }

    fn end_line(&mut self) {
        self.pending_slash = false;
        self.state = match self.state {
            LexState::LineComment => LexState::Code,
            // Only template literals span lines.
            LexState::Quoted { quote, .. } if quote != '`' => LexState::Code,
            other => other,
        };
    }
}
