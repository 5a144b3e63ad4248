//! Line recognizers for definition headers, in priority order.

use once_cell::sync::Lazy;
use regex::Regex;

use super::language::LanguageHint;
use super::matcher::BlockMatcher;
use crate::domain::model::{ANONYMOUS, SpanKind};

/// Words that can precede `(` in statements and must never be taken as a definition's return
/// type or name.
const STATEMENT_KEYWORDS: &[&str] = &[
    "if", "else", "for", "foreach", "while", "do", "switch", "case", "catch", "return", "throw",
    "new", "await", "yield", "typeof", "sizeof", "delete", "function", "match", "loop", "let",
    "using", "lock", "goto", "assert", "print", "not", "and", "or", "in", "is", "lambda", "del",
    "raise", "import", "from", "with", "elif", "pass", "echo", "defer", "go", "select",
];

const PYTHON: &[LanguageHint] = &[LanguageHint::Python];
const SCRIPT: &[LanguageHint] = &[LanguageHint::JavaScript, LanguageHint::TypeScript];
const CLASSES: &[LanguageHint] = &[
    LanguageHint::JavaScript,
    LanguageHint::TypeScript,
    LanguageHint::Java,
    LanguageHint::CSharp,
    LanguageHint::Cpp,
];
const RUST: &[LanguageHint] = &[LanguageHint::Rust];
const GO: &[LanguageHint] = &[LanguageHint::Go];
const C_FAMILY: &[LanguageHint] = &[LanguageHint::Java, LanguageHint::CSharp, LanguageHint::Cpp];

/// A definition header found on one line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    pub kind: SpanKind,
    pub name: String,
    pub matcher: BlockMatcher,
}

#[derive(Debug)]
pub struct Recognizer {
    pub label: &'static str,
    kind: SpanKind,
    matcher: BlockMatcher,
    hints: &'static [LanguageHint],
    pattern: Regex,
    guarded: bool,
}

impl Recognizer {
    fn new(
        label: &'static str,
        kind: SpanKind,
        matcher: BlockMatcher,
        hints: &'static [LanguageHint],
        pattern: &str,
    ) -> Self {
        Self {
            label,
            kind,
            matcher,
            hints,
            // Patterns are compile-time constants covered by the tests below.
            pattern: Regex::new(pattern).expect("recognizer pattern must compile"),
            guarded: false,
        }
    }

    fn guarded(mut self) -> Self {
        self.guarded = true;
        self
    }

    pub fn applies_to(&self, hint: LanguageHint) -> bool {
        hint == LanguageHint::Auto || self.hints.contains(&hint)
    }

    pub fn recognize(&self, line: &str) -> Option<Header> {
        let captures = self.pattern.captures(line)?;
        let name = captures
            .name("name")
            .map(|m| m.as_str().trim())
            .filter(|name| !name.is_empty());

        if self.guarded {
            let returns = captures.name("ret").map(|m| m.as_str()).unwrap_or_default();
            let keyword_found = returns
                .split_whitespace()
                .chain(name)
                .any(|word| STATEMENT_KEYWORDS.contains(&word));
            if keyword_found {
                return None;
            }
        }

        Some(Header {
            kind: self.kind,
            name: name.unwrap_or(ANONYMOUS).to_string(),
            matcher: self.matcher,
        })
    }
}

pub static RECOGNIZERS: Lazy<Vec<Recognizer>> = Lazy::new(|| {
    vec![
        Recognizer::new(
            "python-def",
            SpanKind::Function,
            BlockMatcher::Indent,
            PYTHON,
            r"^\s*(?:async\s+)?def\s+(?P<name>[A-Za-z_]\w*)\s*\(",
        ),
        Recognizer::new(
            "python-class",
            SpanKind::Class,
            BlockMatcher::Indent,
            PYTHON,
            r"^\s*class\s+(?P<name>[A-Za-z_]\w*)\s*[(:]",
        ),
        Recognizer::new(
            "js-function",
            SpanKind::Function,
            BlockMatcher::Brace,
            SCRIPT,
            r"^\s*(?:export\s+)?(?:default\s+)?(?:async\s+)?function\b\s*\*?\s*(?P<name>[A-Za-z_$][\w$]*)?\s*(?:<[^>]*>)?\s*\(",
        ),
        Recognizer::new(
            "class",
            SpanKind::Class,
            BlockMatcher::Brace,
            CLASSES,
            r"^\s*(?:export\s+)?(?:default\s+)?(?:(?:public|private|protected|internal|static|abstract|final|sealed|partial)\s+)*class\b(?:\s+(?P<name>[A-Za-z_$][\w$]*))?\s*(?:\{|extends\b|implements\b|<|:|$)",
        ),
        Recognizer::new(
            "js-binding",
            SpanKind::Function,
            BlockMatcher::Brace,
            SCRIPT,
            r"^\s*(?:export\s+)?(?:const|let|var)\s+(?P<name>[A-Za-z_$][\w$]*)\s*(?::[^=]+)?=\s*(?:async\s+)?(?:function\b|\((?:[^)]*\)\s*(?::[^=]+)?=>|[^)]*$)|[A-Za-z_$][\w$]*\s*=>)",
        ),
        Recognizer::new(
            "rust-fn",
            SpanKind::Function,
            BlockMatcher::Brace,
            RUST,
            r#"^\s*(?:pub(?:\([^)]*\))?\s+)?(?:default\s+)?(?:const\s+)?(?:async\s+)?(?:unsafe\s+)?(?:extern\s+"[^"]*"\s+)?fn\s+(?P<name>[A-Za-z_]\w*)"#,
        ),
        Recognizer::new(
            "rust-type",
            SpanKind::Class,
            BlockMatcher::Brace,
            RUST,
            r"^\s*(?:pub(?:\([^)]*\))?\s+)?(?:unsafe\s+)?(?:struct|enum|union|trait)\s+(?P<name>[A-Za-z_]\w*)",
        ),
        Recognizer::new(
            "rust-impl",
            SpanKind::Class,
            BlockMatcher::Brace,
            RUST,
            r"^\s*(?:unsafe\s+)?impl(?:<[^>]*>)?\s+(?P<name>[^{]+?)\s*(?:\{|\bwhere\b|$)",
        ),
        Recognizer::new(
            "go-func",
            SpanKind::Function,
            BlockMatcher::Brace,
            GO,
            r"^\s*func\s*(?:\([^)]*\)\s*)?(?P<name>[A-Za-z_]\w*)\s*(?:\[[^\]]*\]\s*)?\(",
        ),
        Recognizer::new(
            "typed-method",
            SpanKind::Function,
            BlockMatcher::Brace,
            C_FAMILY,
            r"^\s*(?:(?:public|private|protected|internal|static|final|abstract|synchronized|native|virtual|override|async|sealed|extern|inline|constexpr|unsafe|new|partial)\s+)*(?P<ret>[A-Za-z_][\w:<>,\[\]\s*&?.]*?)\s+[*&]*(?P<name>[A-Za-z_~]\w*)\s*\(",
        )
        .guarded(),
        Recognizer::new(
            "js-method",
            SpanKind::Function,
            BlockMatcher::Brace,
            SCRIPT,
            r"^\s*(?:(?:static|async|get|set|public|private|protected|readonly|override)\s+)*\*?(?P<name>[A-Za-z_$][\w$]*)\s*\([^)]*\)\s*(?::\s*[^{=;]+)?\{",
        )
        .guarded(),
    ]
});

/// First recognizer (in priority order) that fires on `line` under `hint`.
pub fn recognize(line: &str, hint: LanguageHint) -> Option<Header> {
    RECOGNIZERS
        .iter()
        .filter(|recognizer| recognizer.applies_to(hint))
        .find_map(|recognizer| recognizer.recognize(line))
}
