//! Language hints narrowing which recognizers run over a source.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Guess about the language of a source text. `Auto` runs every recognizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum LanguageHint {
    #[default]
    Auto,
    Python,
    JavaScript,
    TypeScript,
    Java,
    CSharp,
    Cpp,
    Go,
    Rust,
}

impl LanguageHint {
    pub fn as_str(&self) -> &'static str {
        match self {
            LanguageHint::Auto => "auto",
            LanguageHint::Python => "python",
            LanguageHint::JavaScript => "javascript",
            LanguageHint::TypeScript => "typescript",
            LanguageHint::Java => "java",
            LanguageHint::CSharp => "csharp",
            LanguageHint::Cpp => "cpp",
            LanguageHint::Go => "go",
            LanguageHint::Rust => "rust",
        }
    }

    /// Token understood by the syntax highlighter, if any.
    pub fn syntax_token(&self) -> Option<&'static str> {
        match self {
            LanguageHint::Auto => None,
            LanguageHint::Python => Some("py"),
            LanguageHint::JavaScript => Some("js"),
            // The bundled grammars have no TypeScript syntax.
            LanguageHint::TypeScript => Some("js"),
            LanguageHint::Java => Some("java"),
            LanguageHint::CSharp => Some("cs"),
            LanguageHint::Cpp => Some("cpp"),
            LanguageHint::Go => Some("go"),
            LanguageHint::Rust => Some("rs"),
        }
    }

    /// Guess from a file extension, falling back to `Auto`.
    pub fn from_path(path: &Path) -> Self {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(Self::from_extension)
            .unwrap_or_default()
    }

    pub fn from_extension(ext: &str) -> Self {
        ext.parse().unwrap_or_default()
    }

    /// Parse leniently: unknown names become `Auto`.
    pub fn parse_lenient(value: &str) -> Self {
        value.parse().unwrap_or_else(|err: LanguageParseError| {
            tracing::debug!(error = %err, "falling back to automatic language detection");
            LanguageHint::Auto
        })
    }
}

impl fmt::Display for LanguageHint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LanguageHint {
    type Err = LanguageParseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "" | "auto" => Ok(LanguageHint::Auto),
            "python" | "py" | "pyw" => Ok(LanguageHint::Python),
            "javascript" | "js" | "jsx" | "mjs" | "cjs" => Ok(LanguageHint::JavaScript),
            "typescript" | "ts" | "tsx" | "mts" | "cts" => Ok(LanguageHint::TypeScript),
            "java" => Ok(LanguageHint::Java),
            "csharp" | "c#" | "cs" => Ok(LanguageHint::CSharp),
            "cpp" | "c++" | "c" | "cc" | "cxx" | "h" | "hpp" | "hh" => Ok(LanguageHint::Cpp),
            "go" | "golang" => Ok(LanguageHint::Go),
            "rust" | "rs" => Ok(LanguageHint::Rust),
            other => Err(LanguageParseError::Unknown(other.to_string())),
        }
    }
}

#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum LanguageParseError {
    #[error("unknown language '{0}'")]
    Unknown(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_names_and_extensions() {
        assert_eq!("Python".parse(), Ok(LanguageHint::Python));
        assert_eq!("tsx".parse(), Ok(LanguageHint::TypeScript));
        assert_eq!("c#".parse(), Ok(LanguageHint::CSharp));
        assert!("cobol".parse::<LanguageHint>().is_err());
    }

    #[test]
    fn guesses_from_path() {
        assert_eq!(
            LanguageHint::from_path(Path::new("src/app.py")),
            LanguageHint::Python
        );
        assert_eq!(
            LanguageHint::from_path(Path::new("README")),
            LanguageHint::Auto
        );
        assert_eq!(
            LanguageHint::from_path(Path::new("notes.txt")),
            LanguageHint::Auto
        );
    }

    #[test]
    fn lenient_parse_defaults_to_auto() {
        assert_eq!(LanguageHint::parse_lenient("fortran"), LanguageHint::Auto);
        assert_eq!(LanguageHint::parse_lenient(" go "), LanguageHint::Go);
    }
}
