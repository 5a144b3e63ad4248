//! Walking paths and detecting definitions in every source file found.

use std::fmt::Write as _;
use std::fs::{self, File};
use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use ignore::WalkBuilder;
use rayon::prelude::*;
use serde::Serialize;

use crate::app::detect::{LanguageHint, StructureDetector};
use crate::domain::model::Span;

const DEFAULT_MAX_FILE_SIZE: u64 = 1024 * 1024;

/// Reason a file was not analysed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SkipReason {
    LargeFile,
    BinaryFile,
}

impl SkipReason {
    pub fn describe(&self) -> &'static str {
        match self {
            SkipReason::LargeFile => "file too large",
            SkipReason::BinaryFile => "binary file",
        }
    }
}

/// Definitions found in one file.
#[derive(Debug, Clone, Serialize)]
pub struct DetectionReport {
    pub path: String,
    pub language: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skipped: Option<SkipReason>,
    pub spans: Vec<Span>,
}

impl DetectionReport {
    /// Human readable listing used by `spanlens detect`.
    pub fn render_plain(&self) -> String {
        let mut out = String::new();
        match self.skipped {
            Some(reason) => {
                let _ = writeln!(out, "{} (skipped: {})", self.path, reason.describe());
            }
            None => {
                let _ = writeln!(out, "{} ({})", self.path, self.language);
                if self.spans.is_empty() {
                    out.push_str("  (no definitions)\n");
                }
                for span in &self.spans {
                    let _ = writeln!(
                        out,
                        "  {}-{} {} {}",
                        span.line_start, span.line_end, span.kind, span.name
                    );
                }
            }
        }
        out
    }
}

/// Inputs for a detection run over files and directories.
#[derive(Debug, Clone)]
pub struct ScanRequest {
    pub paths: Vec<PathBuf>,
    /// When non-empty, only files matching one of these globs are analysed.
    pub globs: Vec<String>,
    /// Forces a language for every file instead of guessing from extensions.
    pub language: LanguageHint,
    pub max_file_size: u64,
    pub show_hidden: bool,
}

impl ScanRequest {
    pub fn new(paths: Vec<PathBuf>) -> Self {
        Self {
            paths,
            globs: Vec::new(),
            language: LanguageHint::Auto,
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            show_hidden: false,
        }
    }

    pub fn with_globs(mut self, globs: Vec<String>) -> Self {
        self.globs = globs;
        self
    }

    pub fn with_language(mut self, language: LanguageHint) -> Self {
        self.language = language;
        self
    }

    pub fn with_max_file_size(mut self, bytes: u64) -> Self {
        self.max_file_size = bytes;
        self
    }
}

/// Detects definitions across many files in parallel.
#[derive(Debug, Default)]
pub struct Scanner {
    detector: StructureDetector,
}

impl Scanner {
    pub fn new(detector: StructureDetector) -> Self {
        Self { detector }
    }

    /// Reports ordered by path.
    pub fn scan(&self, request: &ScanRequest) -> Result<Vec<DetectionReport>> {
        let filter = build_filter(&request.globs)?;
        let files = collect_files(request, filter.as_ref())?;
        tracing::debug!(files = files.len(), "detecting definitions");

        let mut reports = files
            .par_iter()
            .map(|(path, display)| self.detect_file(path, display.clone(), request))
            .collect::<Result<Vec<_>>>()?;
        reports.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(reports)
    }

    fn detect_file(
        &self,
        path: &Path,
        display: String,
        request: &ScanRequest,
    ) -> Result<DetectionReport> {
        let language = match request.language {
            LanguageHint::Auto => LanguageHint::from_path(path),
            forced => forced,
        };
        let mut report = DetectionReport {
            path: display,
            language: language.to_string(),
            skipped: None,
            spans: Vec::new(),
        };

        let size = fs::metadata(path)
            .with_context(|| format!("failed to stat {}", path.display()))?
            .len();
        if size > request.max_file_size {
            report.skipped = Some(SkipReason::LargeFile);
            return Ok(report);
        }
        if is_probably_binary(path) {
            report.skipped = Some(SkipReason::BinaryFile);
            return Ok(report);
        }

        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        report.spans = self.detector.detect(&text, language);
        Ok(report)
    }
}

fn build_filter(globs: &[String]) -> Result<Option<GlobSet>> {
    if globs.is_empty() {
        return Ok(None);
    }
    let mut builder = GlobSetBuilder::new();
    for glob in globs {
        builder.add(Glob::new(glob).with_context(|| format!("invalid glob '{glob}'"))?);
    }
    Ok(Some(builder.build().context("failed to build glob filter")?))
}

/// Files to analyse with their display paths. Explicit files are always included; directories
/// are walked respecting ignore files and the glob filter.
fn collect_files(request: &ScanRequest, filter: Option<&GlobSet>) -> Result<Vec<(PathBuf, String)>> {
    let mut files = Vec::new();
    for root in &request.paths {
        if root.is_file() {
            files.push((root.clone(), root.display().to_string()));
            continue;
        }
        if !root.is_dir() {
            anyhow::bail!("path not found: {}", root.display());
        }

        let mut builder = WalkBuilder::new(root);
        builder.git_ignore(true).hidden(!request.show_hidden);
        for entry in builder.build() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    tracing::warn!(error = %err, "walk error");
                    continue;
                }
            };
            if !entry.file_type().is_some_and(|kind| kind.is_file()) {
                continue;
            }
            let rel = entry.path().strip_prefix(root).unwrap_or(entry.path());
            if filter.is_some_and(|set| !set.is_match(rel)) {
                continue;
            }
            files.push((entry.path().to_path_buf(), rel.display().to_string()));
        }
    }
    Ok(files)
}

fn is_probably_binary(path: &Path) -> bool {
    let mut file = match File::open(path) {
        Ok(file) => file,
        Err(_) => return false,
    };
    let mut buf = [0u8; 1024];
    match file.read(&mut buf) {
        Ok(0) => false,
        Ok(n) => buf[..n].contains(&0),
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture() -> Result<tempfile::TempDir> {
        let temp = tempfile::tempdir()?;
        let root = temp.path();
        fs::create_dir_all(root.join("src"))?;
        fs::write(root.join("src/app.py"), "def main():\n    run()\n")?;
        fs::write(root.join("src/util.js"), "function helper() {\n  return 1;\n}\n")?;
        fs::write(root.join("notes.txt"), "nothing here\n")?;
        fs::write(root.join("blob.bin"), b"abc\0def")?;
        Ok(temp)
    }

    fn paths(reports: &[DetectionReport]) -> Vec<&str> {
        reports.iter().map(|r| r.path.as_str()).collect()
    }

    #[test]
    fn walks_directories_in_path_order() -> Result<()> {
        let temp = fixture()?;
        let reports = Scanner::default().scan(&ScanRequest::new(vec![temp.path().to_path_buf()]))?;

        assert_eq!(paths(&reports), vec!["blob.bin", "notes.txt", "src/app.py", "src/util.js"]);
        assert_eq!(reports[0].skipped, Some(SkipReason::BinaryFile));
        assert_eq!(reports[2].language, "python");
        assert_eq!(reports[2].spans[0].name, "main");
        assert_eq!(reports[3].spans[0].line_end, 3);
        Ok(())
    }

    #[test]
    fn globs_filter_walked_files() -> Result<()> {
        let temp = fixture()?;
        let request = ScanRequest::new(vec![temp.path().to_path_buf()])
            .with_globs(vec!["**/*.py".into()]);
        let reports = Scanner::default().scan(&request)?;
        assert_eq!(paths(&reports), vec!["src/app.py"]);
        Ok(())
    }

    #[test]
    fn large_files_are_skipped() -> Result<()> {
        let temp = fixture()?;
        let request = ScanRequest::new(vec![temp.path().join("src/app.py")]).with_max_file_size(4);
        let reports = Scanner::default().scan(&request)?;
        assert_eq!(reports[0].skipped, Some(SkipReason::LargeFile));
        assert!(reports[0].spans.is_empty());
        Ok(())
    }

    #[test]
    fn forced_language_overrides_extension() -> Result<()> {
        let temp = fixture()?;
        let file = temp.path().join("script.txt");
        fs::write(&file, "def tail():\n    pass\n")?;
        let request = ScanRequest::new(vec![file]).with_language(LanguageHint::Python);
        let reports = Scanner::default().scan(&request)?;
        assert_eq!(reports[0].language, "python");
        assert_eq!(reports[0].spans.len(), 1);
        Ok(())
    }

    #[test]
    fn missing_paths_are_errors() {
        let request = ScanRequest::new(vec![PathBuf::from("/definitely/not/here")]);
        assert!(Scanner::default().scan(&request).is_err());
    }

    #[test]
    fn plain_rendering() {
        let report = DetectionReport {
            path: "src/app.py".into(),
            language: "python".into(),
            skipped: None,
            spans: crate::app::detect::detect(
                "class A:\n    def f(self):\n        pass\n",
                LanguageHint::Python,
            ),
        };
        insta::assert_snapshot!(report.render_plain(), @r"
        src/app.py (python)
          1-3 class A
          2-3 function f
        ");

        let skipped = DetectionReport {
            path: "blob.bin".into(),
            language: "auto".into(),
            skipped: Some(SkipReason::BinaryFile),
            spans: Vec::new(),
        };
        assert_eq!(skipped.render_plain(), "blob.bin (skipped: binary file)\n");
    }
}
