//! Command-line interface.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use tokio::runtime::Runtime;

use crate::app::annotations::AnnotationCoordinator;
use crate::app::detect::{LanguageHint, StructureDetector};
use crate::app::history::HistoryStore;
use crate::app::scan::{DetectionReport, ScanRequest, Scanner};
use crate::app::service::AnnotationService;
use crate::app::session::AnnotatorSession;
use crate::app::watch::SourceWatcher;
use crate::infra::config::{Config, workspace_root};
use crate::infra::http::HttpAnnotationService;
use crate::infra::logging::{self, LogTarget};
use crate::ui::app::{BrowserApp, BrowserOptions};

const LOG_FILE: &str = "spanlens.log";
const WATCH_POLL: Duration = Duration::from_millis(500);

#[derive(Debug, Parser)]
#[command(
    name = "spanlens",
    author,
    version,
    about = "Find function and class definitions and annotate them",
    long_about = None
)]
pub struct Cli {
    /// Read configuration from this file instead of the workspace config.
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Print the definitions found in files or directories
    Detect(DetectArgs),
    /// Open the terminal browser on a source file
    Browse(BrowseArgs),
    /// Upload a source file to the annotation service
    Upload(UploadArgs),
    /// Print the annotation of one definition
    Annotate(AnnotateArgs),
    /// Manage files stored by the annotation service
    Files {
        #[command(subcommand)]
        command: FilesCommand,
    },
    /// Generate shell completions
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Debug, Args)]
pub struct DetectArgs {
    #[arg(required = true)]
    pub paths: Vec<PathBuf>,
    /// Language of the input; inferred from the file extension by default.
    #[arg(long)]
    pub language: Option<LanguageHint>,
    /// Print reports as JSON.
    #[arg(long)]
    pub json: bool,
    /// Only walk files matching these globs (repeatable).
    #[arg(long = "glob", value_name = "GLOB")]
    pub globs: Vec<String>,
    /// Re-run detection whenever the file changes.
    #[arg(long)]
    pub watch: bool,
}

#[derive(Debug, Args)]
pub struct BrowseArgs {
    pub path: PathBuf,
    /// Remote file id; defaults to the id remembered from the last upload of this path.
    #[arg(long)]
    pub file_id: Option<String>,
    #[arg(long)]
    pub language: Option<LanguageHint>,
    /// Do not re-detect when the file changes on disk.
    #[arg(long)]
    pub no_watch: bool,
}

#[derive(Debug, Args)]
pub struct UploadArgs {
    pub path: PathBuf,
    /// Display name; defaults to the file name.
    #[arg(long)]
    pub name: Option<String>,
}

#[derive(Debug, Args)]
pub struct AnnotateArgs {
    pub path: PathBuf,
    /// Remote file id; defaults to the id remembered from the last upload of this path.
    #[arg(long)]
    pub file_id: Option<String>,
    /// Line on which the definition starts.
    #[arg(long, conflicts_with = "name", required_unless_present = "name")]
    pub line: Option<usize>,
    /// Name of the definition.
    #[arg(long)]
    pub name: Option<String>,
    /// Also ask for a more detailed explanation.
    #[arg(long)]
    pub more: bool,
    #[arg(long)]
    pub language: Option<LanguageHint>,
}

#[derive(Debug, Subcommand)]
pub enum FilesCommand {
    /// List uploaded files
    List,
    /// Delete an uploaded file
    Delete { id: String },
}

/// Execute a parsed command line.
pub fn run(cli: Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };

    match cli.command {
        Commands::Detect(args) => {
            logging::init(&config.logging.level, LogTarget::Stderr)?;
            detect(&config, args)
        }
        Commands::Browse(args) => {
            let state_root = state_root()?;
            let log_path = HistoryStore::new(&state_root).state_dir().join(LOG_FILE);
            logging::init(&config.logging.level, LogTarget::File(log_path))?;
            browse(config, args, state_root)
        }
        Commands::Upload(args) => {
            logging::init(&config.logging.level, LogTarget::Stderr)?;
            upload(&config, args)
        }
        Commands::Annotate(args) => {
            logging::init(&config.logging.level, LogTarget::Stderr)?;
            annotate(&config, args)
        }
        Commands::Files { command } => {
            logging::init(&config.logging.level, LogTarget::Stderr)?;
            files(&config, command)
        }
        Commands::Completions { shell } => {
            let mut command = Cli::command();
            clap_complete::generate(shell, &mut command, "spanlens", &mut io::stdout());
            Ok(())
        }
    }
}

fn detect(config: &Config, args: DetectArgs) -> Result<()> {
    let language = args.language.unwrap_or_else(|| config.detector.language());
    let scanner = Scanner::new(StructureDetector::new(config.detector.options()));
    let request = ScanRequest::new(args.paths.clone())
        .with_globs(args.globs)
        .with_language(language);

    let reports = scanner.scan(&request)?;
    print_reports(&reports, args.json)?;
    if !args.watch {
        return Ok(());
    }

    let [path] = args.paths.as_slice() else {
        anyhow::bail!("--watch takes exactly one file");
    };
    anyhow::ensure!(path.is_file(), "--watch takes a file, not {}", path.display());
    let watcher = SourceWatcher::new(path)?;
    loop {
        if watcher.wait_changed(WATCH_POLL)? {
            tracing::debug!(path = %path.display(), "file changed");
            let reports = scanner.scan(&request)?;
            print_reports(&reports, args.json)?;
        }
    }
}

fn print_reports(reports: &[DetectionReport], json: bool) -> Result<()> {
    let mut stdout = io::stdout().lock();
    if json {
        serde_json::to_writer_pretty(&mut stdout, reports).context("failed to encode reports")?;
        writeln!(stdout)?;
    } else {
        for report in reports {
            write!(stdout, "{}", report.render_plain())?;
        }
    }
    stdout.flush()?;
    Ok(())
}

fn browse(config: Config, args: BrowseArgs, state_root: PathBuf) -> Result<()> {
    let language = resolve_language(args.language, &config, &args.path);
    let service = http_service(&config)?;
    let options = BrowserOptions {
        path: canonical(&args.path),
        file_id: args.file_id,
        language,
        state_root,
        watch: !args.no_watch,
    };
    let mut app = BrowserApp::new(config, options, service)?;
    app.run()
}

fn upload(config: &Config, args: UploadArgs) -> Result<()> {
    let path = canonical(&args.path);
    let text = read_source(&path)?;
    let name = args.name.unwrap_or_else(|| file_name(&path));
    let mut session = session_for(config, None, &path)?;

    let record = runtime()?
        .block_on(session.upload(&name, text))
        .with_context(|| format!("failed to upload {}", path.display()))?;

    let store = HistoryStore::new(state_root()?);
    let mut history = store.load_or_default()?;
    history.remember_upload(&path, record.id.clone());
    store.save(&history)?;

    println!("{}\t{}", record.id, record.name);
    Ok(())
}

fn annotate(config: &Config, args: AnnotateArgs) -> Result<()> {
    let path = canonical(&args.path);
    let text = read_source(&path)?;
    let file_id = match args.file_id {
        Some(id) => id,
        None => HistoryStore::new(state_root()?)
            .load_or_default()?
            .file_id_for(&path)
            .map(ToString::to_string)
            .with_context(|| {
                format!(
                    "{} has not been uploaded; pass --file-id or run `spanlens upload` first",
                    path.display()
                )
            })?,
    };

    let mut session = session_for(config, args.language, &path)?;
    session.load_file(file_id, text);
    match (args.line, args.name.as_deref()) {
        (Some(line), _) => session.select_line(line).map(|_| ())?,
        (None, Some(name)) => session.select_name(name).map(|_| ())?,
        (None, None) => anyhow::bail!("pass --line or --name"),
    }
    let request = session.annotation_request()?;
    let coordinator = session.coordinator().clone();

    let runtime = runtime()?;
    let annotation = runtime
        .block_on(coordinator.resolve(&request.span, &request.file_id))?
        .into_text()
        .context("file changed while the annotation was requested")?;
    println!("{annotation}");

    if args.more {
        let detail = runtime
            .block_on(coordinator.say_more(&request.span, &request.file_id, &annotation))?
            .into_text()
            .context("file changed while the detail was requested")?;
        println!("\n{detail}");
    }
    Ok(())
}

fn files(config: &Config, command: FilesCommand) -> Result<()> {
    let service = http_service(config)?;
    let runtime = runtime()?;
    match command {
        FilesCommand::List => {
            let records = runtime.block_on(service.list_files())?;
            for record in records {
                let created = record.created_at.as_deref().unwrap_or("-");
                println!("{}\t{}\t{}", record.id, record.name, created);
            }
        }
        FilesCommand::Delete { id } => {
            runtime
                .block_on(service.delete_file(&id))
                .with_context(|| format!("failed to delete {id}"))?;
            let store = HistoryStore::new(state_root()?);
            let mut history = store.load_or_default()?;
            if history.forget_file(&id) {
                store.save(&history)?;
            }
            println!("deleted {id}");
        }
    }
    Ok(())
}

fn session_for(
    config: &Config,
    language: Option<LanguageHint>,
    path: &Path,
) -> Result<AnnotatorSession> {
    let coordinator = AnnotationCoordinator::new(http_service(config)?);
    Ok(AnnotatorSession::new(
        StructureDetector::new(config.detector.options()),
        resolve_language(language, config, path),
        coordinator,
    ))
}

fn http_service(config: &Config) -> Result<Arc<dyn AnnotationService>> {
    let service = HttpAnnotationService::new(&config.service)
        .context("failed to build annotation service client")?;
    tracing::debug!(base_url = service.base_url(), "annotation service");
    Ok(Arc::new(service))
}

/// Flag first, then the configured language, then the file extension.
fn resolve_language(flag: Option<LanguageHint>, config: &Config, path: &Path) -> LanguageHint {
    match flag.unwrap_or_else(|| config.detector.language()) {
        LanguageHint::Auto => LanguageHint::from_path(path),
        language => language,
    }
}

fn runtime() -> Result<Runtime> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")
}

fn state_root() -> Result<PathBuf> {
    workspace_root()
}

fn canonical(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn read_source(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_detect_flags() {
        let cli = Cli::try_parse_from([
            "spanlens", "detect", "src", "--language", "ts", "--json", "--glob", "*.ts",
        ])
        .unwrap();
        let Commands::Detect(args) = cli.command else {
            panic!("expected detect");
        };
        assert_eq!(args.language, Some(LanguageHint::TypeScript));
        assert!(args.json);
        assert_eq!(args.globs, vec!["*.ts".to_string()]);
    }

    #[test]
    fn annotate_needs_line_or_name() {
        assert!(Cli::try_parse_from(["spanlens", "annotate", "a.py"]).is_err());
        assert!(
            Cli::try_parse_from(["spanlens", "annotate", "a.py", "--line", "3", "--name", "f"])
                .is_err()
        );
        let cli = Cli::try_parse_from(["spanlens", "annotate", "a.py", "--name", "f", "--more"])
            .unwrap();
        let Commands::Annotate(args) = cli.command else {
            panic!("expected annotate");
        };
        assert_eq!(args.name.as_deref(), Some("f"));
        assert!(args.more);
    }

    #[test]
    fn explicit_language_wins_over_extension() {
        let config = Config::default();
        let path = Path::new("main.rs");
        assert_eq!(resolve_language(None, &config, path), LanguageHint::Rust);
        assert_eq!(
            resolve_language(Some(LanguageHint::Go), &config, path),
            LanguageHint::Go
        );
    }
}
