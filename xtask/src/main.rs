use anyhow::{Context, Result};
use cargo_metadata::MetadataCommand;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::Command;
use walkdir::WalkDir;

const DEFAULT_CONFIG: &str = "crates/spanlens/assets/default-config.toml";
const CONFIG_SECTIONS: &[&str] = &["detector", "service", "display", "logging"];

#[derive(Parser)]
#[command(author, version, about = "Project automation commands", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run cargo nextest with default configuration
    Nextest {
        #[arg(long)]
        profile: Option<String>,
        #[arg(long)]
        release: bool,
    },
    /// Run snapshot tests through cargo-insta and list pending snapshots
    Snapshots {
        /// Accept every new snapshot
        #[arg(long)]
        accept: bool,
    },
    /// Check that the bundled default config parses and has every section
    CheckConfig,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Nextest { profile, release } => run_nextest(profile, release)?,
        Commands::Snapshots { accept } => run_snapshots(accept)?,
        Commands::CheckConfig => check_config()?,
    }
    Ok(())
}

fn run_nextest(profile: Option<String>, release: bool) -> Result<()> {
    let mut cmd = Command::new("cargo");
    cmd.arg("nextest").arg("run");
    if let Some(profile) = profile {
        cmd.arg("--profile").arg(profile);
    }
    if release {
        cmd.arg("--release");
    }
    let status = cmd.status()?;
    if !status.success() {
        anyhow::bail!("cargo nextest run failed");
    }
    Ok(())
}

fn run_snapshots(accept: bool) -> Result<()> {
    let mut cmd = Command::new("cargo");
    cmd.arg("insta").arg("test").arg("--workspace");
    if accept {
        cmd.arg("--accept");
    }
    let status = cmd.status()?;

    let pending = pending_snapshots(&workspace_root()?);
    for path in &pending {
        println!("pending: {}", path.display());
    }
    if !status.success() {
        anyhow::bail!("cargo insta test failed");
    }
    if !accept && !pending.is_empty() {
        anyhow::bail!("{} snapshot(s) awaiting review", pending.len());
    }
    Ok(())
}

fn pending_snapshots(root: &Path) -> Vec<PathBuf> {
    WalkDir::new(root)
        .into_iter()
        .filter_entry(|entry| entry.file_name() != "target" && entry.file_name() != "examples")
        .filter_map(|entry| entry.ok())
        .filter(|entry| {
            let name = entry.file_name().to_string_lossy();
            name.ends_with(".snap.new") || name.ends_with(".pending-snap")
        })
        .map(|entry| entry.into_path())
        .collect()
}

fn check_config() -> Result<()> {
    let path = workspace_root()?.join(DEFAULT_CONFIG);
    let raw = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let value: toml::Value =
        toml::from_str(&raw).with_context(|| format!("invalid TOML in {}", path.display()))?;
    for section in CONFIG_SECTIONS {
        if value.get(section).is_none() {
            anyhow::bail!("{} is missing the [{section}] table", path.display());
        }
    }
    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(())
}

fn workspace_root() -> Result<PathBuf> {
    let metadata = MetadataCommand::new()
        .no_deps()
        .exec()
        .context("failed to read cargo metadata")?;
    Ok(metadata.workspace_root.into_std_path_buf())
}
