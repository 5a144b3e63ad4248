//! Configuration management utilities.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use dirs_next::config_dir;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::app::detect::{BraceCounting, DetectorOptions, LanguageHint};

static DEFAULT_CONFIG: Lazy<&'static str> =
    Lazy::new(|| include_str!("../../assets/default-config.toml"));
static DEFAULT_WORKSPACE_CONFIG_PATH: &str = ".spanlens/config.toml";

/// Layered configuration loaded from defaults, user, workspace, and env.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub detector: Detector,
    #[serde(default)]
    pub service: Service,
    #[serde(default)]
    pub display: Display,
    #[serde(default)]
    pub logging: Logging,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Detector {
    #[serde(default = "Detector::default_tab_width")]
    pub tab_width: usize,
    #[serde(default)]
    pub brace_counting: BraceCounting,
    #[serde(default = "Detector::default_language")]
    pub language: String,
}

impl Detector {
    fn default_tab_width() -> usize {
        4
    }

    fn default_language() -> String {
        "auto".into()
    }

    pub fn options(&self) -> DetectorOptions {
        DetectorOptions {
            tab_width: self.tab_width.max(1),
            brace_counting: self.brace_counting,
        }
    }

    /// Configured language; unknown names fall back to automatic detection.
    pub fn language(&self) -> LanguageHint {
        LanguageHint::parse_lenient(&self.language)
    }
}

impl Default for Detector {
    fn default() -> Self {
        Self {
            tab_width: Self::default_tab_width(),
            brace_counting: BraceCounting::default(),
            language: Self::default_language(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Service {
    #[serde(default = "Service::default_base_url")]
    pub base_url: String,
    #[serde(default = "Service::default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub token: Option<String>,
}

impl Service {
    fn default_base_url() -> String {
        "http://localhost:5000/api/v1".into()
    }

    fn default_timeout_secs() -> u64 {
        30
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }
}

impl Default for Service {
    fn default() -> Self {
        Self {
            base_url: Self::default_base_url(),
            timeout_secs: Self::default_timeout_secs(),
            token: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Display {
    #[serde(default = "Display::default_theme")]
    pub theme: String,
    /// Share of the screen given to the code pane.
    #[serde(default = "Display::default_split_percent")]
    pub split_percent: u16,
}

impl Display {
    fn default_theme() -> String {
        "base16-ocean.dark".into()
    }

    fn default_split_percent() -> u16 {
        70
    }
}

impl Default for Display {
    fn default() -> Self {
        Self {
            theme: Self::default_theme(),
            split_percent: Self::default_split_percent(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Logging {
    #[serde(default = "Logging::default_level")]
    pub level: String,
}

impl Logging {
    fn default_level() -> String {
        "info".into()
    }
}

impl Default for Logging {
    fn default() -> Self {
        Self {
            level: Self::default_level(),
        }
    }
}

/// Environment overrides for critical settings.
#[derive(Debug, Default, Clone)]
pub struct EnvOverrides {
    service_url: Option<String>,
    token: Option<String>,
    log: Option<String>,
}

impl EnvOverrides {
    fn from_env() -> Self {
        Self {
            service_url: env::var("SPANLENS_SERVICE_URL").ok(),
            token: env::var("SPANLENS_TOKEN").ok(),
            log: env::var("SPANLENS_LOG").ok(),
        }
    }

    #[cfg(test)]
    fn for_tests(service_url: &str, token: &str, log: &str) -> Self {
        Self {
            service_url: Some(service_url.to_owned()),
            token: Some(token.to_owned()),
            log: Some(log.to_owned()),
        }
    }
}

impl Config {
    /// Load configuration from defaults, user/global config, workspace config, and env overrides.
    pub fn load() -> Result<Self> {
        let env = EnvOverrides::from_env();
        let global = global_config_path();
        let workspace = workspace_config_path()?;
        Self::load_with_layers(global, workspace, env)
    }

    /// Load with an explicit config file taking the place of the workspace layer.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            anyhow::bail!("config file not found: {}", path.display());
        }
        Self::load_with_layers(
            global_config_path(),
            Some(path.to_path_buf()),
            EnvOverrides::from_env(),
        )
    }

    fn load_with_layers(
        global: Option<PathBuf>,
        workspace: Option<PathBuf>,
        env_overrides: EnvOverrides,
    ) -> Result<Self> {
        let mut layers: Vec<Config> = Vec::new();

        layers.push(Self::from_str(&DEFAULT_CONFIG)?);

        if let Some(global_path) = global.filter(|path| path.exists()) {
            layers.push(Self::from_file(&global_path)?);
        }

        if let Some(workspace_path) = workspace.filter(|path| path.exists()) {
            layers.push(Self::from_file(&workspace_path)?);
        }

        let merged = layers.into_iter().reduce(Config::merge).unwrap_or_default();
        Ok(apply_env_overrides(merged, env_overrides))
    }

    fn from_file(path: &Path) -> Result<Self> {
        let data = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;
        Self::from_str(&data)
            .with_context(|| format!("invalid config file: {}", path.display()))
    }

    fn from_str(contents: &str) -> Result<Self> {
        let config: Config =
            toml::from_str(contents).with_context(|| "failed to parse TOML config".to_string())?;
        Ok(config)
    }

    fn merge(self, other: Self) -> Self {
        Self {
            detector: merge_detector(self.detector, other.detector),
            service: merge_service(self.service, other.service),
            display: merge_display(self.display, other.display),
            logging: merge_logging(self.logging, other.logging),
        }
    }
}

fn choose<T: PartialEq>(base: T, overlay: T, default: T) -> T {
    if overlay != default { overlay } else { base }
}

fn merge_detector(base: Detector, overlay: Detector) -> Detector {
    Detector {
        tab_width: choose(base.tab_width, overlay.tab_width, Detector::default_tab_width()),
        brace_counting: choose(
            base.brace_counting,
            overlay.brace_counting,
            BraceCounting::default(),
        ),
        language: choose(base.language, overlay.language, Detector::default_language()),
    }
}

fn merge_service(base: Service, overlay: Service) -> Service {
    Service {
        base_url: choose(base.base_url, overlay.base_url, Service::default_base_url()),
        timeout_secs: choose(
            base.timeout_secs,
            overlay.timeout_secs,
            Service::default_timeout_secs(),
        ),
        token: overlay.token.or(base.token),
    }
}

fn merge_display(base: Display, overlay: Display) -> Display {
    Display {
        theme: choose(base.theme, overlay.theme, Display::default_theme()),
        split_percent: choose(
            base.split_percent,
            overlay.split_percent,
            Display::default_split_percent(),
        ),
    }
}

fn merge_logging(base: Logging, overlay: Logging) -> Logging {
    Logging {
        level: choose(base.level, overlay.level, Logging::default_level()),
    }
}

fn global_config_path() -> Option<PathBuf> {
    config_dir().map(|base| base.join("spanlens/config.toml"))
}

fn workspace_config_path() -> Result<Option<PathBuf>> {
    let root = workspace_root()?;
    Ok(Some(root.join(DEFAULT_WORKSPACE_CONFIG_PATH)))
}

/// Nearest ancestor of the working directory holding `.git`, or the working directory itself.
pub fn workspace_root() -> Result<PathBuf> {
    let cwd = env::current_dir().context("failed to read current directory")?;
    Ok(find_repo_root(&cwd).unwrap_or(cwd))
}

fn find_repo_root(start: &Path) -> Option<PathBuf> {
    let mut current = start;
    loop {
        if current.join(".git").exists() {
            return Some(current.to_path_buf());
        }
        match current.parent() {
            Some(parent) => current = parent,
            None => return None,
        }
    }
}

fn apply_env_overrides(mut config: Config, env: EnvOverrides) -> Config {
    if let Some(url) = env.service_url {
        config.service.base_url = url;
    }
    if let Some(token) = env.token.filter(|token| !token.trim().is_empty()) {
        config.service.token = Some(token);
    }
    if let Some(level) = env.log {
        config.logging.level = level;
    }
    config
}
