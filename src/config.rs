//! Configuration for techmd.
//!
//! Configuration sources (highest priority first):
//! 1. Environment variables (TECHMD_WORKSPACE, TECHMD_LOCK_TIMEOUT)
//! 2. Config file (.techmd/config.yaml)
//! 3. Defaults (./workspace/, 10 second lock timeout)
//!
//! Config file discovery:
//! - Searches current directory and parents for .techmd/config.yaml
//! - Falls back to the user config directory (e.g. ~/.config/techmd/config.yaml)
//! - A relative workspace path is relative to the directory holding .techmd/

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::family::ColorPolicy;
use crate::store::DEFAULT_LOCK_TIMEOUT;
use crate::xml::NamespaceTable;

/// Global cached configuration (stores Result to handle init errors)
static CONFIG: OnceLock<Result<ResolvedConfig, String>> = OnceLock::new();

const CONFIG_DIR: &str = ".techmd";
const CONFIG_NAME: &str = "config.yaml";
const DEFAULT_WORKSPACE: &str = "./workspace/";

/// Raw config file schema (matches YAML structure)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub version: Option<String>,
    pub workspace: Option<String>,
    pub lock_timeout_seconds: Option<u64>,
    /// Extra namespace prefixes: `prefix: uri`
    #[serde(default)]
    pub namespaces: BTreeMap<String, String>,
    #[serde(default)]
    pub video: VideoConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct VideoConfig {
    /// Classify `gray` pixel formats as Grayscale
    #[serde(default)]
    pub grayscale_detection: bool,
}

/// Values taken from the environment
#[derive(Debug, Clone, Default)]
struct EnvOverrides {
    workspace: Option<String>,
    lock_timeout: Option<String>,
}

impl EnvOverrides {
    fn from_env() -> Self {
        Self {
            workspace: std::env::var("TECHMD_WORKSPACE").ok(),
            lock_timeout: std::env::var("TECHMD_LOCK_TIMEOUT").ok(),
        }
    }
}

/// Resolved configuration
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    /// Default workspace directory
    pub workspace: PathBuf,
    /// How long a commit waits for the workspace lock
    pub lock_timeout: Duration,
    /// Built-in namespace table plus configured prefixes
    pub namespaces: NamespaceTable,
    pub color_policy: ColorPolicy,
    /// Path to config file (if found)
    pub config_file: Option<PathBuf>,
}

impl Default for ResolvedConfig {
    fn default() -> Self {
        Self {
            workspace: PathBuf::from(DEFAULT_WORKSPACE),
            lock_timeout: DEFAULT_LOCK_TIMEOUT,
            namespaces: NamespaceTable::builtin(),
            color_policy: ColorPolicy::Legacy,
            config_file: None,
        }
    }
}

/// Find config file by searching current directory and parents
fn find_config_file() -> Option<PathBuf> {
    let mut current = std::env::current_dir().ok()?;

    loop {
        let config_path = current.join(CONFIG_DIR).join(CONFIG_NAME);
        if config_path.exists() {
            return Some(config_path);
        }

        if !current.pop() {
            break;
        }
    }

    let user_config = dirs::config_dir()?.join("techmd").join(CONFIG_NAME);
    user_config.exists().then_some(user_config)
}

/// Load and parse config file
fn load_config_file(path: &Path) -> Result<ConfigFile> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Resolve a path that may be relative to the config file's project root
fn resolve_path(base: &Path, path_str: &str) -> PathBuf {
    let path = PathBuf::from(path_str);
    if path.is_absolute() {
        path
    } else {
        base.join(path)
    }
}

/// Combine a parsed config file with environment overrides
fn resolve(
    file: Option<(PathBuf, ConfigFile)>,
    env: EnvOverrides,
) -> Result<ResolvedConfig> {
    let mut resolved = ResolvedConfig::default();

    if let Some((config_path, config)) = file {
        // Base directory is the parent of .techmd/ (i.e., grandparent of config.yaml)
        let base_dir = config_path
            .parent()
            .and_then(|p| p.parent())
            .unwrap_or(Path::new("."));

        if let Some(ref workspace) = config.workspace {
            resolved.workspace = resolve_path(base_dir, workspace);
        }
        if let Some(secs) = config.lock_timeout_seconds {
            resolved.lock_timeout = Duration::from_secs(secs);
        }
        for (prefix, uri) in &config.namespaces {
            resolved.namespaces = resolved
                .namespaces
                .with(prefix, uri)
                .with_context(|| format!("Invalid namespace in {}", config_path.display()))?;
        }
        if config.video.grayscale_detection {
            resolved.color_policy = ColorPolicy::DetectGrayscale;
        }
        resolved.config_file = Some(config_path);
    }

    if let Some(workspace) = env.workspace {
        resolved.workspace = PathBuf::from(workspace);
    }
    if let Some(raw) = env.lock_timeout {
        let secs: u64 = raw
            .trim()
            .parse()
            .with_context(|| format!("TECHMD_LOCK_TIMEOUT is not a number of seconds: '{}'", raw))?;
        resolved.lock_timeout = Duration::from_secs(secs);
    }

    Ok(resolved)
}

/// Load configuration from all sources
fn load_config() -> Result<ResolvedConfig> {
    let file = match find_config_file() {
        Some(path) => {
            let config = load_config_file(&path)?;
            Some((path, config))
        }
        None => None,
    };

    resolve(file, EnvOverrides::from_env())
}

/// Get the global configuration (loads once, then cached)
pub fn config() -> Result<&'static ResolvedConfig> {
    let result = CONFIG.get_or_init(|| load_config().map_err(|e| format!("{:#}", e)));

    match result {
        Ok(config) => Ok(config),
        Err(e) => anyhow::bail!("{}", e),
    }
}

/// Force reload configuration (useful for testing)
pub fn reload_config() -> Result<ResolvedConfig> {
    load_config()
}
