//! Configuration loading and setting resolution
//!
//! Every setting is resolved with the same priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. Compiled default (fallback)
//!
//! A missing config file is never fatal: a warning is logged and the
//! compiled defaults are used. A config file that exists but cannot be
//! parsed is a configuration error.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Directory name used under the platform config/cache folders
pub const APP_DIR_NAME: &str = "shortlist";

/// Environment variable naming an explicit config file
pub const ENV_CONFIG: &str = "SHORTLIST_CONFIG";
/// Environment variable overriding the output directory
pub const ENV_OUTPUT_DIR: &str = "SHORTLIST_OUTPUT_DIR";
/// Environment variable overriding the download cache directory
pub const ENV_CACHE_DIR: &str = "SHORTLIST_CACHE_DIR";
/// Environment variable overriding the catalog base URL
pub const ENV_API_BASE: &str = "SHORTLIST_API_BASE";
/// Environment variable carrying the catalog bearer token
pub const ENV_API_TOKEN: &str = "SHORTLIST_API_TOKEN";

const DEFAULT_BASE_URL: &str = "https://api.djdownload.me";
const DEFAULT_USER_AGENT: &str = "Mozilla/5.0";
const DEFAULT_REFERER: &str = "https://djdownload.me/";
const TOKEN_FILE_NAME: &str = "token.txt";

/// On-disk TOML configuration
///
/// All fields are optional; absent sections fall back to their defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    /// Root of the genre-organized output tree
    pub output_dir: Option<PathBuf>,
    /// Root under which per-run download caches are created
    pub cache_dir: Option<PathBuf>,
    /// Catalog bearer token (prefer `token_file` or the environment)
    pub api_token: Option<String>,
    /// File holding the catalog bearer token
    pub token_file: Option<PathBuf>,
    /// Remote catalog settings
    pub catalog: CatalogConfig,
    /// Audio download settings
    pub fetch: FetchConfig,
    /// Logging settings
    pub logging: LoggingConfig,
}

/// Remote catalog settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    /// Base URL of the catalog API (without trailing `/tracks`)
    pub base_url: String,
    /// Per-request timeout for page fetches
    pub timeout_secs: u64,
    /// User-Agent header sent with every request
    pub user_agent: String,
    /// Referer header sent with every request, if any
    pub referer: Option<String>,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: 30,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            referer: Some(DEFAULT_REFERER.to_string()),
        }
    }
}

impl CatalogConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Audio download settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// Total attempts per stream URL (first try included)
    pub max_attempts: u32,
    /// Fixed delay between attempts
    pub backoff_ms: u64,
    /// Write buffer size used while streaming a payload to disk
    pub chunk_size: usize,
    /// Whole-request timeout for one download attempt
    pub timeout_secs: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_ms: 1000,
            chunk_size: 8192,
            timeout_secs: 120,
        }
    }
}

impl FetchConfig {
    pub fn backoff(&self) -> Duration {
        Duration::from_millis(self.backoff_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Logging settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is not set (e.g. "info")
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Compiled fallback values for the current platform
#[derive(Debug, Clone)]
pub struct CompiledDefaults {
    pub output_dir: PathBuf,
    pub cache_dir: PathBuf,
    pub log_level: String,
}

impl CompiledDefaults {
    pub fn for_current_platform() -> Self {
        Self {
            output_dir: PathBuf::from("./shortlist_output"),
            cache_dir: dirs::cache_dir()
                .map(|d| d.join(APP_DIR_NAME))
                .unwrap_or_else(|| PathBuf::from("./.shortlist_cache")),
            log_level: "info".to_string(),
        }
    }
}

/// Platform location of the default config file
/// (`~/.config/shortlist/config.toml` on Linux)
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join(APP_DIR_NAME).join("config.toml"))
}

/// Platform location of the default token file
pub fn default_token_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join(APP_DIR_NAME).join(TOKEN_FILE_NAME))
}

/// Read and parse one TOML config file
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
    toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))
}

/// Locate and load the TOML config
///
/// An explicitly requested file (CLI or `SHORTLIST_CONFIG`) must exist.
/// The platform default file is optional.
pub fn load_config(cli_path: Option<&Path>) -> Result<TomlConfig> {
    let explicit = cli_path
        .map(Path::to_path_buf)
        .or_else(|| std::env::var_os(ENV_CONFIG).map(PathBuf::from));

    if let Some(path) = explicit {
        if !path.exists() {
            return Err(Error::Config(format!(
                "Config file not found: {}",
                path.display()
            )));
        }
        info!("Loading config from {}", path.display());
        return load_toml_config(&path);
    }

    match default_config_path() {
        Some(path) if path.exists() => {
            info!("Loading config from {}", path.display());
            load_toml_config(&path)
        }
        Some(path) => {
            warn!(
                "No config file at {}, using compiled defaults",
                path.display()
            );
            Ok(TomlConfig::default())
        }
        None => {
            warn!("Could not determine config directory, using compiled defaults");
            Ok(TomlConfig::default())
        }
    }
}

/// Values supplied on the command line, each overriding every other tier
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub output_dir: Option<PathBuf>,
    pub cache_dir: Option<PathBuf>,
}

/// Fully resolved runtime settings
#[derive(Debug, Clone)]
pub struct Settings {
    pub output_dir: PathBuf,
    pub cache_dir: PathBuf,
    pub catalog: CatalogConfig,
    pub fetch: FetchConfig,
    pub logging: LoggingConfig,
    pub api_token: Option<String>,
}

impl Settings {
    /// Merge CLI overrides, environment, TOML and compiled defaults
    pub fn resolve(config: TomlConfig, cli: CliOverrides) -> Self {
        let defaults = CompiledDefaults::for_current_platform();

        let output_dir = resolve_path(
            cli.output_dir,
            ENV_OUTPUT_DIR,
            config.output_dir.clone(),
            defaults.output_dir,
        );
        let cache_dir = resolve_path(
            cli.cache_dir,
            ENV_CACHE_DIR,
            config.cache_dir.clone(),
            defaults.cache_dir,
        );

        let mut catalog = config.catalog.clone();
        if let Some(base) = env_non_empty(ENV_API_BASE) {
            debug!(base_url = %base, "Catalog base URL overridden by environment");
            catalog.base_url = base;
        }
        catalog.base_url = catalog.base_url.trim_end_matches('/').to_string();

        let mut logging = config.logging.clone();
        if logging.level.trim().is_empty() {
            logging.level = defaults.log_level;
        }

        let api_token = resolve_api_token(&config);

        Self {
            output_dir,
            cache_dir,
            catalog,
            fetch: config.fetch,
            logging,
            api_token,
        }
    }
}

fn resolve_path(
    cli: Option<PathBuf>,
    env_name: &str,
    toml: Option<PathBuf>,
    default: PathBuf,
) -> PathBuf {
    cli.or_else(|| env_non_empty(env_name).map(PathBuf::from))
        .or(toml)
        .unwrap_or(default)
}

fn env_non_empty(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Resolve the catalog bearer token
///
/// **Priority:** ENV → TOML `api_token` → token file (`token_file` or the
/// platform default). Returns `None` when no source holds a valid token.
pub fn resolve_api_token(config: &TomlConfig) -> Option<String> {
    let env_token = std::env::var(ENV_API_TOKEN).ok().filter(|t| is_valid_token(t));
    let toml_token = config.api_token.clone().filter(|t| is_valid_token(t));
    let file_path = config.token_file.clone().or_else(default_token_path);
    let file_token = file_path.as_deref().and_then(read_token_file);

    let mut sources = Vec::new();
    if env_token.is_some() {
        sources.push("environment");
    }
    if toml_token.is_some() {
        sources.push("TOML");
    }
    if file_token.is_some() {
        sources.push("token file");
    }

    if sources.len() > 1 {
        warn!(
            "Catalog token found in multiple sources: {}. Using {} (highest priority).",
            sources.join(", "),
            sources[0]
        );
    }

    if let Some(token) = env_token {
        info!("Catalog token loaded from environment variable");
        return Some(token.trim().to_string());
    }
    if let Some(token) = toml_token {
        info!("Catalog token loaded from TOML config");
        return Some(token.trim().to_string());
    }
    if let Some(token) = file_token {
        info!("Catalog token loaded from token file");
        return Some(token);
    }

    None
}

/// Read a token file, returning its trimmed content when valid
pub fn read_token_file(path: &Path) -> Option<String> {
    match std::fs::read_to_string(path) {
        Ok(content) => {
            let token = content.trim().to_string();
            is_valid_token(&token).then_some(token)
        }
        Err(e) => {
            debug!("Token file {} not readable: {}", path.display(), e);
            None
        }
    }
}

/// Validate token (non-empty, non-whitespace)
pub fn is_valid_token(token: &str) -> bool {
    !token.trim().is_empty()
}
