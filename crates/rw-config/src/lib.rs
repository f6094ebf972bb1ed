//! Configuration for embed resolution.
//!
//! Parses the `[embed]` section of `rw.toml` with serde and provides
//! auto-discovery of the config file in parent directories.
//!
//! CLI settings can be applied during load via [`CliSettings`].
//!
//! ## Environment Variable Expansion
//!
//! String values support `${VAR}` (error if unset) and `${VAR:-default}`.
//!
//! Expanded fields:
//! - `embed.origin`
//! - `embed.source_dir`

mod expand;

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

/// CLI settings that override configuration file values.
///
/// Only non-None values override the loaded config.
#[derive(Debug, Default)]
pub struct CliSettings {
    /// Override the origin relative embed URLs are fetched from.
    pub origin: Option<String>,
    /// Override the directory the filesystem fetcher reads from.
    pub source_dir: Option<PathBuf>,
    /// Override the document cache flag.
    pub cache_enabled: Option<bool>,
    /// Override the HTTP fetch timeout in seconds.
    pub timeout_secs: Option<u64>,
}

/// Configuration filename to search for.
const CONFIG_FILENAME: &str = "rw.toml";

const DEFAULT_TIMEOUT_SECS: u64 = 30;
const MAX_TIMEOUT_SECS: u64 = 600;

/// Application configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// `[embed]` section as written in TOML.
    embed: EmbedConfigRaw,

    /// Resolved embed configuration (set after loading).
    #[serde(skip)]
    pub embed_resolved: EmbedConfig,
    /// Path to the config file (set after loading).
    #[serde(skip)]
    pub config_path: Option<PathBuf>,
}

/// Raw `[embed]` section (paths as strings, all keys optional).
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct EmbedConfigRaw {
    origin: Option<String>,
    source_dir: Option<String>,
    timeout_secs: Option<u64>,
    front_matter: Option<bool>,
    cache_enabled: Option<bool>,
}

/// Resolved embed configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbedConfig {
    /// Origin for scheme-less embed URLs, e.g. `https://docs.example.com`.
    ///
    /// When set, embeds are fetched over HTTP; otherwise from `source_dir`.
    pub origin: Option<String>,
    /// Root directory for the filesystem fetcher.
    pub source_dir: PathBuf,
    /// Timeout for each HTTP fetch.
    pub timeout: Duration,
    /// Strip YAML front matter from embedded markdown.
    pub front_matter: bool,
    /// Memoize resolved documents in the process-wide cache.
    pub cache_enabled: bool,
}

impl Default for EmbedConfig {
    fn default() -> Self {
        Self::with_base(Path::new("."))
    }
}

impl EmbedConfig {
    fn with_base(base: &Path) -> Self {
        Self {
            origin: None,
            source_dir: base.join("docs"),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            front_matter: true,
            cache_enabled: true,
        }
    }
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File not found.
    #[error("Configuration file not found: {}", .0.display())]
    NotFound(PathBuf),
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// TOML parsing error.
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),
    /// Validation error.
    #[error("Configuration error: {0}")]
    Validation(String),
    /// Environment variable error during expansion.
    #[error("Environment variable error in {field}: {message}")]
    EnvVar {
        /// Config field path (e.g., "`embed.origin`").
        field: String,
        /// Error message (e.g., "${`DOCS_ORIGIN`} not set").
        message: String,
    },
}

/// Require a URL field to use http:// or https:// scheme.
fn require_http_url(url: &str, field: &str) -> Result<(), ConfigError> {
    if url.is_empty() {
        return Err(ConfigError::Validation(format!("{field} cannot be empty")));
    }
    if !url.starts_with("http://") && !url.starts_with("https://") {
        return Err(ConfigError::Validation(format!(
            "{field} must start with http:// or https://"
        )));
    }
    Ok(())
}

impl Config {
    /// Load configuration from file with optional CLI settings.
    ///
    /// If `config_path` is provided, loads from that file.
    /// Otherwise, searches for `rw.toml` in current directory and parents.
    ///
    /// CLI settings are applied last and validated along with the file values.
    ///
    /// # Errors
    ///
    /// Returns error if explicit `config_path` doesn't exist, parsing fails
    /// or a value is invalid.
    pub fn load(
        config_path: Option<&Path>,
        cli_settings: Option<&CliSettings>,
    ) -> Result<Self, ConfigError> {
        let mut config = if let Some(path) = config_path {
            if !path.exists() {
                return Err(ConfigError::NotFound(path.to_path_buf()));
            }
            Self::load_from_file(path)?
        } else if let Some(discovered) = Self::discover_config() {
            Self::load_from_file(&discovered)?
        } else {
            Self::default_with_cwd()
        };

        if let Some(settings) = cli_settings {
            config.apply_cli_settings(settings);
        }
        config.validate()?;

        Ok(config)
    }

    fn apply_cli_settings(&mut self, settings: &CliSettings) {
        let embed = &mut self.embed_resolved;
        if let Some(origin) = &settings.origin {
            embed.origin = Some(origin.clone());
        }
        if let Some(source_dir) = &settings.source_dir {
            embed.source_dir.clone_from(source_dir);
        }
        if let Some(cache_enabled) = settings.cache_enabled {
            embed.cache_enabled = cache_enabled;
        }
        if let Some(secs) = settings.timeout_secs {
            embed.timeout = Duration::from_secs(secs);
        }
    }

    /// Validate resolved configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` if any validation fails.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let embed = &self.embed_resolved;

        if let Some(origin) = &embed.origin {
            require_http_url(origin, "embed.origin")?;
        }

        let secs = embed.timeout.as_secs();
        if secs == 0 {
            return Err(ConfigError::Validation(
                "embed.timeout_secs must be greater than 0".to_owned(),
            ));
        }
        if secs > MAX_TIMEOUT_SECS {
            return Err(ConfigError::Validation(format!(
                "embed.timeout_secs cannot exceed {MAX_TIMEOUT_SECS}"
            )));
        }

        Ok(())
    }

    /// Search for config file in current directory and parents.
    fn discover_config() -> Option<PathBuf> {
        let mut current = std::env::current_dir().ok()?;
        loop {
            let candidate = current.join(CONFIG_FILENAME);
            if candidate.exists() {
                return Some(candidate);
            }
            if !current.pop() {
                return None;
            }
        }
    }

    /// Default config with paths relative to the current working directory.
    fn default_with_cwd() -> Self {
        let cwd = std::env::current_dir().unwrap_or_default();
        Self::default_with_base(&cwd)
    }

    fn default_with_base(base: &Path) -> Self {
        Self {
            embed: EmbedConfigRaw::default(),
            embed_resolved: EmbedConfig::with_base(base),
            config_path: None,
        }
    }

    fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Self = toml::from_str(&content)?;

        // Expand environment variables before path resolution
        config.expand_env_vars()?;

        let config_dir = path.parent().unwrap_or(Path::new("."));
        config.resolve(config_dir);
        config.config_path = Some(path.to_path_buf());

        Ok(config)
    }

    fn expand_env_vars(&mut self) -> Result<(), ConfigError> {
        if let Some(origin) = &self.embed.origin {
            self.embed.origin = Some(expand::expand_env(origin, "embed.origin")?);
        }
        if let Some(source_dir) = &self.embed.source_dir {
            self.embed.source_dir = Some(expand::expand_env(source_dir, "embed.source_dir")?);
        }
        Ok(())
    }

    /// Fill `embed_resolved` from the raw section; relative paths resolve
    /// against `config_dir`.
    fn resolve(&mut self, config_dir: &Path) {
        let raw = &self.embed;
        let defaults = EmbedConfig::with_base(config_dir);

        self.embed_resolved = EmbedConfig {
            origin: raw.origin.clone(),
            source_dir: raw
                .source_dir
                .as_deref()
                .map_or(defaults.source_dir, |dir| config_dir.join(dir)),
            timeout: raw
                .timeout_secs
                .map_or(defaults.timeout, Duration::from_secs),
            front_matter: raw.front_matter.unwrap_or(defaults.front_matter),
            cache_enabled: raw.cache_enabled.unwrap_or(defaults.cache_enabled),
        };
    }
}
