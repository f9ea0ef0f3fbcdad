//! Configuration management for the Protonox dev bridge.
//!
//! Parses `protonox.toml` configuration files with serde and provides
//! auto-discovery of config files in parent directories.
//!
//! CLI settings can be applied during load via [`CliSettings`].
//!
//! ## Environment Variable Expansion
//!
//! String configuration values support environment variable expansion:
//!
//! - `${VAR}` - expands to the value of VAR, errors if unset
//! - `${VAR:-default}` - expands to VAR if set, otherwise uses default
//!
//! Expanded fields:
//! - `server.host`
//! - `bridge.overlay_path`

mod expand;

use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Default URL path of the overlay client script.
pub const DEFAULT_OVERLAY_PATH: &str = "/__protonox/studio-client.js";

/// Default location of the overlay client source, relative to the config directory.
pub const DEFAULT_OVERLAY_SCRIPT: &str = "web/overlay_client.js";

/// Configuration filename to search for.
const CONFIG_FILENAME: &str = "protonox.toml";

/// CLI settings that override configuration file values.
///
/// All fields are optional. Only non-None values override the loaded config.
#[derive(Debug, Default)]
pub struct CliSettings {
    /// Override server host.
    pub host: Option<String>,
    /// Override server port.
    pub port: Option<u16>,
    /// Override the directory served by the dev server.
    pub root_dir: Option<PathBuf>,
    /// Override the overlay script URL path.
    pub overlay_path: Option<String>,
    /// Override the overlay script source file.
    pub overlay_script: Option<PathBuf>,
}

/// Application configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Server configuration.
    pub server: ServerConfig,
    /// Site configuration (paths are relative strings from TOML).
    site: SiteConfigRaw,
    /// Bridge configuration (paths are relative strings from TOML).
    bridge: BridgeConfigRaw,

    /// Resolved site configuration (set after loading).
    #[serde(skip)]
    pub site_resolved: SiteConfig,
    /// Resolved bridge configuration (set after loading).
    #[serde(skip)]
    pub bridge_resolved: BridgeConfig,
    /// Path to the config file (set after loading).
    #[serde(skip)]
    pub config_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self::default_with_base(Path::new("."))
    }
}

/// Server configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Server host address.
    pub host: String,
    /// Server port.
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_owned(),
            port: 4173,
        }
    }
}

/// Raw site configuration as parsed from TOML.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct SiteConfigRaw {
    root_dir: Option<String>,
}

/// Resolved site configuration with absolute paths.
#[derive(Debug, Default)]
pub struct SiteConfig {
    /// Directory served by the dev server.
    pub root_dir: PathBuf,
}

/// Raw bridge configuration as parsed from TOML.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct BridgeConfigRaw {
    overlay_path: Option<String>,
    overlay_script: Option<String>,
}

/// Resolved bridge configuration.
#[derive(Debug)]
pub struct BridgeConfig {
    /// URL path where the overlay client is served and referenced from HTML.
    pub overlay_path: String,
    /// File the overlay client source is loaded from at startup.
    pub overlay_script: PathBuf,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            overlay_path: DEFAULT_OVERLAY_PATH.to_owned(),
            overlay_script: PathBuf::from(DEFAULT_OVERLAY_SCRIPT),
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
        /// Config field path (e.g., "`server.host`").
        field: String,
        /// Error message (e.g., "${`STUDIO_HOST`} not set").
        message: String,
    },
}

/// Require a string field to be non-empty.
fn require_non_empty(value: &str, field: &str) -> Result<(), ConfigError> {
    if value.is_empty() {
        return Err(ConfigError::Validation(format!("{field} cannot be empty")));
    }
    Ok(())
}

/// Require a URL path that can be embedded verbatim in an HTML attribute.
fn require_url_path(value: &str, field: &str) -> Result<(), ConfigError> {
    if !value.starts_with('/') {
        return Err(ConfigError::Validation(format!(
            "{field} must start with '/'"
        )));
    }
    if value
        .chars()
        .any(|c| c.is_whitespace() || matches!(c, '"' | '\'' | '<' | '>'))
    {
        return Err(ConfigError::Validation(format!(
            "{field} cannot contain whitespace, quotes or angle brackets"
        )));
    }
    Ok(())
}

impl Config {
    /// Load configuration from file with optional CLI settings.
    ///
    /// If `config_path` is provided, loads from that file.
    /// Otherwise, searches for `protonox.toml` in current directory and parents.
    ///
    /// CLI settings are applied after loading and path resolution, allowing CLI
    /// arguments to take precedence over config file values. The result is
    /// validated once more after the overrides are in place.
    ///
    /// # Errors
    ///
    /// Returns error if explicit `config_path` doesn't exist, parsing fails
    /// or the final configuration is invalid.
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
            config.validate()?;
        }

        Ok(config)
    }

    /// Apply CLI settings to the configuration.
    fn apply_cli_settings(&mut self, settings: &CliSettings) {
        if let Some(host) = &settings.host {
            self.server.host.clone_from(host);
        }
        if let Some(port) = settings.port {
            self.server.port = port;
        }
        if let Some(root_dir) = &settings.root_dir {
            self.site_resolved.root_dir.clone_from(root_dir);
        }
        if let Some(overlay_path) = &settings.overlay_path {
            self.bridge_resolved.overlay_path.clone_from(overlay_path);
        }
        if let Some(overlay_script) = &settings.overlay_script {
            self.bridge_resolved
                .overlay_script
                .clone_from(overlay_script);
        }
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

    /// Create default config with paths relative to current working directory.
    fn default_with_cwd() -> Self {
        let cwd = std::env::current_dir().unwrap_or_default();
        Self::default_with_base(&cwd)
    }

    /// Create default config with paths relative to given base directory.
    fn default_with_base(base: &Path) -> Self {
        Self {
            server: ServerConfig::default(),
            site: SiteConfigRaw::default(),
            bridge: BridgeConfigRaw::default(),
            site_resolved: SiteConfig {
                root_dir: base.to_path_buf(),
            },
            bridge_resolved: BridgeConfig {
                overlay_path: DEFAULT_OVERLAY_PATH.to_owned(),
                overlay_script: base.join(DEFAULT_OVERLAY_SCRIPT),
            },
            config_path: None,
        }
    }

    /// Load configuration from a specific file.
    fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Self = toml::from_str(&content)?;

        config.expand_env_vars()?;

        let config_dir = path.parent().unwrap_or(Path::new("."));
        config.resolve_paths(config_dir);
        config.config_path = Some(path.to_path_buf());

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` if any validation fails.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_server()?;
        self.validate_bridge()?;
        Ok(())
    }

    /// Validate server configuration.
    fn validate_server(&self) -> Result<(), ConfigError> {
        require_non_empty(&self.server.host, "server.host")?;

        // Port 0 lets the OS pick, which is never what a dev server config wants
        if self.server.port == 0 {
            return Err(ConfigError::Validation(
                "server.port cannot be 0".to_owned(),
            ));
        }

        Ok(())
    }

    /// Validate bridge configuration.
    fn validate_bridge(&self) -> Result<(), ConfigError> {
        let overlay_path = &self.bridge_resolved.overlay_path;
        require_non_empty(overlay_path, "bridge.overlay_path")?;
        require_url_path(overlay_path, "bridge.overlay_path")?;

        if self.bridge.overlay_script.as_deref() == Some("")
            || self.bridge_resolved.overlay_script.as_os_str().is_empty()
        {
            return Err(ConfigError::Validation(
                "bridge.overlay_script cannot be empty".to_owned(),
            ));
        }

        Ok(())
    }

    /// Expand environment variable references in configuration strings.
    fn expand_env_vars(&mut self) -> Result<(), ConfigError> {
        self.server.host = expand::expand_env(&self.server.host, "server.host")?;

        if let Some(ref path) = self.bridge.overlay_path {
            self.bridge.overlay_path = Some(expand::expand_env(path, "bridge.overlay_path")?);
        }

        Ok(())
    }

    /// Resolve relative paths to absolute paths based on config directory.
    fn resolve_paths(&mut self, config_dir: &Path) {
        self.site_resolved = SiteConfig {
            root_dir: config_dir.join(self.site.root_dir.as_deref().unwrap_or(".")),
        };

        self.bridge_resolved = BridgeConfig {
            overlay_path: self
                .bridge
                .overlay_path
                .clone()
                .unwrap_or_else(|| DEFAULT_OVERLAY_PATH.to_owned()),
            overlay_script: config_dir.join(
                self.bridge
                    .overlay_script
                    .as_deref()
                    .unwrap_or(DEFAULT_OVERLAY_SCRIPT),
            ),
        };
    }
}
