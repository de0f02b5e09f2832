//! ---
//! mgw_section: "01-core-functionality"
//! mgw_subsection: "module"
//! mgw_type: "source"
//! mgw_scope: "code"
//! mgw_description: "Configuration model and loading for the MGW gateway."
//! mgw_version: "v0.1.0"
//! mgw_owner: "tbd"
//! ---
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use crate::logging::LogFormat;

fn default_controller_base() -> String {
    "https://localhost".to_owned()
}

fn default_api_listen() -> SocketAddr {
    "0.0.0.0:8080".parse().expect("valid default api address")
}

fn default_logging_directory() -> PathBuf {
    PathBuf::from("target/logs")
}

fn default_log_format() -> LogFormat {
    LogFormat::StructuredJson
}

/// Primary configuration object for the MGW gateway.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub controller: ControllerConfig,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Metadata describing where an [`AppConfig`] was loaded from.
///
/// `source` is `None` when no configuration file was present and the
/// built-in defaults were used (the gateway is fully operable from
/// environment overrides alone).
#[derive(Debug, Clone)]
pub struct LoadedAppConfig {
    pub config: AppConfig,
    pub source: Option<PathBuf>,
}

impl AppConfig {
    pub const ENV_CONFIG_PATH: &str = "MGW_CONFIG";
    pub const ENV_CORE_BASE: &str = "MGW_CORE_BASE";
    pub const ENV_VERIFY_TLS: &str = "MGW_VERIFY_TLS";
    pub const ENV_STATIC_DIR: &str = "MGW_STATIC_DIR";

    /// Load configuration from disk, respecting the `MGW_CONFIG` override.
    pub fn load<P: AsRef<Path>>(candidates: &[P]) -> Result<Self> {
        Ok(Self::load_with_source(candidates)?.config)
    }

    /// Load configuration from disk together with the effective source path.
    ///
    /// Candidates are tried in order; when none exists the defaults are
    /// returned so a pure environment-variable deployment still boots.
    pub fn load_with_source<P: AsRef<Path>>(candidates: &[P]) -> Result<LoadedAppConfig> {
        if let Ok(env_path) = std::env::var(Self::ENV_CONFIG_PATH) {
            if !env_path.trim().is_empty() {
                let path = PathBuf::from(env_path);
                let config = Self::from_path(path.clone())?;
                return Ok(LoadedAppConfig {
                    config,
                    source: Some(path),
                });
            }
        }

        for candidate in candidates {
            if candidate.as_ref().exists() {
                let path = candidate.as_ref().to_path_buf();
                let config = Self::from_path(path.clone())?;
                return Ok(LoadedAppConfig {
                    config,
                    source: Some(path),
                });
            }
        }

        debug!("no configuration file found; using built-in defaults");
        Ok(LoadedAppConfig {
            config: AppConfig::default(),
            source: None,
        })
    }

    fn from_path(path: PathBuf) -> Result<Self> {
        debug!(config_path = %path.display(), "loading configuration");
        let contents = fs::read_to_string(&path)
            .with_context(|| format!("unable to read config file {}", path.display()))?;
        let config = toml::from_str::<AppConfig>(&contents)
            .with_context(|| format!("failed to parse config file {}", path.display()))?;
        Ok(config)
    }

    /// Overlay the environment-style options recognised by the gateway on
    /// top of the file-derived configuration. File values lose to the
    /// environment so containerised deployments can reconfigure without
    /// editing mounted files.
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(base) = std::env::var(Self::ENV_CORE_BASE) {
            if !base.trim().is_empty() {
                self.controller.base_url = base;
            }
        }
        if let Ok(raw) = std::env::var(Self::ENV_VERIFY_TLS) {
            self.controller.verify_tls = parse_bool_flag(&raw);
        }
        if let Ok(dir) = std::env::var(Self::ENV_STATIC_DIR) {
            if dir.trim().is_empty() {
                self.api.static_dir = None;
            } else {
                self.api.static_dir = Some(PathBuf::from(dir));
            }
        }
        Ok(())
    }

    /// Validate structural invariants.
    pub fn validate(&self) -> Result<()> {
        self.controller.validate()?;
        Ok(())
    }
}

impl std::str::FromStr for AppConfig {
    type Err = anyhow::Error;

    fn from_str(content: &str) -> std::result::Result<Self, Self::Err> {
        let config: AppConfig =
            toml::from_str(content).with_context(|| "failed to parse configuration")?;
        config.validate()?;
        Ok(config)
    }
}

/// Connection settings for the upstream controller's Data Layer REST
/// interface.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControllerConfig {
    /// Base URL of the controller, e.g. `https://192.168.1.1`.
    #[serde(default = "default_controller_base")]
    pub base_url: String,
    /// Whether to verify the controller's TLS certificate. Defaults to
    /// `false` to match the factory self-signed certificate posture;
    /// production deployments should turn this on.
    #[serde(default)]
    pub verify_tls: bool,
}

impl ControllerConfig {
    /// Parse and return the controller base URL.
    pub fn parsed_base_url(&self) -> Result<Url> {
        let url = Url::parse(&self.base_url)
            .with_context(|| format!("invalid controller base_url '{}'", self.base_url))?;
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(anyhow!(
                "controller base_url '{}' must use http or https",
                self.base_url
            ));
        }
        if !url.has_host() {
            return Err(anyhow!(
                "controller base_url '{}' is missing a host",
                self.base_url
            ));
        }
        Ok(url)
    }

    pub fn validate(&self) -> Result<()> {
        self.parsed_base_url().map(|_| ())
    }
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            base_url: default_controller_base(),
            verify_tls: false,
        }
    }
}

/// Settings for the externally visible HTTP API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_api_listen")]
    pub listen: SocketAddr,
    /// Directory holding the prebuilt UI bundle. Static hosting is skipped
    /// when unset or when the path is not a directory at startup.
    #[serde(default)]
    pub static_dir: Option<PathBuf>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            listen: default_api_listen(),
            static_dir: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_logging_directory")]
    pub directory: PathBuf,
    #[serde(default = "default_log_format")]
    pub format: LogFormat,
    #[serde(default)]
    pub file_prefix: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            directory: default_logging_directory(),
            format: default_log_format(),
            file_prefix: None,
        }
    }
}

/// Interpret the reference deployment's boolean flag convention:
/// `true`/`1` (case-insensitive) enable, everything else disables.
fn parse_bool_flag(raw: &str) -> bool {
    let trimmed = raw.trim();
    trimmed.eq_ignore_ascii_case("true") || trimmed == "1"
}
