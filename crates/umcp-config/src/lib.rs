//! Layered TOML configuration for umcp.
//!
//! Reads configuration from multiple sources with precedence:
//! CLI flags > env vars > config file > defaults

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use umcp_types::ConfigError;

/// Default listen address for `umcp serve`.
pub const DEFAULT_BIND: &str = "0.0.0.0:8006";

/// Default base URL of the user-management service.
pub const DEFAULT_USER_SERVICE_URL: &str = "http://localhost:8041";

/// Default MCP endpoint the client talks to.
pub const DEFAULT_ENDPOINT: &str = "http://localhost:8006/mcp";

/// Default client request timeout.
pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;

/// Resolved configuration.
#[derive(Debug, Clone)]
pub struct UmcpConfig {
    pub bind: SocketAddr,
    pub user_service_url: String,
    pub user_service_api_key: Option<String>,
    pub endpoint: String,
    pub timeout_ms: u64,
    pub config_dir: PathBuf,
}

/// Settings that can be read from a TOML config file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SettingsFile {
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub users: UserServiceSettings,
    #[serde(default)]
    pub client: ClientSettings,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerSettings {
    pub bind: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserServiceSettings {
    pub base_url: Option<String>,
    pub api_key: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClientSettings {
    pub endpoint: Option<String>,
    pub timeout_ms: Option<u64>,
}

/// CLI overrides that take highest precedence.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub bind: Option<String>,
    pub endpoint: Option<String>,
}

impl UmcpConfig {
    /// Load configuration from the process environment and
    /// `<config_dir>/config.toml`.
    pub fn load(overrides: CliOverrides) -> Result<Self, ConfigError> {
        let config_dir = config_dir();
        let settings = load_settings_file(&config_dir.join("config.toml"));
        Self::resolve(overrides, settings, |key| std::env::var(key).ok(), config_dir)
    }

    /// Apply precedence to already-gathered sources. `env` looks up one
    /// environment variable.
    pub fn resolve(
        overrides: CliOverrides,
        settings: SettingsFile,
        env: impl Fn(&str) -> Option<String>,
        config_dir: PathBuf,
    ) -> Result<Self, ConfigError> {
        let bind = overrides
            .bind
            .or_else(|| env("UMCP_BIND"))
            .or(settings.server.bind)
            .unwrap_or_else(|| DEFAULT_BIND.to_string());
        let bind = bind
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::InvalidValue {
                key: "server.bind".into(),
                message: format!("'{bind}': {e}"),
            })?;

        let user_service_url = env("USER_SERVICE_URL")
            .or(settings.users.base_url)
            .unwrap_or_else(|| DEFAULT_USER_SERVICE_URL.to_string());

        let user_service_api_key = env("USER_SERVICE_API_KEY")
            .or(settings.users.api_key)
            .filter(|k| !k.is_empty());

        let endpoint = overrides
            .endpoint
            .or_else(|| env("UMCP_ENDPOINT"))
            .or(settings.client.endpoint)
            .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string());

        let timeout_ms = settings.client.timeout_ms.unwrap_or(DEFAULT_TIMEOUT_MS);
        if timeout_ms == 0 {
            return Err(ConfigError::InvalidValue {
                key: "client.timeout_ms".into(),
                message: "must be greater than zero".into(),
            });
        }

        Ok(UmcpConfig {
            bind,
            user_service_url,
            user_service_api_key,
            endpoint,
            timeout_ms,
            config_dir,
        })
    }
}

/// Get the umcp config directory path (~/.umcp/).
pub fn config_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("UMCP_CONFIG_DIR") {
        return PathBuf::from(dir);
    }
    dirs_next::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".umcp")
}

/// Load and parse a TOML settings file, returning defaults on any error.
pub fn load_settings_file(path: &Path) -> SettingsFile {
    match std::fs::read_to_string(path) {
        Ok(content) => toml::from_str(&content).unwrap_or_else(|e| {
            tracing::warn!("Failed to parse {}: {}", path.display(), e);
            SettingsFile::default()
        }),
        Err(_) => SettingsFile::default(),
    }
}
