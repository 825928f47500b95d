//! Server configuration loading from file and environment variables.

use clinic_db::DbPaths;
use serde::Deserialize;
use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;
use thiserror::Error;

/// Top-level server configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Server network settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Database settings.
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Network configuration for the HTTP server.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind to.
    #[serde(default = "default_host")]
    pub host: IpAddr,

    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
}

/// Database configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DatabaseConfig {
    /// Directory holding `db_init.sql`. The database file lives at
    /// `../data/clinic.db` relative to it. Defaults to the executable's
    /// directory.
    #[serde(default)]
    pub component_dir: Option<PathBuf>,
}

impl DatabaseConfig {
    /// Resolves the database and bootstrap script locations.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if no component directory is configured and the
    /// executable's directory cannot be determined.
    pub fn paths(&self) -> std::io::Result<DbPaths> {
        match &self.component_dir {
            Some(dir) => Ok(DbPaths::for_component_dir(dir)),
            None => DbPaths::from_current_exe(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "clinic_db=debug,info").
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Whether to output logs in JSON format.
    #[serde(default)]
    pub json: bool,
}

fn default_host() -> IpAddr {
    IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1))
}

fn default_port() -> u16 {
    3000
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    /// Failed to parse the configuration file.
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Loads configuration from a TOML file, falling back to defaults.
///
/// Environment variable overrides:
/// - `CLINIC_HOST` overrides `server.host`
/// - `CLINIC_PORT` overrides `server.port`
/// - `CLINIC_COMPONENT_DIR` overrides `database.component_dir`
/// - `CLINIC_LOG_LEVEL` overrides `logging.level`
/// - `CLINIC_LOG_JSON` overrides `logging.json` (set to "true" to enable)
///
/// # Errors
///
/// Returns `ConfigError` if the file exists but cannot be read or parsed.
pub fn load_config(path: Option<&str>) -> Result<Config, ConfigError> {
    let config = match path {
        Some(p) => match std::fs::read_to_string(p) {
            Ok(contents) => toml::from_str(&contents)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = p, "config file not found, using defaults");
                Config::default()
            }
            Err(e) => return Err(ConfigError::FileRead(e)),
        },
        None => Config::default(),
    };

    Ok(apply_env_overrides(config, |key| std::env::var(key).ok()))
}

fn apply_env_overrides(mut config: Config, var: impl Fn(&str) -> Option<String>) -> Config {
    if let Some(host) = var("CLINIC_HOST") {
        if let Ok(parsed) = host.parse() {
            config.server.host = parsed;
        }
    }
    if let Some(port) = var("CLINIC_PORT") {
        if let Ok(parsed) = port.parse() {
            config.server.port = parsed;
        }
    }
    if let Some(dir) = var("CLINIC_COMPONENT_DIR") {
        if !dir.trim().is_empty() {
            config.database.component_dir = Some(PathBuf::from(dir));
        }
    }
    if let Some(level) = var("CLINIC_LOG_LEVEL") {
        config.logging.level = level;
    }
    if let Some(json) = var("CLINIC_LOG_JSON") {
        config.logging.json = json == "true" || json == "1";
    }

    config
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    #[test]
    fn missing_file_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("absent.toml");
        let config = load_config(path.to_str()).expect("missing file is not an error");

        assert_eq!(config.server.port, 3000);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn parses_partial_file() {
        let config: Config = toml::from_str(
            r#"
            [server]
            port = 8080

            [database]
            component_dir = "/opt/clinic/public"
            "#,
        )
        .unwrap();

        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.host, default_host());
        assert!(!config.logging.json);

        let paths = config.database.paths().unwrap();
        assert_eq!(paths.database, PathBuf::from("/opt/clinic/data/clinic.db"));
        assert_eq!(
            paths.init_script,
            PathBuf::from("/opt/clinic/public/db_init.sql")
        );
    }

    #[test]
    fn malformed_file_is_a_parse_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[server\nport = ").unwrap();

        let err = load_config(path.to_str()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn env_overrides_apply() {
        let vars: HashMap<&str, &str> = [
            ("CLINIC_PORT", "9000"),
            ("CLINIC_HOST", "not-an-ip"),
            ("CLINIC_COMPONENT_DIR", "/srv/clinic/public"),
            ("CLINIC_LOG_JSON", "1"),
        ]
        .into_iter()
        .collect();

        let config = apply_env_overrides(Config::default(), |key| {
            vars.get(key).map(|v| v.to_string())
        });

        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.host, default_host(), "bad host is ignored");
        assert_eq!(
            config.database.component_dir,
            Some(PathBuf::from("/srv/clinic/public"))
        );
        assert!(config.logging.json);
    }
}
