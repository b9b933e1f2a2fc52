//! Application configuration structures.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing_subscriber::filter::LevelFilter;

use super::exporter::ExporterConfig;
use super::validation::{ConfigError, expand_env_vars};

// =============================================================================
// Constants
// =============================================================================

/// Default polling period for exporters that do not set one (1 minute).
pub const DEFAULT_SCRAPE_INTERVAL: Duration = Duration::from_secs(60);

/// Default pass deadline for exporters that do not set one (10 seconds).
pub const DEFAULT_SCRAPE_TIMEOUT: Duration = Duration::from_secs(10);

/// Default scrape server address.
pub const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:2112";

/// Default scrape endpoint path.
pub const DEFAULT_ENDPOINT: &str = "/metrics";

/// Paths served next to the scrape endpoint.
const RESERVED_PATHS: [&str; 2] = ["/version", "/healthz"];

// =============================================================================
// Global Configuration
// =============================================================================

/// Defaults inherited by every exporter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GlobalConfig {
    /// Polling period used when an exporter's interval is zero.
    #[serde(with = "humantime_serde")]
    pub scrape_interval: Duration,

    /// Pass deadline used when an exporter's timeout is zero.
    #[serde(with = "humantime_serde")]
    pub scrape_timeout: Duration,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            scrape_interval: DEFAULT_SCRAPE_INTERVAL,
            scrape_timeout: DEFAULT_SCRAPE_TIMEOUT,
        }
    }
}

impl GlobalConfig {
    fn validate(&self) -> Vec<String> {
        let mut problems = Vec::new();
        if self.scrape_interval.is_zero() {
            problems.push("global: scrape_interval must be greater than 0".to_string());
        }
        if self.scrape_timeout.is_zero() {
            problems.push("global: scrape_timeout must be greater than 0".to_string());
        }
        problems
    }
}

// =============================================================================
// Log Configuration
// =============================================================================

/// Minimum level of emitted log records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => LevelFilter::TRACE,
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Warn => LevelFilter::WARN,
            LogLevel::Error => LevelFilter::ERROR,
        }
    }
}

/// Output format of log records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Json,
    Text,
}

/// Logging configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Minimum level (default: info). `RUST_LOG` takes precedence when set.
    pub level: LogLevel,

    /// Output format (default: json).
    pub format: LogFormat,

    /// Include source file and line in each record.
    pub add_source: bool,
}

// =============================================================================
// Server Configuration
// =============================================================================

/// Scrape server configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Socket address to listen on (default: "0.0.0.0:2112").
    pub listen_addr: String,

    /// Path of the metrics endpoint (default: "/metrics").
    pub endpoint: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: DEFAULT_LISTEN_ADDR.to_string(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
        }
    }
}

impl ServerConfig {
    /// Address to bind, `host:port`. An empty host (`:2112`) binds every
    /// interface.
    pub fn bind_addr(&self) -> String {
        match self.listen_addr.strip_prefix(':') {
            Some(port) => format!("0.0.0.0:{}", port),
            None => self.listen_addr.clone(),
        }
    }

    fn validate(&self) -> Vec<String> {
        let mut problems = Vec::new();
        if self.listen_addr.is_empty() {
            problems.push("server: listen_addr is required".to_string());
        } else if let Err(e) = split_host_port(&self.listen_addr) {
            problems.push(format!(
                "server: invalid listen_addr '{}': {}",
                self.listen_addr, e
            ));
        }
        if self.endpoint.is_empty() {
            problems.push("server: endpoint is required".to_string());
        } else if !self.endpoint.starts_with('/') {
            problems.push(format!(
                "server: endpoint '{}' must start with '/'",
                self.endpoint
            ));
        } else if RESERVED_PATHS.contains(&self.endpoint.as_str()) {
            problems.push(format!(
                "server: endpoint '{}' is reserved",
                self.endpoint
            ));
        }
        problems
    }
}

/// Split `host:port`; the host may be empty, an IP (IPv6 in brackets) or a
/// domain name.
fn split_host_port(addr: &str) -> Result<(&str, u16), String> {
    let (host, port) = addr
        .rsplit_once(':')
        .ok_or_else(|| "expected host:port".to_string())?;
    let port = port
        .parse::<u16>()
        .map_err(|e| format!("invalid port '{}': {}", port, e))?;
    if !host.is_empty() {
        url::Host::parse(host).map_err(|e| format!("invalid host '{}': {}", host, e))?;
    }
    Ok((host, port))
}

// =============================================================================
// Application Configuration
// =============================================================================

/// Top-level application configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Defaults inherited by exporters.
    #[serde(default)]
    pub global: GlobalConfig,

    /// Logging configuration.
    #[serde(default)]
    pub log: LogConfig,

    /// Scrape server configuration.
    #[serde(default)]
    pub server: ServerConfig,

    /// Configured exporter instances.
    #[serde(default)]
    pub exporters: Vec<ExporterConfig>,
}

impl AppConfig {
    /// Load configuration from a YAML file.
    ///
    /// `${VAR}` and `${VAR:-default}` references are expanded before parsing.
    ///
    /// # Errors
    /// Returns `ConfigError` if the file cannot be read, parsed, or validated.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_yaml(&content)
    }

    /// Parse and validate configuration from YAML text.
    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(&expand_env_vars(content))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values.
    ///
    /// Every problem found is reported in a single error.
    ///
    /// # Errors
    /// Returns `ConfigError::ValidationError` if any field is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut problems = self.global.validate();
        problems.extend(self.server.validate());
        for (i, exporter) in self.exporters.iter().enumerate() {
            problems.extend(
                exporter
                    .validate()
                    .into_iter()
                    .map(|p| format!("exporters[{}]: {}", i, p)),
            );
        }
        ConfigError::from_problems(problems)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
global:
  scrape_interval: 30s
  scrape_timeout: 5s
log:
  level: debug
  format: text
  add_source: true
server:
  listen_addr: 127.0.0.1:9100
  endpoint: /probe
exporters:
  - name: attic
    type: http-temp
    interval: 10s
    options:
      address: 10.0.0.7/temp
      insecure: true
      metric:
        name: attic_temperature_celsius
  - name: garden
    type: http-weather
    options:
      address: weather.lan
"#;

    #[test]
    fn test_server_config_default() {
        let config = ServerConfig::default();
        assert_eq!(config.listen_addr, "0.0.0.0:2112");
        assert_eq!(config.endpoint, "/metrics");
    }

    #[test]
    fn test_global_config_default() {
        let config = GlobalConfig::default();
        assert_eq!(config.scrape_interval, DEFAULT_SCRAPE_INTERVAL);
        assert_eq!(config.scrape_timeout, DEFAULT_SCRAPE_TIMEOUT);
    }

    #[test]
    fn test_log_config_default() {
        let config = LogConfig::default();
        assert_eq!(config.level, LogLevel::Info);
        assert_eq!(config.format, LogFormat::Json);
        assert!(!config.add_source);
    }

    #[test]
    fn test_parse_full_config() {
        let config = AppConfig::from_yaml(SAMPLE).unwrap();

        assert_eq!(config.global.scrape_interval, Duration::from_secs(30));
        assert_eq!(config.global.scrape_timeout, Duration::from_secs(5));
        assert_eq!(config.log.level, LogLevel::Debug);
        assert_eq!(config.log.format, LogFormat::Text);
        assert!(config.log.add_source);
        assert_eq!(config.server.listen_addr, "127.0.0.1:9100");
        assert_eq!(config.server.endpoint, "/probe");
        assert_eq!(config.exporters.len(), 2);
        assert_eq!(config.exporters[0].interval, Duration::from_secs(10));
        assert_eq!(config.exporters[1].kind, "http-weather");
    }

    #[test]
    fn test_empty_document_uses_defaults() {
        let config = AppConfig::from_yaml("{}").unwrap();
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn test_zero_global_interval_rejected() {
        let yaml = "global:\n  scrape_interval: 0s\n  scrape_timeout: 0s\n";
        let err = AppConfig::from_yaml(yaml).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("scrape_interval must be greater than 0"));
        assert!(msg.contains("scrape_timeout must be greater than 0"));
    }

    #[test]
    fn test_listen_addr_forms() {
        for addr in [":2112", "localhost:2112", "127.0.0.1:9100", "[::1]:2112"] {
            let server = ServerConfig {
                listen_addr: addr.to_string(),
                ..ServerConfig::default()
            };
            assert!(server.validate().is_empty(), "{addr} should be accepted");
        }

        for addr in ["2112", "localhost", "host:port", "bad host:2112", ":70000"] {
            let server = ServerConfig {
                listen_addr: addr.to_string(),
                ..ServerConfig::default()
            };
            assert_eq!(server.validate().len(), 1, "{addr} should be rejected");
        }
    }

    #[test]
    fn test_bind_addr_fills_empty_host() {
        let mut server = ServerConfig::default();
        assert_eq!(server.bind_addr(), "0.0.0.0:2112");

        server.listen_addr = ":9100".to_string();
        assert_eq!(server.bind_addr(), "0.0.0.0:9100");

        server.listen_addr = "localhost:9100".to_string();
        assert_eq!(server.bind_addr(), "localhost:9100");
    }

    #[test]
    fn test_invalid_server_rejected() {
        let mut config = AppConfig::default();
        config.server.listen_addr = "localhost".to_string();
        config.server.endpoint = "metrics".to_string();

        let msg = config.validate().unwrap_err().to_string();
        assert!(msg.contains("invalid listen_addr"));
        assert!(msg.contains("must start with '/'"));
    }

    #[test]
    fn test_reserved_endpoint_rejected() {
        let mut config = AppConfig::default();
        config.server.endpoint = "/healthz".to_string();

        let msg = config.validate().unwrap_err().to_string();
        assert!(msg.contains("endpoint '/healthz' is reserved"));
    }

    #[test]
    fn test_invalid_exporter_entry_rejected() {
        let mut config = AppConfig::default();
        config.exporters.push(ExporterConfig::new("lonely", "http-temp"));

        let msg = config.validate().unwrap_err().to_string();
        assert!(msg.contains("exporters[0]: exporter 'lonely': options is required"));
    }

    #[test]
    fn test_unknown_log_format_fails_to_parse() {
        let err = AppConfig::from_yaml("log:\n  format: xml\n").unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, SAMPLE).unwrap();

        let config = AppConfig::load(&path).unwrap();
        assert_eq!(config.exporters[0].name, "attic");
    }

    #[test]
    fn test_shipped_config_is_valid() {
        let path = concat!(env!("CARGO_MANIFEST_DIR"), "/configs/config.yaml");
        let config = AppConfig::load(path).unwrap();

        assert_eq!(config.exporters.len(), 3);
        assert_eq!(config.global, GlobalConfig::default());
        assert_eq!(config.server, ServerConfig::default());
    }

    #[test]
    fn test_load_missing_file() {
        let err = AppConfig::load("/nonexistent/http-exporter.yaml").unwrap_err();
        assert!(matches!(err, ConfigError::IoError(_)));
    }
}
