//! Configuration module.
//!
//! Provides YAML-based configuration loading and validation for:
//! - Global defaults (scrape interval and timeout)
//! - Logging (level, format, source locations)
//! - Scrape server (listen address, endpoint)
//! - Exporter definitions (name, type, interval, timeout, options)

mod app;
mod exporter;
mod validation;

pub use app::{
    AppConfig, DEFAULT_ENDPOINT, DEFAULT_LISTEN_ADDR, DEFAULT_SCRAPE_INTERVAL,
    DEFAULT_SCRAPE_TIMEOUT, GlobalConfig, LogConfig, LogFormat, LogLevel, ServerConfig,
};
pub use exporter::{ExporterConfig, Timing};
pub use validation::{ConfigError, expand_env_vars};
