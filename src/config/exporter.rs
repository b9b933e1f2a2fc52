//! Per-exporter configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::app::GlobalConfig;

/// Configuration of one exporter instance.
///
/// `options` is opaque here; each collector type decodes it into its own
/// typed structure when the instance is built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExporterConfig {
    /// Human-readable label for this instance.
    pub name: String,
    /// Collector type tag (e.g. `http-temp`).
    #[serde(rename = "type")]
    pub kind: String,
    /// Polling period. Zero inherits `global.scrape_interval`.
    #[serde(default, with = "humantime_serde")]
    pub interval: Duration,
    /// Deadline of a single pass. Zero inherits `global.scrape_timeout`.
    #[serde(default, with = "humantime_serde")]
    pub timeout: Duration,
    /// Collector-specific options.
    #[serde(default)]
    pub options: serde_yaml::Mapping,
}

/// Effective polling period and pass deadline of an exporter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timing {
    pub interval: Duration,
    pub timeout: Duration,
}

impl ExporterConfig {
    /// Create a configuration that inherits both durations.
    pub fn new(name: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: kind.into(),
            interval: Duration::ZERO,
            timeout: Duration::ZERO,
            options: serde_yaml::Mapping::new(),
        }
    }

    /// Set the polling period.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Set the pass deadline.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Replace the options mapping.
    pub fn with_options(mut self, options: serde_yaml::Mapping) -> Self {
        self.options = options;
        self
    }

    /// Add a single option.
    pub fn with_option(
        mut self,
        key: impl Into<String>,
        value: impl Into<serde_yaml::Value>,
    ) -> Self {
        self.options
            .insert(serde_yaml::Value::String(key.into()), value.into());
        self
    }

    /// Effective timing, falling back to the global defaults for zero values.
    pub fn timing(&self, defaults: &GlobalConfig) -> Timing {
        Timing {
            interval: if self.interval.is_zero() {
                defaults.scrape_interval
            } else {
                self.interval
            },
            timeout: if self.timeout.is_zero() {
                defaults.scrape_timeout
            } else {
                self.timeout
            },
        }
    }

    /// Copy of this configuration with the effective timing filled in.
    pub fn resolved(&self, defaults: &GlobalConfig) -> Self {
        let timing = self.timing(defaults);
        Self {
            interval: timing.interval,
            timeout: timing.timeout,
            ..self.clone()
        }
    }

    /// Structural problems with this entry; empty when valid.
    pub fn validate(&self) -> Vec<String> {
        let mut problems = Vec::new();
        if self.name.is_empty() {
            problems.push("exporter config name is required".to_string());
        }
        if self.kind.is_empty() {
            problems.push(format!("exporter '{}': type is required", self.name));
        }
        if self.options.is_empty() {
            problems.push(format!("exporter '{}': options is required", self.name));
        }
        problems
    }
}
