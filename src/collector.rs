//! Collector Layer
//!
//! Pluggable collectors that poll a data source and update gauges. Each
//! configured exporter gets its own collector instance, driven by the
//! [`Scheduler`](crate::scheduler::Scheduler) in its own Tokio task.
//!
//! # Architecture
//!
//! - [`Collector`]: Core trait for implementing data collectors
//! - [`CollectorRegistry`]: Maps a configured type tag to a factory
//! - [`decode_options`]: Turns an exporter's untyped options into a typed structure
//! - [`Deadline`]: Timeout and shutdown bound of a single pass
//!
//! # Built-in types
//!
//! - `http-temp` ([`temperature`]): plain-text temperature
//! - `http-json-temp` ([`json_temperature`]): two JSON temperature sensors
//! - `http-weather` ([`weather`]): JSON weather station
//!
//! # Example
//!
//! ```rust,no_run
//! use http_exporter::collector::CollectorRegistry;
//! use http_exporter::config::ExporterConfig;
//! use http_exporter::metrics::MetricRegistry;
//!
//! let registry = CollectorRegistry::with_builtins();
//! let metrics = MetricRegistry::new();
//! let config = ExporterConfig::new("missing", "modbus");
//! assert!(registry.create(&config, &metrics).is_err());
//! ```

pub mod http;
pub mod json_temperature;
mod options;
mod registry;
pub mod temperature;
mod traits;
pub mod weather;

pub use options::{ExporterOptions, OptionsError, decode_options};
pub use registry::{CollectorFactory, CollectorRegistry};
pub use traits::{Collector, CollectorError, Deadline};

/// Register the built-in collector types.
///
/// # Panics
/// Panics if any built-in type is already registered.
pub fn register_builtins(registry: &CollectorRegistry) {
    registry.register(temperature::TYPE, temperature::factory);
    registry.register(json_temperature::TYPE, json_temperature::factory);
    registry.register(weather::TYPE, weather::factory);
}
