//! HTTP Exporter - Prometheus exporter for HTTP sensors
//!
//! Periodically polls small HTTP devices (thermometers, weather stations),
//! turns their readings into Prometheus gauges and serves them on a scrape
//! endpoint. It can be used as a library, or run as a standalone binary with
//! the `http-exporter` executable.
//!
//! # Architecture
//!
//! - **Collectors**: one per configured exporter, built from a type tag and untyped options
//! - **Metrics**: shared gauge registry keyed by fully-qualified name
//! - **Scheduler**: one Tokio task per exporter, bounded passes, cooperative shutdown
//! - **Server**: Prometheus text endpoint, version and liveness
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use http_exporter::{AppConfig, CollectorRegistry, MetricRegistry, Scheduler};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = AppConfig::load("configs/config.yaml")?;
//! let metrics = Arc::new(MetricRegistry::new());
//! let scheduler = Scheduler::new(
//!     Arc::new(CollectorRegistry::with_builtins()),
//!     Arc::clone(&metrics),
//!     config.global.clone(),
//! )?;
//!
//! let cancel = CancellationToken::new();
//! let reports = scheduler.run(config.exporters, cancel).await;
//! # let _ = reports;
//! # Ok(())
//! # }
//! ```

pub mod collector;
pub mod config;
pub mod logging;
pub mod metrics;
pub mod scheduler;
pub mod server;

pub use collector::{Collector, CollectorError, CollectorRegistry, Deadline};
pub use config::{AppConfig, ConfigError, ExporterConfig, GlobalConfig};
pub use metrics::{BoundGauge, MetricConfig, MetricRegistry, MetricsError};
pub use scheduler::{ExporterState, InstanceReport, Scheduler, SchedulerError};
