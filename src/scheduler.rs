//! Exporter scheduling and lifecycle.
//!
//! Every configured exporter runs in its own Tokio task:
//!
//! ```text
//! Created ──build ok──▶ Running ──cancel──▶ Stopping ──close──▶ Stopped
//!    │
//!    └──build failed──▶ Aborted
//! ```
//!
//! A running exporter performs one pass per tick, bounded by its timeout.
//! Passes of one exporter never overlap: a pass that overruns delays the next
//! tick instead of running concurrently with it. Exporters share nothing but
//! the registries and the cancellation token.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::task::JoinSet;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use crate::collector::{Collector, CollectorError, CollectorRegistry, Deadline};
use crate::config::{ExporterConfig, GlobalConfig};
use crate::metrics::MetricRegistry;

/// Errors raised before any exporter starts.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// Global defaults cannot drive a schedule.
    #[error("invalid global defaults: {0}")]
    InvalidDefaults(String),
}

/// Lifecycle state of one exporter instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExporterState {
    Created,
    Running,
    Stopping,
    Stopped,
    /// The collector could not be built; the instance never ran.
    Aborted,
}

impl std::fmt::Display for ExporterState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Created => "created",
            Self::Running => "running",
            Self::Stopping => "stopping",
            Self::Stopped => "stopped",
            Self::Aborted => "aborted",
        };
        f.write_str(s)
    }
}

/// Final account of one exporter instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstanceReport {
    pub name: String,
    pub kind: String,
    pub state: ExporterState,
    /// Passes started.
    pub passes: u64,
    /// Passes that ended with an error.
    pub failures: u64,
}

impl InstanceReport {
    fn new(config: &ExporterConfig) -> Self {
        Self {
            name: config.name.clone(),
            kind: config.kind.clone(),
            state: ExporterState::Created,
            passes: 0,
            failures: 0,
        }
    }
}

/// Runs all configured exporters until shutdown.
#[derive(Debug)]
pub struct Scheduler {
    collectors: Arc<CollectorRegistry>,
    metrics: Arc<MetricRegistry>,
    defaults: GlobalConfig,
}

impl Scheduler {
    /// Create a scheduler.
    ///
    /// # Errors
    /// Returns `SchedulerError::InvalidDefaults` if the default interval or
    /// timeout is zero.
    pub fn new(
        collectors: Arc<CollectorRegistry>,
        metrics: Arc<MetricRegistry>,
        defaults: GlobalConfig,
    ) -> Result<Self, SchedulerError> {
        if defaults.scrape_interval.is_zero() {
            return Err(SchedulerError::InvalidDefaults(
                "scrape_interval must be greater than 0".to_string(),
            ));
        }
        if defaults.scrape_timeout.is_zero() {
            return Err(SchedulerError::InvalidDefaults(
                "scrape_timeout must be greater than 0".to_string(),
            ));
        }

        Ok(Self {
            collectors,
            metrics,
            defaults,
        })
    }

    /// Run every exporter until `cancel` fires and all of them have stopped.
    ///
    /// Reports are returned in configuration order.
    pub async fn run(
        &self,
        exporters: Vec<ExporterConfig>,
        cancel: CancellationToken,
    ) -> Vec<InstanceReport> {
        tracing::debug!(count = exporters.len(), "Starting exporters");

        let mut tasks = JoinSet::new();
        for (index, config) in exporters.into_iter().enumerate() {
            let config = config.resolved(&self.defaults);
            let span = tracing::info_span!(
                "exporter",
                name = %config.name,
                kind = %config.kind,
                interval = ?config.interval,
                timeout = ?config.timeout,
            );
            let instance = Instance {
                config,
                collectors: Arc::clone(&self.collectors),
                metrics: Arc::clone(&self.metrics),
                cancel: cancel.clone(),
            };
            tasks.spawn(async move { (index, instance.run().await) }.instrument(span));
        }

        let mut reports = Vec::with_capacity(tasks.len());
        while let Some(result) = tasks.join_next().await {
            match result {
                Ok(report) => reports.push(report),
                Err(e) => tracing::error!(error = %e, "Exporter task failed"),
            }
        }
        reports.sort_by_key(|(index, _)| *index);

        tracing::info!(count = reports.len(), "All exporters stopped");
        reports.into_iter().map(|(_, report)| report).collect()
    }
}

/// One exporter's task state.
struct Instance {
    config: ExporterConfig,
    collectors: Arc<CollectorRegistry>,
    metrics: Arc<MetricRegistry>,
    cancel: CancellationToken,
}

impl Instance {
    async fn run(self) -> InstanceReport {
        let mut report = InstanceReport::new(&self.config);
        tracing::debug!("Starting exporter");

        let collector = match self.collectors.create(&self.config, &self.metrics) {
            Ok(collector) => collector,
            Err(CollectorError::TypeNotFound(kind)) => {
                tracing::error!(kind = %kind, stage = "create", "Exporter type not found");
                report.state = ExporterState::Aborted;
                return report;
            }
            Err(e) => {
                tracing::error!(error = %e, stage = "create", "Failed to create exporter");
                report.state = ExporterState::Aborted;
                return report;
            }
        };

        report.state = ExporterState::Running;
        let interval = self.config.interval;
        let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                () = self.cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }

            report.passes += 1;
            if !run_pass(collector.as_ref(), self.config.timeout, &self.cancel).await {
                report.failures += 1;
            }
        }

        report.state = ExporterState::Stopping;
        tracing::debug!(passes = report.passes, "Stopping exporter");
        if let Err(e) = collector.close() {
            tracing::error!(error = %e, "Failed to close exporter");
        }

        report.state = ExporterState::Stopped;
        tracing::debug!("Exporter stopped");
        report
    }
}

/// Execute a single collection pass and log the result.
async fn run_pass(collector: &dyn Collector, timeout: Duration, cancel: &CancellationToken) -> bool {
    let start = Instant::now();
    tracing::debug!("Running collection");

    let deadline = Deadline::new(timeout, cancel.clone());
    let result = collector.collect(&deadline).await;
    let duration_ms = start.elapsed().as_millis() as u64;

    match result {
        Ok(()) => {
            tracing::debug!(duration_ms, "Collection succeeded");
            true
        }
        Err(CollectorError::Cancelled) => {
            tracing::debug!(duration_ms, "Collection cancelled by shutdown");
            false
        }
        Err(e) => {
            tracing::error!(error = %e, duration_ms, "Collection failed");
            false
        }
    }
}
