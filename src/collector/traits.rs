//! Core collector traits and types.

use std::future::Future;
use std::time::Duration;

use thiserror::Error;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::collector::options::OptionsError;
use crate::metrics::MetricsError;

/// Errors that can occur while building a collector or during a pass.
#[derive(Debug, Error)]
pub enum CollectorError {
    /// No factory is registered for the configured type.
    #[error("exporter type not found: {0}")]
    TypeNotFound(String),

    /// A factory is already registered for this type.
    #[error("exporter type already registered: {0}")]
    DuplicateType(String),

    /// Options could not be decoded or failed validation.
    #[error(transparent)]
    Options(#[from] OptionsError),

    /// Gauge registration failed.
    #[error("metric error: {0}")]
    Metrics(#[from] MetricsError),

    /// Transport-level HTTP failure.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Data source answered with a non-200 status.
    #[error("unexpected status code: {0}")]
    Status(reqwest::StatusCode),

    /// Response body could not be turned into readings.
    #[error("failed to parse response: {0}")]
    Parse(String),

    /// Pass deadline elapsed.
    #[error("deadline of {0:?} elapsed")]
    Timeout(Duration),

    /// Shutdown was requested during the pass.
    #[error("collection cancelled")]
    Cancelled,

    /// Configuration error.
    #[error("config error: {0}")]
    Config(String),
}

/// Bound on a single collection pass.
///
/// Combines the pass timeout with the process-wide shutdown signal. Work run
/// through [`Deadline::run`] stops at whichever comes first.
#[derive(Debug, Clone)]
pub struct Deadline {
    at: Instant,
    timeout: Duration,
    cancel: CancellationToken,
}

impl Deadline {
    /// Deadline `timeout` from now, also ending when `cancel` fires.
    pub fn new(timeout: Duration, cancel: CancellationToken) -> Self {
        Self {
            at: Instant::now() + timeout,
            timeout,
            cancel,
        }
    }

    /// Time left before the deadline.
    pub fn remaining(&self) -> Duration {
        self.at.saturating_duration_since(Instant::now())
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Drive `fut` until it completes, the deadline elapses, or shutdown is
    /// requested.
    ///
    /// # Errors
    /// - `CollectorError::Cancelled` if shutdown was requested
    /// - `CollectorError::Timeout` if the deadline elapsed
    pub async fn run<F: Future>(&self, fut: F) -> Result<F::Output, CollectorError> {
        tokio::select! {
            biased;
            () = self.cancel.cancelled() => Err(CollectorError::Cancelled),
            () = tokio::time::sleep_until(self.at) => Err(CollectorError::Timeout(self.timeout)),
            output = fut => Ok(output),
        }
    }
}

/// Core collector trait.
///
/// A collector is owned by exactly one scheduling task. `collect` runs once
/// per tick and never overlaps with itself; `close` is called once when the
/// task stops.
///
/// # Error Handling
///
/// An error from `collect` abandons the current pass only. The scheduler logs
/// it and keeps ticking; gauges keep the last value that was set. Collectors
/// must therefore update gauges only after a reading was fully parsed.
#[async_trait::async_trait]
pub trait Collector: Send + Sync + 'static {
    /// Perform one collection pass bounded by `deadline`.
    async fn collect(&self, deadline: &Deadline) -> Result<(), CollectorError>;

    /// Release held resources.
    fn close(self: Box<Self>) -> Result<(), CollectorError>;
}
