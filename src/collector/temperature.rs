//! `http-temp`: a single plain-text temperature reading.
//!
//! The target answers with a bare number such as `21.5\n`.

use serde::{Deserialize, Serialize};

use crate::collector::http::{HttpSource, HttpTarget};
use crate::collector::options::{ExporterOptions, decode_options};
use crate::collector::{Collector, CollectorError, Deadline};
use crate::config::ExporterConfig;
use crate::metrics::{BoundGauge, MetricConfig, MetricRegistry};

/// Type tag of this collector.
pub const TYPE: &str = "http-temp";

/// Options of an `http-temp` exporter.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TemperatureOptions {
    /// Gauge receiving the reading.
    #[serde(default)]
    pub metric: MetricConfig,
    #[serde(flatten)]
    pub target: HttpTarget,
}

impl ExporterOptions for TemperatureOptions {
    fn validate(&self) -> Vec<String> {
        let mut problems = self.target.validate();
        if let Err(e) = self.metric.validate() {
            problems.push(format!("metric: {}", e));
        }
        problems
    }
}

/// Collector polling a plain-text temperature endpoint.
pub struct TemperatureCollector {
    source: HttpSource,
    gauge: BoundGauge,
}

/// Factory registered under [`TYPE`].
pub fn factory(
    config: &ExporterConfig,
    metrics: &MetricRegistry,
) -> Result<Box<dyn Collector>, CollectorError> {
    let options: TemperatureOptions = decode_options(&config.options)?;
    let gauge = metrics.bind(&options.metric)?;
    let source = HttpSource::new(&options.target, config.timeout)?;

    Ok(Box::new(TemperatureCollector { source, gauge }))
}

#[async_trait::async_trait]
impl Collector for TemperatureCollector {
    async fn collect(&self, deadline: &Deadline) -> Result<(), CollectorError> {
        tracing::debug!(url = %self.source.url(), "Collecting http-temp data");

        let body = self.source.fetch_text(deadline).await?;
        let temperature = parse_temperature(&body)?;
        self.gauge.set(temperature)?;
        Ok(())
    }

    fn close(self: Box<Self>) -> Result<(), CollectorError> {
        tracing::debug!("Closing http-temp exporter");
        Ok(())
    }
}

fn parse_temperature(body: &str) -> Result<f64, CollectorError> {
    let text = body.trim();
    text.parse::<f64>()
        .map_err(|e| CollectorError::Parse(format!("invalid temperature '{}': {}", text, e)))
}
