//! `http-weather`: weather station readings reported as JSON.
//!
//! Expected body:
//!
//! ```json
//! {"temperature0": 12.1, "temperature1": 11.8, "temperature2": 20.4,
//!  "humidity": 81.0, "pressure": 1009.3}
//! ```

use serde::{Deserialize, Serialize};

use crate::collector::http::{HttpSource, HttpTarget};
use crate::collector::options::{ExporterOptions, decode_options};
use crate::collector::{Collector, CollectorError, Deadline};
use crate::config::ExporterConfig;
use crate::metrics::{BoundGauge, MetricConfig, MetricRegistry};

/// Type tag of this collector.
pub const TYPE: &str = "http-weather";

/// Gauges fed by an `http-weather` exporter.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WeatherMetrics {
    pub temperature0: MetricConfig,
    pub temperature1: MetricConfig,
    pub temperature2: MetricConfig,
    pub humidity: MetricConfig,
    pub pressure: MetricConfig,
}

impl WeatherMetrics {
    fn fields(&self) -> [(&'static str, &MetricConfig); 5] {
        [
            ("temperature0", &self.temperature0),
            ("temperature1", &self.temperature1),
            ("temperature2", &self.temperature2),
            ("humidity", &self.humidity),
            ("pressure", &self.pressure),
        ]
    }
}

/// Options of an `http-weather` exporter.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WeatherOptions {
    #[serde(default)]
    pub metrics: WeatherMetrics,
    #[serde(flatten)]
    pub target: HttpTarget,
}

impl ExporterOptions for WeatherOptions {
    fn validate(&self) -> Vec<String> {
        let mut problems = self.target.validate();
        for (field, metric) in self.metrics.fields() {
            if let Err(e) = metric.validate() {
                problems.push(format!("metrics.{}: {}", field, e));
            }
        }
        problems
    }
}

#[derive(Debug, Deserialize)]
struct Reading {
    temperature0: f64,
    temperature1: f64,
    temperature2: f64,
    humidity: f64,
    pressure: f64,
}

struct WeatherGauges {
    temperature0: BoundGauge,
    temperature1: BoundGauge,
    temperature2: BoundGauge,
    humidity: BoundGauge,
    pressure: BoundGauge,
}

/// Collector polling a weather station.
pub struct WeatherCollector {
    source: HttpSource,
    gauges: WeatherGauges,
}

/// Factory registered under [`TYPE`].
pub fn factory(
    config: &ExporterConfig,
    metrics: &MetricRegistry,
) -> Result<Box<dyn Collector>, CollectorError> {
    let options: WeatherOptions = decode_options(&config.options)?;
    let gauges = WeatherGauges {
        temperature0: metrics.bind(&options.metrics.temperature0)?,
        temperature1: metrics.bind(&options.metrics.temperature1)?,
        temperature2: metrics.bind(&options.metrics.temperature2)?,
        humidity: metrics.bind(&options.metrics.humidity)?,
        pressure: metrics.bind(&options.metrics.pressure)?,
    };
    let source = HttpSource::new(&options.target, config.timeout)?;

    Ok(Box::new(WeatherCollector { source, gauges }))
}

#[async_trait::async_trait]
impl Collector for WeatherCollector {
    async fn collect(&self, deadline: &Deadline) -> Result<(), CollectorError> {
        tracing::debug!(url = %self.source.url(), "Collecting http-weather data");

        let reading: Reading = self.source.fetch_json(deadline).await?;
        self.gauges.temperature0.set(reading.temperature0)?;
        self.gauges.temperature1.set(reading.temperature1)?;
        self.gauges.temperature2.set(reading.temperature2)?;
        self.gauges.humidity.set(reading.humidity)?;
        self.gauges.pressure.set(reading.pressure)?;
        Ok(())
    }

    fn close(self: Box<Self>) -> Result<(), CollectorError> {
        tracing::debug!("Closing http-weather exporter");
        Ok(())
    }
}
