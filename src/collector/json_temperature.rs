//! `http-json-temp`: two temperature sensors reported as JSON.
//!
//! Expected body: `{"temperature0": 21.5, "temperature1": 19.0}`.

use serde::{Deserialize, Serialize};

use crate::collector::http::{HttpSource, HttpTarget};
use crate::collector::options::{ExporterOptions, decode_options};
use crate::collector::{Collector, CollectorError, Deadline};
use crate::config::ExporterConfig;
use crate::metrics::{BoundGauge, MetricConfig, MetricRegistry};

/// Type tag of this collector.
pub const TYPE: &str = "http-json-temp";

/// Gauges fed by an `http-json-temp` exporter.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JsonTemperatureMetrics {
    #[serde(default)]
    pub temperature0: MetricConfig,
    #[serde(default)]
    pub temperature1: MetricConfig,
}

/// Options of an `http-json-temp` exporter.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JsonTemperatureOptions {
    #[serde(default)]
    pub metrics: JsonTemperatureMetrics,
    #[serde(flatten)]
    pub target: HttpTarget,
}

impl ExporterOptions for JsonTemperatureOptions {
    fn validate(&self) -> Vec<String> {
        let mut problems = self.target.validate();
        for (field, metric) in [
            ("temperature0", &self.metrics.temperature0),
            ("temperature1", &self.metrics.temperature1),
        ] {
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
}

/// Collector polling a JSON endpoint with two temperature sensors.
pub struct JsonTemperatureCollector {
    source: HttpSource,
    temperature0: BoundGauge,
    temperature1: BoundGauge,
}

/// Factory registered under [`TYPE`].
pub fn factory(
    config: &ExporterConfig,
    metrics: &MetricRegistry,
) -> Result<Box<dyn Collector>, CollectorError> {
    let options: JsonTemperatureOptions = decode_options(&config.options)?;
    let temperature0 = metrics.bind(&options.metrics.temperature0)?;
    let temperature1 = metrics.bind(&options.metrics.temperature1)?;
    let source = HttpSource::new(&options.target, config.timeout)?;

    Ok(Box::new(JsonTemperatureCollector {
        source,
        temperature0,
        temperature1,
    }))
}

#[async_trait::async_trait]
impl Collector for JsonTemperatureCollector {
    async fn collect(&self, deadline: &Deadline) -> Result<(), CollectorError> {
        tracing::debug!(url = %self.source.url(), "Collecting http-json-temp data");

        let reading: Reading = self.source.fetch_json(deadline).await?;
        self.temperature0.set(reading.temperature0)?;
        self.temperature1.set(reading.temperature1)?;
        Ok(())
    }

    fn close(self: Box<Self>) -> Result<(), CollectorError> {
        tracing::debug!("Closing http-json-temp exporter");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::OptionsError;

    fn options(yaml: &str) -> serde_yaml::Mapping {
        serde_yaml::from_str(yaml).unwrap()
    }

    #[test]
    fn test_reading_requires_both_sensors() {
        let reading: Reading =
            serde_json::from_str(r#"{"temperature0": 21.5, "temperature1": -2}"#).unwrap();
        assert_eq!(reading.temperature0, 21.5);
        assert_eq!(reading.temperature1, -2.0);

        assert!(serde_json::from_str::<Reading>(r#"{"temperature0": 21.5}"#).is_err());
    }

    #[test]
    fn test_validation_checks_each_metric() {
        let err = decode_options::<JsonTemperatureOptions>(&options(
            "address: sensor.lan\nmetrics:\n  temperature0:\n    name: t0_celsius\n",
        ))
        .unwrap_err();

        match err {
            OptionsError::Invalid(problems) => {
                assert_eq!(
                    problems,
                    vec!["metrics.temperature1: metric config name is required"]
                );
            }
            other => panic!("expected Invalid, got {other:?}"),
        }
    }

    #[test]
    fn test_metrics_must_be_a_mapping() {
        let err = decode_options::<JsonTemperatureOptions>(&options(
            "address: sensor.lan\nmetrics: [t0, t1]\n",
        ))
        .unwrap_err();
        assert!(err.is_decode());
    }

    #[tokio::test]
    async fn test_factory_shares_gauge_between_sensors() {
        let metrics = MetricRegistry::new();
        let config = ExporterConfig::new("boiler", TYPE)
            .with_timeout(std::time::Duration::from_secs(1))
            .with_options(options(
                r#"
address: boiler.lan
metrics:
  temperature0:
    name: boiler_celsius
    labels: { sensor: inlet }
  temperature1:
    name: boiler_celsius
    labels: { sensor: outlet }
"#,
            ));

        factory(&config, &metrics).unwrap();
        assert_eq!(metrics.len(), 1);
    }
}
