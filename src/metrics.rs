//! Gauge registration shared by all exporters.
//!
//! Several exporters may publish into the same metric (e.g. one temperature
//! gauge labeled by room). [`MetricRegistry`] keeps exactly one
//! [`GaugeVec`] per fully-qualified name and hands the same handle to every
//! caller.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, PoisonError};

use prometheus::proto::MetricFamily;
use prometheus::core::Collector as _;
use prometheus::{Encoder, GaugeVec, Opts, Registry, TextEncoder};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Shared handle to a label-parameterized gauge.
pub type GaugeHandle = Arc<GaugeVec>;

/// Errors raised while registering or exposing gauges.
#[derive(Debug, Error)]
pub enum MetricsError {
    /// A gauge with this name exists with a different label-name set.
    #[error("metric '{name}' already registered with labels {existing:?}, requested {requested:?}")]
    LabelMismatch {
        name: String,
        existing: Vec<String>,
        requested: Vec<String>,
    },

    /// Rejected by the prometheus client (invalid name, duplicate, ...).
    #[error("prometheus error: {0}")]
    Prometheus(#[from] prometheus::Error),

    /// Encoded exposition was not valid UTF-8.
    #[error("failed to encode metrics: {0}")]
    Encoding(#[from] std::string::FromUtf8Error),
}

/// Definition of one gauge as it appears in exporter options.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricConfig {
    /// Metric name (required).
    #[serde(default)]
    pub name: String,
    /// Help text. Falls back to the fully-qualified name when empty.
    #[serde(default)]
    pub help: String,
    /// Optional namespace prefix.
    #[serde(default)]
    pub namespace: String,
    /// Optional subsystem prefix.
    #[serde(default)]
    pub subsystem: String,
    /// Constant labels this exporter writes (label name -> value).
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
}

impl MetricConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = help.into();
        self
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    pub fn with_subsystem(mut self, subsystem: impl Into<String>) -> Self {
        self.subsystem = subsystem.into();
        self
    }

    pub fn with_label(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(name.into(), value.into());
        self
    }

    /// # Errors
    /// Returns a message if the metric name is missing.
    pub fn validate(&self) -> Result<(), String> {
        if self.name.is_empty() {
            return Err("metric config name is required".to_string());
        }
        Ok(())
    }

    /// `namespace_subsystem_name`, skipping empty parts.
    pub fn fq_name(&self) -> String {
        self.opts().fq_name()
    }

    /// Label names in sorted order.
    pub fn label_names(&self) -> Vec<String> {
        self.labels.keys().cloned().collect()
    }

    fn label_values(&self) -> Vec<String> {
        self.labels.values().cloned().collect()
    }

    fn opts(&self) -> Opts {
        let mut opts = Opts::new(self.name.as_str(), self.help.as_str())
            .namespace(self.namespace.as_str())
            .subsystem(self.subsystem.as_str());
        if opts.help.is_empty() {
            opts.help = opts.fq_name();
        }
        opts
    }
}

/// One labeled series of a shared gauge.
#[derive(Clone)]
pub struct BoundGauge {
    handle: GaugeHandle,
    label_values: Vec<String>,
}

impl BoundGauge {
    /// Set the series, creating it on first use.
    ///
    /// # Errors
    /// Returns `MetricsError::Prometheus` if the label values do not fit the
    /// gauge.
    pub fn set(&self, value: f64) -> Result<(), MetricsError> {
        self.handle
            .get_metric_with_label_values(&self.label_values)?
            .set(value);
        Ok(())
    }

    /// Current value; `None` while the series was never set.
    pub fn value(&self) -> Option<f64> {
        self.handle
            .collect()
            .iter()
            .flat_map(|family| family.get_metric())
            .find(|m| {
                m.get_label()
                    .iter()
                    .map(|pair| pair.get_value())
                    .eq(self.label_values.iter().map(String::as_str))
            })
            .map(|m| m.get_gauge().value())
    }
}

impl std::fmt::Debug for BoundGauge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoundGauge")
            .field("label_values", &self.label_values)
            .finish_non_exhaustive()
    }
}

struct GaugeEntry {
    handle: GaugeHandle,
    label_names: Vec<String>,
}

/// Owner of every gauge exposed by the process.
///
/// Safe to share between exporter tasks; the name table is guarded by a
/// single mutex and gauge values are atomics readable during scrapes.
pub struct MetricRegistry {
    registry: Registry,
    gauges: Mutex<HashMap<String, GaugeEntry>>,
}

impl MetricRegistry {
    /// Create a registry backed by a fresh prometheus registry.
    pub fn new() -> Self {
        Self::with_registry(Registry::new())
    }

    /// Create a registry that registers gauges into `registry`.
    pub fn with_registry(registry: Registry) -> Self {
        Self {
            registry,
            gauges: Mutex::new(HashMap::new()),
        }
    }

    /// Underlying prometheus registry.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Return the gauge registered under the metric's fully-qualified name,
    /// creating and registering it on first use.
    ///
    /// The first registration fixes the label-name set; help text of later
    /// requests is ignored.
    ///
    /// # Errors
    /// - `MetricsError::LabelMismatch` if the name exists with other label names
    /// - `MetricsError::Prometheus` if the name or labels are invalid
    pub fn get_or_create_gauge(&self, metric: &MetricConfig) -> Result<GaugeHandle, MetricsError> {
        let opts = metric.opts();
        let fq_name = opts.fq_name();
        let label_names = metric.label_names();

        let mut gauges = self.gauges.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(entry) = gauges.get(&fq_name) {
            if entry.label_names != label_names {
                return Err(MetricsError::LabelMismatch {
                    name: fq_name,
                    existing: entry.label_names.clone(),
                    requested: label_names,
                });
            }
            return Ok(Arc::clone(&entry.handle));
        }

        let names: Vec<&str> = label_names.iter().map(String::as_str).collect();
        let gauge = GaugeVec::new(opts, &names)?;
        self.registry.register(Box::new(gauge.clone()))?;
        tracing::debug!(metric = %fq_name, labels = ?label_names, "Gauge registered");

        let handle = Arc::new(gauge);
        gauges.insert(
            fq_name,
            GaugeEntry {
                handle: Arc::clone(&handle),
                label_names,
            },
        );
        Ok(handle)
    }

    /// Get-or-create the gauge and bind the metric's label values to it.
    ///
    /// The labeled series itself is created by the first
    /// [`BoundGauge::set`], so nothing is exposed before a reading exists.
    pub fn bind(&self, metric: &MetricConfig) -> Result<BoundGauge, MetricsError> {
        let handle = self.get_or_create_gauge(metric)?;
        Ok(BoundGauge {
            handle,
            label_values: metric.label_values(),
        })
    }

    /// Number of distinct gauges.
    pub fn len(&self) -> usize {
        self.gauges
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of all registered metric families.
    pub fn gather(&self) -> Vec<MetricFamily> {
        self.registry.gather()
    }

    /// Current state in the Prometheus text exposition format.
    pub fn encode_text(&self) -> Result<String, MetricsError> {
        let mut buf = Vec::new();
        TextEncoder::new().encode(&self.gather(), &mut buf)?;
        Ok(String::from_utf8(buf)?)
    }
}

impl Default for MetricRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MetricRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetricRegistry")
            .field("gauge_count", &self.len())
            .finish_non_exhaustive()
    }
}
