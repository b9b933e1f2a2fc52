//! Collector registry mapping type tags to factories.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use crate::collector::{Collector, CollectorError};
use crate::config::ExporterConfig;
use crate::metrics::MetricRegistry;

/// Builds a collector from an exporter configuration with resolved timing.
///
/// Factories decode their options, obtain gauges from the metric registry and
/// return any failure unchanged to the caller.
pub type CollectorFactory = Arc<
    dyn Fn(&ExporterConfig, &MetricRegistry) -> Result<Box<dyn Collector>, CollectorError>
        + Send
        + Sync,
>;

/// Registry of collector types.
///
/// Populated once at startup; afterwards only read by the scheduler when it
/// builds exporter instances.
#[derive(Default)]
pub struct CollectorRegistry {
    factories: RwLock<HashMap<String, CollectorFactory>>,
}

impl CollectorRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry holding the built-in collector types.
    pub fn with_builtins() -> Self {
        let registry = Self::new();
        super::register_builtins(&registry);
        registry
    }

    /// Register a factory under `kind`.
    ///
    /// # Panics
    /// Panics if `kind` is already registered. Registration happens at
    /// startup, so a duplicate is a programming error.
    pub fn register<F>(&self, kind: impl Into<String>, factory: F)
    where
        F: Fn(&ExporterConfig, &MetricRegistry) -> Result<Box<dyn Collector>, CollectorError>
            + Send
            + Sync
            + 'static,
    {
        if let Err(e) = self.try_register(kind, factory) {
            panic!("{e}");
        }
    }

    /// Register a factory under `kind`, reporting duplicates as an error.
    ///
    /// # Errors
    /// Returns `CollectorError::DuplicateType` if `kind` is already registered;
    /// the existing factory is kept.
    pub fn try_register<F>(&self, kind: impl Into<String>, factory: F) -> Result<(), CollectorError>
    where
        F: Fn(&ExporterConfig, &MetricRegistry) -> Result<Box<dyn Collector>, CollectorError>
            + Send
            + Sync
            + 'static,
    {
        let kind = kind.into();
        let mut factories = self
            .factories
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        if factories.contains_key(&kind) {
            return Err(CollectorError::DuplicateType(kind));
        }
        tracing::debug!(kind = %kind, "Exporter type registered");
        factories.insert(kind, Arc::new(factory));
        Ok(())
    }

    /// Build the collector for `config`.
    ///
    /// # Errors
    /// - `CollectorError::TypeNotFound` if `config.kind` is not registered
    /// - whatever the factory returns
    pub fn create(
        &self,
        config: &ExporterConfig,
        metrics: &MetricRegistry,
    ) -> Result<Box<dyn Collector>, CollectorError> {
        let factory = self
            .factories
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&config.kind)
            .cloned()
            .ok_or_else(|| CollectorError::TypeNotFound(config.kind.clone()))?;

        factory(config, metrics)
    }

    /// Whether `kind` is registered.
    pub fn contains(&self, kind: &str) -> bool {
        self.factories
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(kind)
    }

    /// Registered type tags, sorted.
    pub fn types(&self) -> Vec<String> {
        let mut types: Vec<String> = self
            .factories
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        types.sort();
        types
    }
}

impl std::fmt::Debug for CollectorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CollectorRegistry")
            .field("types", &self.types())
            .finish_non_exhaustive()
    }
}
