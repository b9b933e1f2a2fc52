//! Decoding of collector-specific options.
//!
//! The configuration file carries an untyped `options` mapping per exporter.
//! Each collector type turns it into its own structure in two stages:
//!
//! 1. **Decode**: the mapping is deserialized into the typed structure.
//!    Shape mismatches (wrong primitive type, missing nested table) fail here.
//! 2. **Validate**: [`ExporterOptions::validate`] checks semantic rules such
//!    as required fields. It never runs when decoding failed.

use serde::de::DeserializeOwned;
use thiserror::Error;

/// Typed options of one collector type.
pub trait ExporterOptions: DeserializeOwned {
    /// Semantic problems with the decoded options; empty when valid.
    fn validate(&self) -> Vec<String>;
}

/// Failure of one of the two decoding stages.
#[derive(Debug, Error)]
pub enum OptionsError {
    /// The mapping does not have the shape of the options structure.
    #[error("decode options: {0}")]
    Decode(#[source] serde_yaml::Error),

    /// The options decoded but are not usable.
    #[error("validate options: {}", .0.join("; "))]
    Invalid(Vec<String>),
}

impl OptionsError {
    pub fn is_decode(&self) -> bool {
        matches!(self, Self::Decode(_))
    }

    pub fn is_invalid(&self) -> bool {
        matches!(self, Self::Invalid(_))
    }
}

/// Decode and validate a raw options mapping.
///
/// # Errors
/// - `OptionsError::Decode` if the mapping cannot be deserialized into `T`
/// - `OptionsError::Invalid` if `T::validate` reports problems
pub fn decode_options<T: ExporterOptions>(raw: &serde_yaml::Mapping) -> Result<T, OptionsError> {
    let options: T = serde_yaml::from_value(serde_yaml::Value::Mapping(raw.clone()))
        .map_err(OptionsError::Decode)?;

    let problems = options.validate();
    if !problems.is_empty() {
        return Err(OptionsError::Invalid(problems));
    }
    Ok(options)
}
