//! Error types for configuration and parameter validation
//!
//! Every error is raised before the first simulated year. Once a
//! [`GrowthParameters`](crate::parameters::GrowthParameters) and a
//! [`ValidatedScenario`](crate::landscape::ValidatedScenario) exist, the
//! year loop cannot fail.

use crate::parameters::ParameterKey;
use thiserror::Error;

/// Error type for invalid configuration.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CarbonError {
    #[error("Parameter '{0}' is missing from the parameter set")]
    MissingParameter(ParameterKey),
    #[error("Parameter '{key}' = {value}: {reason}")]
    InvalidParameter {
        key: ParameterKey,
        value: f64,
        reason: &'static str,
    },
    #[error("Unknown parameter '{0}'")]
    UnknownParameter(String),
    #[error("Invalid scenario: {0}")]
    InvalidScenario(String),
    #[error("Configuration could not be read: {0}")]
    Config(String),
}

impl From<toml::de::Error> for CarbonError {
    fn from(err: toml::de::Error) -> Self {
        CarbonError::Config(err.to_string())
    }
}

/// Convenience type for `Result<T, CarbonError>`.
pub type CarbonResult<T> = Result<T, CarbonError>;
