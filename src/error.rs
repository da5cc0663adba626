//! Error types for kubelift

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// A metric with the same name already lives in the registry
    #[error("Metric {name} is already registered")]
    Registration { name: String },

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Failed to encode metrics: {0}")]
    MetricsEncode(#[from] std::fmt::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
