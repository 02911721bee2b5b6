//! Errors from loading the server configuration.
//!
//! Domain errors live next to their modules:
//! [`GeometryError`](crate::geometry::GeometryError),
//! [`ServiceError`](crate::services::ServiceError),
//! [`EstimateError`](crate::estimate::EstimateError) and
//! [`WizardError`](crate::wizard::WizardError).

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while reading or checking the quoting configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The file exists but could not be read.
    #[error("cannot read quote config '{path}': {source}")]
    ReadError {
        /// Config file path.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The file is not valid JSON or has unknown or mistyped keys.
    #[error("quote config '{path}' is malformed at line {line}: {source}", line = .source.line())]
    ParseError {
        /// Config file path.
        path: PathBuf,
        /// The underlying JSON error.
        #[source]
        source: serde_json::Error,
    },

    /// An explicitly given config path does not exist.
    #[error("quote config not found at '{path}'")]
    NotFound {
        /// Path given on the command line.
        path: PathBuf,
    },

    /// A setting is out of range, e.g. a negative panel gap or an unknown
    /// log level.
    #[error("invalid setting `{key}` in quote config: {message}")]
    ValidationError {
        /// Dotted key of the offending setting, e.g. `layout.panel_gap_m`.
        key: &'static str,
        /// What is wrong with the value.
        message: String,
    },
}

impl ConfigError {
    /// Dotted key of the offending setting, for validation errors.
    #[must_use]
    pub const fn key(&self) -> Option<&'static str> {
        match self {
            Self::ValidationError { key, .. } => Some(*key),
            Self::ReadError { .. } | Self::ParseError { .. } | Self::NotFound { .. } => None,
        }
    }
}
