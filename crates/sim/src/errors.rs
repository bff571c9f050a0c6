//! Error types for the model engine.
//!
//! Two families are kept apart on purpose. [`ConfigError`]s are user-facing:
//! they are accumulated while a configuration is validated and built so the
//! user sees every problem at once. [`ModelError::Internal`] signals a broken
//! engine invariant discovered at execute time and aborts the run
//! immediately.

use std::fmt;
use thiserror::Error;

/// One problem found in a model configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{location}: {message}")]
pub struct ConfigError {
    /// Dotted path of the offending parameter, e.g. `processes[mortality].m`.
    pub location: String,
    /// Human readable description.
    pub message: String,
}

impl ConfigError {
    pub fn new(location: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            location: location.into(),
            message: message.into(),
        }
    }
}

/// Collector for configuration errors.
///
/// Validation and build steps push into this instead of returning on the
/// first failure.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigErrors {
    errors: Vec<ConfigError>,
}

impl ConfigErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an error at `location`.
    pub fn push(&mut self, location: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigError::new(location, message));
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ConfigError> {
        self.errors.iter()
    }

    /// Whether any recorded error mentions `location`.
    pub fn contains_location(&self, location: &str) -> bool {
        self.errors.iter().any(|e| e.location.contains(location))
    }

    /// Convert the collected errors into a result.
    pub fn into_result(self) -> Result<()> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(ModelError::Configuration(self))
        }
    }
}

impl fmt::Display for ConfigErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, error) in self.errors.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "  - {error}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ConfigErrors {}

impl IntoIterator for ConfigErrors {
    type Item = ConfigError;
    type IntoIter = std::vec::IntoIter<ConfigError>;

    fn into_iter(self) -> Self::IntoIter {
        self.errors.into_iter()
    }
}

/// Errors returned by model construction and execution.
#[derive(Debug, Error)]
pub enum ModelError {
    /// The configuration has one or more user errors.
    #[error("invalid model configuration ({count} error(s)):\n{0}", count = .0.len())]
    Configuration(ConfigErrors),

    /// An engine invariant was violated while executing.
    #[error("internal error: {0}")]
    Internal(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ModelError {
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Single configuration error, for paths that can only fail one way.
    pub fn config(location: impl Into<String>, message: impl Into<String>) -> Self {
        let mut errors = ConfigErrors::new();
        errors.push(location, message);
        Self::Configuration(errors)
    }

    /// The accumulated configuration errors, if this is a configuration error.
    pub fn config_errors(&self) -> Option<&ConfigErrors> {
        match self {
            Self::Configuration(errors) => Some(errors),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, ModelError>;
