//! Error handling for audioled-rs
//!
//! Graph operations report [`GraphError`]; everything at the edges of the
//! engine (configuration, project files, IO) is folded into
//! [`AudioledError`] with a Result alias.

use crate::graph::GraphError;
use thiserror::Error;

/// Main error type for audioled-rs operations
#[derive(Error, Debug)]
pub enum AudioledError {
    /// Errors related to configuration or project loading/saving
    #[error("Configuration error: {0}")]
    Config(String),

    /// Errors raised by the filter graph
    #[error("Graph error: {0}")]
    Graph(#[from] GraphError),

    /// Errors related to the frame driver thread
    #[error("Driver error: {0}")]
    Driver(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic errors with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<AudioledError>,
    },
}

impl AudioledError {
    /// Add context to an error
    pub fn with_context(self, context: impl Into<String>) -> Self {
        AudioledError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }
}

/// Result type alias for audioled-rs operations
pub type Result<T> = std::result::Result<T, AudioledError>;

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to an error result
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Add context lazily to an error result
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T, E> ResultExt<T> for std::result::Result<T, E>
where
    E: Into<AudioledError>,
{
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.into().with_context(context))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| e.into().with_context(f()))
    }
}
