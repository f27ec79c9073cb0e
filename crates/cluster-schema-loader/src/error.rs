//! Error types for the schema loading library.

use thiserror::Error;

/// Main error type for schema loading operations.
#[derive(Error, Debug)]
pub enum LoaderError {
    /// Configuration error (invalid YAML, bad domain suffix, bad identifier, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Transport or command failure reported by the admin provider.
    #[error("Command failed: {0}")]
    Transport(String),

    /// A result table could not be decoded into the expected record shape.
    #[error("Malformed result table: {0}")]
    Decode(String),

    /// A column type name outside the fixed scalar-type enumeration.
    ///
    /// Raised in both strict and lenient loads; the enumeration is closed.
    #[error("Unmapped column type: {0}")]
    UnmappedColumnType(String),

    /// The requested database does not exist on the target cluster.
    #[error("Database '{database}' not found on cluster '{cluster}'")]
    DatabaseNotFound { cluster: String, database: String },

    /// IO error (config file operations)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML deserialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Load was cancelled mid-flight.
    #[error("Load cancelled")]
    Cancelled,
}

impl LoaderError {
    /// Create a Transport error.
    pub fn transport(message: impl Into<String>) -> Self {
        LoaderError::Transport(message.into())
    }

    /// Create a Decode error.
    pub fn decode(message: impl Into<String>) -> Self {
        LoaderError::Decode(message.into())
    }

    /// Format error with full details including error chain
    pub fn format_detailed(&self) -> String {
        let mut output = format!("Error: {}\n", self);

        // Add error chain for wrapped errors
        let mut source = std::error::Error::source(self);
        let mut depth = 1;
        while let Some(err) = source {
            output.push_str(&format!("\nCaused by:\n  {}: {}", depth, err));
            source = err.source();
            depth += 1;
        }

        output
    }
}

/// Result type alias for schema loading operations.
pub type Result<T> = std::result::Result<T, LoaderError>;
