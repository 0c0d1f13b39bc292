//! Error types for holorig

use thiserror::Error;

/// Main error type for holorig
#[derive(Error, Debug)]
pub enum HolorigError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Graph error: {0}")]
    Graph(#[from] GraphError),

    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    #[error("Capture error: {0}")]
    Capture(#[from] CaptureError),
}

/// Configuration-related errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadFile(String),

    #[error("Failed to parse config: {0}")]
    Parse(String),

    #[error("Invalid configuration value: {field} - {message}")]
    InvalidValue { field: String, message: String },
}

/// Inference graph errors (build, stream wiring, frame submission, drain)
#[derive(Error, Debug)]
pub enum GraphError {
    #[error("Failed to build graph: {0}")]
    Build(String),

    #[error("Failed to observe stream {stream}: {message}")]
    Observe { stream: String, message: String },

    #[error("Failed to start graph: {0}")]
    Start(String),

    #[error("Failed to submit frame: {0}")]
    Submit(String),

    #[error("Failed to close input sources: {0}")]
    Close(String),

    #[error("Graph did not drain cleanly: {0}")]
    Drain(String),
}

/// Session lifecycle errors
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Session registry is full (capacity {capacity})")]
    RegistryFull { capacity: usize },

    #[error("No inference graph is configured")]
    NotConfigured,
}

/// Frame capture errors
#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("Failed to read source pixels: {0}")]
    SourceRead(String),
}

/// Result type alias for holorig operations
pub type Result<T> = std::result::Result<T, HolorigError>;
