use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("{field} must be greater than zero")]
    Zero { field: &'static str },

    #[error("{field} must be within [0, 1], got {value}")]
    OutOfUnitRange { field: &'static str, value: f64 },

    #[error("{field} must be positive and finite, got {value}")]
    NotPositive { field: &'static str, value: f64 },

    #[error("environment variable {key} has unparsable value {value:?}")]
    InvalidEnv { key: String, value: String },
}

#[derive(Error, Debug)]
pub enum AnalyzerError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("analyzer is already running")]
    AlreadyRunning,

    #[error("analyzer is not running")]
    NotRunning,

    #[error("analyzer task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Why a sink refused an event.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkError {
    #[error("sink queue is full")]
    Full,

    #[error("sink is closed")]
    Closed,
}
