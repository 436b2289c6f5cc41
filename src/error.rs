use std::io;
use thiserror::Error;

/// Error type for worker pool operations.
#[derive(Error, Debug)]
pub enum PoolError {
    /// IO error, raised when the OS refuses to spawn a worker thread.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Malformed JSON pool configuration.
    #[error("Config error: {0}")]
    Json(#[from] serde_json::Error),

    /// The configuration is well-formed but cannot be run.
    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    /// The pool was asked to run without any workers.
    #[error("Pool has no workers configured")]
    NoWorkers,

    /// A task was submitted while the pool is stopped. The task was dropped.
    #[error("Pool is not running")]
    NotRunning,

    /// A non-blocking submission found no room under the submit policy.
    #[error("Task queue is full")]
    QueueFull,

    /// A task tried to run the pool while another thread was stopping it.
    #[error("Pool is stopping")]
    Stopping,
}

/// Result type alias for worker pool operations.
pub type Result<T> = std::result::Result<T, PoolError>;
