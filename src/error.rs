//! Error types for the call-session engine.
//!
//! Invalid *domain* operations (pausing while idle, advancing past the end
//! of a script, toggling an unknown task) are not errors; they are defined
//! no-ops and never surface here. [`CallError`] covers real faults only.

/// Top-level error type for the call-session engine.
#[derive(Debug, thiserror::Error)]
pub enum CallError {
    /// Lead catalog parse or lookup error.
    #[error("catalog error: {0}")]
    Catalog(String),

    /// Configuration error.
    #[error("config error: {0}")]
    Config(String),

    /// Engine channel send/receive error.
    #[error("channel error: {0}")]
    Channel(String),

    /// Announcement capability error.
    #[error("announce error: {0}")]
    Announce(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience result type.
pub type Result<T> = std::result::Result<T, CallError>;
