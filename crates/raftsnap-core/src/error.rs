//! Error types module
//!
//! `AgentError` is the agent-wide taxonomy. Only `Config` is fatal: it stops the
//! process at startup. Everything else is scoped to one backend or one cycle and
//! is logged, then retried on the next scheduled cycle.

use std::io;

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Expected conditions, e.g. a backend that is briefly unreachable
    Warn,
    /// Unexpected failures
    Error,
}

#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("IO error: {0}")]
    Io(String),

    #[error("Schedule error: {0}")]
    Schedule(String),
}

/// Result type for agent operations
pub type AgentResult<T> = Result<T, AgentError>;

impl AgentError {
    /// Whether the process must stop. Only configuration errors are.
    pub fn is_fatal(&self) -> bool {
        matches!(self, AgentError::Config(_))
    }

    pub fn log_level(&self) -> LogLevel {
        match self {
            AgentError::Schedule(_) => LogLevel::Warn,
            _ => LogLevel::Error,
        }
    }
}

impl From<io::Error> for AgentError {
    fn from(err: io::Error) -> Self {
        AgentError::Io(err.to_string())
    }
}
