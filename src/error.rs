//! Crate-wide error type

use thiserror::Error;

/// Failures surfaced by the grid and its collaborators.
///
/// None of these are fatal to the process: the runner and scheduler log them
/// and keep going.
#[derive(Debug, Error)]
pub enum GridError {
    #[error("data source error: {0}")]
    DataSource(String),

    #[error("action execution failed for {subject}: {reason}")]
    Execution { subject: String, reason: String },

    #[error("reward ledger error: {0}")]
    Ledger(String),

    #[error("notifier error: {0}")]
    Notifier(String),

    #[error("engine {engine} failed: {reason}")]
    Engine { engine: String, reason: String },

    #[error("engine {0} panicked")]
    EnginePanic(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("http transport error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl GridError {
    pub fn engine(engine: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Engine {
            engine: engine.into(),
            reason: reason.into(),
        }
    }

    pub fn execution(subject: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Execution {
            subject: subject.into(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, GridError>;
