//! Error types for the task-graph planner.

use thiserror::Error;

/// Planner error type.
#[derive(Debug, Error)]
pub enum Error {
    /// The plan text was not valid JSON.
    #[error("plan parse error: {0}")]
    PlanParse(#[from] serde_json::Error),

    /// LLM provider or network failure.
    #[error("llm error: {0}")]
    Llm(String),

    /// Capability storage failure.
    #[error("matcher error: {0}")]
    Matcher(String),

    /// Configuration could not be loaded.
    #[error("configuration error: {0}")]
    Config(String),

    /// Workflow failed a structural check.
    #[error("invalid workflow: {0}")]
    InvalidWorkflow(String),
}

impl Error {
    /// Create an LLM error.
    pub fn llm(msg: impl Into<String>) -> Self {
        Self::Llm(msg.into())
    }

    /// Create a matcher error.
    pub fn matcher(msg: impl Into<String>) -> Self {
        Self::Matcher(msg.into())
    }

    /// Create an invalid workflow error.
    pub fn invalid_workflow(msg: impl Into<String>) -> Self {
        Self::InvalidWorkflow(msg.into())
    }
}

impl From<serde_yaml::Error> for Error {
    fn from(err: serde_yaml::Error) -> Self {
        Self::Config(err.to_string())
    }
}

/// Result type alias.
pub type Result<T> = std::result::Result<T, Error>;
