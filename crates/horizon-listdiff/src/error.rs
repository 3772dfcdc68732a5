//! Error types for the filter-and-diff pipeline.

use crate::interceptor::Stage;

/// Result type alias for pipeline operations.
pub type Result<T> = std::result::Result<T, FilterError>;

/// Errors that can occur while filtering, diffing or scheduling updates.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FilterError {
    /// An interceptor failed; the pass is aborted and nothing is committed.
    #[error("interceptor failed in {stage} stage: {message}")]
    Interceptor { stage: Stage, message: String },

    /// A task ran without a parameter snapshot.
    #[error("update task has no filter parameters")]
    MissingParameters,

    /// The background worker pool could not be created.
    #[error("failed to create worker pool: {0}")]
    WorkerPool(String),

    /// The UI event loop thread could not be started.
    #[error("failed to start event loop: {0}")]
    EventLoop(String),

    /// A job was posted to an event loop that has already stopped.
    #[error("event loop has stopped")]
    ContextStopped,

    /// The configuration could not be parsed.
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl FilterError {
    /// Create an interceptor failure for the given stage.
    pub fn interceptor(stage: Stage, message: impl Into<String>) -> Self {
        Self::Interceptor {
            stage,
            message: message.into(),
        }
    }

    /// Returns `true` if this error aborts a filter pass.
    pub fn is_interceptor_failure(&self) -> bool {
        matches!(self, Self::Interceptor { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interceptor_error_display() {
        let err = FilterError::interceptor(Stage::Main, "boom");
        assert_eq!(err.to_string(), "interceptor failed in main stage: boom");
        assert!(err.is_interceptor_failure());
        assert!(!FilterError::MissingParameters.is_interceptor_failure());
    }
}
