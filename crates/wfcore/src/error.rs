use thiserror::Error;

#[derive(Error, Debug)]
pub enum FlowError {
    #[error("Step error: {0}")]
    Step(#[from] StepError),

    #[error("Cyclic dependency detected")]
    CyclicDependency,

    #[error("Workflow is not running")]
    NotRunning,

    #[error("Workflow is not paused")]
    NotPaused,

    #[error("Step has no handler: {0}")]
    MissingHandler(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl FlowError {
    /// The handler-level error, if this error originated in a step handler.
    pub fn as_step_error(&self) -> Option<&StepError> {
        match self {
            FlowError::Step(e) => Some(e),
            _ => None,
        }
    }
}

/// Errors raised by step handlers.
///
/// The engine never inspects these; they travel back to the caller of `run`
/// unchanged through every enclosing pipeline or DAG.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StepError {
    #[error("Missing required input: {0}")]
    MissingInput(String),

    #[error("Invalid input type for '{field}': expected {expected}, got {actual}")]
    InvalidInputType {
        field: String,
        expected: String,
        actual: String,
    },

    #[error("Execution failed: {0}")]
    ExecutionFailed(String),

    #[error("Cancelled")]
    Cancelled,
}

impl StepError {
    pub fn failed(message: impl Into<String>) -> Self {
        StepError::ExecutionFailed(message.into())
    }
}
