//! Domain-level error type shared across the workspace.

/// Errors produced by domain operations.
///
/// These are pure state-machine errors; storage and transport layers wrap
/// them in their own error types.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// A lookup legitimately missed (unknown job id, unknown stage key).
    #[error("{entity} with id {id} not found")]
    NotFound {
        /// Kind of entity that was looked up (e.g. `"job"`, `"stage"`).
        entity: &'static str,
        /// Identifier that missed.
        id: String,
    },

    /// The requested transition is not legal from the current state.
    #[error("Validation error: {0}")]
    Validation(String),

    /// The operation conflicts with already-recorded state
    /// (e.g. mutating a job whose final status is set).
    #[error("Conflict: {0}")]
    Conflict(String),

    /// An unexpected internal defect.
    #[error("Internal error: {0}")]
    Internal(String),
}
