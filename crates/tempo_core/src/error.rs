//! Core error types

use thiserror::Error;

/// Routine runner errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RoutineError {
    /// `step()` was called from inside a unit the runner is polling
    #[error("Routine runner is already stepping; step() cannot be nested inside a unit")]
    Reentrant,
}

/// Result type for routine operations
pub type Result<T> = std::result::Result<T, RoutineError>;
