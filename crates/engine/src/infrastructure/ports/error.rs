//! Error types for port operations.

/// Failures talking to the LLM service.
#[derive(Debug, Clone, thiserror::Error)]
pub enum LlmError {
    #[error("LLM request failed: {0}")]
    RequestFailed(String),
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// Generation/save file operation errors with context for debugging.
#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    /// File not found - includes the name that was requested.
    #[error("Generation file not found: {0}")]
    NotFound(String),

    /// Filesystem operation failed - includes operation and path for tracing.
    #[error("I/O error in {operation} ({path}): {message}")]
    Io {
        operation: &'static str,
        path: String,
        message: String,
    },

    /// Serialization/deserialization failed.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl PersistenceError {
    /// Create an Io error with operation and path context.
    pub fn io(operation: &'static str, path: impl ToString, message: impl ToString) -> Self {
        Self::Io {
            operation,
            path: path.to_string(),
            message: message.to_string(),
        }
    }

    /// Create a Serialization error.
    pub fn serialization(message: impl ToString) -> Self {
        Self::Serialization(message.to_string())
    }

    /// Check if this is a NotFound error.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}
