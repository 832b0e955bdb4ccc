//! Unified error types for the domain layer
//!
//! Provides a common error type that can be used across all domain operations,
//! enabling consistent error handling without forcing adapters to use String or anyhow.

use thiserror::Error;

/// Unified error type for domain operations
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Invalid game setup (dice count, die size, aggregation policy).
    ///
    /// Fatal at startup; never produced mid-game.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Validation failed (e.g., invalid field values)
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Parse error (for value objects)
    #[error("Parse error: {0}")]
    Parse(String),
}

impl DomainError {
    /// Creates a configuration error for invalid game setup.
    ///
    /// # Example
    /// ```ignore
    /// if dice_count == 0 {
    ///     return Err(DomainError::configuration("number of dice must be at least 1"));
    /// }
    /// ```
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Creates a validation error for business rule violations.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Creates a parse error for string-to-type conversion failures.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse(msg.into())
    }

    /// Check if this is a configuration error.
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configuration_error() {
        let err = DomainError::configuration("unknown aggregation 'median'");
        assert!(err.is_configuration());
        assert_eq!(
            err.to_string(),
            "Configuration error: unknown aggregation 'median'"
        );
    }

    #[test]
    fn test_validation_error() {
        let err = DomainError::validation("item name cannot be empty");
        assert!(matches!(err, DomainError::Validation(_)));
        assert!(!err.is_configuration());
        assert_eq!(err.to_string(), "Validation failed: item name cannot be empty");
    }
}
