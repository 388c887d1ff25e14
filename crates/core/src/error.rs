//! Domain error model.

use thiserror::Error;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level error.
///
/// Covers deterministic failures when building domain values (identifiers,
/// locales, coordinates). Failures of engine operations are not errors in
/// this sense: they travel on the reply that represents the operation.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DomainError {
    /// A value failed validation (e.g. malformed input).
    #[error("validation failed: {0}")]
    Validation(String),

    /// An identifier was invalid (e.g. contains control characters).
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    /// A numeric value fell outside its permitted range.
    #[error("{field} out of range: {value}")]
    OutOfRange { field: &'static str, value: f64 },

    /// A locale tag could not be parsed.
    #[error("invalid locale: {0}")]
    InvalidLocale(String),
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    pub fn out_of_range(field: &'static str, value: f64) -> Self {
        Self::OutOfRange { field, value }
    }

    pub fn invalid_locale(msg: impl Into<String>) -> Self {
        Self::InvalidLocale(msg.into())
    }
}
