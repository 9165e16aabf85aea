//! Domain error model.

use thiserror::Error;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level error.
///
/// Keep this focused on deterministic, business/domain failures (validation,
/// invariants, malformed identifiers). Storage concerns belong to the ledger crate.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A value failed validation (e.g. non-positive quantity, unknown currency).
    #[error("validation failed: {0}")]
    Validation(String),

    /// A domain invariant was violated (e.g. stock would go negative).
    #[error("invariant violated: {0}")]
    InvariantViolation(String),

    /// An identifier was malformed.
    #[error("invalid identifier: {0}")]
    InvalidId(String),

}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invariant(msg: impl Into<String>) -> Self {
        Self::InvariantViolation(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }
}

/// Reject quantities below one with a uniform message.
pub fn ensure_positive(field: &str, value: i64) -> DomainResult<()> {
    if value < 1 {
        return Err(DomainError::validation(format!(
            "{field} must be at least 1 (got {value})"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ensure_positive_rejects_zero_and_negative() {
        assert!(ensure_positive("quantity", 1).is_ok());
        assert!(matches!(
            ensure_positive("quantity", 0),
            Err(DomainError::Validation(msg)) if msg.contains("quantity")
        ));
        assert!(ensure_positive("quantity", -3).is_err());
    }
}
