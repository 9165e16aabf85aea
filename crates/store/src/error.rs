//! Ledger error model.
//!
//! SQLx errors are mapped as follows:
//!
//! | SQLx Error | LedgerError | Scenario |
//! |------------|-------------|----------|
//! | Database (unique violation) | `Conflict` | Generated identifier already present |
//! | Database (check constraint) | `Storage` | Row rejected by a schema constraint |
//! | PoolClosed | `Storage` | Ledger used after `close()` |
//! | Other | `Storage` | IO, connection and decode failures |

use thiserror::Error;

use bomledger_core::DomainError;
use bomledger_inventory::Shortfall;

pub type LedgerResult<T> = Result<T, LedgerError>;

#[derive(Debug, Error)]
pub enum LedgerError {
    /// Malformed or out-of-range input; nothing was changed.
    #[error("validation failed: {0}")]
    Validation(String),

    /// Not enough material to build the requested units; nothing was changed.
    #[error("insufficient materials: {}", describe_shortfalls(.0))]
    InsufficientMaterials(Vec<Shortfall>),

    /// Not enough finished units to ship; nothing was changed.
    #[error("insufficient {device_type} units in stock: {available} available, {requested} requested")]
    InsufficientUnits {
        device_type: String,
        available: i64,
        requested: i64,
    },

    #[error("conflict: {0}")]
    Conflict(String),

    /// Any other domain failure (invariant, not found, bad identifier).
    #[error(transparent)]
    Domain(DomainError),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("storage error in {operation}: {message}")]
    Storage {
        operation: &'static str,
        message: String,
    },
}

impl From<DomainError> for LedgerError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::Validation(msg) => LedgerError::Validation(msg),
            other => LedgerError::Domain(other),
        }
    }
}

fn describe_shortfalls(shortfalls: &[Shortfall]) -> String {
    shortfalls
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

pub(crate) fn map_sqlx_error(operation: &'static str, err: sqlx::Error) -> LedgerError {
    match err {
        sqlx::Error::Database(db_err) => {
            let message = db_err.message().to_string();
            if db_err.is_unique_violation() {
                LedgerError::Conflict(format!("{operation}: {message}"))
            } else {
                LedgerError::Storage { operation, message }
            }
        }
        sqlx::Error::PoolClosed => LedgerError::Storage {
            operation,
            message: "ledger connection is closed".to_string(),
        },
        other => LedgerError::Storage {
            operation,
            message: other.to_string(),
        },
    }
}

/// Check if an error is a unique constraint violation.
pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db_err) if db_err.is_unique_violation())
}
