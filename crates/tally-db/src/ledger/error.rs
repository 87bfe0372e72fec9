//! # Ledger Errors
//!
//! What callers of the ledger see.
//!
//! ## Error Mapping
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Source                              LedgerError           ErrorCode    │
//! │  ──────                              ───────────           ─────────    │
//! │  ValidationError                 ──► Validation        ──► VALIDATION_ERROR
//! │  CoreError::*NotFound            ──► NotFound          ──► NOT_FOUND    │
//! │  DbError::NotFound               ──► NotFound          ──► NOT_FOUND    │
//! │  CoreError::InsufficientStock    ──► InsufficientStock ──► INSUFFICIENT_STOCK
//! │  CoreError::InvalidTxStatus      ──► InvalidTransactionStatus           │
//! │                                                        ──► BUSINESS_LOGIC
//! │  DbError (unique / foreign key)  ──► Store             ──► VALIDATION_ERROR
//! │  DbError (anything else)         ──► Store             ──► DATABASE_ERROR
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every error leaves the database as it was before the operation started.

use serde::Serialize;
use tally_core::{CoreError, TransactionStatus, ValidationError};
use thiserror::Error;

use crate::error::DbError;

/// Errors returned by ledger operations.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// Malformed or out-of-range input, caught before any write.
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// A referenced product, client, category or transaction doesn't exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// A removal would take stock below zero where that is not allowed.
    #[error("Insufficient stock for {sku}: available {available}, requested {requested}")]
    InsufficientStock {
        sku: String,
        available: i64,
        requested: i64,
    },

    /// The transaction's status doesn't allow the operation.
    #[error("Transaction {transaction_id} is {status}, cannot perform operation")]
    InvalidTransactionStatus {
        transaction_id: String,
        status: TransactionStatus,
    },

    /// The store failed; surfaced as-is.
    #[error(transparent)]
    Store(DbError),
}

impl LedgerError {
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        LedgerError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// Machine-readable code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            LedgerError::Validation(_) => ErrorCode::ValidationError,
            LedgerError::NotFound { .. } => ErrorCode::NotFound,
            LedgerError::InsufficientStock { .. } => ErrorCode::InsufficientStock,
            LedgerError::InvalidTransactionStatus { .. } => ErrorCode::BusinessLogic,
            LedgerError::Store(DbError::UniqueViolation { .. })
            | LedgerError::Store(DbError::ForeignKeyViolation { .. }) => ErrorCode::ValidationError,
            LedgerError::Store(_) => ErrorCode::DatabaseError,
        }
    }

    /// Serializable `{ code, message }` pair for transport layers.
    pub fn to_payload(&self) -> ErrorPayload {
        ErrorPayload {
            code: self.code(),
            message: self.to_string(),
        }
    }
}

impl From<DbError> for LedgerError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => LedgerError::NotFound { entity, id },
            other => LedgerError::Store(other),
        }
    }
}

impl From<sqlx::Error> for LedgerError {
    fn from(err: sqlx::Error) -> Self {
        LedgerError::from(DbError::from(err))
    }
}

impl From<CoreError> for LedgerError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ProductNotFound(id) => LedgerError::not_found("Product", id),
            CoreError::ClientNotFound(id) => LedgerError::not_found("Client", id),
            CoreError::TransactionNotFound(id) => LedgerError::not_found("Transaction", id),
            CoreError::InsufficientStock {
                sku,
                available,
                requested,
            } => LedgerError::InsufficientStock {
                sku,
                available,
                requested,
            },
            CoreError::InvalidTransactionStatus {
                transaction_id,
                current_status,
            } => LedgerError::InvalidTransactionStatus {
                transaction_id,
                status: current_status,
            },
            CoreError::Validation(e) => LedgerError::Validation(e),
        }
    }
}

/// Result type for ledger operations.
pub type LedgerResult<T> = Result<T, LedgerError>;

// =============================================================================
// Serializable Form
// =============================================================================

/// Error codes for callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Resource not found (404)
    NotFound,

    /// Input validation failed (400)
    ValidationError,

    /// Stock would go below zero (409)
    InsufficientStock,

    /// Business rule violated (422)
    BusinessLogic,

    /// Database operation failed (500)
    DatabaseError,
}

/// What a transport layer sends back for a failed operation.
///
/// ```json
/// { "code": "INSUFFICIENT_STOCK", "message": "Insufficient stock for RICE-5KG: ..." }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorPayload {
    pub code: ErrorCode,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes() {
        assert_eq!(
            LedgerError::from(ValidationError::required("items")).code(),
            ErrorCode::ValidationError
        );
        assert_eq!(LedgerError::not_found("Product", "p-1").code(), ErrorCode::NotFound);
        assert_eq!(
            LedgerError::from(DbError::duplicate("products.sku", "RICE-5KG")).code(),
            ErrorCode::ValidationError
        );
        assert_eq!(
            LedgerError::from(DbError::QueryFailed("boom".to_string())).code(),
            ErrorCode::DatabaseError
        );
    }

    #[test]
    fn test_db_not_found_becomes_not_found() {
        let err = LedgerError::from(DbError::not_found("Client", "c-1"));
        assert!(matches!(err, LedgerError::NotFound { ref entity, .. } if entity == "Client"));
    }

    #[test]
    fn test_core_insufficient_stock_maps_through() {
        let err = LedgerError::from(CoreError::InsufficientStock {
            sku: "RICE-5KG".to_string(),
            available: 5,
            requested: 10,
        });
        assert_eq!(err.code(), ErrorCode::InsufficientStock);

        let json = serde_json::to_value(err.to_payload()).unwrap();
        assert_eq!(json["code"], "INSUFFICIENT_STOCK");
        assert_eq!(
            json["message"],
            "Insufficient stock for RICE-5KG: available 5, requested 10"
        );
    }
}
