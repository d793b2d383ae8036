//! Ledger error types.
//!
//! Every failure in the stock ledger, account ledger, document poster, or consistency
//! service surfaces as a `LedgerError`. Errors are never downgraded to default values;
//! the consistency service rolls back before handing one to its caller.

use rust_decimal::Decimal;
use thiserror::Error;

use makhzan_shared::types::{DocumentId, ProductId, WarehouseId};

use crate::document::DocumentStatus;
use crate::store::StoreError;

/// Errors that can occur during ledger operations.
#[derive(Debug, Error)]
pub enum LedgerError {
    // ========== Lookup Errors ==========
    /// Unknown product, warehouse, account, or document id.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// Kind of record that was looked up.
        entity: &'static str,
        /// The identifier that did not resolve.
        id: String,
    },

    // ========== Validation Errors ==========
    /// Non-positive transaction amount, non-positive line quantity, or negative price.
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    /// Input failed a business rule that is not about amounts.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Code or document number already in use.
    #[error("Duplicate {entity}: {value}")]
    Duplicate {
        /// Kind of record.
        entity: &'static str,
        /// The conflicting value.
        value: String,
    },

    // ========== Document State Errors ==========
    /// Posting was attempted on a document that is no longer a draft.
    #[error("Document {id} is already {status}")]
    AlreadyPosted {
        /// The document.
        id: DocumentId,
        /// Its current status.
        status: DocumentStatus,
    },

    /// A posted or cancelled document cannot be edited or deleted.
    #[error("Document {id} is {status} and can no longer be modified")]
    DocumentNotEditable {
        /// The document.
        id: DocumentId,
        /// Its current status.
        status: DocumentStatus,
    },

    /// The document being posted references something missing, inactive, or of the wrong type.
    #[error("Inconsistent document {id}: {reason}")]
    InconsistentDocument {
        /// The document.
        id: DocumentId,
        /// What is wrong with it.
        reason: String,
    },

    // ========== Stock Errors ==========
    /// A sale or transfer would drive a stock level below zero.
    #[error(
        "Insufficient stock for product {product_id} in warehouse {warehouse_id}: available {available}, requested {requested}"
    )]
    InsufficientStock {
        /// The product.
        product_id: ProductId,
        /// The warehouse.
        warehouse_id: WarehouseId,
        /// Quantity on hand before the movement.
        available: Decimal,
        /// Quantity the movement tried to take.
        requested: Decimal,
    },

    /// A product cannot be deleted while stock or documents reference it.
    #[error("Product {0} is referenced by stock or documents and cannot be deleted")]
    ProductInUse(ProductId),

    // ========== Storage Errors ==========
    /// The backing store failed, including commit failures and lock contention.
    #[error(transparent)]
    Storage(#[from] StoreError),
}

impl LedgerError {
    /// Builds a `NotFound` error for the given entity name and id.
    pub fn not_found(entity: &'static str, id: impl std::fmt::Display) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// Builds an `InconsistentDocument` error.
    pub fn inconsistent(id: DocumentId, reason: impl Into<String>) -> Self {
        Self::InconsistentDocument {
            id,
            reason: reason.into(),
        }
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "NOT_FOUND",
            Self::InvalidAmount(_) => "INVALID_AMOUNT",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::Duplicate { .. } => "DUPLICATE",
            Self::AlreadyPosted { .. } => "ALREADY_POSTED",
            Self::DocumentNotEditable { .. } => "DOCUMENT_NOT_EDITABLE",
            Self::InconsistentDocument { .. } => "INCONSISTENT_DOCUMENT",
            Self::InsufficientStock { .. } => "INSUFFICIENT_STOCK",
            Self::ProductInUse(_) => "PRODUCT_IN_USE",
            Self::Storage(_) => "STORAGE_ERROR",
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub fn http_status_code(&self) -> u16 {
        match self {
            // 400 Bad Request - validation errors
            Self::InvalidAmount(_) | Self::Validation(_) => 400,

            // 404 Not Found
            Self::NotFound { .. } => 404,

            // 409 Conflict - state errors
            Self::Duplicate { .. }
            | Self::AlreadyPosted { .. }
            | Self::DocumentNotEditable { .. }
            | Self::ProductInUse(_) => 409,

            // 422 Unprocessable - the request is well formed but the ledger refuses it
            Self::InconsistentDocument { .. } | Self::InsufficientStock { .. } => 422,

            // 503 for contention, 500 for everything else the store reports
            Self::Storage(err) if err.is_retryable() => 503,
            Self::Storage(_) => 500,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use rust_decimal_macros::dec;

    #[rstest]
    #[case(LedgerError::not_found("product", ProductId::new()), "NOT_FOUND", 404)]
    #[case(LedgerError::InvalidAmount("quantity".into()), "INVALID_AMOUNT", 400)]
    #[case(
        LedgerError::AlreadyPosted { id: DocumentId::new(), status: DocumentStatus::Posted },
        "ALREADY_POSTED",
        409
    )]
    #[case(
        LedgerError::inconsistent(DocumentId::new(), "no lines"),
        "INCONSISTENT_DOCUMENT",
        422
    )]
    #[case(LedgerError::ProductInUse(ProductId::new()), "PRODUCT_IN_USE", 409)]
    #[case(
        LedgerError::Storage(StoreError::Database("boom".into())),
        "STORAGE_ERROR",
        500
    )]
    #[case(
        LedgerError::Storage(StoreError::Conflict("lock timeout".into())),
        "STORAGE_ERROR",
        503
    )]
    fn test_codes_and_statuses(
        #[case] err: LedgerError,
        #[case] code: &str,
        #[case] status: u16,
    ) {
        assert_eq!(err.error_code(), code);
        assert_eq!(err.http_status_code(), status);
    }

    #[test]
    fn test_error_display() {
        let product_id = ProductId::new();
        let warehouse_id = WarehouseId::new();
        let err = LedgerError::InsufficientStock {
            product_id,
            warehouse_id,
            available: dec!(3),
            requested: dec!(4),
        };
        assert_eq!(
            err.to_string(),
            format!(
                "Insufficient stock for product {product_id} in warehouse {warehouse_id}: available 3, requested 4"
            )
        );

        let id = DocumentId::new();
        let err = LedgerError::AlreadyPosted {
            id,
            status: DocumentStatus::Posted,
        };
        assert_eq!(err.to_string(), format!("Document {id} is already posted"));
    }
}
