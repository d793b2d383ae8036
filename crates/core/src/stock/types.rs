//! Stock domain types.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use makhzan_shared::types::{DocumentId, ProductId, StockMovementId, WarehouseId};

use crate::document::DocumentKind;

/// The key of a stock level: one product in one warehouse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct StockCell {
    /// The product.
    pub product_id: ProductId,
    /// The warehouse.
    pub warehouse_id: WarehouseId,
}

impl StockCell {
    /// Creates a cell key.
    #[must_use]
    pub const fn new(product_id: ProductId, warehouse_id: WarehouseId) -> Self {
        Self {
            product_id,
            warehouse_id,
        }
    }
}

/// Quantity on hand for one cell.
///
/// Non-negative in steady state; a negative value only results from an explicit override.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockLevel {
    /// The product.
    pub product_id: ProductId,
    /// The warehouse.
    pub warehouse_id: WarehouseId,
    /// Quantity on hand.
    pub quantity: Decimal,
    /// When the quantity last changed.
    pub updated_at: DateTime<Utc>,
}

impl StockLevel {
    /// A fresh level at zero, used on the first movement for a cell.
    #[must_use]
    pub fn zero(cell: StockCell, now: DateTime<Utc>) -> Self {
        Self {
            product_id: cell.product_id,
            warehouse_id: cell.warehouse_id,
            quantity: Decimal::ZERO,
            updated_at: now,
        }
    }

    /// The cell this level belongs to.
    #[must_use]
    pub const fn cell(&self) -> StockCell {
        StockCell::new(self.product_id, self.warehouse_id)
    }
}

/// Why stock moved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MovementKind {
    /// Goods received on a purchase document.
    Purchase,
    /// Goods issued on a sales document.
    Sale,
    /// Manual correction or physical count.
    Adjustment,
    /// Receiving side of a transfer.
    TransferIn,
    /// Sending side of a transfer.
    TransferOut,
}

impl MovementKind {
    /// Stable string form used in storage and the API.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Purchase => "purchase",
            Self::Sale => "sale",
            Self::Adjustment => "adjustment",
            Self::TransferIn => "transfer-in",
            Self::TransferOut => "transfer-out",
        }
    }
}

impl std::fmt::Display for MovementKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for MovementKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "purchase" => Ok(Self::Purchase),
            "sale" => Ok(Self::Sale),
            "adjustment" => Ok(Self::Adjustment),
            "transfer-in" => Ok(Self::TransferIn),
            "transfer-out" => Ok(Self::TransferOut),
            _ => Err(format!("Unknown movement kind: {s}")),
        }
    }
}

/// The document a movement or transaction was produced by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentRef {
    /// The document.
    pub document_id: DocumentId,
    /// Sale or purchase.
    pub kind: DocumentKind,
}

/// Where a movement came from, beyond its kind.
#[derive(Debug, Clone, Default)]
pub struct MovementSource {
    /// Originating document, if any.
    pub document: Option<DocumentRef>,
    /// Free-text note.
    pub note: Option<String>,
}

impl MovementSource {
    /// A movement caused by a document.
    #[must_use]
    pub fn document(document: DocumentRef) -> Self {
        Self {
            document: Some(document),
            note: None,
        }
    }

    /// A movement with only a note.
    #[must_use]
    pub fn note(note: impl Into<String>) -> Self {
        Self {
            document: None,
            note: Some(note.into()),
        }
    }
}

/// One immutable entry in the stock audit trail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockMovement {
    /// Unique identifier.
    pub id: StockMovementId,
    /// The product.
    pub product_id: ProductId,
    /// The warehouse.
    pub warehouse_id: WarehouseId,
    /// Signed change in quantity.
    pub delta: Decimal,
    /// Quantity on hand right after this movement.
    pub quantity_after: Decimal,
    /// Why stock moved.
    pub kind: MovementKind,
    /// Originating document, if any.
    pub document: Option<DocumentRef>,
    /// Free-text note.
    pub note: Option<String>,
    /// When the movement was recorded.
    pub created_at: DateTime<Utc>,
}

impl StockMovement {
    /// The cell this movement touched.
    #[must_use]
    pub const fn cell(&self) -> StockCell {
        StockCell::new(self.product_id, self.warehouse_id)
    }
}

/// Filter for listing movements. Empty filter lists everything.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MovementFilter {
    /// Only this product.
    pub product_id: Option<ProductId>,
    /// Only this warehouse.
    pub warehouse_id: Option<WarehouseId>,
    /// Only movements produced by this document.
    pub document_id: Option<DocumentId>,
}

impl MovementFilter {
    /// Returns true if the movement passes the filter.
    #[must_use]
    pub fn matches(&self, movement: &StockMovement) -> bool {
        self.product_id.is_none_or(|id| movement.product_id == id)
            && self.warehouse_id.is_none_or(|id| movement.warehouse_id == id)
            && self
                .document_id
                .is_none_or(|id| movement.document.is_some_and(|d| d.document_id == id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_movement_kind_round_trips_through_str() {
        for kind in [
            MovementKind::Purchase,
            MovementKind::Sale,
            MovementKind::Adjustment,
            MovementKind::TransferIn,
            MovementKind::TransferOut,
        ] {
            assert_eq!(MovementKind::from_str(kind.as_str()).unwrap(), kind);
        }
        assert!(MovementKind::from_str("transfer").is_err());
    }

    #[test]
    fn test_filter_matches_by_document() {
        let document_id = DocumentId::new();
        let movement = StockMovement {
            id: StockMovementId::new(),
            product_id: ProductId::new(),
            warehouse_id: WarehouseId::new(),
            delta: Decimal::ONE,
            quantity_after: Decimal::ONE,
            kind: MovementKind::Purchase,
            document: Some(DocumentRef {
                document_id,
                kind: DocumentKind::Purchase,
            }),
            note: None,
            created_at: Utc::now(),
        };

        assert!(MovementFilter::default().matches(&movement));
        assert!(
            MovementFilter {
                document_id: Some(document_id),
                ..MovementFilter::default()
            }
            .matches(&movement)
        );
        assert!(
            !MovementFilter {
                product_id: Some(ProductId::new()),
                ..MovementFilter::default()
            }
            .matches(&movement)
        );
    }
}
