//! Inputs and results of consistency service operations.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use makhzan_shared::types::{ProductId, WarehouseId};

use crate::account::Transaction;
use crate::document::{Document, JournalTotals, PostingOutcome};
use crate::stock::StockMovement;

/// A document after a successful post, with everything the posting recorded.
#[derive(Debug, Clone, Serialize)]
pub struct PostedDocument {
    /// The document, now `posted`.
    pub document: Document,
    /// Stock movements, one per line.
    pub movements: Vec<StockMovement>,
    /// Journal entries.
    pub entries: Vec<Transaction>,
    /// Debit and credit sums of `entries`.
    pub totals: JournalTotals,
    /// Cost of goods sold at posting time; zero for purchases.
    pub cost_of_goods_sold: Decimal,
}

impl PostedDocument {
    pub(crate) fn new(document: Document, outcome: PostingOutcome) -> Self {
        Self {
            document,
            movements: outcome.movements,
            entries: outcome.entries,
            totals: outcome.totals,
            cost_of_goods_sold: outcome.cost_of_goods_sold,
        }
    }
}

/// A physical count forcing a cell to an absolute quantity.
#[derive(Debug, Clone, Deserialize)]
pub struct StockAdjustment {
    /// The product.
    pub product_id: ProductId,
    /// The warehouse.
    pub warehouse_id: WarehouseId,
    /// Counted quantity, never negative.
    pub counted_quantity: Decimal,
    /// Reason for the adjustment.
    #[serde(default)]
    pub note: Option<String>,
}

/// Moving stock of one product between two warehouses.
#[derive(Debug, Clone, Deserialize)]
pub struct StockTransfer {
    /// The product.
    pub product_id: ProductId,
    /// Source warehouse.
    pub from_warehouse_id: WarehouseId,
    /// Destination warehouse.
    pub to_warehouse_id: WarehouseId,
    /// Quantity moved, positive.
    pub quantity: Decimal,
    /// Free-text note copied to both movements.
    #[serde(default)]
    pub note: Option<String>,
    /// Overrides the configured negative stock policy for this call.
    #[serde(default)]
    pub allow_negative_stock: Option<bool>,
}

/// The two movements a transfer records.
#[derive(Debug, Clone, Serialize)]
pub struct TransferOutcome {
    /// `transfer-out` from the source warehouse.
    pub outgoing: StockMovement,
    /// `transfer-in` to the destination warehouse.
    pub incoming: StockMovement,
}
