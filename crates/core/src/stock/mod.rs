//! Stock tracking.
//!
//! - Stock levels keyed by (product, warehouse)
//! - The append-only movement log
//! - The stock ledger that keeps the two in step

pub mod ledger;
pub mod types;

pub use ledger::StockLedger;
pub use types::{
    DocumentRef, MovementFilter, MovementKind, MovementSource, StockCell, StockLevel,
    StockMovement,
};
