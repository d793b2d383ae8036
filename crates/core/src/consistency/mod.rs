//! Consistency service: all-or-nothing operations over the stock and account ledgers.

pub mod service;
pub mod types;

#[cfg(test)]
mod fixture;
#[cfg(test)]
mod service_props;

pub use service::ConsistencyService;
pub use types::{PostedDocument, StockAdjustment, StockTransfer, TransferOutcome};
