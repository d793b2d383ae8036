//! Core business logic for Makhzan.
//!
//! This crate keeps stock quantities, account balances and journal entries consistent
//! when sales and purchase documents are posted. It has no web or database dependencies;
//! persistence goes through the [`store`] traits.
//!
//! # Modules
//!
//! - `stock` - Per-(product, warehouse) quantities and the movement log
//! - `account` - Running balances and the transaction log
//! - `document` - Sales/purchase documents and the posting policy
//! - `consistency` - The all-or-nothing service callers use
//! - `catalog` - Products and warehouses
//! - `amount` - Storage bounds and checked arithmetic for decimals
//! - `store` - Storage traits and the in-memory backend

pub mod account;
pub mod amount;
pub mod catalog;
pub mod consistency;
pub mod document;
pub mod error;
pub mod stock;
pub mod store;

pub use consistency::ConsistencyService;
pub use error::LedgerError;
