//! `SeaORM` entity definitions, one module per table.

pub mod accounts;
pub mod document_lines;
pub mod documents;
pub mod products;
pub mod stock_levels;
pub mod stock_movements;
pub mod transactions;
pub mod warehouses;
