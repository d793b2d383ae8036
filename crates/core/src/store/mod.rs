//! Storage provider abstraction.
//!
//! The consistency service talks to storage only through these traits, never branching on
//! which backend it runs against. Two implementations exist:
//!
//! - [`MemoryStore`] in this crate, for tests and local development
//! - `SeaOrmStore` in `makhzan-db`, backed by Postgres
//!
//! # Transaction contract
//!
//! ```text
//! LedgerStore::begin() ──► StoreTransaction ──► commit()   publishes every write
//!                                    │
//!                                    └──────► drop          discards every write
//! ```
//!
//! `lock_*` methods take a row lock (or its equivalent) held until commit or drop, so two
//! transactions touching the same account or stock cell serialize.

mod error;
mod memory;

#[cfg(test)]
pub(crate) mod testing;

use async_trait::async_trait;

use makhzan_shared::types::{AccountId, DocumentId, ProductId, WarehouseId};

use crate::account::{Account, Transaction, TransactionFilter};
use crate::catalog::{Product, Warehouse};
use crate::document::{Document, DocumentFilter, DocumentKind};
use crate::stock::{MovementFilter, StockCell, StockLevel, StockMovement};

pub use error::StoreError;
pub use memory::MemoryStore;

/// A storage backend that hands out transactions.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Starts a new transaction.
    async fn begin(&self) -> Result<Box<dyn StoreTransaction>, StoreError>;
}

/// One unit of work against the backing store.
///
/// Reads see the transaction's own writes. Nothing is visible to other transactions until
/// [`StoreTransaction::commit`] succeeds; dropping the value rolls everything back.
#[async_trait]
pub trait StoreTransaction: Send {
    // ========== Products ==========
    /// Fetches a product.
    async fn product(&mut self, id: ProductId) -> Result<Option<Product>, StoreError>;
    /// Fetches a product by its code.
    async fn product_by_code(&mut self, code: &str) -> Result<Option<Product>, StoreError>;
    /// Lists products ordered by code.
    async fn list_products(&mut self) -> Result<Vec<Product>, StoreError>;
    /// Inserts a product.
    async fn insert_product(&mut self, product: &Product) -> Result<(), StoreError>;
    /// Overwrites a product.
    async fn update_product(&mut self, product: &Product) -> Result<(), StoreError>;
    /// Deletes a product.
    async fn delete_product(&mut self, id: ProductId) -> Result<(), StoreError>;
    /// Returns true if any stock level, movement, or document line references the product.
    async fn product_is_referenced(&mut self, id: ProductId) -> Result<bool, StoreError>;

    // ========== Warehouses ==========
    /// Fetches a warehouse.
    async fn warehouse(&mut self, id: WarehouseId) -> Result<Option<Warehouse>, StoreError>;
    /// Lists warehouses ordered by name.
    async fn list_warehouses(&mut self) -> Result<Vec<Warehouse>, StoreError>;
    /// Inserts a warehouse.
    async fn insert_warehouse(&mut self, warehouse: &Warehouse) -> Result<(), StoreError>;
    /// Overwrites a warehouse.
    async fn update_warehouse(&mut self, warehouse: &Warehouse) -> Result<(), StoreError>;

    // ========== Accounts ==========
    /// Fetches an account without locking it.
    async fn account(&mut self, id: AccountId) -> Result<Option<Account>, StoreError>;
    /// Fetches an account and locks it until the transaction ends.
    async fn lock_account(&mut self, id: AccountId) -> Result<Option<Account>, StoreError>;
    /// Fetches an account by its code.
    async fn account_by_code(&mut self, code: &str) -> Result<Option<Account>, StoreError>;
    /// Lists accounts ordered by code.
    async fn list_accounts(&mut self) -> Result<Vec<Account>, StoreError>;
    /// Inserts an account.
    async fn insert_account(&mut self, account: &Account) -> Result<(), StoreError>;
    /// Overwrites an account (balance included).
    async fn update_account(&mut self, account: &Account) -> Result<(), StoreError>;

    // ========== Account Transactions ==========
    /// Appends a transaction.
    async fn insert_transaction(&mut self, transaction: &Transaction) -> Result<(), StoreError>;
    /// Lists transactions matching the filter, newest first.
    async fn list_transactions(
        &mut self,
        filter: &TransactionFilter,
    ) -> Result<Vec<Transaction>, StoreError>;

    // ========== Stock ==========
    /// Fetches a stock level without locking it.
    async fn stock_level(&mut self, cell: StockCell) -> Result<Option<StockLevel>, StoreError>;
    /// Locks a stock level, creating it at zero when the cell has no row yet.
    async fn lock_stock_level(&mut self, cell: StockCell) -> Result<StockLevel, StoreError>;
    /// Writes a stock level's quantity.
    async fn save_stock_level(&mut self, level: &StockLevel) -> Result<(), StoreError>;
    /// Appends a stock movement.
    async fn insert_movement(&mut self, movement: &StockMovement) -> Result<(), StoreError>;
    /// Lists movements matching the filter, newest first.
    async fn list_movements(
        &mut self,
        filter: &MovementFilter,
    ) -> Result<Vec<StockMovement>, StoreError>;

    // ========== Documents ==========
    /// Fetches a document with its lines, without locking.
    async fn document(&mut self, id: DocumentId) -> Result<Option<Document>, StoreError>;
    /// Fetches a document with its lines and locks its header row.
    async fn lock_document(&mut self, id: DocumentId) -> Result<Option<Document>, StoreError>;
    /// Returns true if a document with this number exists.
    async fn document_number_exists(&mut self, number: &str) -> Result<bool, StoreError>;
    /// Counts documents of one kind, used to propose the next number.
    async fn count_documents(&mut self, kind: DocumentKind) -> Result<u64, StoreError>;
    /// Lists documents matching the filter, newest first.
    async fn list_documents(
        &mut self,
        filter: &DocumentFilter,
    ) -> Result<Vec<Document>, StoreError>;
    /// Inserts a document and its lines.
    async fn insert_document(&mut self, document: &Document) -> Result<(), StoreError>;
    /// Overwrites a document header and replaces its lines.
    async fn update_document(&mut self, document: &Document) -> Result<(), StoreError>;
    /// Deletes a document and its lines.
    async fn delete_document(&mut self, id: DocumentId) -> Result<(), StoreError>;

    // ========== Lifecycle ==========
    /// Publishes every write made through this transaction.
    async fn commit(self: Box<Self>) -> Result<(), StoreError>;
}
