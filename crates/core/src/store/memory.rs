//! In-memory storage backend.
//!
//! A single async mutex guards the whole state, so at most one transaction is open at a
//! time. Reads go straight to the guarded state. The first write copies it, and the copy
//! replaces the shared state on commit; dropping the transaction leaves it untouched.
//! Read-only transactions never copy.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::{Mutex, OwnedMutexGuard};

use makhzan_shared::types::{AccountId, DocumentId, ProductId, WarehouseId};

use super::{LedgerStore, StoreError, StoreTransaction};
use crate::account::{Account, Transaction, TransactionFilter};
use crate::catalog::{Product, Warehouse};
use crate::document::{Document, DocumentFilter, DocumentKind};
use crate::stock::{MovementFilter, StockCell, StockLevel, StockMovement};

#[derive(Debug, Clone, Default)]
struct MemoryState {
    products: HashMap<ProductId, Product>,
    warehouses: HashMap<WarehouseId, Warehouse>,
    accounts: HashMap<AccountId, Account>,
    stock_levels: HashMap<StockCell, StockLevel>,
    // append order; listings reverse it
    movements: Vec<StockMovement>,
    transactions: Vec<Transaction>,
    documents: Vec<Document>,
}

/// Storage backend holding everything in process memory.
///
/// Cloning shares the same state. Construct one per test (or per process for development).
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
    fail_next_commit: Arc<AtomicBool>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next commit fail with `StoreError::Commit`, discarding its writes.
    pub fn fail_next_commit(&self) {
        self.fail_next_commit.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl LedgerStore for MemoryStore {
    async fn begin(&self) -> Result<Box<dyn StoreTransaction>, StoreError> {
        let guard = Arc::clone(&self.state).lock_owned().await;
        Ok(Box::new(MemoryTransaction {
            guard,
            working: None,
            fail_commit: Arc::clone(&self.fail_next_commit),
        }))
    }
}

struct MemoryTransaction {
    guard: OwnedMutexGuard<MemoryState>,
    // copied from `guard` on first write
    working: Option<MemoryState>,
    fail_commit: Arc<AtomicBool>,
}

impl MemoryTransaction {
    fn read(&self) -> &MemoryState {
        self.working.as_ref().unwrap_or(&*self.guard)
    }

    fn write(&mut self) -> &mut MemoryState {
        self.working
            .get_or_insert_with(|| MemoryState::clone(&*self.guard))
    }
}

#[async_trait]
impl StoreTransaction for MemoryTransaction {
    async fn product(&mut self, id: ProductId) -> Result<Option<Product>, StoreError> {
        Ok(self.read().products.get(&id).cloned())
    }

    async fn product_by_code(&mut self, code: &str) -> Result<Option<Product>, StoreError> {
        Ok(self
            .read()
            .products
            .values()
            .find(|p| p.code == code)
            .cloned())
    }

    async fn list_products(&mut self) -> Result<Vec<Product>, StoreError> {
        let mut products: Vec<Product> = self.read().products.values().cloned().collect();
        products.sort_by(|a, b| a.code.cmp(&b.code));
        Ok(products)
    }

    async fn insert_product(&mut self, product: &Product) -> Result<(), StoreError> {
        if self.read().products.contains_key(&product.id) {
            return Err(StoreError::conflict(format!("product {} exists", product.id)));
        }
        self.write().products.insert(product.id, product.clone());
        Ok(())
    }

    async fn update_product(&mut self, product: &Product) -> Result<(), StoreError> {
        self.write().products.insert(product.id, product.clone());
        Ok(())
    }

    async fn delete_product(&mut self, id: ProductId) -> Result<(), StoreError> {
        self.write().products.remove(&id);
        Ok(())
    }

    async fn product_is_referenced(&mut self, id: ProductId) -> Result<bool, StoreError> {
        let state = self.read();
        Ok(state.stock_levels.keys().any(|cell| cell.product_id == id)
            || state.movements.iter().any(|m| m.product_id == id)
            || state
                .documents
                .iter()
                .any(|d| d.lines.iter().any(|l| l.product_id == id)))
    }

    async fn warehouse(&mut self, id: WarehouseId) -> Result<Option<Warehouse>, StoreError> {
        Ok(self.read().warehouses.get(&id).cloned())
    }

    async fn list_warehouses(&mut self) -> Result<Vec<Warehouse>, StoreError> {
        let mut warehouses: Vec<Warehouse> = self.read().warehouses.values().cloned().collect();
        warehouses.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(warehouses)
    }

    async fn insert_warehouse(&mut self, warehouse: &Warehouse) -> Result<(), StoreError> {
        self.write().warehouses.insert(warehouse.id, warehouse.clone());
        Ok(())
    }

    async fn update_warehouse(&mut self, warehouse: &Warehouse) -> Result<(), StoreError> {
        self.write().warehouses.insert(warehouse.id, warehouse.clone());
        Ok(())
    }

    async fn account(&mut self, id: AccountId) -> Result<Option<Account>, StoreError> {
        Ok(self.read().accounts.get(&id).cloned())
    }

    async fn lock_account(&mut self, id: AccountId) -> Result<Option<Account>, StoreError> {
        // the mutex guard already makes this transaction the only writer
        Ok(self.read().accounts.get(&id).cloned())
    }

    async fn account_by_code(&mut self, code: &str) -> Result<Option<Account>, StoreError> {
        Ok(self
            .read()
            .accounts
            .values()
            .find(|a| a.code == code)
            .cloned())
    }

    async fn list_accounts(&mut self) -> Result<Vec<Account>, StoreError> {
        let mut accounts: Vec<Account> = self.read().accounts.values().cloned().collect();
        accounts.sort_by(|a, b| a.code.cmp(&b.code));
        Ok(accounts)
    }

    async fn insert_account(&mut self, account: &Account) -> Result<(), StoreError> {
        if self.read().accounts.contains_key(&account.id) {
            return Err(StoreError::conflict(format!("account {} exists", account.id)));
        }
        self.write().accounts.insert(account.id, account.clone());
        Ok(())
    }

    async fn update_account(&mut self, account: &Account) -> Result<(), StoreError> {
        self.write().accounts.insert(account.id, account.clone());
        Ok(())
    }

    async fn insert_transaction(&mut self, transaction: &Transaction) -> Result<(), StoreError> {
        self.write().transactions.push(transaction.clone());
        Ok(())
    }

    async fn list_transactions(
        &mut self,
        filter: &TransactionFilter,
    ) -> Result<Vec<Transaction>, StoreError> {
        Ok(self
            .read()
            .transactions
            .iter()
            .rev()
            .filter(|t| filter.matches(t))
            .cloned()
            .collect())
    }

    async fn stock_level(&mut self, cell: StockCell) -> Result<Option<StockLevel>, StoreError> {
        Ok(self.read().stock_levels.get(&cell).cloned())
    }

    async fn lock_stock_level(&mut self, cell: StockCell) -> Result<StockLevel, StoreError> {
        Ok(self
            .write()
            .stock_levels
            .entry(cell)
            .or_insert_with(|| StockLevel::zero(cell, chrono::Utc::now()))
            .clone())
    }

    async fn save_stock_level(&mut self, level: &StockLevel) -> Result<(), StoreError> {
        self.write().stock_levels.insert(level.cell(), level.clone());
        Ok(())
    }

    async fn insert_movement(&mut self, movement: &StockMovement) -> Result<(), StoreError> {
        self.write().movements.push(movement.clone());
        Ok(())
    }

    async fn list_movements(
        &mut self,
        filter: &MovementFilter,
    ) -> Result<Vec<StockMovement>, StoreError> {
        Ok(self
            .read()
            .movements
            .iter()
            .rev()
            .filter(|m| filter.matches(m))
            .cloned()
            .collect())
    }

    async fn document(&mut self, id: DocumentId) -> Result<Option<Document>, StoreError> {
        Ok(self.read().documents.iter().find(|d| d.id == id).cloned())
    }

    async fn lock_document(&mut self, id: DocumentId) -> Result<Option<Document>, StoreError> {
        Ok(self.read().documents.iter().find(|d| d.id == id).cloned())
    }

    async fn document_number_exists(&mut self, number: &str) -> Result<bool, StoreError> {
        Ok(self
            .read()
            .documents
            .iter()
            .any(|d| d.document_number == number))
    }

    async fn count_documents(&mut self, kind: DocumentKind) -> Result<u64, StoreError> {
        let count = self.read().documents.iter().filter(|d| d.kind == kind).count();
        u64::try_from(count).map_err(|e| StoreError::database(e.to_string()))
    }

    async fn list_documents(
        &mut self,
        filter: &DocumentFilter,
    ) -> Result<Vec<Document>, StoreError> {
        Ok(self
            .read()
            .documents
            .iter()
            .rev()
            .filter(|d| filter.matches(d))
            .cloned()
            .collect())
    }

    async fn insert_document(&mut self, document: &Document) -> Result<(), StoreError> {
        if self
            .read()
            .documents
            .iter()
            .any(|d| d.document_number == document.document_number)
        {
            return Err(StoreError::conflict(format!(
                "document number {} exists",
                document.document_number
            )));
        }
        self.write().documents.push(document.clone());
        Ok(())
    }

    async fn update_document(&mut self, document: &Document) -> Result<(), StoreError> {
        match self.write().documents.iter_mut().find(|d| d.id == document.id) {
            Some(existing) => {
                *existing = document.clone();
                Ok(())
            }
            None => Err(StoreError::database(format!(
                "document {} does not exist",
                document.id
            ))),
        }
    }

    async fn delete_document(&mut self, id: DocumentId) -> Result<(), StoreError> {
        self.write().documents.retain(|d| d.id != id);
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        let Self {
            mut guard,
            working,
            fail_commit,
        } = *self;

        if fail_commit.swap(false, Ordering::SeqCst) {
            return Err(StoreError::Commit("injected commit failure".to_string()));
        }

        if let Some(working) = working {
            *guard = working;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::testing::{seed_product, seed_warehouse};
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn test_dropped_transaction_discards_writes() {
        let store = MemoryStore::new();
        let product = seed_product(&store, "P-1", dec!(5)).await;
        let warehouse = seed_warehouse(&store, "Main").await;
        let cell = StockCell::new(product.id, warehouse.id);

        {
            let mut tx = store.begin().await.unwrap();
            let mut level = tx.lock_stock_level(cell).await.unwrap();
            level.quantity = dec!(99);
            tx.save_stock_level(&level).await.unwrap();
        }

        let mut tx = store.begin().await.unwrap();
        assert!(tx.stock_level(cell).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_committed_transaction_publishes_writes() {
        let store = MemoryStore::new();
        let product = seed_product(&store, "P-1", dec!(5)).await;
        let warehouse = seed_warehouse(&store, "Main").await;
        let cell = StockCell::new(product.id, warehouse.id);

        let mut tx = store.begin().await.unwrap();
        let mut level = tx.lock_stock_level(cell).await.unwrap();
        level.quantity = dec!(4);
        tx.save_stock_level(&level).await.unwrap();
        tx.commit().await.unwrap();

        let mut tx = store.begin().await.unwrap();
        assert_eq!(tx.stock_level(cell).await.unwrap().unwrap().quantity, dec!(4));
    }

    #[tokio::test]
    async fn test_reads_follow_own_writes_and_read_only_commit_keeps_state() {
        let store = MemoryStore::new();
        let warehouse = seed_warehouse(&store, "Main").await;

        let mut tx = store.begin().await.unwrap();
        assert_eq!(tx.list_warehouses().await.unwrap().len(), 1);
        tx.commit().await.unwrap();

        let mut tx = store.begin().await.unwrap();
        assert_eq!(tx.warehouse(warehouse.id).await.unwrap().unwrap().name, "Main");
        let mut renamed = warehouse.clone();
        renamed.name = "Renamed".into();
        tx.update_warehouse(&renamed).await.unwrap();
        assert_eq!(tx.warehouse(warehouse.id).await.unwrap().unwrap().name, "Renamed");
        drop(tx);

        let mut tx = store.begin().await.unwrap();
        assert_eq!(tx.warehouse(warehouse.id).await.unwrap().unwrap().name, "Main");
    }

    #[tokio::test]
    async fn test_injected_commit_failure_discards_writes_once() {
        let store = MemoryStore::new();
        let warehouse = seed_warehouse(&store, "Main").await;
        store.fail_next_commit();

        let mut tx = store.begin().await.unwrap();
        let mut renamed = warehouse.clone();
        renamed.name = "Renamed".into();
        tx.update_warehouse(&renamed).await.unwrap();
        assert!(matches!(tx.commit().await, Err(StoreError::Commit(_))));

        let mut tx = store.begin().await.unwrap();
        assert_eq!(tx.warehouse(warehouse.id).await.unwrap().unwrap().name, "Main");
        tx.update_warehouse(&renamed).await.unwrap();
        tx.commit().await.unwrap();

        let mut tx = store.begin().await.unwrap();
        assert_eq!(tx.warehouse(warehouse.id).await.unwrap().unwrap().name, "Renamed");
    }
}
