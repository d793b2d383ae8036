//! Postgres implementation of the ledger storage traits.
//!
//! One [`SeaOrmStore::begin`] is one database transaction. Row locks come from
//! `SELECT ... FOR UPDATE`; a stock cell touched for the first time is created with
//! `INSERT ... ON CONFLICT DO NOTHING` and then locked like any other row, so two
//! postings racing on a new cell serialize instead of failing. Dropping the transaction
//! without committing rolls it back.

mod convert;

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DatabaseTransaction, DbErr, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, SqlErr, TransactionTrait,
};
use std::collections::HashMap;
use uuid::Uuid;

use makhzan_core::account::{Account, Transaction, TransactionFilter};
use makhzan_core::catalog::{Product, Warehouse};
use makhzan_core::document::{Document, DocumentFilter, DocumentKind};
use makhzan_core::stock::{MovementFilter, StockCell, StockLevel, StockMovement};
use makhzan_core::store::{LedgerStore, StoreError, StoreTransaction};
use makhzan_shared::types::{AccountId, DocumentId, ProductId, WarehouseId};

use crate::entities::{
    accounts, document_lines, documents, products, stock_levels, stock_movements, transactions,
    warehouses,
};

/// Maps a database error to a storage error, flagging lock and uniqueness races as conflicts.
fn db_err(err: DbErr) -> StoreError {
    if let Some(SqlErr::UniqueConstraintViolation(message)) = err.sql_err() {
        return StoreError::conflict(message);
    }
    let message = err.to_string();
    if message.contains("could not serialize access")
        || message.contains("deadlock detected")
        || message.contains("could not obtain lock")
    {
        StoreError::conflict(message)
    } else {
        StoreError::database(message)
    }
}

/// Postgres-backed ledger store.
#[derive(Debug, Clone)]
pub struct SeaOrmStore {
    db: DatabaseConnection,
}

impl SeaOrmStore {
    /// Creates a store over an open connection pool.
    #[must_use]
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// The underlying connection pool.
    #[must_use]
    pub fn connection(&self) -> &DatabaseConnection {
        &self.db
    }
}

#[async_trait]
impl LedgerStore for SeaOrmStore {
    async fn begin(&self) -> Result<Box<dyn StoreTransaction>, StoreError> {
        let txn = self.db.begin().await.map_err(db_err)?;
        Ok(Box::new(SeaOrmTransaction { txn }))
    }
}

struct SeaOrmTransaction {
    txn: DatabaseTransaction,
}

impl SeaOrmTransaction {
    async fn document_lines(
        &self,
        document_id: Uuid,
    ) -> Result<Vec<document_lines::Model>, StoreError> {
        document_lines::Entity::find()
            .filter(document_lines::Column::DocumentId.eq(document_id))
            .order_by_asc(document_lines::Column::LineNo)
            .all(&self.txn)
            .await
            .map_err(db_err)
    }

    async fn load_document(
        &self,
        header: Option<documents::Model>,
    ) -> Result<Option<Document>, StoreError> {
        match header {
            Some(header) => {
                let lines = self.document_lines(header.id).await?;
                convert::document(header, lines).map(Some)
            }
            None => Ok(None),
        }
    }

    async fn insert_lines(&self, document: &Document) -> Result<(), StoreError> {
        let lines = convert::line_models(document)?;
        if lines.is_empty() {
            return Ok(());
        }
        document_lines::Entity::insert_many(lines)
            .exec_without_returning(&self.txn)
            .await
            .map_err(db_err)?;
        Ok(())
    }
}

#[async_trait]
impl StoreTransaction for SeaOrmTransaction {
    // ========== Products ==========

    async fn product(&mut self, id: ProductId) -> Result<Option<Product>, StoreError> {
        let model = products::Entity::find_by_id(id.into_inner())
            .one(&self.txn)
            .await
            .map_err(db_err)?;
        Ok(model.map(convert::product))
    }

    async fn product_by_code(&mut self, code: &str) -> Result<Option<Product>, StoreError> {
        let model = products::Entity::find()
            .filter(products::Column::Code.eq(code))
            .one(&self.txn)
            .await
            .map_err(db_err)?;
        Ok(model.map(convert::product))
    }

    async fn list_products(&mut self) -> Result<Vec<Product>, StoreError> {
        let models = products::Entity::find()
            .order_by_asc(products::Column::Code)
            .all(&self.txn)
            .await
            .map_err(db_err)?;
        Ok(models.into_iter().map(convert::product).collect())
    }

    async fn insert_product(&mut self, product: &Product) -> Result<(), StoreError> {
        convert::product_model(product)
            .insert(&self.txn)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn update_product(&mut self, product: &Product) -> Result<(), StoreError> {
        convert::product_model(product)
            .update(&self.txn)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn delete_product(&mut self, id: ProductId) -> Result<(), StoreError> {
        products::Entity::delete_by_id(id.into_inner())
            .exec(&self.txn)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn product_is_referenced(&mut self, id: ProductId) -> Result<bool, StoreError> {
        let id = id.into_inner();
        let levels = stock_levels::Entity::find()
            .filter(stock_levels::Column::ProductId.eq(id))
            .count(&self.txn)
            .await
            .map_err(db_err)?;
        let movements = stock_movements::Entity::find()
            .filter(stock_movements::Column::ProductId.eq(id))
            .count(&self.txn)
            .await
            .map_err(db_err)?;
        let lines = document_lines::Entity::find()
            .filter(document_lines::Column::ProductId.eq(id))
            .count(&self.txn)
            .await
            .map_err(db_err)?;
        Ok(levels + movements + lines > 0)
    }

    // ========== Warehouses ==========

    async fn warehouse(&mut self, id: WarehouseId) -> Result<Option<Warehouse>, StoreError> {
        let model = warehouses::Entity::find_by_id(id.into_inner())
            .one(&self.txn)
            .await
            .map_err(db_err)?;
        Ok(model.map(convert::warehouse))
    }

    async fn list_warehouses(&mut self) -> Result<Vec<Warehouse>, StoreError> {
        let models = warehouses::Entity::find()
            .order_by_asc(warehouses::Column::Name)
            .all(&self.txn)
            .await
            .map_err(db_err)?;
        Ok(models.into_iter().map(convert::warehouse).collect())
    }

    async fn insert_warehouse(&mut self, warehouse: &Warehouse) -> Result<(), StoreError> {
        convert::warehouse_model(warehouse)
            .insert(&self.txn)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn update_warehouse(&mut self, warehouse: &Warehouse) -> Result<(), StoreError> {
        convert::warehouse_model(warehouse)
            .update(&self.txn)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    // ========== Accounts ==========

    async fn account(&mut self, id: AccountId) -> Result<Option<Account>, StoreError> {
        accounts::Entity::find_by_id(id.into_inner())
            .one(&self.txn)
            .await
            .map_err(db_err)?
            .map(convert::account)
            .transpose()
    }

    async fn lock_account(&mut self, id: AccountId) -> Result<Option<Account>, StoreError> {
        accounts::Entity::find_by_id(id.into_inner())
            .lock_exclusive()
            .one(&self.txn)
            .await
            .map_err(db_err)?
            .map(convert::account)
            .transpose()
    }

    async fn account_by_code(&mut self, code: &str) -> Result<Option<Account>, StoreError> {
        accounts::Entity::find()
            .filter(accounts::Column::Code.eq(code))
            .one(&self.txn)
            .await
            .map_err(db_err)?
            .map(convert::account)
            .transpose()
    }

    async fn list_accounts(&mut self) -> Result<Vec<Account>, StoreError> {
        accounts::Entity::find()
            .order_by_asc(accounts::Column::Code)
            .all(&self.txn)
            .await
            .map_err(db_err)?
            .into_iter()
            .map(convert::account)
            .collect()
    }

    async fn insert_account(&mut self, account: &Account) -> Result<(), StoreError> {
        convert::account_model(account)
            .insert(&self.txn)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn update_account(&mut self, account: &Account) -> Result<(), StoreError> {
        convert::account_model(account)
            .update(&self.txn)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    // ========== Account Transactions ==========

    async fn insert_transaction(&mut self, transaction: &Transaction) -> Result<(), StoreError> {
        transactions::Entity::insert(convert::transaction_model(transaction))
            .exec_without_returning(&self.txn)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn list_transactions(
        &mut self,
        filter: &TransactionFilter,
    ) -> Result<Vec<Transaction>, StoreError> {
        let mut query = transactions::Entity::find();
        if let Some(account_id) = filter.account_id {
            query = query.filter(transactions::Column::AccountId.eq(account_id.into_inner()));
        }
        if let Some(document_id) = filter.document_id {
            query = query.filter(transactions::Column::DocumentId.eq(document_id.into_inner()));
        }
        if let Some(transaction_type) = filter.transaction_type {
            query = query.filter(transactions::Column::TransactionType.eq(transaction_type.as_str()));
        }
        if let Some(from) = filter.date_from {
            query = query.filter(transactions::Column::Date.gte(from));
        }
        if let Some(to) = filter.date_to {
            query = query.filter(transactions::Column::Date.lte(to));
        }

        query
            .order_by_desc(transactions::Column::CreatedAt)
            .order_by_desc(transactions::Column::Id)
            .all(&self.txn)
            .await
            .map_err(db_err)?
            .into_iter()
            .map(convert::transaction)
            .collect()
    }

    // ========== Stock ==========

    async fn stock_level(&mut self, cell: StockCell) -> Result<Option<StockLevel>, StoreError> {
        let model = stock_levels::Entity::find_by_id((
            cell.product_id.into_inner(),
            cell.warehouse_id.into_inner(),
        ))
        .one(&self.txn)
        .await
        .map_err(db_err)?;
        Ok(model.map(convert::stock_level))
    }

    async fn lock_stock_level(&mut self, cell: StockCell) -> Result<StockLevel, StoreError> {
        let zero = StockLevel::zero(cell, Utc::now());
        stock_levels::Entity::insert(convert::stock_level_model(&zero))
            .on_conflict(
                OnConflict::columns([
                    stock_levels::Column::ProductId,
                    stock_levels::Column::WarehouseId,
                ])
                .do_nothing()
                .to_owned(),
            )
            .exec_without_returning(&self.txn)
            .await
            .map_err(db_err)?;

        let model = stock_levels::Entity::find_by_id((
            cell.product_id.into_inner(),
            cell.warehouse_id.into_inner(),
        ))
        .lock_exclusive()
        .one(&self.txn)
        .await
        .map_err(db_err)?
        .ok_or_else(|| StoreError::database(format!("stock level for {cell:?} vanished")))?;
        Ok(convert::stock_level(model))
    }

    async fn save_stock_level(&mut self, level: &StockLevel) -> Result<(), StoreError> {
        convert::stock_level_model(level)
            .update(&self.txn)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn insert_movement(&mut self, movement: &StockMovement) -> Result<(), StoreError> {
        stock_movements::Entity::insert(convert::movement_model(movement))
            .exec_without_returning(&self.txn)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn list_movements(
        &mut self,
        filter: &MovementFilter,
    ) -> Result<Vec<StockMovement>, StoreError> {
        let mut query = stock_movements::Entity::find();
        if let Some(product_id) = filter.product_id {
            query = query.filter(stock_movements::Column::ProductId.eq(product_id.into_inner()));
        }
        if let Some(warehouse_id) = filter.warehouse_id {
            query = query.filter(stock_movements::Column::WarehouseId.eq(warehouse_id.into_inner()));
        }
        if let Some(document_id) = filter.document_id {
            query = query.filter(stock_movements::Column::DocumentId.eq(document_id.into_inner()));
        }

        query
            .order_by_desc(stock_movements::Column::CreatedAt)
            .order_by_desc(stock_movements::Column::Id)
            .all(&self.txn)
            .await
            .map_err(db_err)?
            .into_iter()
            .map(convert::movement)
            .collect()
    }

    // ========== Documents ==========

    async fn document(&mut self, id: DocumentId) -> Result<Option<Document>, StoreError> {
        let header = documents::Entity::find_by_id(id.into_inner())
            .one(&self.txn)
            .await
            .map_err(db_err)?;
        self.load_document(header).await
    }

    async fn lock_document(&mut self, id: DocumentId) -> Result<Option<Document>, StoreError> {
        let header = documents::Entity::find_by_id(id.into_inner())
            .lock_exclusive()
            .one(&self.txn)
            .await
            .map_err(db_err)?;
        self.load_document(header).await
    }

    async fn document_number_exists(&mut self, number: &str) -> Result<bool, StoreError> {
        let count = documents::Entity::find()
            .filter(documents::Column::DocumentNumber.eq(number))
            .count(&self.txn)
            .await
            .map_err(db_err)?;
        Ok(count > 0)
    }

    async fn count_documents(&mut self, kind: DocumentKind) -> Result<u64, StoreError> {
        documents::Entity::find()
            .filter(documents::Column::Kind.eq(kind.as_str()))
            .count(&self.txn)
            .await
            .map_err(db_err)
    }

    async fn list_documents(
        &mut self,
        filter: &DocumentFilter,
    ) -> Result<Vec<Document>, StoreError> {
        let mut query = documents::Entity::find();
        if let Some(kind) = filter.kind {
            query = query.filter(documents::Column::Kind.eq(kind.as_str()));
        }
        if let Some(status) = filter.status {
            query = query.filter(documents::Column::Status.eq(status.as_str()));
        }
        if let Some(account_id) = filter.account_id {
            query = query.filter(documents::Column::AccountId.eq(account_id.into_inner()));
        }
        let headers = query
            .order_by_desc(documents::Column::CreatedAt)
            .order_by_desc(documents::Column::Id)
            .all(&self.txn)
            .await
            .map_err(db_err)?;
        if headers.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<Uuid> = headers.iter().map(|h| h.id).collect();
        let mut lines: HashMap<Uuid, Vec<document_lines::Model>> = HashMap::new();
        for line in document_lines::Entity::find()
            .filter(document_lines::Column::DocumentId.is_in(ids))
            .order_by_asc(document_lines::Column::DocumentId)
            .order_by_asc(document_lines::Column::LineNo)
            .all(&self.txn)
            .await
            .map_err(db_err)?
        {
            lines.entry(line.document_id).or_default().push(line);
        }

        headers
            .into_iter()
            .map(|header| {
                let own = lines.remove(&header.id).unwrap_or_default();
                convert::document(header, own)
            })
            .collect()
    }

    async fn insert_document(&mut self, document: &Document) -> Result<(), StoreError> {
        documents::Entity::insert(convert::document_model(document))
            .exec_without_returning(&self.txn)
            .await
            .map_err(db_err)?;
        self.insert_lines(document).await
    }

    async fn update_document(&mut self, document: &Document) -> Result<(), StoreError> {
        convert::document_model(document)
            .update(&self.txn)
            .await
            .map_err(db_err)?;
        document_lines::Entity::delete_many()
            .filter(document_lines::Column::DocumentId.eq(document.id.into_inner()))
            .exec(&self.txn)
            .await
            .map_err(db_err)?;
        self.insert_lines(document).await
    }

    async fn delete_document(&mut self, id: DocumentId) -> Result<(), StoreError> {
        // lines go with the header (ON DELETE CASCADE)
        documents::Entity::delete_by_id(id.into_inner())
            .exec(&self.txn)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    // ========== Lifecycle ==========

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        self.txn
            .commit()
            .await
            .map_err(|e| StoreError::Commit(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    #[test]
    fn test_lock_contention_is_retryable() {
        let err = DbErr::Custom("deadlock detected".into());
        assert!(db_err(err).is_retryable());

        let err = DbErr::Custom("relation \"products\" does not exist".into());
        assert!(!db_err(err).is_retryable());
    }

    #[test]
    fn test_zero_level_for_new_cell() {
        let cell = StockCell::new(ProductId::new(), WarehouseId::new());
        let level = StockLevel::zero(cell, Utc::now());
        assert_eq!(level.quantity, Decimal::ZERO);
        assert_eq!(level.cell(), cell);
    }
}
