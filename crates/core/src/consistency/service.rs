//! The consistency service: the single entry point in front of both ledgers.
//!
//! Every operation opens one storage transaction, does all of its reads and writes
//! through it, and commits once at the end. Any error returns early, dropping the
//! transaction and with it every write made so far.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use tracing::{info, warn};

use makhzan_shared::types::{AccountId, DocumentId, ProductId, WarehouseId};

use super::types::{PostedDocument, StockAdjustment, StockTransfer, TransferOutcome};
use crate::account::{
    Account, AccountLedger, NewAccount, Transaction, TransactionFilter, TransactionKind,
    TransactionMeta,
};
use crate::amount;
use crate::catalog::{
    MAX_NAME_LEN, NewProduct, NewWarehouse, Product, ProductUpdate, Warehouse, WarehouseUpdate,
    ensure_max_len,
};
use crate::document::{
    Document, DocumentFilter, DocumentKind, DocumentPoster, DocumentStatus, DocumentUpdate,
    MAX_DOCUMENT_NUMBER_LEN, NewDocument, PostingAccounts, PostingOptions, build_lines,
};
use crate::error::LedgerError;
use crate::stock::{
    MovementFilter, MovementKind, MovementSource, StockCell, StockLedger, StockMovement,
};
use crate::store::{LedgerStore, StoreTransaction};

/// Orchestrates the stock ledger, account ledger and document poster over one store.
#[derive(Clone)]
pub struct ConsistencyService {
    store: Arc<dyn LedgerStore>,
    poster: DocumentPoster,
    defaults: PostingOptions,
}

impl std::fmt::Debug for ConsistencyService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConsistencyService")
            .field("poster", &self.poster)
            .field("defaults", &self.defaults)
            .finish_non_exhaustive()
    }
}

impl ConsistencyService {
    /// Creates a service over `store`, posting to `accounts` with `defaults` unless overridden.
    #[must_use]
    pub fn new(
        store: Arc<dyn LedgerStore>,
        accounts: PostingAccounts,
        defaults: PostingOptions,
    ) -> Self {
        Self {
            store,
            poster: DocumentPoster::new(accounts),
            defaults,
        }
    }

    /// The internal accounts postings write to.
    #[must_use]
    pub const fn posting_accounts(&self) -> PostingAccounts {
        self.poster.accounts()
    }

    // ========== Posting ==========

    /// Posts a draft document with the configured options.
    ///
    /// # Errors
    ///
    /// See [`ConsistencyService::post_document_with`].
    pub async fn post_document(&self, id: DocumentId) -> Result<PostedDocument, LedgerError> {
        self.post_document_with(id, self.defaults).await
    }

    /// Posts a draft document: records its stock movements and journal entries and marks it
    /// `posted`, all in one storage transaction.
    ///
    /// # Errors
    ///
    /// - `NotFound` for an unknown document
    /// - `AlreadyPosted` if the document is not a draft
    /// - `InvalidAmount` for a non-positive line quantity
    /// - `InconsistentDocument` for a missing, inactive or mistyped account, warehouse or product
    /// - `InsufficientStock` when a sale would go negative without the override
    /// - `Storage` when the store fails, including the final commit
    ///
    /// On any error no ledger state has changed.
    pub async fn post_document_with(
        &self,
        id: DocumentId,
        options: PostingOptions,
    ) -> Result<PostedDocument, LedgerError> {
        let result = self.try_post(id, options).await;
        match &result {
            Ok(posted) => info!(
                document_id = %id,
                document_number = %posted.document.document_number,
                kind = %posted.document.kind,
                total = %posted.document.total,
                cost_of_goods_sold = %posted.cost_of_goods_sold,
                "Document posted"
            ),
            Err(e) => warn!(document_id = %id, error = %e, "Document posting rejected"),
        }
        result
    }

    async fn try_post(
        &self,
        id: DocumentId,
        options: PostingOptions,
    ) -> Result<PostedDocument, LedgerError> {
        let mut tx = self.store.begin().await?;

        let mut document = tx
            .lock_document(id)
            .await?
            .ok_or_else(|| LedgerError::not_found("document", id))?;
        if document.status != DocumentStatus::Draft {
            return Err(LedgerError::AlreadyPosted {
                id,
                status: document.status,
            });
        }

        let products = Self::validate_for_posting(tx.as_mut(), &document).await?;
        let outcome = self
            .poster
            .post(tx.as_mut(), &document, &products, options)
            .await?;

        let now = Utc::now();
        document.status = DocumentStatus::Posted;
        document.posted_at = Some(now);
        document.updated_at = now;
        tx.update_document(&document).await?;
        tx.commit().await?;

        Ok(PostedDocument::new(document, outcome))
    }

    async fn validate_for_posting(
        tx: &mut dyn StoreTransaction,
        document: &Document,
    ) -> Result<HashMap<ProductId, Product>, LedgerError> {
        if document.lines.is_empty() {
            return Err(LedgerError::inconsistent(document.id, "document has no lines"));
        }

        let account = tx
            .account(document.account_id)
            .await?
            .ok_or_else(|| {
                LedgerError::inconsistent(
                    document.id,
                    format!("account {} does not exist", document.account_id),
                )
            })?;
        if !account.is_active {
            return Err(LedgerError::inconsistent(
                document.id,
                format!("account {} is inactive", account.code),
            ));
        }
        let type_allowed = match document.kind {
            DocumentKind::Sale => account.account_type.can_buy(),
            DocumentKind::Purchase => account.account_type.can_sell(),
        };
        if !type_allowed {
            return Err(LedgerError::inconsistent(
                document.id,
                format!(
                    "a {} account cannot be the counterparty of a {}",
                    account.account_type, document.kind
                ),
            ));
        }

        let warehouse = tx
            .warehouse(document.warehouse_id)
            .await?
            .ok_or_else(|| {
                LedgerError::inconsistent(
                    document.id,
                    format!("warehouse {} does not exist", document.warehouse_id),
                )
            })?;
        if !warehouse.is_active {
            return Err(LedgerError::inconsistent(
                document.id,
                format!("warehouse {} is inactive", warehouse.name),
            ));
        }

        let mut products = HashMap::with_capacity(document.lines.len());
        for line in &document.lines {
            if line.quantity <= Decimal::ZERO {
                return Err(LedgerError::InvalidAmount(format!(
                    "line quantity must be positive, got {}",
                    line.quantity
                )));
            }
            if products.contains_key(&line.product_id) {
                continue;
            }
            let product = tx.product(line.product_id).await?.ok_or_else(|| {
                LedgerError::inconsistent(
                    document.id,
                    format!("line references unknown product {}", line.product_id),
                )
            })?;
            if !product.is_active {
                return Err(LedgerError::inconsistent(
                    document.id,
                    format!("product {} is inactive", product.code),
                ));
            }
            products.insert(product.id, product);
        }
        Ok(products)
    }

    // ========== Read Accessors ==========

    /// Quantity on hand for a product in a warehouse; zero when it has never moved.
    ///
    /// # Errors
    ///
    /// Returns a storage error.
    pub async fn get_stock_level(
        &self,
        product_id: ProductId,
        warehouse_id: WarehouseId,
    ) -> Result<Decimal, LedgerError> {
        let mut tx = self.store.begin().await?;
        StockLedger::get_level(tx.as_mut(), StockCell::new(product_id, warehouse_id)).await
    }

    /// Current balance of an account.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown account, or a storage error.
    pub async fn get_account_balance(&self, account_id: AccountId) -> Result<Decimal, LedgerError> {
        let mut tx = self.store.begin().await?;
        AccountLedger::get_balance(tx.as_mut(), account_id).await
    }

    /// Stock movements matching the filter, newest first.
    ///
    /// # Errors
    ///
    /// Returns a storage error.
    pub async fn list_stock_movements(
        &self,
        filter: &MovementFilter,
    ) -> Result<Vec<StockMovement>, LedgerError> {
        let mut tx = self.store.begin().await?;
        StockLedger::list_movements(tx.as_mut(), filter).await
    }

    /// Account transactions matching the filter, newest first.
    ///
    /// # Errors
    ///
    /// Returns a storage error.
    pub async fn list_transactions(
        &self,
        filter: &TransactionFilter,
    ) -> Result<Vec<Transaction>, LedgerError> {
        let mut tx = self.store.begin().await?;
        AccountLedger::list_transactions(tx.as_mut(), filter).await
    }

    // ========== Products ==========

    /// Creates a product.
    ///
    /// # Errors
    ///
    /// Returns `Duplicate` when the code is taken, or a validation error.
    pub async fn create_product(&self, input: NewProduct) -> Result<Product, LedgerError> {
        let product = input.into_product(Utc::now())?;

        let mut tx = self.store.begin().await?;
        if tx.product_by_code(&product.code).await?.is_some() {
            return Err(LedgerError::Duplicate {
                entity: "product code",
                value: product.code,
            });
        }
        tx.insert_product(&product).await?;
        tx.commit().await?;

        info!(product_id = %product.id, code = %product.code, "Product created");
        Ok(product)
    }

    /// Edits a product's name, unit, prices or active flag.
    ///
    /// Price changes affect only documents posted afterwards.
    ///
    /// # Errors
    ///
    /// Returns `NotFound`, or a validation error.
    pub async fn update_product(
        &self,
        id: ProductId,
        update: ProductUpdate,
    ) -> Result<Product, LedgerError> {
        let mut tx = self.store.begin().await?;
        let mut product = tx
            .product(id)
            .await?
            .ok_or_else(|| LedgerError::not_found("product", id))?;
        product.apply(update, Utc::now())?;
        tx.update_product(&product).await?;
        tx.commit().await?;

        info!(product_id = %id, "Product updated");
        Ok(product)
    }

    /// Deletes a product nothing references.
    ///
    /// # Errors
    ///
    /// Returns `NotFound`, or `ProductInUse` when any stock level, movement or document
    /// line references it.
    pub async fn delete_product(&self, id: ProductId) -> Result<(), LedgerError> {
        let mut tx = self.store.begin().await?;
        if tx.product(id).await?.is_none() {
            return Err(LedgerError::not_found("product", id));
        }
        if tx.product_is_referenced(id).await? {
            return Err(LedgerError::ProductInUse(id));
        }
        tx.delete_product(id).await?;
        tx.commit().await?;

        info!(product_id = %id, "Product deleted");
        Ok(())
    }

    /// Fetches a product.
    ///
    /// # Errors
    ///
    /// Returns `NotFound`, or a storage error.
    pub async fn get_product(&self, id: ProductId) -> Result<Product, LedgerError> {
        let mut tx = self.store.begin().await?;
        tx.product(id)
            .await?
            .ok_or_else(|| LedgerError::not_found("product", id))
    }

    /// Lists products by code.
    ///
    /// # Errors
    ///
    /// Returns a storage error.
    pub async fn list_products(&self) -> Result<Vec<Product>, LedgerError> {
        let mut tx = self.store.begin().await?;
        Ok(tx.list_products().await?)
    }

    // ========== Warehouses ==========

    /// Creates a warehouse. The first warehouse always becomes the default.
    ///
    /// # Errors
    ///
    /// Returns `Validation` for a blank or overlong name, or a storage error.
    pub async fn create_warehouse(&self, input: NewWarehouse) -> Result<Warehouse, LedgerError> {
        if input.name.trim().is_empty() {
            return Err(LedgerError::Validation("warehouse name is required".into()));
        }
        ensure_max_len("warehouse name", input.name.trim(), MAX_NAME_LEN)?;

        let mut tx = self.store.begin().await?;
        let existing = tx.list_warehouses().await?;
        let warehouse = Warehouse {
            id: WarehouseId::new(),
            name: input.name.trim().to_string(),
            is_default: input.is_default || existing.is_empty(),
            is_active: true,
            created_at: Utc::now(),
        };
        if warehouse.is_default {
            Self::clear_default(tx.as_mut(), existing).await?;
        }
        tx.insert_warehouse(&warehouse).await?;
        tx.commit().await?;

        info!(warehouse_id = %warehouse.id, is_default = warehouse.is_default, "Warehouse created");
        Ok(warehouse)
    }

    /// Makes a warehouse the default, clearing the flag on every other one.
    ///
    /// # Errors
    ///
    /// Returns `NotFound`, or `Validation` for an inactive warehouse.
    pub async fn set_default_warehouse(&self, id: WarehouseId) -> Result<Warehouse, LedgerError> {
        let mut tx = self.store.begin().await?;
        let mut warehouse = tx
            .warehouse(id)
            .await?
            .ok_or_else(|| LedgerError::not_found("warehouse", id))?;
        if !warehouse.is_active {
            return Err(LedgerError::Validation(
                "an inactive warehouse cannot be the default".into(),
            ));
        }

        let others = tx
            .list_warehouses()
            .await?
            .into_iter()
            .filter(|w| w.id != id)
            .collect();
        Self::clear_default(tx.as_mut(), others).await?;
        warehouse.is_default = true;
        tx.update_warehouse(&warehouse).await?;
        tx.commit().await?;

        info!(warehouse_id = %id, "Default warehouse changed");
        Ok(warehouse)
    }

    /// Renames or (de)activates a warehouse.
    ///
    /// # Errors
    ///
    /// Returns `NotFound`, or `Validation` for a blank or overlong name or for deactivating
    /// the default.
    pub async fn update_warehouse(
        &self,
        id: WarehouseId,
        update: WarehouseUpdate,
    ) -> Result<Warehouse, LedgerError> {
        let mut tx = self.store.begin().await?;
        let mut warehouse = tx
            .warehouse(id)
            .await?
            .ok_or_else(|| LedgerError::not_found("warehouse", id))?;

        if let Some(name) = update.name {
            if name.trim().is_empty() {
                return Err(LedgerError::Validation("warehouse name is required".into()));
            }
            ensure_max_len("warehouse name", name.trim(), MAX_NAME_LEN)?;
            warehouse.name = name.trim().to_string();
        }
        if let Some(is_active) = update.is_active {
            if !is_active && warehouse.is_default {
                return Err(LedgerError::Validation(
                    "the default warehouse cannot be deactivated".into(),
                ));
            }
            warehouse.is_active = is_active;
        }
        tx.update_warehouse(&warehouse).await?;
        tx.commit().await?;

        info!(warehouse_id = %id, "Warehouse updated");
        Ok(warehouse)
    }

    /// Fetches a warehouse.
    ///
    /// # Errors
    ///
    /// Returns `NotFound`, or a storage error.
    pub async fn get_warehouse(&self, id: WarehouseId) -> Result<Warehouse, LedgerError> {
        let mut tx = self.store.begin().await?;
        tx.warehouse(id)
            .await?
            .ok_or_else(|| LedgerError::not_found("warehouse", id))
    }

    /// Lists warehouses by name.
    ///
    /// # Errors
    ///
    /// Returns a storage error.
    pub async fn list_warehouses(&self) -> Result<Vec<Warehouse>, LedgerError> {
        let mut tx = self.store.begin().await?;
        Ok(tx.list_warehouses().await?)
    }

    async fn clear_default(
        tx: &mut dyn StoreTransaction,
        warehouses: Vec<Warehouse>,
    ) -> Result<(), LedgerError> {
        for mut other in warehouses.into_iter().filter(|w| w.is_default) {
            other.is_default = false;
            tx.update_warehouse(&other).await?;
        }
        Ok(())
    }

    // ========== Accounts ==========

    /// Creates an account with a zero balance.
    ///
    /// # Errors
    ///
    /// Returns `Duplicate` when the code is taken, or a validation error.
    pub async fn create_account(&self, input: NewAccount) -> Result<Account, LedgerError> {
        let account = input.into_account(Utc::now())?;

        let mut tx = self.store.begin().await?;
        if tx.account_by_code(&account.code).await?.is_some() {
            return Err(LedgerError::Duplicate {
                entity: "account code",
                value: account.code,
            });
        }
        tx.insert_account(&account).await?;
        tx.commit().await?;

        info!(account_id = %account.id, code = %account.code, account_type = %account.account_type, "Account created");
        Ok(account)
    }

    /// Fetches an account.
    ///
    /// # Errors
    ///
    /// Returns `NotFound`, or a storage error.
    pub async fn get_account(&self, id: AccountId) -> Result<Account, LedgerError> {
        let mut tx = self.store.begin().await?;
        tx.account(id)
            .await?
            .ok_or_else(|| LedgerError::not_found("account", id))
    }

    /// Lists accounts by code.
    ///
    /// # Errors
    ///
    /// Returns a storage error.
    pub async fn list_accounts(&self) -> Result<Vec<Account>, LedgerError> {
        let mut tx = self.store.begin().await?;
        Ok(tx.list_accounts().await?)
    }

    /// Records a cash receipt, payment or manual journal entry against one account.
    ///
    /// # Errors
    ///
    /// Returns `InvalidAmount` for a non-positive or unstorable amount or a balance out of
    /// range, `NotFound` for an unknown account, `Validation` for an inactive one or an
    /// overlong reference, or a storage error.
    pub async fn record_transaction(
        &self,
        account_id: AccountId,
        kind: TransactionKind,
        amount: Decimal,
        mut meta: TransactionMeta,
    ) -> Result<Transaction, LedgerError> {
        let mut tx = self.store.begin().await?;
        let account = tx
            .account(account_id)
            .await?
            .ok_or_else(|| LedgerError::not_found("account", account_id))?;
        if !account.is_active {
            return Err(LedgerError::Validation(format!(
                "account {} is inactive",
                account.code
            )));
        }

        meta.document_id = None;
        let transaction =
            AccountLedger::apply_transaction(tx.as_mut(), account_id, kind, amount, meta).await?;
        tx.commit().await?;

        info!(
            account_id = %account_id,
            transaction_id = %transaction.id,
            transaction_type = %transaction.transaction_type,
            amount = %amount,
            "Transaction recorded"
        );
        Ok(transaction)
    }

    // ========== Documents ==========

    /// Creates a draft document. No ledger is touched until it is posted.
    ///
    /// # Errors
    ///
    /// - `InvalidAmount` for a non-positive quantity or negative price
    /// - `NotFound` for an unknown account, warehouse or product
    /// - `Validation` when no warehouse is given and none is the default
    /// - `Validation` for a document number longer than its column
    /// - `Duplicate` for a document number already in use
    pub async fn create_document(&self, input: NewDocument) -> Result<Document, LedgerError> {
        let (lines, total) = build_lines(input.lines)?;

        let mut tx = self.store.begin().await?;
        let warehouse_id = match input.warehouse_id {
            Some(id) => id,
            None => tx
                .list_warehouses()
                .await?
                .into_iter()
                .find(|w| w.is_default)
                .map(|w| w.id)
                .ok_or_else(|| {
                    LedgerError::Validation("no warehouse given and no default warehouse set".into())
                })?,
        };

        let now = Utc::now();
        let mut document = Document {
            id: DocumentId::new(),
            document_number: String::new(),
            kind: input.kind,
            account_id: input.account_id,
            warehouse_id,
            date: input.date,
            status: DocumentStatus::Draft,
            lines,
            total,
            notes: input.notes,
            posted_at: None,
            created_at: now,
            updated_at: now,
        };
        Self::check_references(tx.as_mut(), &document).await?;
        document.document_number =
            Self::assign_number(tx.as_mut(), input.kind, input.document_number).await?;

        tx.insert_document(&document).await?;
        tx.commit().await?;

        info!(
            document_id = %document.id,
            document_number = %document.document_number,
            kind = %document.kind,
            total = %document.total,
            "Draft document created"
        );
        Ok(document)
    }

    /// Edits a draft document.
    ///
    /// # Errors
    ///
    /// Returns `NotFound`, `DocumentNotEditable` for posted or cancelled documents, or the
    /// same validation errors as creation.
    pub async fn update_document(
        &self,
        id: DocumentId,
        update: DocumentUpdate,
    ) -> Result<Document, LedgerError> {
        let mut tx = self.store.begin().await?;
        let mut document = tx
            .lock_document(id)
            .await?
            .ok_or_else(|| LedgerError::not_found("document", id))?;
        document.apply(update, Utc::now())?;
        Self::check_references(tx.as_mut(), &document).await?;
        tx.update_document(&document).await?;
        tx.commit().await?;

        info!(document_id = %id, total = %document.total, "Draft document updated");
        Ok(document)
    }

    /// Deletes a draft document.
    ///
    /// # Errors
    ///
    /// Returns `NotFound`, or `DocumentNotEditable` for posted or cancelled documents.
    pub async fn delete_document(&self, id: DocumentId) -> Result<(), LedgerError> {
        let mut tx = self.store.begin().await?;
        let document = tx
            .lock_document(id)
            .await?
            .ok_or_else(|| LedgerError::not_found("document", id))?;
        document.ensure_editable()?;
        tx.delete_document(id).await?;
        tx.commit().await?;

        info!(document_id = %id, "Draft document deleted");
        Ok(())
    }

    /// Fetches a document with its lines.
    ///
    /// # Errors
    ///
    /// Returns `NotFound`, or a storage error.
    pub async fn get_document(&self, id: DocumentId) -> Result<Document, LedgerError> {
        let mut tx = self.store.begin().await?;
        tx.document(id)
            .await?
            .ok_or_else(|| LedgerError::not_found("document", id))
    }

    /// Lists documents matching the filter, newest first.
    ///
    /// # Errors
    ///
    /// Returns a storage error.
    pub async fn list_documents(&self, filter: &DocumentFilter) -> Result<Vec<Document>, LedgerError> {
        let mut tx = self.store.begin().await?;
        Ok(tx.list_documents(filter).await?)
    }

    async fn check_references(
        tx: &mut dyn StoreTransaction,
        document: &Document,
    ) -> Result<(), LedgerError> {
        if tx.account(document.account_id).await?.is_none() {
            return Err(LedgerError::not_found("account", document.account_id));
        }
        if tx.warehouse(document.warehouse_id).await?.is_none() {
            return Err(LedgerError::not_found("warehouse", document.warehouse_id));
        }
        for line in &document.lines {
            if tx.product(line.product_id).await?.is_none() {
                return Err(LedgerError::not_found("product", line.product_id));
            }
        }
        Ok(())
    }

    async fn assign_number(
        tx: &mut dyn StoreTransaction,
        kind: DocumentKind,
        requested: Option<String>,
    ) -> Result<String, LedgerError> {
        if let Some(number) = requested.map(|n| n.trim().to_string()).filter(|n| !n.is_empty()) {
            ensure_max_len("document number", &number, MAX_DOCUMENT_NUMBER_LEN)?;
            if tx.document_number_exists(&number).await? {
                return Err(LedgerError::Duplicate {
                    entity: "document number",
                    value: number,
                });
            }
            return Ok(number);
        }

        let mut sequence = tx.count_documents(kind).await? + 1;
        loop {
            let candidate = format!("{}{sequence}", kind.number_prefix());
            if !tx.document_number_exists(&candidate).await? {
                return Ok(candidate);
            }
            sequence += 1;
        }
    }

    // ========== Stock Operations ==========

    /// Forces a stock level to a counted quantity, logging the difference as an adjustment.
    ///
    /// # Errors
    ///
    /// Returns `InvalidAmount` for a negative or unstorable count, `NotFound` for an unknown
    /// product or warehouse, or a storage error.
    pub async fn adjust_stock(&self, input: StockAdjustment) -> Result<StockMovement, LedgerError> {
        if input.counted_quantity < Decimal::ZERO {
            return Err(LedgerError::InvalidAmount(format!(
                "counted quantity cannot be negative, got {}",
                input.counted_quantity
            )));
        }
        amount::ensure_storable("counted quantity", input.counted_quantity)?;

        let mut tx = self.store.begin().await?;
        let source = MovementSource {
            document: None,
            note: input.note,
        };
        let movement = StockLedger::set_absolute(
            tx.as_mut(),
            StockCell::new(input.product_id, input.warehouse_id),
            input.counted_quantity,
            MovementKind::Adjustment,
            source,
        )
        .await?;
        tx.commit().await?;

        info!(
            product_id = %input.product_id,
            warehouse_id = %input.warehouse_id,
            delta = %movement.delta,
            quantity_after = %movement.quantity_after,
            "Stock adjusted"
        );
        Ok(movement)
    }

    /// Moves stock between two warehouses as a `transfer-out`/`transfer-in` pair.
    ///
    /// # Errors
    ///
    /// - `InvalidAmount` for a non-positive or unstorable quantity, or a level out of range
    /// - `Validation` when source and destination are the same
    /// - `NotFound` for an unknown product or warehouse
    /// - `InsufficientStock` when the source would go negative without the override
    pub async fn transfer_stock(&self, input: StockTransfer) -> Result<TransferOutcome, LedgerError> {
        if input.quantity <= Decimal::ZERO {
            return Err(LedgerError::InvalidAmount(format!(
                "transfer quantity must be positive, got {}",
                input.quantity
            )));
        }
        amount::ensure_storable("transfer quantity", input.quantity)?;
        if input.from_warehouse_id == input.to_warehouse_id {
            return Err(LedgerError::Validation(
                "source and destination warehouses must differ".into(),
            ));
        }
        let allow_negative = input
            .allow_negative_stock
            .unwrap_or(self.defaults.allow_negative_stock);

        let from = StockCell::new(input.product_id, input.from_warehouse_id);
        let to = StockCell::new(input.product_id, input.to_warehouse_id);

        let mut tx = self.store.begin().await?;
        for warehouse_id in [input.from_warehouse_id, input.to_warehouse_id] {
            if tx.warehouse(warehouse_id).await?.is_none() {
                return Err(LedgerError::not_found("warehouse", warehouse_id));
            }
        }
        if tx.product(input.product_id).await?.is_none() {
            return Err(LedgerError::not_found("product", input.product_id));
        }
        let (first, second) = if from < to { (from, to) } else { (to, from) };
        tx.lock_stock_level(first).await?;
        tx.lock_stock_level(second).await?;

        let outgoing = StockLedger::apply_movement(
            tx.as_mut(),
            from,
            -input.quantity,
            MovementKind::TransferOut,
            MovementSource {
                document: None,
                note: input.note.clone(),
            },
        )
        .await?;
        if outgoing.quantity_after < Decimal::ZERO && !allow_negative {
            return Err(LedgerError::InsufficientStock {
                product_id: input.product_id,
                warehouse_id: input.from_warehouse_id,
                available: outgoing.quantity_after - outgoing.delta,
                requested: input.quantity,
            });
        }
        let incoming = StockLedger::apply_movement(
            tx.as_mut(),
            to,
            input.quantity,
            MovementKind::TransferIn,
            MovementSource {
                document: None,
                note: input.note,
            },
        )
        .await?;
        tx.commit().await?;

        info!(
            product_id = %input.product_id,
            from = %input.from_warehouse_id,
            to = %input.to_warehouse_id,
            quantity = %input.quantity,
            "Stock transferred"
        );
        Ok(TransferOutcome { outgoing, incoming })
    }
}
