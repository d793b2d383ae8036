//! Document poster: turns one draft document into stock movements and journal entries.
//!
//! # Accounting policy
//!
//! ```text
//! Purchase (total T)             Sale (total T, cost of goods sold C)
//!   stock   +qty per line          stock   -qty per line
//!   Dr Inventory        T          Dr Customer          T
//!   Cr Supplier         T          Cr Sales Revenue     T
//!                                  Dr Cost of Goods     C
//!                                  Cr Inventory         C
//! ```
//!
//! Counterparty balances move only through these journal entries. A debit/credit pair
//! whose amount is zero is left out.

use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use makhzan_shared::types::{AccountId, ProductId};

use super::types::{Document, DocumentKind};
use crate::account::{AccountLedger, Transaction, TransactionKind, TransactionMeta};
use crate::amount;
use crate::catalog::Product;
use crate::error::LedgerError;
use crate::stock::{DocumentRef, MovementSource, StockCell, StockLedger, StockMovement};
use crate::store::StoreTransaction;

/// Internal accounts every posting writes to besides the counterparty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostingAccounts {
    /// Inventory asset account.
    pub inventory: AccountId,
    /// Sales revenue account.
    pub sales_revenue: AccountId,
    /// Cost of goods sold expense account.
    pub cost_of_goods_sold: AccountId,
}

/// Per-call posting switches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostingOptions {
    /// Let a sale drive stock below zero instead of failing with `InsufficientStock`.
    #[serde(default)]
    pub allow_negative_stock: bool,
}

/// One journal entry the poster intends to record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlannedEntry {
    /// Account to post to.
    pub account_id: AccountId,
    /// Debit side when true.
    pub is_debit: bool,
    /// Positive amount.
    pub amount: Decimal,
    /// Short description stored in the transaction notes.
    pub memo: &'static str,
}

/// Debit and credit sums of a posting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalTotals {
    /// Sum of debit entries.
    pub debit: Decimal,
    /// Sum of credit entries.
    pub credit: Decimal,
    /// Whether debits equal credits.
    pub is_balanced: bool,
}

impl JournalTotals {
    /// Creates totals from debit and credit sums.
    #[must_use]
    pub fn new(debit: Decimal, credit: Decimal) -> Self {
        Self {
            debit,
            credit,
            is_balanced: debit == credit,
        }
    }

    /// Sums planned entries by side.
    #[must_use]
    pub fn from_entries(entries: &[PlannedEntry]) -> Self {
        let (debit, credit) = entries.iter().fold(
            (Decimal::ZERO, Decimal::ZERO),
            |(debit, credit), entry| {
                if entry.is_debit {
                    (debit + entry.amount, credit)
                } else {
                    (debit, credit + entry.amount)
                }
            },
        );
        Self::new(debit, credit)
    }

    /// Debits minus credits.
    #[must_use]
    pub fn difference(&self) -> Decimal {
        self.debit - self.credit
    }
}

/// Everything one posting recorded.
#[derive(Debug, Clone, Serialize)]
pub struct PostingOutcome {
    /// Stock movements, one per line, in line order.
    pub movements: Vec<StockMovement>,
    /// Journal entries in policy order.
    pub entries: Vec<Transaction>,
    /// Debit and credit sums of `entries`.
    pub totals: JournalTotals,
    /// Cost of goods sold; zero for purchases.
    pub cost_of_goods_sold: Decimal,
}

/// Applies the fixed accounting policy to documents.
#[derive(Debug, Clone)]
pub struct DocumentPoster {
    accounts: PostingAccounts,
}

impl DocumentPoster {
    /// Creates a poster writing to the given internal accounts.
    #[must_use]
    pub const fn new(accounts: PostingAccounts) -> Self {
        Self { accounts }
    }

    /// The internal accounts this poster writes to.
    #[must_use]
    pub const fn accounts(&self) -> PostingAccounts {
        self.accounts
    }

    /// Cost of goods sold for a sale at each product's current cost price.
    ///
    /// # Errors
    ///
    /// Returns `InconsistentDocument` if a line's product is missing from `products`, or
    /// `InvalidAmount` when the cost does not fit a stored column.
    pub fn cost_of_goods_sold(
        document: &Document,
        products: &HashMap<ProductId, Product>,
    ) -> Result<Decimal, LedgerError> {
        if document.kind == DocumentKind::Purchase {
            return Ok(Decimal::ZERO);
        }
        document.lines.iter().try_fold(Decimal::ZERO, |cogs, line| {
            let product = products.get(&line.product_id).ok_or_else(|| {
                LedgerError::inconsistent(
                    document.id,
                    format!("line references unknown product {}", line.product_id),
                )
            })?;
            let line_cost =
                amount::mul("cost of goods sold", product.cost_price, line.quantity)?;
            amount::add("cost of goods sold", cogs, line_cost)
        })
    }

    /// Journal entries for a document, in policy order, zero-amount pairs left out.
    #[must_use]
    pub fn plan_journal(&self, document: &Document, cost_of_goods_sold: Decimal) -> Vec<PlannedEntry> {
        let mut entries = Vec::with_capacity(4);
        let mut pair = |debit: AccountId, credit: AccountId, amount: Decimal, memo: &'static str| {
            if amount > Decimal::ZERO {
                entries.push(PlannedEntry {
                    account_id: debit,
                    is_debit: true,
                    amount,
                    memo,
                });
                entries.push(PlannedEntry {
                    account_id: credit,
                    is_debit: false,
                    amount,
                    memo,
                });
            }
        };

        match document.kind {
            DocumentKind::Purchase => {
                pair(
                    self.accounts.inventory,
                    document.account_id,
                    document.total,
                    "inventory received",
                );
            }
            DocumentKind::Sale => {
                pair(
                    document.account_id,
                    self.accounts.sales_revenue,
                    document.total,
                    "sale",
                );
                pair(
                    self.accounts.cost_of_goods_sold,
                    self.accounts.inventory,
                    cost_of_goods_sold,
                    "cost of goods sold",
                );
            }
        }
        entries
    }

    /// Records the stock movements and journal entries of `document` inside `tx`.
    ///
    /// Account rows are locked in id order and stock cells in (product, warehouse) order
    /// before anything is written. The caller owns the transaction; on error it must be
    /// dropped, which discards whatever this call wrote.
    ///
    /// # Errors
    ///
    /// - `InsufficientStock` when a sale would go negative without the override
    /// - `InconsistentDocument` when a product is missing from `products`
    /// - `NotFound` when a posting account does not exist
    /// - ledger or storage errors
    pub async fn post(
        &self,
        tx: &mut dyn StoreTransaction,
        document: &Document,
        products: &HashMap<ProductId, Product>,
        options: PostingOptions,
    ) -> Result<PostingOutcome, LedgerError> {
        let cost_of_goods_sold = Self::cost_of_goods_sold(document, products)?;
        let plan = self.plan_journal(document, cost_of_goods_sold);
        let totals = JournalTotals::from_entries(&plan);
        if !totals.is_balanced {
            return Err(LedgerError::inconsistent(
                document.id,
                format!("journal does not balance: difference {}", totals.difference()),
            ));
        }

        Self::lock_rows(tx, document, &plan).await?;

        let reference = DocumentRef {
            document_id: document.id,
            kind: document.kind,
        };
        let mut movements = Vec::with_capacity(document.lines.len());
        for line in &document.lines {
            let cell = StockCell::new(line.product_id, document.warehouse_id);
            let delta = match document.kind {
                DocumentKind::Purchase => line.quantity,
                DocumentKind::Sale => -line.quantity,
            };
            let movement = StockLedger::apply_movement(
                tx,
                cell,
                delta,
                document.kind.movement_kind(),
                MovementSource::document(reference),
            )
            .await?;

            if movement.quantity_after < Decimal::ZERO && !options.allow_negative_stock {
                return Err(LedgerError::InsufficientStock {
                    product_id: line.product_id,
                    warehouse_id: document.warehouse_id,
                    available: movement.quantity_after - delta,
                    requested: line.quantity,
                });
            }
            movements.push(movement);
        }

        let mut entries = Vec::with_capacity(plan.len());
        for planned in &plan {
            let meta = TransactionMeta {
                date: document.date,
                payment_method: None,
                reference: Some(document.document_number.clone()),
                document_id: Some(document.id),
                notes: Some(planned.memo.to_string()),
            };
            let entry = AccountLedger::apply_transaction(
                tx,
                planned.account_id,
                TransactionKind::Journal {
                    is_debit: planned.is_debit,
                },
                planned.amount,
                meta,
            )
            .await?;
            entries.push(entry);
        }

        debug!(
            document_id = %document.id,
            movements = movements.len(),
            entries = entries.len(),
            cost_of_goods_sold = %cost_of_goods_sold,
            "Document applied to ledgers"
        );

        Ok(PostingOutcome {
            movements,
            entries,
            totals,
            cost_of_goods_sold,
        })
    }

    async fn lock_rows(
        tx: &mut dyn StoreTransaction,
        document: &Document,
        plan: &[PlannedEntry],
    ) -> Result<(), LedgerError> {
        let mut account_ids: Vec<AccountId> = plan.iter().map(|entry| entry.account_id).collect();
        account_ids.sort_unstable();
        account_ids.dedup();
        for account_id in account_ids {
            if tx.lock_account(account_id).await?.is_none() {
                return Err(LedgerError::not_found("account", account_id));
            }
        }

        let mut cells: Vec<StockCell> = document
            .lines
            .iter()
            .map(|line| StockCell::new(line.product_id, document.warehouse_id))
            .collect();
        cells.sort_unstable();
        cells.dedup();
        for cell in cells {
            tx.lock_stock_level(cell).await?;
        }
        Ok(())
    }
}
