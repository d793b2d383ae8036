//! Account ledger: running balances plus the immutable transaction log.

use chrono::Utc;
use rust_decimal::Decimal;
use tracing::debug;

use makhzan_shared::types::{AccountId, TransactionId};

use super::types::{Transaction, TransactionFilter, TransactionKind, TransactionMeta};
use crate::amount;
use crate::catalog::ensure_max_len;
use crate::error::LedgerError;
use crate::store::StoreTransaction;

/// Longest accepted transaction reference.
pub const MAX_REFERENCE_LEN: usize = 100;

/// Stateless account ledger operating inside a storage transaction.
pub struct AccountLedger;

impl AccountLedger {
    /// Appends a transaction and moves the account's balance by the matching signed amount.
    ///
    /// The account row is locked first, so concurrent callers on the same account
    /// serialize and no update is lost.
    ///
    /// # Errors
    ///
    /// - `InvalidAmount` if `amount` is not positive, or it or the new balance does not fit
    ///   a stored column
    /// - `Validation` if the reference is longer than its column
    /// - `NotFound` if the account does not exist
    /// - a storage error
    pub async fn apply_transaction(
        tx: &mut dyn StoreTransaction,
        account_id: AccountId,
        kind: TransactionKind,
        amount: Decimal,
        meta: TransactionMeta,
    ) -> Result<Transaction, LedgerError> {
        if amount <= Decimal::ZERO {
            return Err(LedgerError::InvalidAmount(format!(
                "transaction amount must be positive, got {amount}"
            )));
        }
        amount::ensure_storable("transaction amount", amount)?;
        if let Some(reference) = &meta.reference {
            ensure_max_len("transaction reference", reference, MAX_REFERENCE_LEN)?;
        }

        let mut account = tx
            .lock_account(account_id)
            .await?
            .ok_or_else(|| LedgerError::not_found("account", account_id))?;

        let change = kind.balance_change(account.account_type, amount);
        let now = Utc::now();
        account.current_balance =
            amount::add("account balance", account.current_balance, change)?;
        account.updated_at = now;
        tx.update_account(&account).await?;

        let transaction = Transaction {
            id: TransactionId::new(),
            account_id,
            transaction_type: kind.transaction_type(),
            is_debit: kind.is_debit(),
            amount,
            balance_after: account.current_balance,
            date: meta.date,
            payment_method: meta.payment_method,
            reference: meta.reference,
            document_id: meta.document_id,
            notes: meta.notes,
            created_at: now,
        };
        tx.insert_transaction(&transaction).await?;

        debug!(
            account_id = %account_id,
            transaction_type = %transaction.transaction_type,
            change = %change,
            balance_after = %transaction.balance_after,
            "Account transaction applied"
        );

        Ok(transaction)
    }

    /// Returns the account's current balance.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the account does not exist, or a storage error.
    pub async fn get_balance(
        tx: &mut dyn StoreTransaction,
        account_id: AccountId,
    ) -> Result<Decimal, LedgerError> {
        tx.account(account_id)
            .await?
            .map(|account| account.current_balance)
            .ok_or_else(|| LedgerError::not_found("account", account_id))
    }

    /// Lists transactions matching the filter, newest first.
    ///
    /// # Errors
    ///
    /// Returns a storage error.
    pub async fn list_transactions(
        tx: &mut dyn StoreTransaction,
        filter: &TransactionFilter,
    ) -> Result<Vec<Transaction>, LedgerError> {
        Ok(tx.list_transactions(filter).await?)
    }
}
