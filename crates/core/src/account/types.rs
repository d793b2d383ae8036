//! Account domain types and the balance sign policy.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use makhzan_shared::types::{AccountId, DocumentId, TransactionId};

use crate::catalog::{MAX_NAME_LEN, ensure_max_len};
use crate::error::LedgerError;

/// Longest accepted account code.
pub const MAX_ACCOUNT_CODE_LEN: usize = 30;

/// Account classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountType {
    /// A customer; positive balance means they owe the business.
    Customer,
    /// A supplier; positive balance means the business owes them.
    Supplier,
    /// Cash box or bank.
    Cash,
    /// Other asset (inventory).
    Asset,
    /// Revenue (sales).
    Revenue,
    /// Expense (cost of goods sold, overheads).
    Expense,
    /// Owner's equity.
    Equity,
}

impl AccountType {
    /// Stable string form used in storage and the API.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Customer => "customer",
            Self::Supplier => "supplier",
            Self::Cash => "cash",
            Self::Asset => "asset",
            Self::Revenue => "revenue",
            Self::Expense => "expense",
            Self::Equity => "equity",
        }
    }

    /// The side that increases this account's balance for plain credit/debit entries.
    #[must_use]
    pub const fn balance_side(self) -> BalanceSide {
        match self {
            Self::Customer | Self::Cash | Self::Asset | Self::Expense => BalanceSide::DebitNormal,
            Self::Supplier | Self::Revenue | Self::Equity => BalanceSide::CreditNormal,
        }
    }

    /// Counterparty types a sales document may be issued to.
    #[must_use]
    pub const fn can_buy(self) -> bool {
        matches!(self, Self::Customer | Self::Cash)
    }

    /// Counterparty types a purchase document may be issued from.
    #[must_use]
    pub const fn can_sell(self) -> bool {
        matches!(self, Self::Supplier | Self::Cash)
    }
}

impl std::fmt::Display for AccountType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for AccountType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "customer" => Ok(Self::Customer),
            "supplier" => Ok(Self::Supplier),
            "cash" => Ok(Self::Cash),
            "asset" => Ok(Self::Asset),
            "revenue" => Ok(Self::Revenue),
            "expense" => Ok(Self::Expense),
            "equity" => Ok(Self::Equity),
            _ => Err(format!("Unknown account type: {s}")),
        }
    }
}

/// Sign policy for plain credit/debit transactions.
///
/// | account type                      | credit    | debit     |
/// |-----------------------------------|-----------|-----------|
/// | customer, cash, asset, expense    | − amount  | + amount  |
/// | supplier, revenue, equity         | + amount  | − amount  |
///
/// A customer credit is a payment received (they owe less); a supplier credit is a new
/// liability (the business owes more). Journal entries ignore this table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BalanceSide {
    /// Debits increase the balance.
    DebitNormal,
    /// Credits increase the balance.
    CreditNormal,
}

impl BalanceSide {
    /// Signed balance change for a debit (`is_debit`) or credit of `amount`.
    #[must_use]
    pub fn change(self, is_debit: bool, amount: Decimal) -> Decimal {
        match (self, is_debit) {
            (Self::DebitNormal, true) | (Self::CreditNormal, false) => amount,
            (Self::DebitNormal, false) | (Self::CreditNormal, true) => -amount,
        }
    }
}

/// A customer, supplier, or internal account with its running balance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Unique identifier.
    pub id: AccountId,
    /// Business code, unique.
    pub code: String,
    /// Display name.
    pub name: String,
    /// Classification, which fixes the sign policy.
    pub account_type: AccountType,
    /// Running balance; only the account ledger writes it.
    pub current_balance: Decimal,
    /// Inactive accounts cannot be used on new postings.
    pub is_active: bool,
    /// When the account was created.
    pub created_at: DateTime<Utc>,
    /// When the balance or details last changed.
    pub updated_at: DateTime<Utc>,
}

/// Input for creating an account. Balances always start at zero.
#[derive(Debug, Clone, Deserialize)]
pub struct NewAccount {
    /// Business code.
    pub code: String,
    /// Display name.
    pub name: String,
    /// Classification.
    pub account_type: AccountType,
}

impl NewAccount {
    /// Validates the input and builds the account record.
    ///
    /// # Errors
    ///
    /// Returns `Validation` for a blank or overlong code or name.
    pub fn into_account(self, now: DateTime<Utc>) -> Result<Account, LedgerError> {
        if self.code.trim().is_empty() {
            return Err(LedgerError::Validation("account code is required".into()));
        }
        if self.name.trim().is_empty() {
            return Err(LedgerError::Validation("account name is required".into()));
        }
        ensure_max_len("account code", self.code.trim(), MAX_ACCOUNT_CODE_LEN)?;
        ensure_max_len("account name", &self.name, MAX_NAME_LEN)?;
        Ok(Account {
            id: AccountId::new(),
            code: self.code.trim().to_string(),
            name: self.name,
            account_type: self.account_type,
            current_balance: Decimal::ZERO,
            is_active: true,
            created_at: now,
            updated_at: now,
        })
    }
}

/// Stored transaction type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    /// Cash/credit entry following the account type's sign policy.
    Credit,
    /// Cash/debit entry following the account type's sign policy.
    Debit,
    /// Journal entry with an explicit side, independent of account type.
    Journal,
}

impl TransactionType {
    /// Stable string form used in storage and the API.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Credit => "credit",
            Self::Debit => "debit",
            Self::Journal => "journal",
        }
    }
}

impl std::fmt::Display for TransactionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TransactionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "credit" => Ok(Self::Credit),
            "debit" => Ok(Self::Debit),
            "journal" => Ok(Self::Journal),
            _ => Err(format!("Unknown transaction type: {s}")),
        }
    }
}

/// What a new transaction does to its account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum TransactionKind {
    /// Credit under the sign policy.
    Credit,
    /// Debit under the sign policy.
    Debit,
    /// Journal entry: `+amount` if `is_debit`, else `-amount`.
    Journal {
        /// Debit side when true.
        is_debit: bool,
    },
}

impl TransactionKind {
    /// The stored type.
    #[must_use]
    pub const fn transaction_type(self) -> TransactionType {
        match self {
            Self::Credit => TransactionType::Credit,
            Self::Debit => TransactionType::Debit,
            Self::Journal { .. } => TransactionType::Journal,
        }
    }

    /// True for debits and debit-side journal entries.
    #[must_use]
    pub const fn is_debit(self) -> bool {
        match self {
            Self::Credit => false,
            Self::Debit => true,
            Self::Journal { is_debit } => is_debit,
        }
    }

    /// Signed balance change this transaction applies to an account of `account_type`.
    #[must_use]
    pub fn balance_change(self, account_type: AccountType, amount: Decimal) -> Decimal {
        match self {
            Self::Credit | Self::Debit => account_type.balance_side().change(self.is_debit(), amount),
            Self::Journal { is_debit: true } => amount,
            Self::Journal { is_debit: false } => -amount,
        }
    }
}

/// How money changed hands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Cash.
    Cash,
    /// Bank transfer.
    BankTransfer,
    /// Cheque.
    Cheque,
    /// Card.
    Card,
    /// Anything else.
    Other,
}

impl PaymentMethod {
    /// Stable string form used in storage.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Cash => "cash",
            Self::BankTransfer => "bank_transfer",
            Self::Cheque => "cheque",
            Self::Card => "card",
            Self::Other => "other",
        }
    }
}

impl std::str::FromStr for PaymentMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cash" => Ok(Self::Cash),
            "bank_transfer" => Ok(Self::BankTransfer),
            "cheque" => Ok(Self::Cheque),
            "card" => Ok(Self::Card),
            "other" => Ok(Self::Other),
            _ => Err(format!("Unknown payment method: {s}")),
        }
    }
}

/// Descriptive fields of a transaction.
#[derive(Debug, Clone, Deserialize)]
pub struct TransactionMeta {
    /// Business date.
    pub date: NaiveDate,
    /// How money changed hands, if it did.
    #[serde(default)]
    pub payment_method: Option<PaymentMethod>,
    /// External reference (receipt number, cheque number...).
    #[serde(default)]
    pub reference: Option<String>,
    /// Originating document, set by the document poster.
    #[serde(skip)]
    pub document_id: Option<DocumentId>,
    /// Free-text notes.
    #[serde(default)]
    pub notes: Option<String>,
}

impl TransactionMeta {
    /// Meta for a transaction on `date` with no other details.
    #[must_use]
    pub fn on(date: NaiveDate) -> Self {
        Self {
            date,
            payment_method: None,
            reference: None,
            document_id: None,
            notes: None,
        }
    }
}

/// One immutable monetary entry against an account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// Unique identifier.
    pub id: TransactionId,
    /// The account.
    pub account_id: AccountId,
    /// Credit, debit, or journal.
    pub transaction_type: TransactionType,
    /// Debit side (for credit/debit types this mirrors the type).
    pub is_debit: bool,
    /// Always positive.
    pub amount: Decimal,
    /// Account balance right after this entry.
    pub balance_after: Decimal,
    /// Business date.
    pub date: NaiveDate,
    /// How money changed hands.
    pub payment_method: Option<PaymentMethod>,
    /// External reference.
    pub reference: Option<String>,
    /// Originating document.
    pub document_id: Option<DocumentId>,
    /// Free-text notes.
    pub notes: Option<String>,
    /// When the entry was recorded.
    pub created_at: DateTime<Utc>,
}

/// Filter for listing transactions. Empty filter lists everything.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TransactionFilter {
    /// Only this account.
    pub account_id: Option<AccountId>,
    /// Only entries produced by this document.
    pub document_id: Option<DocumentId>,
    /// Only this type.
    pub transaction_type: Option<TransactionType>,
    /// Dated on or after.
    pub date_from: Option<NaiveDate>,
    /// Dated on or before.
    pub date_to: Option<NaiveDate>,
}

impl TransactionFilter {
    /// Returns true if the transaction passes the filter.
    #[must_use]
    pub fn matches(&self, transaction: &Transaction) -> bool {
        self.account_id.is_none_or(|id| transaction.account_id == id)
            && self
                .document_id
                .is_none_or(|id| transaction.document_id == Some(id))
            && self
                .transaction_type
                .is_none_or(|t| transaction.transaction_type == t)
            && self.date_from.is_none_or(|from| transaction.date >= from)
            && self.date_to.is_none_or(|to| transaction.date <= to)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use rust_decimal_macros::dec;

    #[rstest]
    #[case(AccountType::Customer, TransactionKind::Credit, dec!(-100))]
    #[case(AccountType::Customer, TransactionKind::Debit, dec!(100))]
    #[case(AccountType::Supplier, TransactionKind::Credit, dec!(100))]
    #[case(AccountType::Supplier, TransactionKind::Debit, dec!(-100))]
    #[case(AccountType::Cash, TransactionKind::Debit, dec!(100))]
    #[case(AccountType::Revenue, TransactionKind::Credit, dec!(100))]
    #[case(AccountType::Supplier, TransactionKind::Journal { is_debit: true }, dec!(100))]
    #[case(AccountType::Supplier, TransactionKind::Journal { is_debit: false }, dec!(-100))]
    #[case(AccountType::Customer, TransactionKind::Journal { is_debit: false }, dec!(-100))]
    #[case(AccountType::Revenue, TransactionKind::Journal { is_debit: false }, dec!(-100))]
    fn test_balance_change_policy(
        #[case] account_type: AccountType,
        #[case] kind: TransactionKind,
        #[case] expected: Decimal,
    ) {
        assert_eq!(kind.balance_change(account_type, dec!(100)), expected);
    }

    #[test]
    fn test_kind_maps_to_stored_type() {
        assert_eq!(TransactionKind::Credit.transaction_type(), TransactionType::Credit);
        assert!(!TransactionKind::Credit.is_debit());
        assert!(TransactionKind::Debit.is_debit());
        assert_eq!(
            TransactionKind::Journal { is_debit: true }.transaction_type(),
            TransactionType::Journal
        );
    }

    #[test]
    fn test_counterparty_rules() {
        assert!(AccountType::Customer.can_buy());
        assert!(AccountType::Cash.can_buy());
        assert!(!AccountType::Supplier.can_buy());
        assert!(AccountType::Supplier.can_sell());
        assert!(!AccountType::Customer.can_sell());
        assert!(!AccountType::Revenue.can_sell());
    }

    #[test]
    fn test_filter_by_date_range() {
        let transaction = Transaction {
            id: TransactionId::new(),
            account_id: AccountId::new(),
            transaction_type: TransactionType::Credit,
            is_debit: false,
            amount: dec!(10),
            balance_after: dec!(-10),
            date: NaiveDate::from_ymd_opt(2026, 3, 15).unwrap(),
            payment_method: Some(PaymentMethod::Cash),
            reference: None,
            document_id: None,
            notes: None,
            created_at: Utc::now(),
        };

        let filter = TransactionFilter {
            date_from: NaiveDate::from_ymd_opt(2026, 3, 1),
            date_to: NaiveDate::from_ymd_opt(2026, 3, 31),
            ..TransactionFilter::default()
        };
        assert!(filter.matches(&transaction));

        let filter = TransactionFilter {
            date_from: NaiveDate::from_ymd_opt(2026, 4, 1),
            ..TransactionFilter::default()
        };
        assert!(!filter.matches(&transaction));
    }

    #[test]
    fn test_account_type_parsing() {
        assert_eq!("Supplier".parse::<AccountType>().unwrap(), AccountType::Supplier);
        assert!("liability".parse::<AccountType>().is_err());
    }

    #[test]
    fn test_new_account_code_length_limit() {
        let input = |code: String| NewAccount {
            code,
            name: "Acme".into(),
            account_type: AccountType::Customer,
        };
        assert!(input("C".repeat(MAX_ACCOUNT_CODE_LEN)).into_account(Utc::now()).is_ok());
        assert!(matches!(
            input("C".repeat(MAX_ACCOUNT_CODE_LEN + 1)).into_account(Utc::now()),
            Err(LedgerError::Validation(_))
        ));
    }
}
