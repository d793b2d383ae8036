//! Account ledger: customer, supplier and internal balances with their transaction history.

pub mod ledger;
pub mod types;

pub use ledger::AccountLedger;
pub use types::{
    Account, AccountType, BalanceSide, NewAccount, PaymentMethod, Transaction, TransactionFilter,
    TransactionKind, TransactionMeta, TransactionType,
};
