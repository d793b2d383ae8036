//! Account and transaction routes.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use makhzan_core::account::{
    Account, NewAccount, Transaction, TransactionFilter, TransactionKind, TransactionMeta,
};
use makhzan_shared::types::AccountId;

use crate::{AppState, error::ApiError};

/// Creates the account routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/accounts", get(list_accounts).post(create_account))
        .route("/accounts/{account_id}", get(get_account))
        .route("/accounts/{account_id}/balance", get(get_balance))
        .route(
            "/accounts/{account_id}/transactions",
            get(list_account_transactions).post(record_transaction),
        )
        .route("/transactions", get(list_transactions))
}

/// Request body for recording a payment or manual entry.
///
/// ```json
/// { "type": "credit", "amount": "60", "date": "2026-06-01", "payment_method": "cash" }
/// { "type": "journal", "is_debit": true, "amount": "10", "date": "2026-06-01" }
/// ```
#[derive(Debug, Deserialize)]
pub struct RecordTransactionRequest {
    /// Credit, debit, or journal with its side.
    #[serde(flatten)]
    pub kind: TransactionKind,
    /// Positive amount.
    pub amount: Decimal,
    /// Date, payment method, reference and notes.
    #[serde(flatten)]
    pub meta: TransactionMeta,
}

/// Response for an account balance.
#[derive(Debug, Serialize)]
pub struct BalanceResponse {
    /// The account.
    pub account_id: AccountId,
    /// Current balance.
    pub balance: Decimal,
}

/// GET `/accounts` - List accounts ordered by code.
async fn list_accounts(State(state): State<AppState>) -> Result<Json<Vec<Account>>, ApiError> {
    Ok(Json(state.service.list_accounts().await?))
}

/// POST `/accounts` - Create an account with a zero balance.
async fn create_account(
    State(state): State<AppState>,
    Json(payload): Json<NewAccount>,
) -> Result<(StatusCode, Json<Account>), ApiError> {
    let account = state.service.create_account(payload).await?;
    Ok((StatusCode::CREATED, Json(account)))
}

/// GET `/accounts/{account_id}` - Get an account.
async fn get_account(
    State(state): State<AppState>,
    Path(account_id): Path<AccountId>,
) -> Result<Json<Account>, ApiError> {
    Ok(Json(state.service.get_account(account_id).await?))
}

/// GET `/accounts/{account_id}/balance` - Current balance.
async fn get_balance(
    State(state): State<AppState>,
    Path(account_id): Path<AccountId>,
) -> Result<Json<BalanceResponse>, ApiError> {
    let balance = state.service.get_account_balance(account_id).await?;
    Ok(Json(BalanceResponse {
        account_id,
        balance,
    }))
}

/// POST `/accounts/{account_id}/transactions` - Record a transaction against one account.
async fn record_transaction(
    State(state): State<AppState>,
    Path(account_id): Path<AccountId>,
    Json(payload): Json<RecordTransactionRequest>,
) -> Result<(StatusCode, Json<Transaction>), ApiError> {
    let transaction = state
        .service
        .record_transaction(account_id, payload.kind, payload.amount, payload.meta)
        .await?;
    Ok((StatusCode::CREATED, Json(transaction)))
}

/// GET `/accounts/{account_id}/transactions` - One account's transactions, newest first.
async fn list_account_transactions(
    State(state): State<AppState>,
    Path(account_id): Path<AccountId>,
    Query(mut filter): Query<TransactionFilter>,
) -> Result<Json<Vec<Transaction>>, ApiError> {
    filter.account_id = Some(account_id);
    Ok(Json(state.service.list_transactions(&filter).await?))
}

/// GET `/transactions` - Transactions matching the query, newest first.
async fn list_transactions(
    State(state): State<AppState>,
    Query(filter): Query<TransactionFilter>,
) -> Result<Json<Vec<Transaction>>, ApiError> {
    Ok(Json(state.service.list_transactions(&filter).await?))
}
