//! Router fixtures for handler tests.

use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header::CONTENT_TYPE},
    response::Response,
};
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use makhzan_core::ConsistencyService;
use makhzan_core::account::{AccountType, NewAccount};
use makhzan_core::document::{PostingAccounts, PostingOptions};
use makhzan_core::store::MemoryStore;
use makhzan_shared::types::AccountId;

use crate::{AppState, create_router};

pub(crate) struct TestApp {
    state: AppState,
}

impl TestApp {
    /// An app over an empty memory store with the three posting accounts in place.
    pub(crate) async fn new() -> Self {
        let store = Arc::new(MemoryStore::new());
        let placeholder = PostingAccounts {
            inventory: AccountId::new(),
            sales_revenue: AccountId::new(),
            cost_of_goods_sold: AccountId::new(),
        };
        let bootstrap =
            ConsistencyService::new(store.clone(), placeholder, PostingOptions::default());

        let mut ids = Vec::new();
        for (code, name, account_type) in [
            ("1300", "Inventory", AccountType::Asset),
            ("4000", "Sales Revenue", AccountType::Revenue),
            ("5000", "Cost of Goods Sold", AccountType::Expense),
        ] {
            let account = bootstrap
                .create_account(NewAccount {
                    code: code.into(),
                    name: name.into(),
                    account_type,
                })
                .await
                .unwrap();
            ids.push(account.id);
        }

        let accounts = PostingAccounts {
            inventory: ids[0],
            sales_revenue: ids[1],
            cost_of_goods_sold: ids[2],
        };
        let service = ConsistencyService::new(store, accounts, PostingOptions::default());
        Self {
            state: AppState::new(service),
        }
    }

    pub(crate) fn router(&self) -> Router {
        create_router(self.state.clone())
    }

    /// Sends a request with an optional JSON body and returns status and parsed body.
    pub(crate) async fn send(&self, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => builder
                .header(CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router().oneshot(request).await.unwrap();
        let status = response.status();
        (status, body_json(response).await)
    }
}

/// Reads a response body as JSON; an empty body reads as `null`.
pub(crate) async fn body_json(response: Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    }
}
