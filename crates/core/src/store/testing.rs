//! Seeding helpers for unit tests.

use chrono::Utc;
use rust_decimal::Decimal;

use super::{LedgerStore, MemoryStore};
use crate::account::{Account, AccountType, NewAccount};
use crate::catalog::{NewProduct, Product, Warehouse};
use makhzan_shared::types::WarehouseId;

pub(crate) async fn seed_product(store: &MemoryStore, code: &str, cost_price: Decimal) -> Product {
    let product = NewProduct {
        code: code.to_string(),
        name: format!("Product {code}"),
        unit: "piece".to_string(),
        cost_price,
        sell_price: cost_price * Decimal::TWO,
    }
    .into_product(Utc::now())
    .unwrap();

    let mut tx = store.begin().await.unwrap();
    tx.insert_product(&product).await.unwrap();
    tx.commit().await.unwrap();
    product
}

pub(crate) async fn seed_warehouse(store: &MemoryStore, name: &str) -> Warehouse {
    let warehouse = Warehouse {
        id: WarehouseId::new(),
        name: name.to_string(),
        is_default: false,
        is_active: true,
        created_at: Utc::now(),
    };

    let mut tx = store.begin().await.unwrap();
    tx.insert_warehouse(&warehouse).await.unwrap();
    tx.commit().await.unwrap();
    warehouse
}

pub(crate) async fn seed_account(store: &MemoryStore, code: &str, account_type: AccountType) -> Account {
    let account = NewAccount {
        code: code.to_string(),
        name: format!("Account {code}"),
        account_type,
    }
    .into_account(Utc::now())
    .unwrap();

    let mut tx = store.begin().await.unwrap();
    tx.insert_account(&account).await.unwrap();
    tx.commit().await.unwrap();
    account
}
