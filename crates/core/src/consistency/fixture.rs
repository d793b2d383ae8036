//! Shared setup for service tests: a memory store with posting accounts, one warehouse,
//! one customer and one supplier.

use std::sync::Arc;

use chrono::NaiveDate;
use rust_decimal::Decimal;

use makhzan_shared::types::{AccountId, DocumentId, ProductId};

use super::ConsistencyService;
use crate::account::{Account, AccountType, NewAccount};
use crate::catalog::{NewProduct, NewWarehouse, Product, Warehouse};
use crate::document::{DocumentKind, DocumentLineInput, NewDocument, PostingAccounts, PostingOptions};
use crate::store::MemoryStore;

pub(super) struct Fixture {
    pub store: MemoryStore,
    pub service: ConsistencyService,
    pub accounts: PostingAccounts,
    pub warehouse: Warehouse,
    pub customer: Account,
    pub supplier: Account,
}

pub(super) fn date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 6, 1).unwrap()
}

async fn account(service: &ConsistencyService, code: &str, account_type: AccountType) -> Account {
    service
        .create_account(NewAccount {
            code: code.into(),
            name: code.into(),
            account_type,
        })
        .await
        .unwrap()
}

impl Fixture {
    pub async fn new() -> Self {
        Self::with_options(PostingOptions::default()).await
    }

    pub async fn with_options(options: PostingOptions) -> Self {
        let store = MemoryStore::new();

        // Posting accounts have to exist before the service that posts to them.
        let bootstrap = ConsistencyService::new(
            Arc::new(store.clone()),
            PostingAccounts {
                inventory: AccountId::new(),
                sales_revenue: AccountId::new(),
                cost_of_goods_sold: AccountId::new(),
            },
            options,
        );
        let inventory = account(&bootstrap, "1300", AccountType::Asset).await;
        let revenue = account(&bootstrap, "4000", AccountType::Revenue).await;
        let cogs = account(&bootstrap, "5000", AccountType::Expense).await;
        let accounts = PostingAccounts {
            inventory: inventory.id,
            sales_revenue: revenue.id,
            cost_of_goods_sold: cogs.id,
        };

        let service = ConsistencyService::new(Arc::new(store.clone()), accounts, options);
        let warehouse = service
            .create_warehouse(NewWarehouse {
                name: "Main".into(),
                is_default: false,
            })
            .await
            .unwrap();
        let customer = account(&service, "C-60", AccountType::Customer).await;
        let supplier = account(&service, "S-50", AccountType::Supplier).await;

        Self {
            store,
            service,
            accounts,
            warehouse,
            customer,
            supplier,
        }
    }

    pub async fn product(&self, code: &str, cost_price: Decimal, sell_price: Decimal) -> Product {
        self.service
            .create_product(NewProduct {
                code: code.into(),
                name: code.into(),
                unit: "piece".into(),
                cost_price,
                sell_price,
            })
            .await
            .unwrap()
    }

    pub async fn draft(
        &self,
        kind: DocumentKind,
        lines: &[(ProductId, Decimal, Decimal)],
    ) -> DocumentId {
        let account_id = match kind {
            DocumentKind::Sale => self.customer.id,
            DocumentKind::Purchase => self.supplier.id,
        };
        self.service
            .create_document(NewDocument {
                document_number: None,
                kind,
                account_id,
                warehouse_id: Some(self.warehouse.id),
                date: date(),
                lines: lines
                    .iter()
                    .map(|&(product_id, quantity, unit_price)| DocumentLineInput {
                        product_id,
                        quantity,
                        unit_price,
                    })
                    .collect(),
                notes: None,
            })
            .await
            .unwrap()
            .id
    }

    pub async fn stock(&self, product: &Product) -> Decimal {
        self.service
            .get_stock_level(product.id, self.warehouse.id)
            .await
            .unwrap()
    }

    pub async fn balance(&self, account: &Account) -> Decimal {
        self.service.get_account_balance(account.id).await.unwrap()
    }
}
