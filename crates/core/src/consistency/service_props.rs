//! Property-based tests for ConsistencyService.
//!
//! - Stock conservation: posting moves each stock level by exactly the line quantities
//! - Balance conservation: a sale raises the customer's balance by exactly its total
//! - Journal balance: every posting's debits equal its credits
//! - Atomicity: a failed post leaves every level and balance as it was

use std::future::Future;

use proptest::prelude::*;
use rust_decimal::Decimal;

use super::fixture::Fixture;
use crate::document::{DocumentKind, PostingOptions};

fn block_on<F: Future>(future: F) -> F::Output {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
        .block_on(future)
}

/// Strategy to generate positive quantities (0.01 to 1,000.00).
fn positive_quantity() -> impl Strategy<Value = Decimal> {
    (1i64..100_000i64).prop_map(|cents| Decimal::new(cents, 2))
}

/// Strategy to generate prices, zero included (0.00 to 10,000.00).
fn price() -> impl Strategy<Value = Decimal> {
    (0i64..1_000_000i64).prop_map(|cents| Decimal::new(cents, 2))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(40))]

    /// Purchasing then selling moves stock up then down by the line quantities, and the
    /// counterparties by the document totals.
    #[test]
    fn prop_purchase_then_sale_conserves(
        bought in positive_quantity(),
        sold in positive_quantity(),
        cost in price(),
        sell in price(),
    ) {
        let (after_purchase, after_sale, supplier, customer, purchase_totals, sale_totals) =
            block_on(async {
                let f = Fixture::with_options(PostingOptions { allow_negative_stock: true }).await;
                let product = f.product("P", cost, sell).await;

                let purchase = f.draft(DocumentKind::Purchase, &[(product.id, bought, cost)]).await;
                let purchase = f.service.post_document(purchase).await.unwrap();
                let after_purchase = f.stock(&product).await;

                let sale = f.draft(DocumentKind::Sale, &[(product.id, sold, sell)]).await;
                let sale = f.service.post_document(sale).await.unwrap();
                let after_sale = f.stock(&product).await;

                (
                    after_purchase,
                    after_sale,
                    f.balance(&f.supplier).await,
                    f.balance(&f.customer).await,
                    purchase.totals,
                    sale.totals,
                )
            });

        prop_assert_eq!(after_purchase, bought);
        prop_assert_eq!(after_sale, bought - sold);
        prop_assert_eq!(supplier, -(bought * cost));
        prop_assert_eq!(customer, sold * sell);
        prop_assert!(purchase_totals.is_balanced);
        prop_assert!(sale_totals.is_balanced);
        prop_assert_eq!(sale_totals.debit, sold * sell + sold * cost);
    }

    /// A sale whose commit fails leaves stock and every touched balance unchanged.
    #[test]
    fn prop_failed_post_changes_nothing(
        quantity in positive_quantity(),
        cost in price(),
        sell in price(),
    ) {
        let (before, after) = block_on(async {
            let f = Fixture::with_options(PostingOptions { allow_negative_stock: true }).await;
            let product = f.product("P", cost, sell).await;
            let sale = f.draft(DocumentKind::Sale, &[(product.id, quantity, sell)]).await;

            let snapshot = async {
                (
                    f.stock(&product).await,
                    f.balance(&f.customer).await,
                    f.service.get_account_balance(f.accounts.inventory).await.unwrap(),
                    f.service.get_account_balance(f.accounts.sales_revenue).await.unwrap(),
                    f.service.get_account_balance(f.accounts.cost_of_goods_sold).await.unwrap(),
                )
            };
            let before = snapshot.await;

            f.store.fail_next_commit();
            assert!(f.service.post_document(sale).await.is_err());

            let after = (
                f.stock(&product).await,
                f.balance(&f.customer).await,
                f.service.get_account_balance(f.accounts.inventory).await.unwrap(),
                f.service.get_account_balance(f.accounts.sales_revenue).await.unwrap(),
                f.service.get_account_balance(f.accounts.cost_of_goods_sold).await.unwrap(),
            );
            (before, after)
        });

        prop_assert_eq!(before, after);
    }
}
