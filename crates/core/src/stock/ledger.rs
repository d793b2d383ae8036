//! Stock ledger: quantity per cell plus the append-only movement log.
//!
//! The ledger does not enforce non-negative quantities. Callers decide policy, using
//! `quantity_after` on the returned movement.

use chrono::Utc;
use rust_decimal::Decimal;
use tracing::debug;

use makhzan_shared::types::StockMovementId;

use super::types::{MovementFilter, MovementKind, MovementSource, StockCell, StockMovement};
use crate::amount;
use crate::error::LedgerError;
use crate::store::StoreTransaction;

/// Stateless stock ledger operating inside a storage transaction.
pub struct StockLedger;

impl StockLedger {
    /// Adds `delta` to the cell's quantity and appends a movement recording it.
    ///
    /// The level is created at zero if this is the cell's first movement.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the product or warehouse is unknown, `InvalidAmount` if the new
    /// quantity does not fit a stored column, or a storage error.
    pub async fn apply_movement(
        tx: &mut dyn StoreTransaction,
        cell: StockCell,
        delta: Decimal,
        kind: MovementKind,
        source: MovementSource,
    ) -> Result<StockMovement, LedgerError> {
        Self::ensure_cell_exists(tx, cell).await?;

        let now = Utc::now();
        let mut level = tx.lock_stock_level(cell).await?;
        level.quantity = amount::add("stock quantity", level.quantity, delta)?;
        level.updated_at = now;
        tx.save_stock_level(&level).await?;

        let movement = StockMovement {
            id: StockMovementId::new(),
            product_id: cell.product_id,
            warehouse_id: cell.warehouse_id,
            delta,
            quantity_after: level.quantity,
            kind,
            document: source.document,
            note: source.note,
            created_at: now,
        };
        tx.insert_movement(&movement).await?;

        debug!(
            product_id = %cell.product_id,
            warehouse_id = %cell.warehouse_id,
            delta = %delta,
            quantity_after = %level.quantity,
            kind = %kind,
            "Stock movement applied"
        );

        Ok(movement)
    }

    /// Forces the cell to an absolute quantity, logging the change rather than the snapshot.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the product or warehouse is unknown, or a storage error.
    pub async fn set_absolute(
        tx: &mut dyn StoreTransaction,
        cell: StockCell,
        quantity: Decimal,
        kind: MovementKind,
        source: MovementSource,
    ) -> Result<StockMovement, LedgerError> {
        Self::ensure_cell_exists(tx, cell).await?;

        let current = tx.lock_stock_level(cell).await?.quantity;
        let delta = quantity.checked_sub(current).ok_or_else(|| {
            LedgerError::InvalidAmount(format!("adjustment from {current} to {quantity} overflowed"))
        })?;
        Self::apply_movement(tx, cell, delta, kind, source).await
    }

    /// Returns the quantity on hand, zero when the cell has never moved.
    ///
    /// # Errors
    ///
    /// Returns a storage error.
    pub async fn get_level(
        tx: &mut dyn StoreTransaction,
        cell: StockCell,
    ) -> Result<Decimal, LedgerError> {
        Ok(tx
            .stock_level(cell)
            .await?
            .map_or(Decimal::ZERO, |level| level.quantity))
    }

    /// Lists movements matching the filter, newest first.
    ///
    /// # Errors
    ///
    /// Returns a storage error.
    pub async fn list_movements(
        tx: &mut dyn StoreTransaction,
        filter: &MovementFilter,
    ) -> Result<Vec<StockMovement>, LedgerError> {
        Ok(tx.list_movements(filter).await?)
    }

    async fn ensure_cell_exists(
        tx: &mut dyn StoreTransaction,
        cell: StockCell,
    ) -> Result<(), LedgerError> {
        if tx.product(cell.product_id).await?.is_none() {
            return Err(LedgerError::not_found("product", cell.product_id));
        }
        if tx.warehouse(cell.warehouse_id).await?.is_none() {
            return Err(LedgerError::not_found("warehouse", cell.warehouse_id));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{LedgerStore, MemoryStore};
    use crate::store::testing::{seed_product, seed_warehouse};
    use makhzan_shared::types::{ProductId, WarehouseId};
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn test_first_movement_creates_level() {
        let store = MemoryStore::new();
        let product = seed_product(&store, "P-1", dec!(5)).await;
        let warehouse = seed_warehouse(&store, "Main").await;
        let cell = StockCell::new(product.id, warehouse.id);

        let mut tx = store.begin().await.unwrap();
        assert_eq!(StockLedger::get_level(tx.as_mut(), cell).await.unwrap(), dec!(0));

        let movement = StockLedger::apply_movement(
            tx.as_mut(),
            cell,
            dec!(10),
            MovementKind::Purchase,
            MovementSource::default(),
        )
        .await
        .unwrap();

        assert_eq!(movement.delta, dec!(10));
        assert_eq!(movement.quantity_after, dec!(10));
        assert_eq!(StockLedger::get_level(tx.as_mut(), cell).await.unwrap(), dec!(10));
    }

    #[tokio::test]
    async fn test_negative_result_is_allowed_at_ledger_level() {
        let store = MemoryStore::new();
        let product = seed_product(&store, "P-1", dec!(5)).await;
        let warehouse = seed_warehouse(&store, "Main").await;
        let cell = StockCell::new(product.id, warehouse.id);

        let mut tx = store.begin().await.unwrap();
        let movement = StockLedger::apply_movement(
            tx.as_mut(),
            cell,
            dec!(-2),
            MovementKind::Sale,
            MovementSource::default(),
        )
        .await
        .unwrap();
        assert_eq!(movement.quantity_after, dec!(-2));
    }

    #[tokio::test]
    async fn test_quantity_out_of_range_leaves_level_unchanged() {
        let store = MemoryStore::new();
        let product = seed_product(&store, "P-1", dec!(5)).await;
        let warehouse = seed_warehouse(&store, "Main").await;
        let cell = StockCell::new(product.id, warehouse.id);

        let mut tx = store.begin().await.unwrap();
        StockLedger::apply_movement(
            tx.as_mut(),
            cell,
            dec!(999999999999999),
            MovementKind::Purchase,
            MovementSource::default(),
        )
        .await
        .unwrap();

        for delta in [dec!(1), Decimal::MAX] {
            let err = StockLedger::apply_movement(
                tx.as_mut(),
                cell,
                delta,
                MovementKind::Purchase,
                MovementSource::default(),
            )
            .await
            .unwrap_err();
            assert!(matches!(err, LedgerError::InvalidAmount(_)), "{delta}");
        }
        assert_eq!(
            StockLedger::get_level(tx.as_mut(), cell).await.unwrap(),
            dec!(999999999999999)
        );

        let err = StockLedger::set_absolute(
            tx.as_mut(),
            cell,
            Decimal::MIN,
            MovementKind::Adjustment,
            MovementSource::default(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, LedgerError::InvalidAmount(_)));
    }

    #[tokio::test]
    async fn test_set_absolute_logs_delta() {
        let store = MemoryStore::new();
        let product = seed_product(&store, "P-1", dec!(5)).await;
        let warehouse = seed_warehouse(&store, "Main").await;
        let cell = StockCell::new(product.id, warehouse.id);

        let mut tx = store.begin().await.unwrap();
        StockLedger::apply_movement(
            tx.as_mut(),
            cell,
            dec!(10),
            MovementKind::Purchase,
            MovementSource::default(),
        )
        .await
        .unwrap();

        let movement = StockLedger::set_absolute(
            tx.as_mut(),
            cell,
            dec!(7),
            MovementKind::Adjustment,
            MovementSource::note("cycle count"),
        )
        .await
        .unwrap();

        assert_eq!(movement.delta, dec!(-3));
        assert_eq!(movement.quantity_after, dec!(7));
        assert_eq!(movement.note.as_deref(), Some("cycle count"));
        assert_eq!(StockLedger::get_level(tx.as_mut(), cell).await.unwrap(), dec!(7));
    }

    #[tokio::test]
    async fn test_unknown_product_or_warehouse_is_not_found() {
        let store = MemoryStore::new();
        let product = seed_product(&store, "P-1", dec!(5)).await;
        let warehouse = seed_warehouse(&store, "Main").await;

        let mut tx = store.begin().await.unwrap();
        let err = StockLedger::apply_movement(
            tx.as_mut(),
            StockCell::new(ProductId::new(), warehouse.id),
            dec!(1),
            MovementKind::Purchase,
            MovementSource::default(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, LedgerError::NotFound { entity: "product", .. }));

        let err = StockLedger::set_absolute(
            tx.as_mut(),
            StockCell::new(product.id, WarehouseId::new()),
            dec!(1),
            MovementKind::Adjustment,
            MovementSource::default(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, LedgerError::NotFound { entity: "warehouse", .. }));
    }

    #[tokio::test]
    async fn test_movements_listed_newest_first() {
        let store = MemoryStore::new();
        let product = seed_product(&store, "P-1", dec!(5)).await;
        let warehouse = seed_warehouse(&store, "Main").await;
        let cell = StockCell::new(product.id, warehouse.id);

        let mut tx = store.begin().await.unwrap();
        for delta in [dec!(1), dec!(2), dec!(3)] {
            StockLedger::apply_movement(
                tx.as_mut(),
                cell,
                delta,
                MovementKind::Adjustment,
                MovementSource::default(),
            )
            .await
            .unwrap();
        }

        let movements = StockLedger::list_movements(tx.as_mut(), &MovementFilter::default())
            .await
            .unwrap();
        let deltas: Vec<Decimal> = movements.iter().map(|m| m.delta).collect();
        assert_eq!(deltas, vec![dec!(3), dec!(2), dec!(1)]);
    }
}
