//! Products and warehouses.
//!
//! These are the reference records the ledgers point at. The ledgers never mutate them;
//! the consistency service owns their lifecycle (create, edit, guarded delete).

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use makhzan_shared::types::{ProductId, WarehouseId};

use crate::amount;
use crate::error::LedgerError;

/// Longest accepted product code.
pub const MAX_PRODUCT_CODE_LEN: usize = 50;
/// Longest accepted product, warehouse or account name.
pub const MAX_NAME_LEN: usize = 255;
/// Longest accepted unit of measure.
pub const MAX_UNIT_LEN: usize = 30;

/// A stocked product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    /// Unique identifier.
    pub id: ProductId,
    /// Business code (SKU), unique.
    pub code: String,
    /// Display name.
    pub name: String,
    /// Unit of measure (piece, kg, box...).
    pub unit: String,
    /// Cost price used for cost of goods sold at posting time.
    pub cost_price: Decimal,
    /// Default selling price.
    pub sell_price: Decimal,
    /// Inactive products cannot appear on posted documents.
    pub is_active: bool,
    /// When the product was created.
    pub created_at: DateTime<Utc>,
    /// When the product was last edited.
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a product.
#[derive(Debug, Clone, Deserialize)]
pub struct NewProduct {
    /// Business code (SKU).
    pub code: String,
    /// Display name.
    pub name: String,
    /// Unit of measure.
    pub unit: String,
    /// Cost price.
    pub cost_price: Decimal,
    /// Selling price.
    pub sell_price: Decimal,
}

/// Editable product fields. Code is fixed once referenced, so it is not here.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductUpdate {
    /// New display name.
    pub name: Option<String>,
    /// New unit of measure.
    pub unit: Option<String>,
    /// New cost price.
    pub cost_price: Option<Decimal>,
    /// New selling price.
    pub sell_price: Option<Decimal>,
    /// Activate or deactivate.
    pub is_active: Option<bool>,
}

impl NewProduct {
    /// Validates the input and builds the product record.
    ///
    /// # Errors
    ///
    /// Returns `Validation` for a blank or overlong code, name or unit, and `InvalidAmount`
    /// for negative or unstorable prices.
    pub fn into_product(self, now: DateTime<Utc>) -> Result<Product, LedgerError> {
        if self.code.trim().is_empty() {
            return Err(LedgerError::Validation("product code is required".into()));
        }
        if self.name.trim().is_empty() {
            return Err(LedgerError::Validation("product name is required".into()));
        }
        ensure_max_len("product code", self.code.trim(), MAX_PRODUCT_CODE_LEN)?;
        ensure_max_len("product name", &self.name, MAX_NAME_LEN)?;
        ensure_max_len("unit", &self.unit, MAX_UNIT_LEN)?;
        validate_price("cost price", self.cost_price)?;
        validate_price("sell price", self.sell_price)?;

        Ok(Product {
            id: ProductId::new(),
            code: self.code.trim().to_string(),
            name: self.name,
            unit: self.unit,
            cost_price: self.cost_price,
            sell_price: self.sell_price,
            is_active: true,
            created_at: now,
            updated_at: now,
        })
    }
}

impl Product {
    /// Applies an edit in place.
    ///
    /// # Errors
    ///
    /// Returns `InvalidAmount` for negative or unstorable prices, `Validation` for a blank
    /// or overlong name or unit.
    pub fn apply(&mut self, update: ProductUpdate, now: DateTime<Utc>) -> Result<(), LedgerError> {
        if let Some(name) = update.name {
            if name.trim().is_empty() {
                return Err(LedgerError::Validation("product name is required".into()));
            }
            ensure_max_len("product name", &name, MAX_NAME_LEN)?;
            self.name = name;
        }
        if let Some(unit) = update.unit {
            ensure_max_len("unit", &unit, MAX_UNIT_LEN)?;
            self.unit = unit;
        }
        if let Some(cost_price) = update.cost_price {
            validate_price("cost price", cost_price)?;
            self.cost_price = cost_price;
        }
        if let Some(sell_price) = update.sell_price {
            validate_price("sell price", sell_price)?;
            self.sell_price = sell_price;
        }
        if let Some(is_active) = update.is_active {
            self.is_active = is_active;
        }
        self.updated_at = now;
        Ok(())
    }
}

fn validate_price(field: &str, value: Decimal) -> Result<(), LedgerError> {
    if value < Decimal::ZERO {
        return Err(LedgerError::InvalidAmount(format!("{field} cannot be negative")));
    }
    amount::ensure_storable(field, value)?;
    Ok(())
}

/// Rejects text longer than `max` characters.
///
/// # Errors
///
/// Returns `Validation` naming the field and its limit.
pub fn ensure_max_len(field: &str, value: &str, max: usize) -> Result<(), LedgerError> {
    if value.chars().count() > max {
        return Err(LedgerError::Validation(format!(
            "{field} must be at most {max} characters"
        )));
    }
    Ok(())
}

/// A stock location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Warehouse {
    /// Unique identifier.
    pub id: WarehouseId,
    /// Display name.
    pub name: String,
    /// At most one warehouse is the default at any time.
    pub is_default: bool,
    /// Inactive warehouses cannot receive postings.
    pub is_active: bool,
    /// When the warehouse was created.
    pub created_at: DateTime<Utc>,
}

/// Input for creating a warehouse.
#[derive(Debug, Clone, Deserialize)]
pub struct NewWarehouse {
    /// Display name.
    pub name: String,
    /// Make this the default warehouse.
    #[serde(default)]
    pub is_default: bool,
}

/// Editable warehouse fields.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WarehouseUpdate {
    /// New display name.
    pub name: Option<String>,
    /// Activate or deactivate.
    pub is_active: Option<bool>,
}
