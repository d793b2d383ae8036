//! Conversions between `SeaORM` models and domain records.
//!
//! Enum columns are stored as their stable string forms; a value that does not parse is
//! reported as a storage error rather than defaulted.

use std::str::FromStr;

use chrono::{DateTime, FixedOffset, Utc};
use sea_orm::ActiveValue::Set;

use makhzan_core::account::{Account, Transaction};
use makhzan_core::catalog::{Product, Warehouse};
use makhzan_core::document::{Document, DocumentLine};
use makhzan_core::stock::{DocumentRef, StockLevel, StockMovement};
use makhzan_core::store::StoreError;
use makhzan_shared::types::{
    AccountId, DocumentId, ProductId, StockMovementId, TransactionId, WarehouseId,
};

use crate::entities::{
    accounts, document_lines, documents, products, stock_levels, stock_movements, transactions,
    warehouses,
};

fn parse<T: FromStr<Err = String>>(column: &str, value: &str) -> Result<T, StoreError> {
    value
        .parse()
        .map_err(|e: String| StoreError::database(format!("invalid {column} '{value}': {e}")))
}

fn utc(value: DateTime<FixedOffset>) -> DateTime<Utc> {
    value.with_timezone(&Utc)
}

fn fixed(value: DateTime<Utc>) -> DateTime<FixedOffset> {
    value.fixed_offset()
}

// ========== Products ==========

pub(crate) fn product(model: products::Model) -> Product {
    Product {
        id: ProductId::from_uuid(model.id),
        code: model.code,
        name: model.name,
        unit: model.unit,
        cost_price: model.cost_price,
        sell_price: model.sell_price,
        is_active: model.is_active,
        created_at: utc(model.created_at),
        updated_at: utc(model.updated_at),
    }
}

pub(crate) fn product_model(product: &Product) -> products::ActiveModel {
    products::ActiveModel {
        id: Set(product.id.into_inner()),
        code: Set(product.code.clone()),
        name: Set(product.name.clone()),
        unit: Set(product.unit.clone()),
        cost_price: Set(product.cost_price),
        sell_price: Set(product.sell_price),
        is_active: Set(product.is_active),
        created_at: Set(fixed(product.created_at)),
        updated_at: Set(fixed(product.updated_at)),
    }
}

// ========== Warehouses ==========

pub(crate) fn warehouse(model: warehouses::Model) -> Warehouse {
    Warehouse {
        id: WarehouseId::from_uuid(model.id),
        name: model.name,
        is_default: model.is_default,
        is_active: model.is_active,
        created_at: utc(model.created_at),
    }
}

pub(crate) fn warehouse_model(warehouse: &Warehouse) -> warehouses::ActiveModel {
    warehouses::ActiveModel {
        id: Set(warehouse.id.into_inner()),
        name: Set(warehouse.name.clone()),
        is_default: Set(warehouse.is_default),
        is_active: Set(warehouse.is_active),
        created_at: Set(fixed(warehouse.created_at)),
    }
}

// ========== Accounts ==========

pub(crate) fn account(model: accounts::Model) -> Result<Account, StoreError> {
    Ok(Account {
        id: AccountId::from_uuid(model.id),
        account_type: parse("account_type", &model.account_type)?,
        code: model.code,
        name: model.name,
        current_balance: model.current_balance,
        is_active: model.is_active,
        created_at: utc(model.created_at),
        updated_at: utc(model.updated_at),
    })
}

pub(crate) fn account_model(account: &Account) -> accounts::ActiveModel {
    accounts::ActiveModel {
        id: Set(account.id.into_inner()),
        code: Set(account.code.clone()),
        name: Set(account.name.clone()),
        account_type: Set(account.account_type.as_str().to_string()),
        current_balance: Set(account.current_balance),
        is_active: Set(account.is_active),
        created_at: Set(fixed(account.created_at)),
        updated_at: Set(fixed(account.updated_at)),
    }
}

pub(crate) fn transaction(model: transactions::Model) -> Result<Transaction, StoreError> {
    Ok(Transaction {
        id: TransactionId::from_uuid(model.id),
        account_id: AccountId::from_uuid(model.account_id),
        transaction_type: parse("transaction_type", &model.transaction_type)?,
        is_debit: model.is_debit,
        amount: model.amount,
        balance_after: model.balance_after,
        date: model.date,
        payment_method: model
            .payment_method
            .as_deref()
            .map(|method| parse("payment_method", method))
            .transpose()?,
        reference: model.reference,
        document_id: model.document_id.map(DocumentId::from_uuid),
        notes: model.notes,
        created_at: utc(model.created_at),
    })
}

pub(crate) fn transaction_model(transaction: &Transaction) -> transactions::ActiveModel {
    transactions::ActiveModel {
        id: Set(transaction.id.into_inner()),
        account_id: Set(transaction.account_id.into_inner()),
        transaction_type: Set(transaction.transaction_type.as_str().to_string()),
        is_debit: Set(transaction.is_debit),
        amount: Set(transaction.amount),
        balance_after: Set(transaction.balance_after),
        date: Set(transaction.date),
        payment_method: Set(transaction.payment_method.map(|m| m.as_str().to_string())),
        reference: Set(transaction.reference.clone()),
        document_id: Set(transaction.document_id.map(DocumentId::into_inner)),
        notes: Set(transaction.notes.clone()),
        created_at: Set(fixed(transaction.created_at)),
    }
}

// ========== Stock ==========

pub(crate) fn stock_level(model: stock_levels::Model) -> StockLevel {
    StockLevel {
        product_id: ProductId::from_uuid(model.product_id),
        warehouse_id: WarehouseId::from_uuid(model.warehouse_id),
        quantity: model.quantity,
        updated_at: utc(model.updated_at),
    }
}

pub(crate) fn stock_level_model(level: &StockLevel) -> stock_levels::ActiveModel {
    stock_levels::ActiveModel {
        product_id: Set(level.product_id.into_inner()),
        warehouse_id: Set(level.warehouse_id.into_inner()),
        quantity: Set(level.quantity),
        updated_at: Set(fixed(level.updated_at)),
    }
}

pub(crate) fn movement(model: stock_movements::Model) -> Result<StockMovement, StoreError> {
    let document = match (model.document_id, model.document_kind.as_deref()) {
        (Some(id), Some(kind)) => Some(DocumentRef {
            document_id: DocumentId::from_uuid(id),
            kind: parse("document_kind", kind)?,
        }),
        _ => None,
    };
    Ok(StockMovement {
        id: StockMovementId::from_uuid(model.id),
        product_id: ProductId::from_uuid(model.product_id),
        warehouse_id: WarehouseId::from_uuid(model.warehouse_id),
        delta: model.delta,
        quantity_after: model.quantity_after,
        kind: parse("movement kind", &model.kind)?,
        document,
        note: model.note,
        created_at: utc(model.created_at),
    })
}

pub(crate) fn movement_model(movement: &StockMovement) -> stock_movements::ActiveModel {
    stock_movements::ActiveModel {
        id: Set(movement.id.into_inner()),
        product_id: Set(movement.product_id.into_inner()),
        warehouse_id: Set(movement.warehouse_id.into_inner()),
        delta: Set(movement.delta),
        quantity_after: Set(movement.quantity_after),
        kind: Set(movement.kind.as_str().to_string()),
        document_id: Set(movement.document.map(|d| d.document_id.into_inner())),
        document_kind: Set(movement.document.map(|d| d.kind.as_str().to_string())),
        note: Set(movement.note.clone()),
        created_at: Set(fixed(movement.created_at)),
    }
}

// ========== Documents ==========

pub(crate) fn document(
    model: documents::Model,
    lines: Vec<document_lines::Model>,
) -> Result<Document, StoreError> {
    Ok(Document {
        id: DocumentId::from_uuid(model.id),
        document_number: model.document_number,
        kind: parse("document kind", &model.kind)?,
        account_id: AccountId::from_uuid(model.account_id),
        warehouse_id: WarehouseId::from_uuid(model.warehouse_id),
        date: model.date,
        status: parse("document status", &model.status)?,
        lines: lines
            .into_iter()
            .map(|line| DocumentLine {
                product_id: ProductId::from_uuid(line.product_id),
                quantity: line.quantity,
                unit_price: line.unit_price,
                line_total: line.line_total,
            })
            .collect(),
        total: model.total,
        notes: model.notes,
        posted_at: model.posted_at.map(utc),
        created_at: utc(model.created_at),
        updated_at: utc(model.updated_at),
    })
}

pub(crate) fn document_model(document: &Document) -> documents::ActiveModel {
    documents::ActiveModel {
        id: Set(document.id.into_inner()),
        document_number: Set(document.document_number.clone()),
        kind: Set(document.kind.as_str().to_string()),
        account_id: Set(document.account_id.into_inner()),
        warehouse_id: Set(document.warehouse_id.into_inner()),
        date: Set(document.date),
        status: Set(document.status.as_str().to_string()),
        total: Set(document.total),
        notes: Set(document.notes.clone()),
        posted_at: Set(document.posted_at.map(fixed)),
        created_at: Set(fixed(document.created_at)),
        updated_at: Set(fixed(document.updated_at)),
    }
}

pub(crate) fn line_models(document: &Document) -> Result<Vec<document_lines::ActiveModel>, StoreError> {
    document
        .lines
        .iter()
        .enumerate()
        .map(|(index, line)| {
            let line_no = i32::try_from(index + 1)
                .map_err(|_| StoreError::database("document has too many lines"))?;
            Ok(document_lines::ActiveModel {
                document_id: Set(document.id.into_inner()),
                line_no: Set(line_no),
                product_id: Set(line.product_id.into_inner()),
                quantity: Set(line.quantity),
                unit_price: Set(line.unit_price),
                line_total: Set(line.line_total),
            })
        })
        .collect()
}
