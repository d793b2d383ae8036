//! Sales and purchase document types.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use makhzan_shared::types::{AccountId, DocumentId, ProductId, WarehouseId};

use crate::amount;
use crate::error::LedgerError;
use crate::stock::MovementKind;

/// Whether a document sells to a customer or buys from a supplier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentKind {
    /// Sales invoice: stock out, receivable in.
    Sale,
    /// Purchase: stock in, payable in.
    Purchase,
}

impl DocumentKind {
    /// Stable string form used in storage and the API.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Sale => "sale",
            Self::Purchase => "purchase",
        }
    }

    /// Prefix of generated document numbers. Presentation only; never parsed back.
    #[must_use]
    pub const fn number_prefix(self) -> &'static str {
        match self {
            Self::Sale => "INV-",
            Self::Purchase => "PUR-",
        }
    }

    /// Kind of the stock movements this document produces.
    #[must_use]
    pub const fn movement_kind(self) -> MovementKind {
        match self {
            Self::Sale => MovementKind::Sale,
            Self::Purchase => MovementKind::Purchase,
        }
    }
}

impl std::fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for DocumentKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "sale" => Ok(Self::Sale),
            "purchase" => Ok(Self::Purchase),
            _ => Err(format!("Unknown document kind: {s}")),
        }
    }
}

/// Document lifecycle status.
///
/// ```text
/// Draft ──post──► Posted
///   │
///   └──delete──► (gone)
/// ```
///
/// `Cancelled` is reserved for compensating reversals and is never entered by posting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentStatus {
    /// Editable, no ledger effect yet.
    Draft,
    /// Stock movements and journal entries recorded; immutable.
    Posted,
    /// Reversed by compensating records; immutable.
    Cancelled,
}

impl DocumentStatus {
    /// Only drafts can be edited, deleted or posted.
    #[must_use]
    pub const fn is_editable(self) -> bool {
        matches!(self, Self::Draft)
    }

    /// Stable string form used in storage and the API.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Posted => "posted",
            Self::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for DocumentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for DocumentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "draft" => Ok(Self::Draft),
            "posted" => Ok(Self::Posted),
            "cancelled" => Ok(Self::Cancelled),
            _ => Err(format!("Unknown document status: {s}")),
        }
    }
}

/// One line of a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentLine {
    /// The product.
    pub product_id: ProductId,
    /// Quantity, always positive.
    pub quantity: Decimal,
    /// Unit price (sell price for sales, cost for purchases).
    pub unit_price: Decimal,
    /// `quantity × unit_price`, rounded to four places.
    pub line_total: Decimal,
}

/// Caller-supplied line; totals are computed, never accepted.
#[derive(Debug, Clone, Deserialize)]
pub struct DocumentLineInput {
    /// The product.
    pub product_id: ProductId,
    /// Quantity.
    pub quantity: Decimal,
    /// Unit price.
    pub unit_price: Decimal,
}

impl DocumentLineInput {
    /// Validates the line and computes its total.
    ///
    /// # Errors
    ///
    /// Returns `InvalidAmount` for a non-positive quantity, a negative unit price, or a
    /// value (input or total) that does not fit a stored column.
    pub fn into_line(self) -> Result<DocumentLine, LedgerError> {
        if self.quantity <= Decimal::ZERO {
            return Err(LedgerError::InvalidAmount(format!(
                "line quantity must be positive, got {}",
                self.quantity
            )));
        }
        if self.unit_price < Decimal::ZERO {
            return Err(LedgerError::InvalidAmount(format!(
                "unit price cannot be negative, got {}",
                self.unit_price
            )));
        }
        amount::ensure_storable("line quantity", self.quantity)?;
        amount::ensure_storable("unit price", self.unit_price)?;
        Ok(DocumentLine {
            product_id: self.product_id,
            quantity: self.quantity,
            unit_price: self.unit_price,
            line_total: amount::mul("line total", self.quantity, self.unit_price)?,
        })
    }
}

/// Builds validated lines and their grand total.
///
/// # Errors
///
/// Returns the first line's validation error, or `InvalidAmount` when the grand total
/// does not fit a stored column.
pub fn build_lines(
    inputs: Vec<DocumentLineInput>,
) -> Result<(Vec<DocumentLine>, Decimal), LedgerError> {
    let lines = inputs
        .into_iter()
        .map(DocumentLineInput::into_line)
        .collect::<Result<Vec<_>, _>>()?;
    let total = amount::sum("document total", lines.iter().map(|line| line.line_total))?;
    Ok((lines, total))
}

/// Longest accepted document number.
pub const MAX_DOCUMENT_NUMBER_LEN: usize = 50;

/// A sales invoice or purchase with its lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    /// Unique identifier.
    pub id: DocumentId,
    /// Human-facing number, unique across all documents.
    pub document_number: String,
    /// Sale or purchase.
    pub kind: DocumentKind,
    /// Customer (sales) or supplier (purchases).
    pub account_id: AccountId,
    /// Warehouse stock moves in or out of.
    pub warehouse_id: WarehouseId,
    /// Business date, also used as the journal date.
    pub date: NaiveDate,
    /// Lifecycle status.
    pub status: DocumentStatus,
    /// Lines in entry order.
    pub lines: Vec<DocumentLine>,
    /// Sum of line totals.
    pub total: Decimal,
    /// Free-text notes.
    pub notes: Option<String>,
    /// When the document was posted.
    pub posted_at: Option<DateTime<Utc>>,
    /// When the draft was created.
    pub created_at: DateTime<Utc>,
    /// When the document last changed.
    pub updated_at: DateTime<Utc>,
}

impl Document {
    /// Applies a draft update, recomputing totals when lines change.
    ///
    /// # Errors
    ///
    /// Returns `DocumentNotEditable` unless the document is a draft, or a line validation error.
    pub fn apply(&mut self, update: DocumentUpdate, now: DateTime<Utc>) -> Result<(), LedgerError> {
        self.ensure_editable()?;

        if let Some(lines) = update.lines {
            let (lines, total) = build_lines(lines)?;
            self.lines = lines;
            self.total = total;
        }
        if let Some(account_id) = update.account_id {
            self.account_id = account_id;
        }
        if let Some(warehouse_id) = update.warehouse_id {
            self.warehouse_id = warehouse_id;
        }
        if let Some(date) = update.date {
            self.date = date;
        }
        if update.notes.is_some() {
            self.notes = update.notes;
        }
        self.updated_at = now;
        Ok(())
    }

    /// Fails unless the document is still a draft.
    ///
    /// # Errors
    ///
    /// Returns `DocumentNotEditable`.
    pub fn ensure_editable(&self) -> Result<(), LedgerError> {
        if self.status.is_editable() {
            Ok(())
        } else {
            Err(LedgerError::DocumentNotEditable {
                id: self.id,
                status: self.status,
            })
        }
    }
}

/// Input for creating a draft document.
#[derive(Debug, Clone, Deserialize)]
pub struct NewDocument {
    /// Explicit number; generated from the kind's prefix when absent.
    #[serde(default)]
    pub document_number: Option<String>,
    /// Sale or purchase.
    pub kind: DocumentKind,
    /// Customer or supplier.
    pub account_id: AccountId,
    /// Warehouse; the default warehouse when absent.
    #[serde(default)]
    pub warehouse_id: Option<WarehouseId>,
    /// Business date.
    pub date: NaiveDate,
    /// Lines.
    pub lines: Vec<DocumentLineInput>,
    /// Free-text notes.
    #[serde(default)]
    pub notes: Option<String>,
}

/// Partial update of a draft document.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DocumentUpdate {
    /// New counterparty.
    pub account_id: Option<AccountId>,
    /// New warehouse.
    pub warehouse_id: Option<WarehouseId>,
    /// New date.
    pub date: Option<NaiveDate>,
    /// Replacement lines.
    pub lines: Option<Vec<DocumentLineInput>>,
    /// New notes.
    pub notes: Option<String>,
}

/// Filter for listing documents.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DocumentFilter {
    /// Only this kind.
    pub kind: Option<DocumentKind>,
    /// Only this status.
    pub status: Option<DocumentStatus>,
    /// Only this counterparty.
    pub account_id: Option<AccountId>,
}

impl DocumentFilter {
    /// Returns true if the document passes the filter.
    #[must_use]
    pub fn matches(&self, document: &Document) -> bool {
        self.kind.is_none_or(|kind| document.kind == kind)
            && self.status.is_none_or(|status| document.status == status)
            && self.account_id.is_none_or(|id| document.account_id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn line(quantity: Decimal, unit_price: Decimal) -> DocumentLineInput {
        DocumentLineInput {
            product_id: ProductId::new(),
            quantity,
            unit_price,
        }
    }

    fn draft() -> Document {
        let (lines, total) = build_lines(vec![line(dec!(4), dec!(20))]).unwrap();
        Document {
            id: DocumentId::new(),
            document_number: "INV-1".into(),
            kind: DocumentKind::Sale,
            account_id: AccountId::new(),
            warehouse_id: WarehouseId::new(),
            date: NaiveDate::from_ymd_opt(2026, 2, 1).unwrap(),
            status: DocumentStatus::Draft,
            lines,
            total,
            notes: None,
            posted_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_build_lines_totals() {
        let (lines, total) =
            build_lines(vec![line(dec!(4), dec!(20)), line(dec!(1.5), dec!(10))]).unwrap();
        assert_eq!(lines[0].line_total, dec!(80));
        assert_eq!(lines[1].line_total, dec!(15));
        assert_eq!(total, dec!(95));
    }

    #[test]
    fn test_line_rejects_bad_amounts() {
        assert!(matches!(
            line(dec!(0), dec!(1)).into_line(),
            Err(LedgerError::InvalidAmount(_))
        ));
        assert!(matches!(
            line(dec!(-1), dec!(1)).into_line(),
            Err(LedgerError::InvalidAmount(_))
        ));
        assert!(matches!(
            line(dec!(1), dec!(-0.01)).into_line(),
            Err(LedgerError::InvalidAmount(_))
        ));
        assert!(line(dec!(1), dec!(0)).into_line().is_ok());
    }

    #[test]
    fn test_line_rejects_values_outside_column_range() {
        for (quantity, unit_price) in [
            (dec!(0.00001), dec!(1)),
            (dec!(1), dec!(0.12345)),
            (dec!(1000000000000000), dec!(1)),
            (dec!(100000000000000000000), dec!(10000000000)),
            (dec!(100000000), dec!(100000000)),
        ] {
            assert!(
                matches!(
                    line(quantity, unit_price).into_line(),
                    Err(LedgerError::InvalidAmount(_))
                ),
                "{quantity} x {unit_price}"
            );
        }
    }

    #[test]
    fn test_line_total_is_rounded_to_four_places() {
        let line = line(dec!(0.3333), dec!(0.0005)).into_line().unwrap();
        assert_eq!(line.line_total, dec!(0.0002));
    }

    #[test]
    fn test_grand_total_out_of_range_is_rejected() {
        let big = || line(dec!(1), dec!(600000000000000));
        assert!(matches!(
            build_lines(vec![big(), big()]),
            Err(LedgerError::InvalidAmount(_))
        ));
    }

    #[test]
    fn test_apply_update_recomputes_total() {
        let mut document = draft();
        let update = DocumentUpdate {
            lines: Some(vec![line(dec!(2), dec!(3))]),
            notes: Some("revised".into()),
            ..DocumentUpdate::default()
        };
        document.apply(update, Utc::now()).unwrap();
        assert_eq!(document.total, dec!(6));
        assert_eq!(document.notes.as_deref(), Some("revised"));
    }

    #[test]
    fn test_posted_document_not_editable() {
        let mut document = draft();
        document.status = DocumentStatus::Posted;
        let err = document.apply(DocumentUpdate::default(), Utc::now()).unwrap_err();
        assert!(matches!(
            err,
            LedgerError::DocumentNotEditable {
                status: DocumentStatus::Posted,
                ..
            }
        ));
    }

    #[test]
    fn test_filter_matches() {
        let document = draft();
        assert!(DocumentFilter::default().matches(&document));
        let filter = DocumentFilter {
            kind: Some(DocumentKind::Purchase),
            ..DocumentFilter::default()
        };
        assert!(!filter.matches(&document));
        let filter = DocumentFilter {
            status: Some(DocumentStatus::Draft),
            account_id: Some(document.account_id),
            ..DocumentFilter::default()
        };
        assert!(filter.matches(&document));
    }

    #[test]
    fn test_kind_prefix_and_movement() {
        assert_eq!(DocumentKind::Sale.number_prefix(), "INV-");
        assert_eq!(DocumentKind::Purchase.number_prefix(), "PUR-");
        assert_eq!(DocumentKind::Sale.movement_kind(), MovementKind::Sale);
        assert_eq!("posted".parse::<DocumentStatus>().unwrap(), DocumentStatus::Posted);
    }
}
