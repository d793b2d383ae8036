//! Initial database migration.
//!
//! Creates the catalog, ledger and document tables, the append-only guards on the two
//! audit logs, and the three posting accounts the default configuration points at.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();

        // ============================================================
        // PART 1: CATALOG
        // ============================================================
        db.execute_unprepared(PRODUCTS_SQL).await?;
        db.execute_unprepared(WAREHOUSES_SQL).await?;

        // ============================================================
        // PART 2: ACCOUNTS
        // ============================================================
        db.execute_unprepared(ACCOUNTS_SQL).await?;

        // ============================================================
        // PART 3: DOCUMENTS
        // ============================================================
        db.execute_unprepared(DOCUMENTS_SQL).await?;
        db.execute_unprepared(DOCUMENT_LINES_SQL).await?;

        // ============================================================
        // PART 4: LEDGERS
        // ============================================================
        db.execute_unprepared(STOCK_LEVELS_SQL).await?;
        db.execute_unprepared(STOCK_MOVEMENTS_SQL).await?;
        db.execute_unprepared(TRANSACTIONS_SQL).await?;

        // ============================================================
        // PART 5: AUDIT GUARDS
        // ============================================================
        db.execute_unprepared(APPEND_ONLY_SQL).await?;

        // ============================================================
        // PART 6: POSTING ACCOUNTS
        // ============================================================
        db.execute_unprepared(POSTING_ACCOUNTS_SQL).await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared(DROP_ALL_SQL).await?;
        Ok(())
    }
}

// ============================================================
// SQL CONSTANTS
// ============================================================

const PRODUCTS_SQL: &str = r"
CREATE TABLE products (
    id UUID PRIMARY KEY,
    code VARCHAR(50) NOT NULL UNIQUE,
    name VARCHAR(255) NOT NULL,
    unit VARCHAR(30) NOT NULL,
    cost_price NUMERIC(19, 4) NOT NULL CHECK (cost_price >= 0),
    sell_price NUMERIC(19, 4) NOT NULL CHECK (sell_price >= 0),
    is_active BOOLEAN NOT NULL DEFAULT true,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
);
";

const WAREHOUSES_SQL: &str = r"
CREATE TABLE warehouses (
    id UUID PRIMARY KEY,
    name VARCHAR(255) NOT NULL,
    is_default BOOLEAN NOT NULL DEFAULT false,
    is_active BOOLEAN NOT NULL DEFAULT true,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now()
);

-- At most one default warehouse
CREATE UNIQUE INDEX idx_warehouses_single_default ON warehouses (is_default) WHERE is_default;
";

const ACCOUNTS_SQL: &str = r"
CREATE TABLE accounts (
    id UUID PRIMARY KEY,
    code VARCHAR(30) NOT NULL UNIQUE,
    name VARCHAR(255) NOT NULL,
    account_type VARCHAR(20) NOT NULL CHECK (account_type IN (
        'customer', 'supplier', 'cash', 'asset', 'revenue', 'expense', 'equity'
    )),
    current_balance NUMERIC(19, 4) NOT NULL DEFAULT 0,
    is_active BOOLEAN NOT NULL DEFAULT true,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
);

CREATE INDEX idx_accounts_type ON accounts (account_type) WHERE is_active;
";

const DOCUMENTS_SQL: &str = r"
CREATE TABLE documents (
    id UUID PRIMARY KEY,
    document_number VARCHAR(50) NOT NULL UNIQUE,
    kind VARCHAR(20) NOT NULL CHECK (kind IN ('sale', 'purchase')),
    account_id UUID NOT NULL REFERENCES accounts(id),
    warehouse_id UUID NOT NULL REFERENCES warehouses(id),
    date DATE NOT NULL,
    status VARCHAR(20) NOT NULL DEFAULT 'draft' CHECK (status IN ('draft', 'posted', 'cancelled')),
    total NUMERIC(19, 4) NOT NULL DEFAULT 0,
    notes TEXT,
    posted_at TIMESTAMPTZ,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CHECK ((status = 'draft') = (posted_at IS NULL) OR status = 'cancelled')
);

CREATE INDEX idx_documents_account ON documents (account_id);
CREATE INDEX idx_documents_kind_status ON documents (kind, status);
";

const DOCUMENT_LINES_SQL: &str = r"
CREATE TABLE document_lines (
    document_id UUID NOT NULL REFERENCES documents(id) ON DELETE CASCADE,
    line_no INTEGER NOT NULL,
    product_id UUID NOT NULL REFERENCES products(id),
    quantity NUMERIC(19, 4) NOT NULL CHECK (quantity > 0),
    unit_price NUMERIC(19, 4) NOT NULL CHECK (unit_price >= 0),
    line_total NUMERIC(19, 4) NOT NULL,
    PRIMARY KEY (document_id, line_no)
);

CREATE INDEX idx_document_lines_product ON document_lines (product_id);
";

const STOCK_LEVELS_SQL: &str = r"
CREATE TABLE stock_levels (
    product_id UUID NOT NULL REFERENCES products(id),
    warehouse_id UUID NOT NULL REFERENCES warehouses(id),
    quantity NUMERIC(19, 4) NOT NULL DEFAULT 0,
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    PRIMARY KEY (product_id, warehouse_id)
);
";

const STOCK_MOVEMENTS_SQL: &str = r"
CREATE TABLE stock_movements (
    id UUID PRIMARY KEY,
    product_id UUID NOT NULL REFERENCES products(id),
    warehouse_id UUID NOT NULL REFERENCES warehouses(id),
    delta NUMERIC(19, 4) NOT NULL,
    quantity_after NUMERIC(19, 4) NOT NULL,
    kind VARCHAR(20) NOT NULL CHECK (kind IN (
        'purchase', 'sale', 'adjustment', 'transfer-in', 'transfer-out'
    )),
    document_id UUID REFERENCES documents(id),
    document_kind VARCHAR(20),
    note TEXT,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CHECK ((document_id IS NULL) = (document_kind IS NULL))
);

CREATE INDEX idx_stock_movements_cell ON stock_movements (product_id, warehouse_id, created_at DESC);
CREATE INDEX idx_stock_movements_document ON stock_movements (document_id) WHERE document_id IS NOT NULL;
";

const TRANSACTIONS_SQL: &str = r"
CREATE TABLE transactions (
    id UUID PRIMARY KEY,
    account_id UUID NOT NULL REFERENCES accounts(id),
    transaction_type VARCHAR(20) NOT NULL CHECK (transaction_type IN ('credit', 'debit', 'journal')),
    is_debit BOOLEAN NOT NULL,
    amount NUMERIC(19, 4) NOT NULL CHECK (amount > 0),
    balance_after NUMERIC(19, 4) NOT NULL,
    date DATE NOT NULL,
    payment_method VARCHAR(20),
    reference VARCHAR(100),
    document_id UUID REFERENCES documents(id),
    notes TEXT,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now()
);

CREATE INDEX idx_transactions_account ON transactions (account_id, created_at DESC);
CREATE INDEX idx_transactions_document ON transactions (document_id) WHERE document_id IS NOT NULL;
";

const APPEND_ONLY_SQL: &str = r"
-- ============================================================
-- FUNCTION: prevent_audit_modification
-- Stock movements and account transactions are never edited or removed
-- ============================================================
CREATE OR REPLACE FUNCTION prevent_audit_modification()
RETURNS TRIGGER AS $$
BEGIN
    RAISE EXCEPTION 'Rows in % are append-only. Record a compensating entry instead.', TG_TABLE_NAME;
END;
$$ LANGUAGE plpgsql;

CREATE TRIGGER trg_stock_movements_append_only
BEFORE UPDATE OR DELETE ON stock_movements
FOR EACH ROW
EXECUTE FUNCTION prevent_audit_modification();

CREATE TRIGGER trg_transactions_append_only
BEFORE UPDATE OR DELETE ON transactions
FOR EACH ROW
EXECUTE FUNCTION prevent_audit_modification();
";

const POSTING_ACCOUNTS_SQL: &str = r"
INSERT INTO accounts (id, code, name, account_type) VALUES
    ('0190a1b2-0000-7000-8000-000000000001', '1300', 'Inventory', 'asset'),
    ('0190a1b2-0000-7000-8000-000000000002', '4000', 'Sales Revenue', 'revenue'),
    ('0190a1b2-0000-7000-8000-000000000003', '5000', 'Cost of Goods Sold', 'expense');
";

const DROP_ALL_SQL: &str = r"
-- ============================================================
-- DROP ALL: Rollback migration
-- Order matters due to foreign key constraints
-- ============================================================

DROP TRIGGER IF EXISTS trg_transactions_append_only ON transactions;
DROP TRIGGER IF EXISTS trg_stock_movements_append_only ON stock_movements;
DROP FUNCTION IF EXISTS prevent_audit_modification();

DROP TABLE IF EXISTS transactions;
DROP TABLE IF EXISTS stock_movements;
DROP TABLE IF EXISTS stock_levels;
DROP TABLE IF EXISTS document_lines;
DROP TABLE IF EXISTS documents;
DROP TABLE IF EXISTS accounts;
DROP TABLE IF EXISTS warehouses;
DROP TABLE IF EXISTS products;
";
