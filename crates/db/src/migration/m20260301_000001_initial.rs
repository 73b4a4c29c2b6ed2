//! Initial database migration.
//!
//! Creates the catalog, balance, ledger, idempotency and cash-close tables,
//! their enums, and the trigger that keeps the ledger append-only.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();

        // ============================================================
        // PART 1: ENUMS
        // ============================================================
        db.execute_unprepared(ENUMS_SQL).await?;

        // ============================================================
        // PART 2: CATALOG
        // ============================================================
        db.execute_unprepared(POINTS_SQL).await?;
        db.execute_unprepared(CURRENCIES_SQL).await?;
        db.execute_unprepared(POINT_ASSIGNMENTS_SQL).await?;

        // ============================================================
        // PART 3: BALANCES
        // ============================================================
        db.execute_unprepared(BALANCES_SQL).await?;
        db.execute_unprepared(SERVICE_BALANCES_SQL).await?;

        // ============================================================
        // PART 4: LEDGER
        // ============================================================
        db.execute_unprepared(BUSINESS_REFERENCES_SQL).await?;
        db.execute_unprepared(MOVEMENTS_SQL).await?;
        db.execute_unprepared(IDEMPOTENCY_KEYS_SQL).await?;

        // ============================================================
        // PART 5: CASH CLOSE
        // ============================================================
        db.execute_unprepared(CASH_CLOSES_SQL).await?;
        db.execute_unprepared(CASH_CLOSE_DETAILS_SQL).await?;

        // ============================================================
        // PART 6: TRIGGERS & FUNCTIONS
        // ============================================================
        db.execute_unprepared(TRIGGERS_SQL).await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared(DROP_ALL_SQL).await?;
        Ok(())
    }
}

// ============================================================
// SQL DEFINITIONS
// ============================================================

const ENUMS_SQL: &str = r"
CREATE TYPE movement_direction AS ENUM ('INCOME', 'EXPENSE', 'ADJUSTMENT');

CREATE TYPE balance_bucket AS ENUM ('CASH', 'BANK');

CREATE TYPE reference_type AS ENUM (
    'EXCHANGE',
    'TRANSFER',
    'EXTERNAL_SERVICE',
    'ADJUSTMENT'
);

CREATE TYPE external_service AS ENUM (
    'SERVIENTREGA',
    'WESTERN_UNION',
    'YA_GANASTE',
    'BANCO_GUAYAQUIL',
    'PRODUBANCO',
    'BANCO_PACIFICO'
);

CREATE TYPE cash_close_status AS ENUM ('OPEN', 'PARTIAL', 'CLOSED');
";

const POINTS_SQL: &str = r"
CREATE TABLE points (
    id UUID PRIMARY KEY,
    code VARCHAR(20) NOT NULL UNIQUE,
    name VARCHAR(255) NOT NULL,
    is_active BOOLEAN NOT NULL DEFAULT true,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);
";

const CURRENCIES_SQL: &str = r"
CREATE TABLE currencies (
    id UUID PRIMARY KEY,
    code VARCHAR(3) NOT NULL UNIQUE,
    name VARCHAR(100) NOT NULL,
    display_order INTEGER NOT NULL DEFAULT 0,
    is_active BOOLEAN NOT NULL DEFAULT true,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);
";

const POINT_ASSIGNMENTS_SQL: &str = r"
CREATE TABLE point_assignments (
    id UUID PRIMARY KEY,
    actor_id UUID NOT NULL,
    point_id UUID NOT NULL REFERENCES points(id),
    started_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    ended_at TIMESTAMPTZ,

    CONSTRAINT chk_assignment_period CHECK (ended_at IS NULL OR ended_at >= started_at)
);

CREATE UNIQUE INDEX uq_point_assignments_active ON point_assignments(actor_id)
    WHERE ended_at IS NULL;
CREATE INDEX idx_point_assignments_point ON point_assignments(point_id);
";

const BALANCES_SQL: &str = r"
CREATE TABLE balances (
    id UUID PRIMARY KEY,
    point_id UUID NOT NULL REFERENCES points(id),
    currency_id UUID NOT NULL REFERENCES currencies(id),
    quantity NUMERIC(19, 4) NOT NULL DEFAULT 0,
    cash_bills NUMERIC(19, 4) NOT NULL DEFAULT 0,
    cash_coins NUMERIC(19, 4) NOT NULL DEFAULT 0,
    bank NUMERIC(19, 4) NOT NULL DEFAULT 0,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),

    CONSTRAINT uq_balances_point_currency UNIQUE (point_id, currency_id),
    CONSTRAINT chk_balances_consistent
        CHECK (ABS(quantity - (cash_bills + cash_coins + bank)) <= 0.01)
);
";

const SERVICE_BALANCES_SQL: &str = r"
CREATE TABLE service_balances (
    id UUID PRIMARY KEY,
    point_id UUID NOT NULL REFERENCES points(id),
    service external_service NOT NULL,
    currency_id UUID NOT NULL REFERENCES currencies(id),
    quantity NUMERIC(19, 4) NOT NULL DEFAULT 0,
    cash_bills NUMERIC(19, 4) NOT NULL DEFAULT 0,
    cash_coins NUMERIC(19, 4) NOT NULL DEFAULT 0,
    bank NUMERIC(19, 4) NOT NULL DEFAULT 0,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),

    CONSTRAINT uq_service_balances_point_service_currency
        UNIQUE (point_id, service, currency_id),
    CONSTRAINT chk_service_balances_consistent
        CHECK (ABS(quantity - (cash_bills + cash_coins + bank)) <= 0.01)
);
";

const BUSINESS_REFERENCES_SQL: &str = r"
CREATE TABLE business_references (
    reference_type reference_type NOT NULL,
    reference_id UUID NOT NULL,
    point_id UUID REFERENCES points(id),
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),

    PRIMARY KEY (reference_type, reference_id)
);
";

const MOVEMENTS_SQL: &str = r"
CREATE TABLE movements (
    id UUID PRIMARY KEY,
    seq BIGINT GENERATED ALWAYS AS IDENTITY UNIQUE,
    point_id UUID NOT NULL REFERENCES points(id),
    currency_id UUID NOT NULL REFERENCES currencies(id),
    service external_service,
    direction movement_direction NOT NULL,
    bucket balance_bucket NOT NULL,
    amount NUMERIC(19, 4) NOT NULL,
    bills_delta NUMERIC(19, 4) NOT NULL DEFAULT 0,
    coins_delta NUMERIC(19, 4) NOT NULL DEFAULT 0,
    balance_before NUMERIC(19, 4) NOT NULL,
    balance_after NUMERIC(19, 4) NOT NULL,
    reference_type reference_type NOT NULL,
    reference_id UUID NOT NULL,
    actor_id UUID NOT NULL,
    description TEXT,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),

    CONSTRAINT chk_movements_amount_positive CHECK (amount > 0),
    CONSTRAINT chk_movements_bank_no_breakdown
        CHECK (bucket = 'CASH' OR (bills_delta = 0 AND coins_delta = 0))
);

CREATE INDEX idx_movements_balance_seq ON movements(point_id, currency_id, service, seq);
CREATE INDEX idx_movements_point_created ON movements(point_id, created_at);
CREATE INDEX idx_movements_reference ON movements(reference_type, reference_id);
";

const IDEMPOTENCY_KEYS_SQL: &str = r"
CREATE TABLE idempotency_keys (
    actor_id UUID NOT NULL,
    key VARCHAR(255) NOT NULL,
    movement_ids JSONB NOT NULL DEFAULT '[]'::jsonb,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),

    PRIMARY KEY (actor_id, key)
);
";

const CASH_CLOSES_SQL: &str = r"
CREATE TABLE cash_closes (
    id UUID PRIMARY KEY,
    point_id UUID NOT NULL REFERENCES points(id),
    business_date DATE NOT NULL,
    status cash_close_status NOT NULL DEFAULT 'OPEN',
    opened_by UUID NOT NULL,
    opened_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    closed_by UUID,
    closed_at TIMESTAMPTZ,
    total_income NUMERIC(19, 4) NOT NULL DEFAULT 0,
    total_expense NUMERIC(19, 4) NOT NULL DEFAULT 0,
    movement_count BIGINT NOT NULL DEFAULT 0,
    notes TEXT,
    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),

    CONSTRAINT uq_cash_closes_point_date UNIQUE (point_id, business_date),
    CONSTRAINT chk_cash_closes_closed
        CHECK ((status = 'CLOSED') = (closed_at IS NOT NULL))
);

CREATE UNIQUE INDEX uq_cash_closes_active ON cash_closes(point_id)
    WHERE status <> 'CLOSED';
";

const CASH_CLOSE_DETAILS_SQL: &str = r"
CREATE TABLE cash_close_details (
    id UUID PRIMARY KEY,
    cash_close_id UUID NOT NULL REFERENCES cash_closes(id) ON DELETE CASCADE,
    currency_id UUID NOT NULL REFERENCES currencies(id),
    opening_balance NUMERIC(19, 4) NOT NULL DEFAULT 0,
    theoretical_closing_balance NUMERIC(19, 4) NOT NULL DEFAULT 0,
    physical_count NUMERIC(19, 4),
    cash_bills NUMERIC(19, 4) NOT NULL DEFAULT 0,
    cash_coins NUMERIC(19, 4) NOT NULL DEFAULT 0,
    difference NUMERIC(19, 4),
    period_income NUMERIC(19, 4) NOT NULL DEFAULT 0,
    period_expense NUMERIC(19, 4) NOT NULL DEFAULT 0,
    period_movement_count BIGINT NOT NULL DEFAULT 0,
    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),

    CONSTRAINT uq_cash_close_details_currency UNIQUE (cash_close_id, currency_id)
);
";

const TRIGGERS_SQL: &str = r"
-- Ledger rows are immutable; corrections are new ADJUSTMENT rows
CREATE OR REPLACE FUNCTION prevent_movement_modification()
RETURNS TRIGGER AS $$
BEGIN
    RAISE EXCEPTION 'Movements are append-only (attempted % on %)', TG_OP, OLD.id;
END;
$$ LANGUAGE plpgsql;

CREATE TRIGGER trg_prevent_movement_modification
    BEFORE UPDATE OR DELETE ON movements
    FOR EACH ROW EXECUTE FUNCTION prevent_movement_modification();

-- Closed sessions and their details are frozen
CREATE OR REPLACE FUNCTION prevent_closed_cash_close_modification()
RETURNS TRIGGER AS $$
BEGIN
    IF OLD.status = 'CLOSED' THEN
        RAISE EXCEPTION 'Cash close % is closed and cannot be modified', OLD.id;
    END IF;
    RETURN NEW;
END;
$$ LANGUAGE plpgsql;

CREATE TRIGGER trg_prevent_closed_cash_close_modification
    BEFORE UPDATE ON cash_closes
    FOR EACH ROW EXECUTE FUNCTION prevent_closed_cash_close_modification();
";

const DROP_ALL_SQL: &str = r"
DROP TRIGGER IF EXISTS trg_prevent_closed_cash_close_modification ON cash_closes;
DROP TRIGGER IF EXISTS trg_prevent_movement_modification ON movements;
DROP FUNCTION IF EXISTS prevent_closed_cash_close_modification();
DROP FUNCTION IF EXISTS prevent_movement_modification();

DROP TABLE IF EXISTS cash_close_details;
DROP TABLE IF EXISTS cash_closes;
DROP TABLE IF EXISTS idempotency_keys;
DROP TABLE IF EXISTS movements;
DROP TABLE IF EXISTS business_references;
DROP TABLE IF EXISTS service_balances;
DROP TABLE IF EXISTS balances;
DROP TABLE IF EXISTS point_assignments;
DROP TABLE IF EXISTS currencies;
DROP TABLE IF EXISTS points;

DROP TYPE IF EXISTS cash_close_status;
DROP TYPE IF EXISTS external_service;
DROP TYPE IF EXISTS reference_type;
DROP TYPE IF EXISTS balance_bucket;
DROP TYPE IF EXISTS movement_direction;
";
