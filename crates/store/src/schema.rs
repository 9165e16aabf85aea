//! Table definitions, applied idempotently when the ledger opens.

use sqlx::SqliteConnection;

use crate::error::{LedgerResult, map_sqlx_error};

const STATEMENTS: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS bom_items (
        item_name       TEXT PRIMARY KEY,
        total_quantity  INTEGER NOT NULL CHECK (total_quantity >= 0)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS bom_requirements (
        device_type        TEXT NOT NULL,
        item_name          TEXT NOT NULL REFERENCES bom_items (item_name),
        required_per_unit  INTEGER NOT NULL CHECK (required_per_unit > 0),
        PRIMARY KEY (device_type, item_name)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS production_batches (
        batch_number     INTEGER PRIMARY KEY AUTOINCREMENT,
        device_type      TEXT NOT NULL,
        quantity         INTEGER NOT NULL CHECK (quantity > 0),
        production_date  TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS devices (
        device_id         TEXT PRIMARY KEY,
        device_type       TEXT NOT NULL,
        production_date   TEXT NOT NULL,
        calibration_date  TEXT NOT NULL,
        location          TEXT NOT NULL,
        status            TEXT NOT NULL CHECK (status IN ('InStock', 'Shipped'))
    )
    "#,
    r#"
    CREATE INDEX IF NOT EXISTS devices_type_status
        ON devices (device_type, status)
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS shipments (
        shipment_id    INTEGER PRIMARY KEY AUTOINCREMENT,
        device_type    TEXT NOT NULL,
        shipment_date  TEXT NOT NULL,
        destination    TEXT NOT NULL,
        quantity       INTEGER NOT NULL CHECK (quantity > 0)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS purchases (
        purchase_id    INTEGER PRIMARY KEY AUTOINCREMENT,
        purchase_date  TEXT NOT NULL,
        buyer          TEXT NOT NULL,
        item_name      TEXT NOT NULL,
        quantity       INTEGER NOT NULL CHECK (quantity > 0),
        price          TEXT NOT NULL,
        currency       TEXT NOT NULL CHECK (currency IN ('CAD', 'USD')),
        tax            TEXT NOT NULL,
        url            TEXT NOT NULL
    )
    "#,
];

pub(crate) async fn bootstrap(conn: &mut SqliteConnection) -> LedgerResult<()> {
    for statement in STATEMENTS {
        sqlx::query(*statement)
            .execute(&mut *conn)
            .await
            .map_err(|e| map_sqlx_error("create_schema", e))?;
    }
    Ok(())
}
