//! SQLite-backed inventory ledger.
//!
//! ## Atomicity
//!
//! Production, shipment and purchase each run in one transaction:
//!
//! - `produce_devices`: requirement lookup, shortfall check, every stock
//!   deduction, the batch row and every device row commit together or not at all.
//! - `log_shipment`: every device status/location flip and the shipment row
//!   commit together.
//! - `record_purchase`: the purchase row and the stock increment commit together.
//!
//! The pool holds a single connection, so operations are serialized.

use std::str::FromStr;
use std::time::Duration;

use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{Span, instrument};

use bomledger_core::{BatchNumber, DeviceId, DomainError};
use bomledger_inventory::{
    BomItem, Device, DeviceStatus, DeviceSummary, DeviceType, MaterialCheck, NewPurchase,
    ProductionRequest, Purchase, Requirement, Shipment, ShipmentRequest, StockLevels,
    buildable_units, check_materials, select_for_shipment,
};

use crate::config::{BomSeed, LedgerConfig};
use crate::error::{LedgerError, LedgerResult, is_unique_violation, map_sqlx_error};
use crate::{rows, schema};

/// Outcome of a production run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductionReport {
    pub device_type: DeviceType,
    pub batch: BatchNumber,
    pub requested: i64,
    pub created: Vec<DeviceId>,
    pub message: String,
}

impl ProductionReport {
    pub fn units_created(&self) -> i64 {
        self.created.len() as i64
    }
}

/// Outcome of a shipment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShipmentReport {
    pub shipment: Shipment,
    pub shipped: Vec<DeviceId>,
    pub message: String,
}

/// How many units of a device type current stock supports.
///
/// `buildable` is `None` when the type has no requirements configured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildableUnits {
    pub device_type: DeviceType,
    pub buildable: Option<i64>,
}

/// The device/material ledger.
#[derive(Debug)]
pub struct InventoryLedger {
    pool: SqlitePool,
}

impl InventoryLedger {
    /// Connect, create the schema if needed, and apply the configured seed.
    #[instrument(skip(config), fields(database_url = %config.database_url), err)]
    pub async fn open(config: &LedgerConfig) -> LedgerResult<Self> {
        let options = SqliteConnectOptions::from_str(&config.database_url)
            .map_err(|e| map_sqlx_error("parse_database_url", e))?
            .create_if_missing(true)
            .foreign_keys(true);

        // One long-lived connection: serializes access and keeps `sqlite::memory:`
        // databases alive for the ledger's lifetime.
        let pool = SqlitePoolOptions::new()
            .min_connections(1)
            .max_connections(1)
            .idle_timeout(None::<Duration>)
            .max_lifetime(None::<Duration>)
            .connect_with(options)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;

        let mut conn = pool
            .acquire()
            .await
            .map_err(|e| map_sqlx_error("acquire", e))?;
        schema::bootstrap(&mut conn).await?;
        drop(conn);

        let ledger = Self { pool };

        if let Some(path) = &config.bom_seed {
            let seed = BomSeed::load(path)?;
            ledger.apply_seed(&seed).await?;
        }

        tracing::info!("inventory ledger opened");
        Ok(ledger)
    }

    /// Release the connection. The ledger cannot be used afterwards.
    pub async fn close(self) {
        self.pool.close().await;
        tracing::info!("inventory ledger closed");
    }

    /// Apply static BOM configuration.
    ///
    /// Stock entries only create pools that do not exist yet; requirements
    /// are upserted.
    #[instrument(skip(self, seed), err)]
    pub async fn apply_seed(&self, seed: &BomSeed) -> LedgerResult<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        for (item_name, quantity) in &seed.stock {
            if *quantity < 0 {
                return Err(LedgerError::Validation(format!(
                    "seed stock for {item_name} cannot be negative (got {quantity})"
                )));
            }
            sqlx::query(
                r#"
                INSERT INTO bom_items (item_name, total_quantity)
                VALUES (?1, ?2)
                ON CONFLICT (item_name) DO NOTHING
                "#,
            )
            .bind(item_name)
            .bind(quantity)
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("seed_stock", e))?;
        }

        for (device_type, items) in &seed.requirements {
            for (item_name, per_unit) in items {
                let requirement = Requirement::new(item_name.clone(), *per_unit)?;
                upsert_requirement(&mut tx, *device_type, &requirement).await?;
            }
        }

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))?;

        tracing::info!(
            device_types = seed.requirements.len(),
            stock_items = seed.stock.len(),
            "BOM seed applied"
        );
        Ok(())
    }

    /// Set how many of `item_name` one unit of `device_type` consumes.
    ///
    /// Creates an empty stock pool for the item if it has none.
    #[instrument(skip(self), err)]
    pub async fn configure_requirement(
        &self,
        device_type: DeviceType,
        item_name: &str,
        required_per_unit: i64,
    ) -> LedgerResult<()> {
        let requirement = Requirement::new(item_name, required_per_unit)?;

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;
        upsert_requirement(&mut tx, device_type, &requirement).await?;
        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))?;

        Ok(())
    }

    /// Build `quantity` units of a device type, consuming their materials.
    ///
    /// All-or-nothing: if any required item is short, every short item is
    /// reported and neither stock nor devices change. On success each
    /// requirement's pool drops by exactly `per_unit * quantity`.
    ///
    /// Should a generated identifier already exist, that unit is skipped and
    /// the rest are still created; `created` then holds fewer than `requested`.
    #[instrument(
        skip(self, request),
        fields(
            device_type = %request.device_type,
            quantity = request.quantity,
            batch = tracing::field::Empty,
            created = tracing::field::Empty
        ),
        err
    )]
    pub async fn produce_devices(
        &self,
        request: ProductionRequest,
    ) -> LedgerResult<ProductionReport> {
        request.validate()?;
        let unit_count = u32::try_from(request.quantity).map_err(|_| {
            LedgerError::Validation(format!("quantity {} is too large", request.quantity))
        })?;
        let device_type = request.device_type;

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        let requirements = fetch_requirements(&mut tx, device_type).await?;
        let stock = fetch_stock(&mut tx).await?;

        let check = check_materials(device_type, &requirements, &stock, request.quantity)?;
        let deductions = match check {
            MaterialCheck::Sufficient(deductions) => deductions,
            MaterialCheck::Short(shortfalls) => {
                tx.rollback()
                    .await
                    .map_err(|e| map_sqlx_error("rollback", e))?;
                tracing::warn!(
                    short_items = shortfalls.len(),
                    "production refused: insufficient materials"
                );
                return Err(LedgerError::InsufficientMaterials(shortfalls));
            }
        };

        for deduction in &deductions {
            let result = sqlx::query(
                r#"
                UPDATE bom_items
                SET total_quantity = total_quantity - ?1
                WHERE item_name = ?2 AND total_quantity >= ?1
                "#,
            )
            .bind(deduction.amount)
            .bind(&deduction.item_name)
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("deduct_stock", e))?;

            if result.rows_affected() != 1 {
                tx.rollback()
                    .await
                    .map_err(|e| map_sqlx_error("rollback", e))?;
                return Err(DomainError::invariant(format!(
                    "stock of {} changed during production",
                    deduction.item_name
                ))
                .into());
            }
        }

        let batch_row = sqlx::query(
            r#"
            INSERT INTO production_batches (device_type, quantity, production_date)
            VALUES (?1, ?2, ?3)
            "#,
        )
        .bind(device_type.as_str())
        .bind(request.quantity)
        .bind(request.production_date.to_string())
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("insert_batch", e))?;
        let batch = BatchNumber::new(batch_row.last_insert_rowid() as u64);

        let mut created = Vec::with_capacity(unit_count as usize);
        for sequence in 1..=unit_count {
            let device_id = DeviceId::compose(device_type.as_str(), batch, sequence);

            let inserted = sqlx::query(
                r#"
                INSERT INTO devices (
                    device_id,
                    device_type,
                    production_date,
                    calibration_date,
                    location,
                    status
                )
                VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                "#,
            )
            .bind(device_id.as_str())
            .bind(device_type.as_str())
            .bind(request.production_date.to_string())
            .bind(request.calibration_date.to_string())
            .bind(&request.location)
            .bind(DeviceStatus::InStock.as_str())
            .execute(&mut *tx)
            .await;

            match inserted {
                Ok(_) => created.push(device_id),
                Err(e) if is_unique_violation(&e) => {
                    tracing::warn!(%device_id, "device identifier already exists; unit skipped");
                }
                Err(e) => {
                    tx.rollback()
                        .await
                        .map_err(|e| map_sqlx_error("rollback", e))?;
                    return Err(map_sqlx_error("insert_device", e));
                }
            }
        }

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))?;

        let span = Span::current();
        span.record("batch", batch.get());
        span.record("created", created.len());

        let message = if created.len() as i64 == request.quantity {
            format!(
                "Produced {} {} device(s) in batch {}",
                created.len(),
                device_type,
                batch
            )
        } else {
            format!(
                "Produced {} of {} requested {} device(s) in batch {}; {} skipped on identifier conflict",
                created.len(),
                request.quantity,
                device_type,
                batch,
                request.quantity - created.len() as i64
            )
        };
        tracing::info!("{message}");

        Ok(ProductionReport {
            device_type,
            batch,
            requested: request.quantity,
            created,
            message,
        })
    }

    /// Ship units dated today. See [`InventoryLedger::log_shipment_on`].
    pub async fn log_shipment(&self, request: ShipmentRequest) -> LedgerResult<ShipmentReport> {
        self.log_shipment_on(request, Local::now().date_naive()).await
    }

    /// Ship `quantity` in-stock units of a device type to `destination`.
    ///
    /// Fails without changes when fewer units are in stock. Otherwise exactly
    /// `quantity` units flip to `Shipped` at the destination and one shipment
    /// row is appended, in the same transaction.
    #[instrument(
        skip(self, request),
        fields(
            device_type = %request.device_type,
            quantity = request.quantity,
            destination = %request.destination
        ),
        err
    )]
    pub async fn log_shipment_on(
        &self,
        request: ShipmentRequest,
        shipped_on: NaiveDate,
    ) -> LedgerResult<ShipmentReport> {
        request.validate()?;
        let device_type = request.device_type;

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        let in_stock =
            fetch_devices(&mut tx, Some(device_type), Some(DeviceStatus::InStock)).await?;

        let selected = match select_for_shipment(&in_stock, device_type, request.quantity) {
            Ok(ids) => ids,
            Err(available) => {
                tx.rollback()
                    .await
                    .map_err(|e| map_sqlx_error("rollback", e))?;
                tracing::warn!(available, "shipment refused: insufficient units in stock");
                return Err(LedgerError::InsufficientUnits {
                    device_type: device_type.to_string(),
                    available,
                    requested: request.quantity,
                });
            }
        };

        for device_id in &selected {
            let result = sqlx::query(
                r#"
                UPDATE devices
                SET status = ?1, location = ?2
                WHERE device_id = ?3 AND status = ?4
                "#,
            )
            .bind(DeviceStatus::Shipped.as_str())
            .bind(&request.destination)
            .bind(device_id.as_str())
            .bind(DeviceStatus::InStock.as_str())
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("ship_device", e))?;

            if result.rows_affected() != 1 {
                tx.rollback()
                    .await
                    .map_err(|e| map_sqlx_error("rollback", e))?;
                return Err(DomainError::invariant(format!(
                    "device {device_id} is no longer in stock"
                ))
                .into());
            }
        }

        sqlx::query(
            r#"
            INSERT INTO shipments (device_type, shipment_date, destination, quantity)
            VALUES (?1, ?2, ?3, ?4)
            "#,
        )
        .bind(device_type.as_str())
        .bind(shipped_on.to_string())
        .bind(&request.destination)
        .bind(request.quantity)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("insert_shipment", e))?;

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))?;

        let message = format!(
            "Shipped {} {} device(s) to {}",
            request.quantity, device_type, request.destination
        );
        tracing::info!("{message}");

        Ok(ShipmentReport {
            shipment: Shipment {
                device_type,
                shipped_on,
                destination: request.destination,
                quantity: request.quantity,
            },
            shipped: selected,
            message,
        })
    }

    /// Maximum units of `device_type` current stock supports.
    #[instrument(skip(self), err)]
    pub async fn calculate_buildable_units(
        &self,
        device_type: DeviceType,
    ) -> LedgerResult<BuildableUnits> {
        let mut conn = self
            .pool
            .acquire()
            .await
            .map_err(|e| map_sqlx_error("acquire", e))?;

        let requirements = fetch_requirements(&mut conn, device_type).await?;
        let stock = fetch_stock(&mut conn).await?;

        Ok(BuildableUnits {
            device_type,
            buildable: buildable_units(&requirements, &stock),
        })
    }

    /// Buildable units for every device type.
    pub async fn buildable_overview(&self) -> LedgerResult<Vec<BuildableUnits>> {
        let mut overview = Vec::with_capacity(DeviceType::ALL.len());
        for device_type in DeviceType::ALL {
            overview.push(self.calculate_buildable_units(device_type).await?);
        }
        Ok(overview)
    }

    /// Append a purchase and add its quantity to the item's pool.
    ///
    /// A purchase of an item no BOM mentions yet creates its pool.
    #[instrument(
        skip(self, purchase),
        fields(item_name = %purchase.item_name, quantity = purchase.quantity),
        err
    )]
    pub async fn record_purchase(&self, purchase: NewPurchase) -> LedgerResult<Purchase> {
        let purchase = purchase.validate()?;

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        let current: Option<i64> =
            sqlx::query_scalar("SELECT total_quantity FROM bom_items WHERE item_name = ?1")
                .bind(&purchase.item_name)
                .fetch_optional(&mut *tx)
                .await
                .map_err(|e| map_sqlx_error("fetch_stock", e))?;
        if current.unwrap_or(0).checked_add(purchase.quantity).is_none() {
            tx.rollback()
                .await
                .map_err(|e| map_sqlx_error("rollback", e))?;
            tracing::warn!("purchase refused: stock pool would overflow");
            return Err(LedgerError::Validation(format!(
                "purchase of {} {} would overflow its stock pool",
                purchase.quantity, purchase.item_name
            )));
        }

        sqlx::query(
            r#"
            INSERT INTO purchases (
                purchase_date,
                buyer,
                item_name,
                quantity,
                price,
                currency,
                tax,
                url
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(purchase.date.to_string())
        .bind(&purchase.buyer)
        .bind(&purchase.item_name)
        .bind(purchase.quantity)
        .bind(purchase.price.to_string())
        .bind(purchase.currency.as_str())
        .bind(purchase.tax.to_string())
        .bind(&purchase.url)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("insert_purchase", e))?;

        sqlx::query(
            r#"
            INSERT INTO bom_items (item_name, total_quantity)
            VALUES (?1, ?2)
            ON CONFLICT (item_name)
            DO UPDATE SET total_quantity = total_quantity + excluded.total_quantity
            "#,
        )
        .bind(&purchase.item_name)
        .bind(purchase.quantity)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("add_stock", e))?;

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))?;

        tracing::info!(currency = %purchase.currency, "purchase recorded");
        Ok(purchase)
    }

    /// In-stock devices grouped by type, location, production date and
    /// calibration date.
    pub async fn get_device_summary(&self) -> LedgerResult<Vec<DeviceSummary>> {
        let records = sqlx::query(
            r#"
            SELECT
                device_type,
                location,
                production_date,
                calibration_date,
                COUNT(*)              AS count,
                MIN(production_date)  AS first_production,
                MAX(production_date)  AS last_production,
                MIN(calibration_date) AS first_calibration,
                MAX(calibration_date) AS last_calibration
            FROM devices
            WHERE status = ?1
            GROUP BY device_type, location, production_date, calibration_date
            ORDER BY device_type, location, production_date, calibration_date
            "#,
        )
        .bind(DeviceStatus::InStock.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("device_summary", e))?;

        records.iter().map(rows::device_summary).collect()
    }

    /// BOM rows with current pool stock, optionally for one device type.
    pub async fn get_bom_inventory(
        &self,
        device_type: Option<DeviceType>,
    ) -> LedgerResult<Vec<BomItem>> {
        let records = sqlx::query(
            r#"
            SELECT r.device_type, r.item_name, r.required_per_unit, i.total_quantity
            FROM bom_requirements r
            JOIN bom_items i ON i.item_name = r.item_name
            WHERE ?1 IS NULL OR r.device_type = ?1
            ORDER BY r.device_type, r.item_name
            "#,
        )
        .bind(device_type.map(|t| t.as_str()))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("bom_inventory", e))?;

        records.iter().map(rows::bom_item).collect()
    }

    /// Shipments, newest first.
    pub async fn get_shipment_history(&self) -> LedgerResult<Vec<Shipment>> {
        let records = sqlx::query(
            r#"
            SELECT device_type, shipment_date, destination, quantity
            FROM shipments
            ORDER BY shipment_date DESC, shipment_id DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("shipment_history", e))?;

        records.iter().map(rows::shipment).collect()
    }

    /// Purchases, newest first.
    pub async fn purchase_history(&self) -> LedgerResult<Vec<Purchase>> {
        let records = sqlx::query(
            r#"
            SELECT purchase_date, buyer, item_name, quantity, price, currency, tax, url
            FROM purchases
            ORDER BY purchase_date DESC, purchase_id DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("purchase_history", e))?;

        records.iter().map(rows::purchase).collect()
    }

    /// Current quantity of every material pool.
    pub async fn list_stock(&self) -> LedgerResult<StockLevels> {
        let mut conn = self
            .pool
            .acquire()
            .await
            .map_err(|e| map_sqlx_error("acquire", e))?;
        fetch_stock(&mut conn).await
    }

    /// Device rows, optionally filtered by type and status.
    pub async fn list_devices(
        &self,
        device_type: Option<DeviceType>,
        status: Option<DeviceStatus>,
    ) -> LedgerResult<Vec<Device>> {
        let mut conn = self
            .pool
            .acquire()
            .await
            .map_err(|e| map_sqlx_error("acquire", e))?;
        fetch_devices(&mut conn, device_type, status).await
    }
}

async fn upsert_requirement(
    conn: &mut SqliteConnection,
    device_type: DeviceType,
    requirement: &Requirement,
) -> LedgerResult<()> {
    sqlx::query(
        r#"
        INSERT INTO bom_items (item_name, total_quantity)
        VALUES (?1, 0)
        ON CONFLICT (item_name) DO NOTHING
        "#,
    )
    .bind(&requirement.item_name)
    .execute(&mut *conn)
    .await
    .map_err(|e| map_sqlx_error("ensure_item", e))?;

    sqlx::query(
        r#"
        INSERT INTO bom_requirements (device_type, item_name, required_per_unit)
        VALUES (?1, ?2, ?3)
        ON CONFLICT (device_type, item_name)
        DO UPDATE SET required_per_unit = excluded.required_per_unit
        "#,
    )
    .bind(device_type.as_str())
    .bind(&requirement.item_name)
    .bind(requirement.per_unit)
    .execute(&mut *conn)
    .await
    .map_err(|e| map_sqlx_error("upsert_requirement", e))?;

    Ok(())
}

async fn fetch_requirements(
    conn: &mut SqliteConnection,
    device_type: DeviceType,
) -> LedgerResult<Vec<Requirement>> {
    let records = sqlx::query(
        r#"
        SELECT item_name, required_per_unit
        FROM bom_requirements
        WHERE device_type = ?1
        ORDER BY item_name
        "#,
    )
    .bind(device_type.as_str())
    .fetch_all(&mut *conn)
    .await
    .map_err(|e| map_sqlx_error("fetch_requirements", e))?;

    records.iter().map(rows::requirement).collect()
}

async fn fetch_stock(conn: &mut SqliteConnection) -> LedgerResult<StockLevels> {
    let records = sqlx::query(
        r#"
        SELECT item_name, total_quantity
        FROM bom_items
        ORDER BY item_name
        "#,
    )
    .fetch_all(&mut *conn)
    .await
    .map_err(|e| map_sqlx_error("fetch_stock", e))?;

    records.iter().map(rows::stock_entry).collect()
}

async fn fetch_devices(
    conn: &mut SqliteConnection,
    device_type: Option<DeviceType>,
    status: Option<DeviceStatus>,
) -> LedgerResult<Vec<Device>> {
    let records = sqlx::query(
        r#"
        SELECT device_id, device_type, production_date, calibration_date, location, status
        FROM devices
        WHERE (?1 IS NULL OR device_type = ?1)
          AND (?2 IS NULL OR status = ?2)
        ORDER BY production_date, device_id
        "#,
    )
    .bind(device_type.map(|t| t.as_str()))
    .bind(status.map(|s| s.as_str()))
    .fetch_all(&mut *conn)
    .await
    .map_err(|e| map_sqlx_error("fetch_devices", e))?;

    records.iter().map(rows::device).collect()
}
