//! Row decoding. Enumerations and dates are stored as text and parsed back
//! through their domain `FromStr` impls.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use sqlx::Row;
use sqlx::sqlite::SqliteRow;

use bomledger_core::DeviceId;
use bomledger_inventory::{
    BomItem, Currency, Device, DeviceStatus, DeviceSummary, DeviceType, Purchase, Requirement,
    Shipment,
};

use crate::error::{LedgerError, LedgerResult, map_sqlx_error};

fn text(row: &SqliteRow, column: &'static str) -> LedgerResult<String> {
    row.try_get::<String, _>(column)
        .map_err(|e| map_sqlx_error("decode_row", e))
}

fn integer(row: &SqliteRow, column: &'static str) -> LedgerResult<i64> {
    row.try_get::<i64, _>(column)
        .map_err(|e| map_sqlx_error("decode_row", e))
}

fn corrupt(column: &'static str, err: impl core::fmt::Display) -> LedgerError {
    LedgerError::Storage {
        operation: "decode_row",
        message: format!("column {column}: {err}"),
    }
}

fn date(row: &SqliteRow, column: &'static str) -> LedgerResult<NaiveDate> {
    let raw = text(row, column)?;
    NaiveDate::parse_from_str(&raw, "%Y-%m-%d").map_err(|e| corrupt(column, e))
}

fn decimal(row: &SqliteRow, column: &'static str) -> LedgerResult<Decimal> {
    text(row, column)?.parse().map_err(|e| corrupt(column, e))
}

fn device_type(row: &SqliteRow) -> LedgerResult<DeviceType> {
    text(row, "device_type")?
        .parse()
        .map_err(|e| corrupt("device_type", e))
}

pub(crate) fn device(row: &SqliteRow) -> LedgerResult<Device> {
    let id: DeviceId = text(row, "device_id")?
        .parse()
        .map_err(|e| corrupt("device_id", e))?;
    let status: DeviceStatus = text(row, "status")?
        .parse()
        .map_err(|e| corrupt("status", e))?;
    let device_type = device_type(row)?;
    if id.type_code() != device_type.as_str() {
        return Err(corrupt(
            "device_id",
            format!("{id} is recorded as device type {device_type}"),
        ));
    }

    Ok(Device {
        id,
        device_type,
        production_date: date(row, "production_date")?,
        calibration_date: date(row, "calibration_date")?,
        location: text(row, "location")?,
        status,
    })
}

pub(crate) fn device_summary(row: &SqliteRow) -> LedgerResult<DeviceSummary> {
    Ok(DeviceSummary {
        device_type: device_type(row)?,
        location: text(row, "location")?,
        production_date: date(row, "production_date")?,
        calibration_date: date(row, "calibration_date")?,
        count: integer(row, "count")?,
        first_production: date(row, "first_production")?,
        last_production: date(row, "last_production")?,
        first_calibration: date(row, "first_calibration")?,
        last_calibration: date(row, "last_calibration")?,
    })
}

pub(crate) fn bom_item(row: &SqliteRow) -> LedgerResult<BomItem> {
    Ok(BomItem {
        item_name: text(row, "item_name")?,
        device_type: device_type(row)?,
        required_per_unit: integer(row, "required_per_unit")?,
        total_quantity: integer(row, "total_quantity")?,
    })
}

pub(crate) fn shipment(row: &SqliteRow) -> LedgerResult<Shipment> {
    Ok(Shipment {
        device_type: device_type(row)?,
        shipped_on: date(row, "shipment_date")?,
        destination: text(row, "destination")?,
        quantity: integer(row, "quantity")?,
    })
}

pub(crate) fn purchase(row: &SqliteRow) -> LedgerResult<Purchase> {
    let currency: Currency = text(row, "currency")?
        .parse()
        .map_err(|e| corrupt("currency", e))?;

    Ok(Purchase {
        date: date(row, "purchase_date")?,
        buyer: text(row, "buyer")?,
        item_name: text(row, "item_name")?,
        quantity: integer(row, "quantity")?,
        price: decimal(row, "price")?,
        currency,
        tax: decimal(row, "tax")?,
        url: text(row, "url")?,
    })
}

pub(crate) fn requirement(row: &SqliteRow) -> LedgerResult<Requirement> {
    Ok(Requirement {
        item_name: text(row, "item_name")?,
        per_unit: integer(row, "required_per_unit")?,
    })
}

pub(crate) fn stock_entry(row: &SqliteRow) -> LedgerResult<(String, i64)> {
    Ok((text(row, "item_name")?, integer(row, "total_quantity")?))
}
