use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use bomledger_core::{DeviceId, DomainError, DomainResult, ensure_positive};

use crate::device::{Device, DeviceStatus, DeviceType};

/// An immutable record of a completed outbound transfer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shipment {
    pub device_type: DeviceType,
    pub shipped_on: NaiveDate,
    pub destination: String,
    pub quantity: i64,
}

/// Input to a shipment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShipmentRequest {
    pub device_type: DeviceType,
    pub quantity: i64,
    pub destination: String,
}

impl ShipmentRequest {
    pub fn validate(&self) -> DomainResult<()> {
        ensure_positive("quantity", self.quantity)?;
        if self.destination.trim().is_empty() {
            return Err(DomainError::validation("destination cannot be empty"));
        }
        Ok(())
    }
}

/// Pick which units leave in a shipment.
///
/// Only in-stock units of the requested type are eligible. Oldest production
/// first, then by identifier, so the choice is deterministic. Returns
/// `Err(available)` when fewer than `quantity` units are eligible.
pub fn select_for_shipment(
    devices: &[Device],
    device_type: DeviceType,
    quantity: i64,
) -> Result<Vec<DeviceId>, i64> {
    let mut eligible: Vec<&Device> = devices
        .iter()
        .filter(|d| d.device_type == device_type && d.status == DeviceStatus::InStock)
        .collect();

    eligible.sort_by(|a, b| {
        a.production_date
            .cmp(&b.production_date)
            .then_with(|| a.id.cmp(&b.id))
    });
    eligible.dedup_by(|a, b| a.id == b.id);

    let available = eligible.len() as i64;
    if available < quantity {
        return Err(available);
    }

    Ok(eligible
        .into_iter()
        .take(quantity as usize)
        .map(|d| d.id.clone())
        .collect())
}
