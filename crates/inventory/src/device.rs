use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use bomledger_core::{DeviceId, DomainError, DomainResult, Entity, ensure_positive};

/// The fixed set of device types the shop builds.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum DeviceType {
    #[serde(rename = "VH")]
    Vh,
    #[serde(rename = "VP")]
    Vp,
}

impl DeviceType {
    pub const ALL: [DeviceType; 2] = [DeviceType::Vh, DeviceType::Vp];

    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceType::Vh => "VH",
            DeviceType::Vp => "VP",
        }
    }
}

impl core::fmt::Display for DeviceType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl core::str::FromStr for DeviceType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "VH" => Ok(DeviceType::Vh),
            "VP" => Ok(DeviceType::Vp),
            other => Err(DomainError::validation(format!(
                "unknown device type '{other}' (expected one of: VH, VP)"
            ))),
        }
    }
}

/// Device lifecycle: produced into stock, then shipped exactly once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeviceStatus {
    InStock,
    Shipped,
}

impl DeviceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceStatus::InStock => "InStock",
            DeviceStatus::Shipped => "Shipped",
        }
    }
}

impl core::str::FromStr for DeviceStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "InStock" => Ok(DeviceStatus::InStock),
            "Shipped" => Ok(DeviceStatus::Shipped),
            other => Err(DomainError::validation(format!("invalid device status: {other}"))),
        }
    }
}

/// A manufactured device unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    pub id: DeviceId,
    pub device_type: DeviceType,
    pub production_date: NaiveDate,
    pub calibration_date: NaiveDate,
    pub location: String,
    pub status: DeviceStatus,
}

impl Entity for Device {
    type Id = DeviceId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// Input to a production run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductionRequest {
    pub device_type: DeviceType,
    pub production_date: NaiveDate,
    pub calibration_date: NaiveDate,
    pub location: String,
    pub quantity: i64,
}

impl ProductionRequest {
    pub fn validate(&self) -> DomainResult<()> {
        ensure_positive("quantity", self.quantity)?;
        if self.location.trim().is_empty() {
            return Err(DomainError::validation("location cannot be empty"));
        }
        Ok(())
    }
}

/// In-stock devices sharing type, location, production date and calibration
/// date. The min/max columns span the group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceSummary {
    pub device_type: DeviceType,
    pub location: String,
    pub production_date: NaiveDate,
    pub calibration_date: NaiveDate,
    pub count: i64,
    pub first_production: NaiveDate,
    pub last_production: NaiveDate,
    pub first_calibration: NaiveDate,
    pub last_calibration: NaiveDate,
}
