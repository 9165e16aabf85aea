//! Bill of materials: per-device-type requirements against a shared material pool.
//!
//! Each item has exactly one stock pool, no matter how many device types
//! consume it. Requirements only say how much of a pool one unit of a given
//! device type needs.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use bomledger_core::{DomainError, DomainResult, ValueObject, ensure_positive};

use crate::device::DeviceType;

/// Current quantity per item name. Items absent from the map hold nothing.
pub type StockLevels = BTreeMap<String, i64>;

/// One line of a device type's bill of materials.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Requirement {
    pub item_name: String,
    pub per_unit: i64,
}

impl ValueObject for Requirement {}

impl Requirement {
    pub fn new(item_name: impl Into<String>, per_unit: i64) -> DomainResult<Self> {
        let item_name = item_name.into();
        if item_name.trim().is_empty() {
            return Err(DomainError::validation("item name cannot be empty"));
        }
        ensure_positive("required per unit", per_unit)?;
        Ok(Self { item_name, per_unit })
    }
}

/// A BOM row as shown to the operator: requirement joined with pool stock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BomItem {
    pub item_name: String,
    pub device_type: DeviceType,
    pub required_per_unit: i64,
    pub total_quantity: i64,
}

/// An item whose stock cannot cover a production request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shortfall {
    pub item_name: String,
    pub available: i64,
    pub required: i64,
}

impl ValueObject for Shortfall {}

impl core::fmt::Display for Shortfall {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "{}: available {}, required {}",
            self.item_name, self.available, self.required
        )
    }
}

/// Amount to take from one item's pool, and what will be left.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deduction {
    pub item_name: String,
    pub amount: i64,
    pub remaining: i64,
}

/// Outcome of checking a production request against stock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MaterialCheck {
    /// Every requirement is covered; apply all deductions together.
    Sufficient(Vec<Deduction>),
    /// At least one item is short; every short item is listed.
    Short(Vec<Shortfall>),
}

/// Check whether `quantity` units can be built and plan the deductions.
///
/// All requirements are checked before anything is planned, so a short
/// result names every short item, not just the first.
pub fn check_materials(
    device_type: DeviceType,
    requirements: &[Requirement],
    stock: &StockLevels,
    quantity: i64,
) -> DomainResult<MaterialCheck> {
    ensure_positive("quantity", quantity)?;
    if requirements.is_empty() {
        return Err(DomainError::validation(format!(
            "no requirements configured for device type {device_type}"
        )));
    }

    let mut deductions = Vec::with_capacity(requirements.len());
    let mut shortfalls = Vec::new();

    for req in requirements {
        let required = req.per_unit.checked_mul(quantity).ok_or_else(|| {
            DomainError::validation(format!(
                "required quantity of {} overflows for {quantity} units",
                req.item_name
            ))
        })?;
        let available = stock.get(&req.item_name).copied().unwrap_or(0);

        if available < required {
            shortfalls.push(Shortfall {
                item_name: req.item_name.clone(),
                available,
                required,
            });
        } else {
            deductions.push(Deduction {
                item_name: req.item_name.clone(),
                amount: required,
                remaining: available - required,
            });
        }
    }

    if shortfalls.is_empty() {
        Ok(MaterialCheck::Sufficient(deductions))
    } else {
        Ok(MaterialCheck::Short(shortfalls))
    }
}

/// Number of complete units current stock supports.
///
/// Floor of `available / per_unit` per item, minimum across items. `None`
/// when the device type has no requirements (it cannot be built at all).
pub fn buildable_units(requirements: &[Requirement], stock: &StockLevels) -> Option<i64> {
    requirements
        .iter()
        .map(|req| {
            let available = stock.get(&req.item_name).copied().unwrap_or(0).max(0);
            available / req.per_unit
        })
        .min()
}
