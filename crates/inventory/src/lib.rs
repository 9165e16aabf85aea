//! Inventory domain module: devices, bills of materials, purchases, shipments.
//!
//! This crate contains business rules for the device/material ledger,
//! implemented purely as deterministic domain logic (no IO, no storage).
//! The store crate loads state, asks these functions what to do, and applies
//! the answer inside one transaction.

pub mod bom;
pub mod device;
pub mod purchase;
pub mod shipment;

pub use bom::{
    BomItem, Deduction, MaterialCheck, Requirement, Shortfall, StockLevels, buildable_units,
    check_materials,
};
pub use device::{Device, DeviceStatus, DeviceSummary, DeviceType, ProductionRequest};
pub use purchase::{Currency, NewPurchase, Purchase};
pub use shipment::{Shipment, ShipmentRequest, select_for_shipment};
