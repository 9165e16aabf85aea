//! `bomledger-store`
//!
//! **Responsibility:** the SQLite-backed inventory ledger.
//!
//! `InventoryLedger` owns the connection to the local store and is the only
//! way state is read or changed. Multi-row mutations (production, shipment,
//! purchase) each run inside a single transaction.

pub mod config;
pub mod error;
pub mod ledger;
mod rows;
mod schema;

pub use config::{BomSeed, LedgerConfig};
pub use error::{LedgerError, LedgerResult};
pub use ledger::{BuildableUnits, InventoryLedger, ProductionReport, ShipmentReport};
