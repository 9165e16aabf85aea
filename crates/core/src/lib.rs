//! Domain building blocks shared by the `bomledger` crates.
//!
//! This crate contains **pure domain** primitives (no storage, no IO).

pub mod entity;
pub mod error;
pub mod id;
pub mod value_object;

pub use entity::Entity;
pub use error::{DomainError, DomainResult, ensure_positive};
pub use id::{BatchNumber, DeviceId};
pub use value_object::ValueObject;
