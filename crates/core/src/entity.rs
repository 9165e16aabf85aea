//! Entity trait: identity + continuity across state changes.

/// Entity marker + minimal interface.
///
/// Devices are the only entities with a lifecycle in the ledger; records such as
/// shipments and purchases are append-only and keyed by their row number.
pub trait Entity {
    /// Strongly-typed entity identifier.
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    /// Returns the entity identifier.
    fn id(&self) -> &Self::Id;
}
