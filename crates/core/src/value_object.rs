//! Value object trait: equality by value, not identity.
//!
//! Value objects have **no identity** - they are defined entirely by their
//! attribute values. A `Shortfall { item: "Coil", available: 5, required: 6 }`
//! is a value object; a `Device` with its generated identifier is an entity.

/// Marker trait for value objects.
///
/// Value objects are **immutable** and **compared by value**. To "modify" one,
/// build a new one.
///
/// ```ignore
/// #[derive(Debug, Clone, PartialEq, Eq)]
/// struct Requirement {
///     item_name: String,
///     per_unit: i64,
/// }
///
/// impl ValueObject for Requirement {}
/// ```
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
