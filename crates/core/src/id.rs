//! Strongly-typed identifiers used across the domain.

use core::str::FromStr;
use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// Monotonic production batch number.
///
/// Allocated by the store (never reused) and used as the distinguishing
/// component of every device identifier produced in that batch.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BatchNumber(u64);

impl BatchNumber {
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl core::fmt::Display for BatchNumber {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{:06}", self.0)
    }
}

/// Identifier of a manufactured device unit.
///
/// Shape: `{TYPE}-{batch:06}-{seq:03}`, e.g. `VH-000042-001`. The batch number
/// is unique per production run and the sequence is unique within the batch,
/// so identifiers never collide across the ledger's history.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DeviceId(String);

impl DeviceId {
    /// Compose an identifier for unit `sequence` (1-based) of `batch`.
    pub fn compose(type_code: &str, batch: BatchNumber, sequence: u32) -> Self {
        Self(format!("{type_code}-{batch}-{sequence:03}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Device type code prefix (e.g. `VH`).
    pub fn type_code(&self) -> &str {
        self.0.split('-').next().unwrap_or_default()
    }
}

impl core::fmt::Display for DeviceId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for DeviceId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split('-').collect();
        let [code, batch, seq] = parts.as_slice() else {
            return Err(DomainError::invalid_id(format!(
                "DeviceId: expected TYPE-BATCH-SEQ, got '{s}'"
            )));
        };

        if code.is_empty() || !code.chars().all(|c| c.is_ascii_uppercase()) {
            return Err(DomainError::invalid_id(format!(
                "DeviceId: bad type code in '{s}'"
            )));
        }
        let numeric = |p: &str| !p.is_empty() && p.chars().all(|c| c.is_ascii_digit());
        if !numeric(batch) || !numeric(seq) {
            return Err(DomainError::invalid_id(format!(
                "DeviceId: batch and sequence must be numeric in '{s}'"
            )));
        }

        Ok(Self(s.to_string()))
    }
}

impl TryFrom<String> for DeviceId {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<DeviceId> for String {
    fn from(value: DeviceId) -> Self {
        value.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compose_pads_batch_and_sequence() {
        let id = DeviceId::compose("VH", BatchNumber::new(42), 7);
        assert_eq!(id.as_str(), "VH-000042-007");
        assert_eq!(id.type_code(), "VH");
    }

    #[test]
    fn type_code_is_the_prefix_of_a_parsed_id() {
        let parsed: DeviceId = "VP-000003-012".parse().unwrap();
        assert_eq!(parsed.type_code(), "VP");
    }

    #[test]
    fn composed_ids_parse_back() {
        let id = DeviceId::compose("VP", BatchNumber::new(1_234_567), 1_001);
        let parsed: DeviceId = id.as_str().parse().unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn malformed_ids_are_rejected() {
        for bad in ["", "VH", "VH-12", "vh-000001-001", "VH-0000x1-001", "VH-000001-"] {
            assert!(
                matches!(bad.parse::<DeviceId>(), Err(DomainError::InvalidId(_))),
                "expected '{bad}' to be rejected"
            );
        }
    }

    #[test]
    fn same_batch_different_sequence_never_collides() {
        let batch = BatchNumber::new(3);
        let a = DeviceId::compose("VH", batch, 1);
        let b = DeviceId::compose("VH", batch, 2);
        assert_ne!(a, b);
    }
}
