use super::EntityReference;
use crate::core::{DbError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Whole-number share between 0 and 100 inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct Percentage(u8);

impl Percentage {
    pub const ZERO: Percentage = Percentage(0);
    pub const MAX: Percentage = Percentage(100);

    pub fn new(value: i64) -> Result<Self> {
        if !(0..=100).contains(&value) {
            return Err(DbError::InvalidArgument(format!(
                "Percentage must be between 0 and 100, got {}",
                value
            )));
        }
        Ok(Percentage(value as u8))
    }

    pub fn value(&self) -> i64 {
        i64::from(self.0)
    }
}

impl TryFrom<i64> for Percentage {
    type Error = DbError;

    fn try_from(value: i64) -> Result<Self> {
        Percentage::new(value)
    }
}

impl From<Percentage> for i64 {
    fn from(p: Percentage) -> Self {
        p.value()
    }
}

impl fmt::Display for Percentage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.0)
    }
}

/// The (measurable, entity) pair used when diffing allocations against
/// ratings within one scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AllocationKey {
    pub measurable_id: i64,
    pub entity: EntityReference,
}

/// Ratings project onto the same triple as allocations.
pub type RatingKey = AllocationKey;

impl AllocationKey {
    pub fn new(measurable_id: i64, entity: EntityReference) -> Self {
        Self {
            measurable_id,
            entity,
        }
    }
}

impl fmt::Display for AllocationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "measurable {} / {}", self.measurable_id, self.entity)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Allocation {
    pub scheme_id: i64,
    pub measurable_id: i64,
    pub entity_reference: EntityReference,
    pub percentage: Percentage,
    pub last_updated_at: DateTime<Utc>,
    pub last_updated_by: String,
    pub external_id: Option<String>,
    pub provenance: String,
}

impl Allocation {
    pub fn key(&self) -> AllocationKey {
        AllocationKey::new(self.measurable_id, self.entity_reference)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percentage_bounds() {
        assert!(Percentage::new(0).is_ok());
        assert!(Percentage::new(100).is_ok());
        assert!(matches!(Percentage::new(101), Err(DbError::InvalidArgument(_))));
        assert!(Percentage::new(-1).is_err());
    }

    #[test]
    fn test_percentage_serde_is_validated() {
        let p: Percentage = serde_json::from_str("40").unwrap();
        assert_eq!(p.value(), 40);
        assert!(serde_json::from_str::<Percentage>("140").is_err());
        assert_eq!(serde_json::to_string(&p).unwrap(), "40");
    }
}
