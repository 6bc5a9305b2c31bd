use super::EntityReference;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A grouping of measurables, taken from one category, that allocations are
/// tracked against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocationScheme {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub measurable_category_id: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeasurableCategory {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Measurable {
    pub id: i64,
    pub category_id: i64,
    pub name: String,
    pub external_id: Option<String>,
}

/// Links an entity to a measurable. The presence of a rating is what makes
/// an allocation for the same pair legitimate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeasurableRating {
    pub measurable_id: i64,
    pub entity_reference: EntityReference,
    pub rating: String,
    pub last_updated_at: DateTime<Utc>,
    pub last_updated_by: String,
    pub provenance: String,
}
