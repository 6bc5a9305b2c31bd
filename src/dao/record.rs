//! Explicit row codecs, one encode/decode pair per record type.
//!
//! Decoding validates what the typed model requires (percentage range, known
//! entity kind, non-empty audit fields) and reports violations as
//! `DecodeError`, since a stored row that fails them is corrupt data rather
//! than a bad argument.

use crate::core::{DbError, Result, Row, Value};
use crate::model::{
    Allocation, AllocationKey, AllocationScheme, EntityKind, EntityReference, Measurable,
    MeasurableCategory, MeasurableRating, Percentage,
};
use crate::storage::schema::{
    allocation, allocation_scheme, measurable, measurable_category, measurable_rating,
};
use crate::storage::Condition;
use chrono::{DateTime, Utc};

fn cell<'a>(row: &'a Row, col: usize, table: &str) -> Result<&'a Value> {
    row.get(col).ok_or_else(|| {
        DbError::DecodeError(format!("Row in '{}' has no column {}", table, col))
    })
}

fn int(row: &Row, col: usize, table: &str) -> Result<i64> {
    let value = cell(row, col, table)?;
    value.as_integer().ok_or_else(|| {
        DbError::DecodeError(format!(
            "Column {} of '{}' expected INTEGER, got {}",
            col,
            table,
            value.type_name()
        ))
    })
}

fn text(row: &Row, col: usize, table: &str) -> Result<String> {
    let value = cell(row, col, table)?;
    match value.as_text() {
        Some(s) if !s.is_empty() => Ok(s.to_string()),
        Some(_) => Err(DbError::DecodeError(format!(
            "Column {} of '{}' is empty",
            col, table
        ))),
        None => Err(DbError::DecodeError(format!(
            "Column {} of '{}' expected TEXT, got {}",
            col,
            table,
            value.type_name()
        ))),
    }
}

fn opt_text(row: &Row, col: usize, table: &str) -> Result<Option<String>> {
    match cell(row, col, table)? {
        Value::Null => Ok(None),
        _ => text(row, col, table).map(Some),
    }
}

fn timestamp(row: &Row, col: usize, table: &str) -> Result<DateTime<Utc>> {
    let value = cell(row, col, table)?;
    value.as_timestamp().ok_or_else(|| {
        DbError::DecodeError(format!(
            "Column {} of '{}' expected TIMESTAMP, got {}",
            col,
            table,
            value.type_name()
        ))
    })
}

fn entity(row: &Row, kind_col: usize, id_col: usize, table: &str) -> Result<EntityReference> {
    let kind = text(row, kind_col, table)?
        .parse::<EntityKind>()
        .map_err(|e: DbError| DbError::DecodeError(e.to_string()))?;
    Ok(EntityReference::new(kind, int(row, id_col, table)?))
}

// ---------------------------------------------------------------------------
// allocation
// ---------------------------------------------------------------------------

/// A write-side allocation row: the full identity key plus the fields a
/// batch mutation sets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllocationRecord {
    pub scheme_id: i64,
    pub measurable_id: i64,
    pub entity: EntityReference,
    pub percentage: Percentage,
    pub last_updated_at: DateTime<Utc>,
    pub last_updated_by: String,
    pub provenance: String,
}

impl AllocationRecord {
    pub fn key_conditions(&self) -> Vec<Condition> {
        allocation_key_conditions(
            self.scheme_id,
            &AllocationKey::new(self.measurable_id, self.entity),
        )
    }

    pub fn to_row(&self) -> Row {
        encode_allocation(&self.clone().into_allocation())
    }

    pub fn into_allocation(self) -> Allocation {
        Allocation {
            scheme_id: self.scheme_id,
            measurable_id: self.measurable_id,
            entity_reference: self.entity,
            percentage: self.percentage,
            last_updated_at: self.last_updated_at,
            last_updated_by: self.last_updated_by,
            external_id: None,
            provenance: self.provenance,
        }
    }
}

pub fn allocation_key_conditions(scheme_id: i64, key: &AllocationKey) -> Vec<Condition> {
    vec![
        (allocation::SCHEME_ID, Value::Integer(scheme_id)),
        (allocation::MEASURABLE_ID, Value::Integer(key.measurable_id)),
        (allocation::ENTITY_KIND, Value::from(key.entity.kind.as_str())),
        (allocation::ENTITY_ID, Value::Integer(key.entity.id)),
    ]
}

pub fn encode_allocation(a: &Allocation) -> Row {
    vec![
        Value::Integer(a.scheme_id),
        Value::Integer(a.measurable_id),
        Value::from(a.entity_reference.kind.as_str()),
        Value::Integer(a.entity_reference.id),
        Value::Integer(a.percentage.value()),
        Value::Timestamp(a.last_updated_at),
        Value::from(a.last_updated_by.as_str()),
        Value::from(a.external_id.clone()),
        Value::from(a.provenance.as_str()),
    ]
}

pub fn decode_allocation(row: &Row) -> Result<Allocation> {
    let t = allocation::TABLE;
    let percentage = Percentage::new(int(row, allocation::PERCENTAGE, t)?)
        .map_err(|e| DbError::DecodeError(e.to_string()))?;
    Ok(Allocation {
        scheme_id: int(row, allocation::SCHEME_ID, t)?,
        measurable_id: int(row, allocation::MEASURABLE_ID, t)?,
        entity_reference: entity(row, allocation::ENTITY_KIND, allocation::ENTITY_ID, t)?,
        percentage,
        last_updated_at: timestamp(row, allocation::LAST_UPDATED_AT, t)?,
        last_updated_by: text(row, allocation::LAST_UPDATED_BY, t)?,
        external_id: opt_text(row, allocation::EXTERNAL_ID, t)?,
        provenance: text(row, allocation::PROVENANCE, t)?,
    })
}

/// Key projection of an allocation row, without decoding the rest.
pub fn decode_allocation_key(row: &Row) -> Result<AllocationKey> {
    let t = allocation::TABLE;
    Ok(AllocationKey::new(
        int(row, allocation::MEASURABLE_ID, t)?,
        entity(row, allocation::ENTITY_KIND, allocation::ENTITY_ID, t)?,
    ))
}

// ---------------------------------------------------------------------------
// reference tables
// ---------------------------------------------------------------------------

pub fn encode_scheme(s: &AllocationScheme) -> Row {
    vec![
        Value::Integer(s.id),
        Value::from(s.name.as_str()),
        Value::from(s.description.clone()),
        Value::Integer(s.measurable_category_id),
    ]
}

pub fn decode_scheme(row: &Row) -> Result<AllocationScheme> {
    let t = allocation_scheme::TABLE;
    Ok(AllocationScheme {
        id: int(row, allocation_scheme::ID, t)?,
        name: text(row, allocation_scheme::NAME, t)?,
        description: opt_text(row, allocation_scheme::DESCRIPTION, t)?,
        measurable_category_id: int(row, allocation_scheme::MEASURABLE_CATEGORY_ID, t)?,
    })
}

pub fn encode_category(c: &MeasurableCategory) -> Row {
    vec![Value::Integer(c.id), Value::from(c.name.as_str())]
}

pub fn decode_category(row: &Row) -> Result<MeasurableCategory> {
    let t = measurable_category::TABLE;
    Ok(MeasurableCategory {
        id: int(row, measurable_category::ID, t)?,
        name: text(row, measurable_category::NAME, t)?,
    })
}

pub fn encode_measurable(m: &Measurable) -> Row {
    vec![
        Value::Integer(m.id),
        Value::Integer(m.category_id),
        Value::from(m.name.as_str()),
        Value::from(m.external_id.clone()),
    ]
}

pub fn decode_measurable(row: &Row) -> Result<Measurable> {
    let t = measurable::TABLE;
    Ok(Measurable {
        id: int(row, measurable::ID, t)?,
        category_id: int(row, measurable::CATEGORY_ID, t)?,
        name: text(row, measurable::NAME, t)?,
        external_id: opt_text(row, measurable::EXTERNAL_ID, t)?,
    })
}

pub fn rating_key_conditions(key: &AllocationKey) -> Vec<Condition> {
    vec![
        (measurable_rating::MEASURABLE_ID, Value::Integer(key.measurable_id)),
        (measurable_rating::ENTITY_KIND, Value::from(key.entity.kind.as_str())),
        (measurable_rating::ENTITY_ID, Value::Integer(key.entity.id)),
    ]
}

pub fn encode_rating(r: &MeasurableRating) -> Row {
    vec![
        Value::Integer(r.measurable_id),
        Value::from(r.entity_reference.kind.as_str()),
        Value::Integer(r.entity_reference.id),
        Value::from(r.rating.as_str()),
        Value::Timestamp(r.last_updated_at),
        Value::from(r.last_updated_by.as_str()),
        Value::from(r.provenance.as_str()),
    ]
}

pub fn decode_rating(row: &Row) -> Result<MeasurableRating> {
    let t = measurable_rating::TABLE;
    Ok(MeasurableRating {
        measurable_id: int(row, measurable_rating::MEASURABLE_ID, t)?,
        entity_reference: entity(row, measurable_rating::ENTITY_KIND, measurable_rating::ENTITY_ID, t)?,
        rating: text(row, measurable_rating::RATING, t)?,
        last_updated_at: timestamp(row, measurable_rating::LAST_UPDATED_AT, t)?,
        last_updated_by: text(row, measurable_rating::LAST_UPDATED_BY, t)?,
        provenance: text(row, measurable_rating::PROVENANCE, t)?,
    })
}

pub fn decode_rating_key(row: &Row) -> Result<AllocationKey> {
    let t = measurable_rating::TABLE;
    Ok(AllocationKey::new(
        int(row, measurable_rating::MEASURABLE_ID, t)?,
        entity(row, measurable_rating::ENTITY_KIND, measurable_rating::ENTITY_ID, t)?,
    ))
}
