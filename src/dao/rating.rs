use super::record::{decode_measurable, decode_rating, decode_rating_key, decode_scheme, encode_rating, rating_key_conditions};
use crate::connection::Reader;
use crate::core::{Result, Value};
use crate::model::{AllocationKey, EntityReference, MeasurableRating, RatingKey};
use crate::storage::schema::{allocation_scheme, measurable, measurable_rating};
use crate::transaction::Transaction;
use std::collections::BTreeSet;

/// Derives which (measurable, entity) pairs should carry an allocation under
/// a scheme: every rating on a measurable in the scheme's category.
///
/// Always reads current state; nothing is cached between calls.
#[derive(Debug, Clone, Copy, Default)]
pub struct RatingProjector;

impl RatingProjector {
    pub fn new() -> Self {
        Self
    }

    pub fn find_rating_keys<R: Reader>(&self, reader: &R, scheme_id: i64) -> Result<BTreeSet<RatingKey>> {
        let schemes = reader.select(
            allocation_scheme::TABLE,
            &[(allocation_scheme::ID, Value::Integer(scheme_id))],
        )?;
        let Some((_, scheme_row)) = schemes.first() else {
            return Ok(BTreeSet::new());
        };
        let category_id = decode_scheme(scheme_row)?.measurable_category_id;

        let measurables = reader.select(
            measurable::TABLE,
            &[(measurable::CATEGORY_ID, Value::Integer(category_id))],
        )?;

        let mut keys = BTreeSet::new();
        for (_, measurable_row) in &measurables {
            let measurable_id = decode_measurable(measurable_row)?.id;
            let ratings = reader.select(
                measurable_rating::TABLE,
                &[(measurable_rating::MEASURABLE_ID, Value::Integer(measurable_id))],
            )?;
            for (_, rating_row) in &ratings {
                keys.insert(decode_rating_key(rating_row)?);
            }
        }
        Ok(keys)
    }
}

/// Pass-through access to rating assignments.
#[derive(Debug, Clone, Copy, Default)]
pub struct MeasurableRatingDao;

impl MeasurableRatingDao {
    pub fn new() -> Self {
        Self
    }

    pub fn find_by_entity<R: Reader>(&self, reader: &R, entity: &EntityReference) -> Result<Vec<MeasurableRating>> {
        reader
            .select(
                measurable_rating::TABLE,
                &[
                    (measurable_rating::ENTITY_KIND, Value::from(entity.kind.as_str())),
                    (measurable_rating::ENTITY_ID, Value::Integer(entity.id)),
                ],
            )?
            .iter()
            .map(|(_, row)| decode_rating(row))
            .collect()
    }

    /// Insert the rating, or replace the one already held for its key.
    pub fn save(&self, tx: &mut Transaction<'_>, rating: &MeasurableRating) -> Result<()> {
        let key = AllocationKey::new(rating.measurable_id, rating.entity_reference);
        let row = encode_rating(rating);
        let replaced = tx.update_where(measurable_rating::TABLE, &rating_key_conditions(&key), |_| row.clone())?;
        if replaced == 0 {
            tx.insert(measurable_rating::TABLE, row)?;
        }
        Ok(())
    }

    pub fn remove(&self, tx: &mut Transaction<'_>, measurable_id: i64, entity: &EntityReference) -> Result<bool> {
        let key = AllocationKey::new(measurable_id, *entity);
        Ok(tx.delete_where(measurable_rating::TABLE, &rating_key_conditions(&key))? == 1)
    }
}
