use super::record::{
    allocation_key_conditions, decode_allocation, decode_allocation_key, AllocationRecord,
};
use crate::connection::{AllocationConfig, Reader};
use crate::core::{Clock, DbError, Result, Row, Value};
use crate::model::{Allocation, AllocationKey, EntityReference, Percentage};
use crate::storage::schema::allocation;
use crate::transaction::Transaction;
use chrono::{DateTime, Utc};
use log::{debug, warn};
use std::collections::BTreeSet;
use std::sync::Arc;

pub(crate) fn check_actor(actor: &str) -> Result<()> {
    if actor.trim().is_empty() {
        return Err(DbError::InvalidArgument(
            "Acting user cannot be empty".into(),
        ));
    }
    Ok(())
}

fn restamp(row: &Row, percentage: Percentage, actor: &str, at: DateTime<Utc>) -> Row {
    let mut row = row.clone();
    row[allocation::PERCENTAGE] = Value::Integer(percentage.value());
    row[allocation::LAST_UPDATED_BY] = Value::from(actor);
    row[allocation::LAST_UPDATED_AT] = Value::Timestamp(at);
    row
}

fn decode_sorted(rows: Vec<(usize, Row)>) -> Result<Vec<Allocation>> {
    let mut allocations = rows
        .iter()
        .map(|(_, row)| decode_allocation(row))
        .collect::<Result<Vec<_>>>()?;
    allocations.sort();
    Ok(allocations)
}

/// Typed access to allocation rows, keyed by (scheme, measurable, entity).
///
/// Reads accept any [`Reader`]; writes take the caller's transaction so that
/// several store calls can commit or roll back together.
#[derive(Clone)]
pub struct AllocationStore {
    config: Arc<AllocationConfig>,
    clock: Arc<dyn Clock>,
}

impl AllocationStore {
    /// Create a store stamping rows with `clock` and the configured provenance.
    pub fn new(config: Arc<AllocationConfig>, clock: Arc<dyn Clock>) -> Self {
        Self { config, clock }
    }

    pub fn config(&self) -> &AllocationConfig {
        &self.config
    }

    /// Current time from the store's clock
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now_utc()
    }

    /// Allocations of one entity within a scheme, ordered by measurable.
    pub fn find_by_entity_and_scheme<R: Reader>(
        &self,
        reader: &R,
        entity: &EntityReference,
        scheme_id: i64,
    ) -> Result<Vec<Allocation>> {
        let rows = reader.select(
            allocation::TABLE,
            &[
                (allocation::SCHEME_ID, Value::Integer(scheme_id)),
                (allocation::ENTITY_KIND, Value::from(entity.kind.as_str())),
                (allocation::ENTITY_ID, Value::Integer(entity.id)),
            ],
        )?;
        decode_sorted(rows)
    }

    /// Allocations on one measurable within a scheme, across all entities.
    pub fn find_by_measurable_and_scheme<R: Reader>(
        &self,
        reader: &R,
        measurable_id: i64,
        scheme_id: i64,
    ) -> Result<Vec<Allocation>> {
        let rows = reader.select(
            allocation::TABLE,
            &[
                (allocation::MEASURABLE_ID, Value::Integer(measurable_id)),
                (allocation::SCHEME_ID, Value::Integer(scheme_id)),
            ],
        )?;
        decode_sorted(rows)
    }

    /// Allocation rows for a full (scheme, measurable, entity) key.
    pub fn find_by_key<R: Reader>(
        &self,
        reader: &R,
        scheme_id: i64,
        key: &AllocationKey,
    ) -> Result<Vec<Allocation>> {
        let rows = reader.select(allocation::TABLE, &allocation_key_conditions(scheme_id, key))?;
        decode_sorted(rows)
    }

    /// Keys of every allocation held under the scheme.
    pub fn find_keys_by_scheme<R: Reader>(
        &self,
        reader: &R,
        scheme_id: i64,
    ) -> Result<BTreeSet<AllocationKey>> {
        reader
            .select(
                allocation::TABLE,
                &[(allocation::SCHEME_ID, Value::Integer(scheme_id))],
            )?
            .iter()
            .map(|(_, row)| decode_allocation_key(row))
            .collect()
    }

    /// Set one allocation's percentage. False unless exactly one row changed.
    pub fn update_one(
        &self,
        tx: &mut Transaction<'_>,
        entity: &EntityReference,
        scheme_id: i64,
        measurable_id: i64,
        percentage: Percentage,
        actor: &str,
    ) -> Result<bool> {
        check_actor(actor)?;
        let now = self.now();
        let key = AllocationKey::new(measurable_id, *entity);
        let updated = tx.update_where(
            allocation::TABLE,
            &allocation_key_conditions(scheme_id, &key),
            |row| restamp(row, percentage, actor, now),
        )?;
        Ok(updated == 1)
    }

    /// Write each allocation's percentage back by key. False unless every
    /// allocation matched a row.
    pub fn update_many(
        &self,
        tx: &mut Transaction<'_>,
        allocations: &[Allocation],
        actor: &str,
    ) -> Result<bool> {
        check_actor(actor)?;
        let now = self.now();
        let mut updated = 0;
        for alloc in allocations {
            updated += tx.update_where(
                allocation::TABLE,
                &allocation_key_conditions(alloc.scheme_id, &alloc.key()),
                |row| restamp(row, alloc.percentage, actor, now),
            )?;
        }
        Ok(updated == allocations.len())
    }

    /// Delete allocations by full key.
    ///
    /// Returns false when fewer rows were deleted than requested; the
    /// deletions that did match are kept.
    pub fn remove_many(&self, tx: &mut Transaction<'_>, allocations: &[Allocation]) -> Result<bool> {
        let mut deleted = 0;
        for alloc in allocations {
            deleted += tx.delete_where(
                allocation::TABLE,
                &allocation_key_conditions(alloc.scheme_id, &alloc.key()),
            )?;
        }
        if deleted != allocations.len() {
            warn!(
                "Removed {} of {} requested allocations",
                deleted,
                allocations.len()
            );
        }
        Ok(deleted == allocations.len())
    }

    /// Create zero-percent allocations for the given keys.
    pub fn insert_many<I>(
        &self,
        tx: &mut Transaction<'_>,
        keys: I,
        scheme_id: i64,
        actor: &str,
    ) -> Result<Vec<Allocation>>
    where
        I: IntoIterator<Item = AllocationKey>,
    {
        check_actor(actor)?;
        let now = self.now();
        let records: Vec<AllocationRecord> = keys
            .into_iter()
            .map(|key| AllocationRecord {
                scheme_id,
                measurable_id: key.measurable_id,
                entity: key.entity,
                percentage: Percentage::ZERO,
                last_updated_at: now,
                last_updated_by: actor.to_string(),
                provenance: self.config.default_provenance.clone(),
            })
            .collect();

        self.insert_records(tx, &records)?;
        debug!("Inserted {} allocations into scheme {}", records.len(), scheme_id);
        Ok(records.into_iter().map(AllocationRecord::into_allocation).collect())
    }

    /// Delete one row per record; a record with no row is an error.
    pub fn delete_records(&self, tx: &mut Transaction<'_>, records: &[AllocationRecord]) -> Result<usize> {
        for record in records {
            let deleted = tx.delete_where(allocation::TABLE, &record.key_conditions())?;
            if deleted != 1 {
                return Err(DbError::RowNotFound(format!(
                    "No allocation for measurable {} / {} in scheme {}",
                    record.measurable_id, record.entity, record.scheme_id
                )));
            }
        }
        Ok(records.len())
    }

    /// Update one row per record; a record with no row is an error.
    pub fn update_records(&self, tx: &mut Transaction<'_>, records: &[AllocationRecord]) -> Result<usize> {
        for record in records {
            let updated = tx.update_where(allocation::TABLE, &record.key_conditions(), |row| {
                restamp(
                    row,
                    record.percentage,
                    &record.last_updated_by,
                    record.last_updated_at,
                )
            })?;
            if updated != 1 {
                return Err(DbError::RowNotFound(format!(
                    "No allocation for measurable {} / {} in scheme {}",
                    record.measurable_id, record.entity, record.scheme_id
                )));
            }
        }
        Ok(records.len())
    }

    /// Insert one row per record; an existing key is a constraint violation.
    pub fn insert_records(&self, tx: &mut Transaction<'_>, records: &[AllocationRecord]) -> Result<usize> {
        for record in records {
            tx.insert(allocation::TABLE, record.to_row())?;
        }
        Ok(records.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::Database;
    use crate::core::FixedClock;
    use crate::model::EntityKind;
    use chrono::TimeZone;

    fn store() -> AllocationStore {
        let clock = FixedClock(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());
        AllocationStore::new(Arc::new(AllocationConfig::default()), Arc::new(clock))
    }

    fn app(id: i64) -> EntityReference {
        EntityReference::new(EntityKind::Application, id)
    }

    #[test]
    fn test_insert_many_defaults() {
        let db = Database::new().unwrap();
        let store = store();
        let created = db
            .transaction(|tx| store.insert_many(tx, [AllocationKey::new(1, app(5))], 10, "jdoe"))
            .unwrap();

        assert_eq!(created.len(), 1);
        assert_eq!(created[0].percentage, Percentage::ZERO);
        assert_eq!(created[0].provenance, "allocdb");
        assert_eq!(created[0].last_updated_by, "jdoe");

        let found = db
            .read(|s| store.find_by_entity_and_scheme(s, &app(5), 10))
            .unwrap();
        assert_eq!(found, created);
    }

    #[test]
    fn test_update_one_reports_missing_row() {
        let db = Database::new().unwrap();
        let store = store();
        let pct = Percentage::new(30).unwrap();
        let updated = db
            .transaction(|tx| store.update_one(tx, &app(5), 10, 1, pct, "jdoe"))
            .unwrap();
        assert!(!updated);
    }

    #[test]
    fn test_empty_actor_rejected_before_io() {
        let db = Database::new().unwrap();
        let store = store();
        let err = db
            .transaction(|tx| store.insert_many(tx, [AllocationKey::new(1, app(5))], 10, " "))
            .unwrap_err();
        assert!(matches!(err, DbError::InvalidArgument(_)));
        assert_eq!(db.row_count(allocation::TABLE).unwrap(), 0);
    }

    #[test]
    fn test_update_records_requires_row() {
        let db = Database::new().unwrap();
        let store = store();
        let record = AllocationRecord {
            scheme_id: 10,
            measurable_id: 3,
            entity: app(5),
            percentage: Percentage::new(10).unwrap(),
            last_updated_at: store.now(),
            last_updated_by: "jdoe".into(),
            provenance: "allocdb".into(),
        };
        let err = db
            .transaction(|tx| store.update_records(tx, std::slice::from_ref(&record)))
            .unwrap_err();
        assert!(matches!(err, DbError::RowNotFound(_)));
    }
}
