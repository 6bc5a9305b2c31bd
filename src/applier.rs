// ============================================================================
// Batch Mutation Applier
// ============================================================================
//
// A change collection for one entity and scheme is classified by operation
// and executed as a single transaction in the order
//
//   delete(REMOVE) -> update(UPDATE) -> insert(ADD)
//
// so an ADD may reuse a key freed by a REMOVE in the same batch. Any failing
// statement rolls back the whole batch.
//
// ============================================================================

use crate::connection::Database;
use crate::core::{DbError, Result};
use crate::dao::allocation::check_actor;
use crate::dao::{AllocationRecord, AllocationStore};
use crate::model::{EntityReference, MeasurablePercentageChange, Operation};
use chrono::{DateTime, Utc};
use log::info;
use std::collections::HashSet;
use tracing::info_span;

/// Changes partitioned by operation. Absent groups are empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClassifiedChanges {
    pub removals: Vec<MeasurablePercentageChange>,
    pub updates: Vec<MeasurablePercentageChange>,
    pub additions: Vec<MeasurablePercentageChange>,
}

impl ClassifiedChanges {
    pub fn classify<'a, I>(changes: I) -> Self
    where
        I: IntoIterator<Item = &'a MeasurablePercentageChange>,
    {
        let mut classified = Self::default();
        for change in changes {
            match change.operation {
                Operation::Remove => classified.removals.push(*change),
                Operation::Update => classified.updates.push(*change),
                Operation::Add => classified.additions.push(*change),
            }
        }
        classified
    }

    pub fn len(&self) -> usize {
        self.removals.len() + self.updates.len() + self.additions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// A measurable may appear at most once per operation group.
    pub fn validate(&self) -> Result<()> {
        for (operation, group) in [
            (Operation::Remove, &self.removals),
            (Operation::Update, &self.updates),
            (Operation::Add, &self.additions),
        ] {
            let mut seen = HashSet::new();
            for change in group {
                if !seen.insert(change.measurable_id()) {
                    return Err(DbError::InvalidArgument(format!(
                        "Measurable {} appears more than once in {} changes",
                        change.measurable_id(),
                        operation
                    )));
                }
            }
        }
        Ok(())
    }
}

/// Who and when a batch is stamped with.
struct BatchContext<'a> {
    entity: &'a EntityReference,
    scheme_id: i64,
    actor: &'a str,
    at: DateTime<Utc>,
    provenance: &'a str,
}

fn mk_records(ctx: &BatchContext<'_>, changes: &[MeasurablePercentageChange]) -> Vec<AllocationRecord> {
    changes
        .iter()
        .map(|change| AllocationRecord {
            scheme_id: ctx.scheme_id,
            measurable_id: change.measurable_id(),
            entity: *ctx.entity,
            percentage: change.percentage(),
            last_updated_at: ctx.at,
            last_updated_by: ctx.actor.to_string(),
            provenance: ctx.provenance.to_string(),
        })
        .collect()
}

#[derive(Clone)]
pub struct BatchMutationApplier {
    store: AllocationStore,
}

impl BatchMutationApplier {
    pub fn new(store: AllocationStore) -> Self {
        Self { store }
    }

    /// Apply every change for `entity` under `scheme_id` atomically.
    ///
    /// Returns only after commit. On error nothing from the batch is kept.
    pub fn apply_changes(
        &self,
        db: &Database,
        entity: &EntityReference,
        scheme_id: i64,
        changes: &[MeasurablePercentageChange],
        actor: &str,
    ) -> Result<()> {
        check_actor(actor)?;
        let classified = ClassifiedChanges::classify(changes);
        classified.validate()?;

        let span = info_span!(
            "apply_changes",
            entity = %entity,
            scheme_id,
            removals = classified.removals.len(),
            updates = classified.updates.len(),
            additions = classified.additions.len()
        );
        let _guard = span.enter();

        let ctx = BatchContext {
            entity,
            scheme_id,
            actor,
            at: self.store.now(),
            provenance: &self.store.config().default_provenance,
        };
        let to_delete = mk_records(&ctx, &classified.removals);
        let to_update = mk_records(&ctx, &classified.updates);
        let to_insert = mk_records(&ctx, &classified.additions);

        db.transaction(|tx| {
            self.store.delete_records(tx, &to_delete)?;
            self.store.update_records(tx, &to_update)?;
            self.store.insert_records(tx, &to_insert)?;
            Ok(())
        })?;

        info!(
            "Applied {} allocation changes for {} in scheme {}",
            classified.len(),
            entity,
            scheme_id
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Percentage;

    fn pct(v: i64) -> Percentage {
        Percentage::new(v).unwrap()
    }

    #[test]
    fn test_classify_partitions_by_operation() {
        let changes = vec![
            MeasurablePercentageChange::add(7, pct(40)),
            MeasurablePercentageChange::update(2, pct(60)),
            MeasurablePercentageChange::remove(4),
            MeasurablePercentageChange::update(3, pct(0)),
        ];
        let classified = ClassifiedChanges::classify(&changes);
        assert_eq!(classified.removals.len(), 1);
        assert_eq!(classified.updates.len(), 2);
        assert_eq!(classified.additions.len(), 1);
        assert_eq!(classified.len(), 4);
    }

    #[test]
    fn test_classify_empty_groups() {
        let classified = ClassifiedChanges::classify(&[MeasurablePercentageChange::remove(1)]);
        assert!(classified.updates.is_empty());
        assert!(classified.additions.is_empty());
        assert!(ClassifiedChanges::classify(&Vec::<MeasurablePercentageChange>::new()).is_empty());
    }

    #[test]
    fn test_validate_rejects_duplicate_measurable_in_group() {
        let changes = [
            MeasurablePercentageChange::update(2, pct(10)),
            MeasurablePercentageChange::update(2, pct(20)),
        ];
        let err = ClassifiedChanges::classify(&changes).validate().unwrap_err();
        assert!(matches!(err, DbError::InvalidArgument(_)));
    }

    #[test]
    fn test_validate_allows_remove_then_add_same_measurable() {
        let changes = [
            MeasurablePercentageChange::remove(4),
            MeasurablePercentageChange::add(4, pct(25)),
        ];
        assert!(ClassifiedChanges::classify(&changes).validate().is_ok());
    }
}
