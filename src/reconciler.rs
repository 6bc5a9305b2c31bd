// ============================================================================
// Allocation Reconciliation
// ============================================================================
//
// Allocation rows and rating assignments are maintained independently. Both
// are projected onto (measurable, entity) keys per scheme and compared with
// set difference:
//
//   orphaned = allocation keys - rating keys   (rows to remove)
//   missing  = rating keys - allocation keys   (rows to create)
//
// A key present in both sets appears in neither result, whatever the row's
// percentage or audit fields.
//
// ============================================================================

use crate::connection::Reader;
use crate::core::Result;
use crate::dao::{AllocationStore, RatingProjector};
use crate::model::{Allocation, AllocationKey};
use crate::transaction::Transaction;
use log::info;
use serde::Serialize;
use std::collections::BTreeSet;
use tracing::info_span;

/// Outcome of bringing one scheme's allocations in line with its ratings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    pub scheme_id: i64,
    pub removed: Vec<Allocation>,
    pub added: Vec<Allocation>,
    /// False when fewer orphans were deleted than were found
    pub fully_removed: bool,
}

impl ReconcileReport {
    pub fn is_noop(&self) -> bool {
        self.removed.is_empty() && self.added.is_empty()
    }
}

#[derive(Clone)]
pub struct Reconciler {
    store: AllocationStore,
    projector: RatingProjector,
}

impl Reconciler {
    pub fn new(store: AllocationStore, projector: RatingProjector) -> Self {
        Self { store, projector }
    }

    /// Allocations in the scheme whose key has no backing rating.
    pub fn find_orphaned_allocations<R: Reader>(
        &self,
        reader: &R,
        scheme_id: i64,
    ) -> Result<BTreeSet<Allocation>> {
        let allocation_keys = self.store.find_keys_by_scheme(reader, scheme_id)?;
        let rating_keys = self.projector.find_rating_keys(reader, scheme_id)?;

        let mut orphaned = BTreeSet::new();
        for key in allocation_keys.difference(&rating_keys) {
            orphaned.extend(self.store.find_by_key(reader, scheme_id, key)?);
        }
        Ok(orphaned)
    }

    /// Rating keys in the scheme that have no allocation row yet.
    pub fn find_missing_allocations<R: Reader>(
        &self,
        reader: &R,
        scheme_id: i64,
    ) -> Result<BTreeSet<AllocationKey>> {
        let allocation_keys = self.store.find_keys_by_scheme(reader, scheme_id)?;
        let rating_keys = self.projector.find_rating_keys(reader, scheme_id)?;

        Ok(rating_keys.difference(&allocation_keys).copied().collect())
    }

    /// Remove orphaned allocations and create missing ones within the
    /// caller's transaction.
    pub fn reconcile_scheme(
        &self,
        tx: &mut Transaction<'_>,
        scheme_id: i64,
        actor: &str,
    ) -> Result<ReconcileReport> {
        let span = info_span!("reconcile_scheme", scheme_id, actor);
        let _guard = span.enter();

        let orphaned: Vec<Allocation> = self
            .find_orphaned_allocations(&*tx, scheme_id)?
            .into_iter()
            .collect();
        let missing = self.find_missing_allocations(&*tx, scheme_id)?;

        let fully_removed = self.store.remove_many(tx, &orphaned)?;
        let added = self.store.insert_many(tx, missing, scheme_id, actor)?;

        info!(
            "Reconciled scheme {}: removed {} orphaned, added {} missing",
            scheme_id,
            orphaned.len(),
            added.len()
        );

        Ok(ReconcileReport {
            scheme_id,
            removed: orphaned,
            added,
            fully_removed,
        })
    }
}
