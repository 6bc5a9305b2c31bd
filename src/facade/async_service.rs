use super::AllocationService;
use crate::core::{DbError, Result};
use crate::model::{
    Allocation, AllocationKey, EntityReference, MeasurablePercentageChange, Percentage,
};
use crate::reconciler::ReconcileReport;
use std::collections::BTreeSet;

/// Async front for [`AllocationService`].
///
/// Each call runs on tokio's blocking pool, so the storage locks are never
/// held on a reactor thread.
#[derive(Clone)]
pub struct AsyncAllocationService {
    inner: AllocationService,
}

impl AsyncAllocationService {
    pub fn new(inner: AllocationService) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> &AllocationService {
        &self.inner
    }

    async fn run<T, F>(&self, work: F) -> Result<T>
    where
        F: FnOnce(&AllocationService) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let service = self.inner.clone();
        tokio::task::spawn_blocking(move || work(&service))
            .await
            .map_err(|e| DbError::TaskFailed(e.to_string()))?
    }

    pub async fn find_by_entity_and_scheme(&self, entity: EntityReference, scheme_id: i64) -> Result<Vec<Allocation>> {
        self.run(move |s| s.find_by_entity_and_scheme(&entity, scheme_id))
            .await
    }

    pub async fn find_by_measurable_and_scheme(&self, measurable_id: i64, scheme_id: i64) -> Result<Vec<Allocation>> {
        self.run(move |s| s.find_by_measurable_and_scheme(measurable_id, scheme_id))
            .await
    }

    pub async fn update_one(
        &self,
        entity: EntityReference,
        scheme_id: i64,
        measurable_id: i64,
        percentage: Percentage,
        actor: String,
    ) -> Result<bool> {
        self.run(move |s| s.update_one(&entity, scheme_id, measurable_id, percentage, &actor))
            .await
    }

    pub async fn remove_many(&self, allocations: Vec<Allocation>) -> Result<bool> {
        self.run(move |s| s.remove_many(&allocations)).await
    }

    pub async fn insert_many(&self, keys: Vec<AllocationKey>, scheme_id: i64, actor: String) -> Result<Vec<Allocation>> {
        self.run(move |s| s.insert_many(keys, scheme_id, &actor))
            .await
    }

    pub async fn apply_changes(
        &self,
        entity: EntityReference,
        scheme_id: i64,
        changes: Vec<MeasurablePercentageChange>,
        actor: String,
    ) -> Result<()> {
        self.run(move |s| s.apply_changes(&entity, scheme_id, &changes, &actor))
            .await
    }

    pub async fn find_orphaned_allocations(&self, scheme_id: i64) -> Result<BTreeSet<Allocation>> {
        self.run(move |s| s.find_orphaned_allocations(scheme_id))
            .await
    }

    pub async fn find_missing_allocations(&self, scheme_id: i64) -> Result<BTreeSet<AllocationKey>> {
        self.run(move |s| s.find_missing_allocations(scheme_id))
            .await
    }

    pub async fn reconcile_scheme(&self, scheme_id: i64, actor: Option<String>) -> Result<ReconcileReport> {
        self.run(move |s| s.reconcile_scheme(scheme_id, actor.as_deref()))
            .await
    }
}
