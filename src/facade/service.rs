use crate::applier::BatchMutationApplier;
use crate::connection::{AllocationConfig, Database};
use crate::core::{Clock, Result, SystemClock};
use crate::dao::{AllocationStore, MeasurableRatingDao, RatingProjector, ReferenceDao};
use crate::model::{
    Allocation, AllocationKey, AllocationScheme, EntityReference, Measurable, MeasurableCategory,
    MeasurablePercentageChange, MeasurableRating, Percentage, RatingKey,
};
use crate::reconciler::{ReconcileReport, Reconciler};
use std::collections::BTreeSet;
use std::sync::Arc;

/// Allocation engine bound to one database.
///
/// Every method runs in its own read session or transaction, released before
/// it returns. For several writes that must commit together, open a
/// transaction on [`AllocationService::database`] and call the components
/// directly. Service methods must not be called from inside such a
/// transaction: the catalog lock is not reentrant and the call deadlocks.
#[derive(Clone)]
pub struct AllocationService {
    db: Database,
    config: Arc<AllocationConfig>,
    store: AllocationStore,
    projector: RatingProjector,
    ratings: MeasurableRatingDao,
    reference: ReferenceDao,
    reconciler: Reconciler,
    applier: BatchMutationApplier,
}

impl AllocationService {
    /// Fresh database, system clock.
    pub fn new(config: AllocationConfig) -> Result<Self> {
        Self::with_database(Database::new()?, config, Arc::new(SystemClock))
    }

    pub fn with_clock(config: AllocationConfig, clock: Arc<dyn Clock>) -> Result<Self> {
        Self::with_database(Database::new()?, config, clock)
    }

    pub fn with_database(db: Database, config: AllocationConfig, clock: Arc<dyn Clock>) -> Result<Self> {
        config.validate()?;
        let config = Arc::new(config);
        let store = AllocationStore::new(Arc::clone(&config), clock);
        let projector = RatingProjector::new();
        Ok(Self {
            db,
            reconciler: Reconciler::new(store.clone(), projector),
            applier: BatchMutationApplier::new(store.clone()),
            config,
            store,
            projector,
            ratings: MeasurableRatingDao::new(),
            reference: ReferenceDao::new(),
        })
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub fn config(&self) -> &AllocationConfig {
        &self.config
    }

    pub fn store(&self) -> &AllocationStore {
        &self.store
    }

    pub fn reconciler(&self) -> &Reconciler {
        &self.reconciler
    }

    // ------------------------------------------------------------------
    // Allocation store
    // ------------------------------------------------------------------

    pub fn find_by_entity_and_scheme(&self, entity: &EntityReference, scheme_id: i64) -> Result<Vec<Allocation>> {
        self.db
            .read(|s| self.store.find_by_entity_and_scheme(s, entity, scheme_id))
    }

    pub fn find_by_measurable_and_scheme(&self, measurable_id: i64, scheme_id: i64) -> Result<Vec<Allocation>> {
        self.db
            .read(|s| self.store.find_by_measurable_and_scheme(s, measurable_id, scheme_id))
    }

    pub fn update_one(
        &self,
        entity: &EntityReference,
        scheme_id: i64,
        measurable_id: i64,
        percentage: Percentage,
        actor: &str,
    ) -> Result<bool> {
        self.db.transaction(|tx| {
            self.store
                .update_one(tx, entity, scheme_id, measurable_id, percentage, actor)
        })
    }

    pub fn update_many(&self, allocations: &[Allocation], actor: &str) -> Result<bool> {
        self.db
            .transaction(|tx| self.store.update_many(tx, allocations, actor))
    }

    pub fn remove_many(&self, allocations: &[Allocation]) -> Result<bool> {
        self.db.transaction(|tx| self.store.remove_many(tx, allocations))
    }

    pub fn insert_many<I>(&self, keys: I, scheme_id: i64, actor: &str) -> Result<Vec<Allocation>>
    where
        I: IntoIterator<Item = AllocationKey>,
    {
        self.db
            .transaction(|tx| self.store.insert_many(tx, keys, scheme_id, actor))
    }

    pub fn apply_changes(
        &self,
        entity: &EntityReference,
        scheme_id: i64,
        changes: &[MeasurablePercentageChange],
        actor: &str,
    ) -> Result<()> {
        self.applier
            .apply_changes(&self.db, entity, scheme_id, changes, actor)
    }

    // ------------------------------------------------------------------
    // Reconciliation
    // ------------------------------------------------------------------

    pub fn find_rating_keys(&self, scheme_id: i64) -> Result<BTreeSet<RatingKey>> {
        self.db
            .read(|s| self.projector.find_rating_keys(s, scheme_id))
    }

    pub fn find_orphaned_allocations(&self, scheme_id: i64) -> Result<BTreeSet<Allocation>> {
        self.db
            .read(|s| self.reconciler.find_orphaned_allocations(s, scheme_id))
    }

    pub fn find_missing_allocations(&self, scheme_id: i64) -> Result<BTreeSet<AllocationKey>> {
        self.db
            .read(|s| self.reconciler.find_missing_allocations(s, scheme_id))
    }

    /// Delete the scheme's orphaned allocations.
    pub fn remove_orphaned_allocations(&self, scheme_id: i64) -> Result<bool> {
        self.db.transaction(|tx| {
            let orphaned: Vec<Allocation> = self
                .reconciler
                .find_orphaned_allocations(&*tx, scheme_id)?
                .into_iter()
                .collect();
            self.store.remove_many(tx, &orphaned)
        })
    }

    /// Create zero-percent allocations for every rating without one,
    /// attributed to the configured system actor.
    pub fn add_missing_allocations(&self, scheme_id: i64) -> Result<Vec<Allocation>> {
        self.db.transaction(|tx| {
            let missing = self.reconciler.find_missing_allocations(&*tx, scheme_id)?;
            self.store
                .insert_many(tx, missing, scheme_id, &self.config.system_actor_label)
        })
    }

    /// Both reconciliation directions in one transaction. Without an actor the
    /// configured system actor is used.
    pub fn reconcile_scheme(&self, scheme_id: i64, actor: Option<&str>) -> Result<ReconcileReport> {
        let actor = actor.unwrap_or(self.config.system_actor_label.as_str());
        self.db
            .transaction(|tx| self.reconciler.reconcile_scheme(tx, scheme_id, actor))
    }

    // ------------------------------------------------------------------
    // Reference data
    // ------------------------------------------------------------------

    pub fn create_category(&self, category: &MeasurableCategory) -> Result<()> {
        self.db
            .transaction(|tx| self.reference.create_category(tx, category))
    }

    pub fn create_measurable(&self, measurable: &Measurable) -> Result<()> {
        self.db
            .transaction(|tx| self.reference.create_measurable(tx, measurable))
    }

    pub fn create_scheme(&self, scheme: &AllocationScheme) -> Result<()> {
        self.db
            .transaction(|tx| self.reference.create_scheme(tx, scheme))
    }

    pub fn find_category(&self, category_id: i64) -> Result<Option<MeasurableCategory>> {
        self.db.read(|s| self.reference.find_category(s, category_id))
    }

    pub fn find_scheme(&self, scheme_id: i64) -> Result<Option<AllocationScheme>> {
        self.db.read(|s| self.reference.find_scheme(s, scheme_id))
    }

    pub fn find_measurables_by_category(&self, category_id: i64) -> Result<Vec<Measurable>> {
        self.db
            .read(|s| self.reference.find_measurables_by_category(s, category_id))
    }

    pub fn save_rating(&self, rating: &MeasurableRating) -> Result<()> {
        self.db.transaction(|tx| self.ratings.save(tx, rating))
    }

    pub fn remove_rating(&self, measurable_id: i64, entity: &EntityReference) -> Result<bool> {
        self.db
            .transaction(|tx| self.ratings.remove(tx, measurable_id, entity))
    }

    pub fn find_ratings_by_entity(&self, entity: &EntityReference) -> Result<Vec<MeasurableRating>> {
        self.db.read(|s| self.ratings.find_by_entity(s, entity))
    }
}
