// ============================================================================
// allocdb Library
// ============================================================================
//
// Percentage allocations of entities across the measurables of an allocation
// scheme, kept consistent with measurable ratings and changed through atomic
// batches.
//
// ============================================================================

pub mod applier;
pub mod connection;
pub mod core;
pub mod dao;
pub mod facade;
pub mod model;
pub mod reconciler;
pub mod storage;
pub mod transaction;

pub use applier::{BatchMutationApplier, ClassifiedChanges};
pub use connection::{AllocationConfig, Database, ReadSession, Reader};
pub use core::{Clock, DbError, FixedClock, Result, SystemClock};
pub use dao::{AllocationStore, MeasurableRatingDao, RatingProjector, ReferenceDao};
pub use facade::{AllocationService, AsyncAllocationService};
pub use model::{
    Allocation, AllocationKey, AllocationScheme, EntityKind, EntityReference, Measurable,
    MeasurableCategory, MeasurablePercentage, MeasurablePercentageChange, MeasurableRating,
    Operation, Percentage, RatingKey,
};
pub use reconciler::{ReconcileReport, Reconciler};
pub use transaction::Transaction;

/// Open an allocation service over a fresh in-memory database with default
/// configuration.
///
/// # Examples
///
/// ```
/// use allocdb::{AllocationKey, EntityKind, EntityReference, MeasurablePercentageChange, Percentage};
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let service = allocdb::open()?;
/// let app = EntityReference::new(EntityKind::Application, 55);
///
/// service.insert_many([AllocationKey::new(2, app)], 10, "jdoe")?;
/// service.apply_changes(
///     &app,
///     10,
///     &[
///         MeasurablePercentageChange::update(2, Percentage::new(60)?),
///         MeasurablePercentageChange::add(7, Percentage::new(40)?),
///     ],
///     "jdoe",
/// )?;
///
/// let allocations = service.find_by_entity_and_scheme(&app, 10)?;
/// assert_eq!(allocations.len(), 2);
/// # Ok(())
/// # }
/// ```
pub fn open() -> Result<AllocationService> {
    AllocationService::new(AllocationConfig::default())
}
