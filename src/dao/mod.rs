pub mod allocation;
pub mod rating;
pub mod record;
pub mod reference;

pub use allocation::AllocationStore;
pub use rating::{MeasurableRatingDao, RatingProjector};
pub use record::AllocationRecord;
pub use reference::ReferenceDao;
