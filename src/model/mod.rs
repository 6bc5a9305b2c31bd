pub mod allocation;
pub mod change;
pub mod entity;
pub mod reference;

pub use allocation::{Allocation, AllocationKey, Percentage, RatingKey};
pub use change::{MeasurablePercentage, MeasurablePercentageChange, Operation};
pub use entity::{EntityKind, EntityReference};
pub use reference::{AllocationScheme, Measurable, MeasurableCategory, MeasurableRating};
