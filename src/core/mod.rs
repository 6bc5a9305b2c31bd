pub mod clock;
pub mod error;
pub mod types;
pub mod value;

pub use clock::{Clock, FixedClock, SystemClock};
pub use error::{DbError, Result};
pub use types::{Column, DataType, Row};
pub use value::Value;
