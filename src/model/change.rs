use super::Percentage;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Operation {
    Add,
    Update,
    Remove,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Add => write!(f, "ADD"),
            Operation::Update => write!(f, "UPDATE"),
            Operation::Remove => write!(f, "REMOVE"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MeasurablePercentage {
    pub measurable_id: i64,
    pub percentage: Percentage,
}

/// A requested change to one measurable's share. The entity and scheme are
/// supplied alongside the whole change collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MeasurablePercentageChange {
    pub operation: Operation,
    pub measurable_percentage: MeasurablePercentage,
}

impl MeasurablePercentageChange {
    pub fn new(operation: Operation, measurable_id: i64, percentage: Percentage) -> Self {
        Self {
            operation,
            measurable_percentage: MeasurablePercentage {
                measurable_id,
                percentage,
            },
        }
    }

    pub fn add(measurable_id: i64, percentage: Percentage) -> Self {
        Self::new(Operation::Add, measurable_id, percentage)
    }

    pub fn update(measurable_id: i64, percentage: Percentage) -> Self {
        Self::new(Operation::Update, measurable_id, percentage)
    }

    pub fn remove(measurable_id: i64) -> Self {
        Self::new(Operation::Remove, measurable_id, Percentage::ZERO)
    }

    pub fn measurable_id(&self) -> i64 {
        self.measurable_percentage.measurable_id
    }

    pub fn percentage(&self) -> Percentage {
        self.measurable_percentage.percentage
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_change_deserializes_from_wire_shape() {
        let json = r#"{"operation":"UPDATE","measurable_percentage":{"measurable_id":2,"percentage":60}}"#;
        let change: MeasurablePercentageChange = serde_json::from_str(json).unwrap();
        assert_eq!(change.operation, Operation::Update);
        assert_eq!(change.measurable_id(), 2);
        assert_eq!(change.percentage().value(), 60);
    }
}
