use crate::core::{DbError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Kinds of entity an allocation or rating can be attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntityKind {
    Actor,
    Application,
    ChangeInitiative,
    DataType,
    EndUserApplication,
    Measurable,
    OrgUnit,
    Person,
}

impl EntityKind {
    pub const ALL: [EntityKind; 8] = [
        EntityKind::Actor,
        EntityKind::Application,
        EntityKind::ChangeInitiative,
        EntityKind::DataType,
        EntityKind::EndUserApplication,
        EntityKind::Measurable,
        EntityKind::OrgUnit,
        EntityKind::Person,
    ];

    /// Stored name of the kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Actor => "ACTOR",
            EntityKind::Application => "APPLICATION",
            EntityKind::ChangeInitiative => "CHANGE_INITIATIVE",
            EntityKind::DataType => "DATA_TYPE",
            EntityKind::EndUserApplication => "END_USER_APPLICATION",
            EntityKind::Measurable => "MEASURABLE",
            EntityKind::OrgUnit => "ORG_UNIT",
            EntityKind::Person => "PERSON",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityKind {
    type Err = DbError;

    fn from_str(s: &str) -> Result<Self> {
        EntityKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| DbError::InvalidArgument(format!("Unknown entity kind '{}'", s)))
    }
}

/// Opaque (kind, id) pointer to the subject of an allocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityReference {
    pub kind: EntityKind,
    pub id: i64,
}

impl EntityReference {
    pub fn new(kind: EntityKind, id: i64) -> Self {
        Self { kind, id }
    }
}

impl fmt::Display for EntityReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.kind, self.id)
    }
}
