//! Table definitions for the allocation domain.
//!
//! Each submodule names its table, exposes column positions as constants and
//! builds the `TableSchema`. Record codecs in `dao::record` address columns
//! only through these constants.

use super::TableSchema;
use crate::core::{Column, DataType};

pub mod allocation {
    use super::*;

    pub const TABLE: &str = "allocation";

    pub const SCHEME_ID: usize = 0;
    pub const MEASURABLE_ID: usize = 1;
    pub const ENTITY_KIND: usize = 2;
    pub const ENTITY_ID: usize = 3;
    pub const PERCENTAGE: usize = 4;
    pub const LAST_UPDATED_AT: usize = 5;
    pub const LAST_UPDATED_BY: usize = 6;
    pub const EXTERNAL_ID: usize = 7;
    pub const PROVENANCE: usize = 8;

    pub fn table() -> TableSchema {
        TableSchema::new(
            TABLE,
            vec![
                Column::new("allocation_scheme_id", DataType::Integer).not_null(),
                Column::new("measurable_id", DataType::Integer).not_null(),
                Column::new("entity_kind", DataType::Text).not_null(),
                Column::new("entity_id", DataType::Integer).not_null(),
                Column::new("allocation_percentage", DataType::Integer).not_null(),
                Column::new("last_updated_at", DataType::Timestamp).not_null(),
                Column::new("last_updated_by", DataType::Text).not_null(),
                Column::new("external_id", DataType::Text),
                Column::new("provenance", DataType::Text).not_null(),
            ],
        )
        .primary_key(&[SCHEME_ID, MEASURABLE_ID, ENTITY_KIND, ENTITY_ID])
        .index(SCHEME_ID)
        .index(MEASURABLE_ID)
    }
}

pub mod allocation_scheme {
    use super::*;

    pub const TABLE: &str = "allocation_scheme";

    pub const ID: usize = 0;
    pub const NAME: usize = 1;
    pub const DESCRIPTION: usize = 2;
    pub const MEASURABLE_CATEGORY_ID: usize = 3;

    pub fn table() -> TableSchema {
        TableSchema::new(
            TABLE,
            vec![
                Column::new("id", DataType::Integer).not_null(),
                Column::new("name", DataType::Text).not_null(),
                Column::new("description", DataType::Text),
                Column::new("measurable_category_id", DataType::Integer).not_null(),
            ],
        )
        .primary_key(&[ID])
    }
}

pub mod measurable_category {
    use super::*;

    pub const TABLE: &str = "measurable_category";

    pub const ID: usize = 0;
    pub const NAME: usize = 1;

    pub fn table() -> TableSchema {
        TableSchema::new(
            TABLE,
            vec![
                Column::new("id", DataType::Integer).not_null(),
                Column::new("name", DataType::Text).not_null(),
            ],
        )
        .primary_key(&[ID])
    }
}

pub mod measurable {
    use super::*;

    pub const TABLE: &str = "measurable";

    pub const ID: usize = 0;
    pub const CATEGORY_ID: usize = 1;
    pub const NAME: usize = 2;
    pub const EXTERNAL_ID: usize = 3;

    pub fn table() -> TableSchema {
        TableSchema::new(
            TABLE,
            vec![
                Column::new("id", DataType::Integer).not_null(),
                Column::new("measurable_category_id", DataType::Integer).not_null(),
                Column::new("name", DataType::Text).not_null(),
                Column::new("external_id", DataType::Text),
            ],
        )
        .primary_key(&[ID])
        .index(CATEGORY_ID)
    }
}

pub mod measurable_rating {
    use super::*;

    pub const TABLE: &str = "measurable_rating";

    pub const MEASURABLE_ID: usize = 0;
    pub const ENTITY_KIND: usize = 1;
    pub const ENTITY_ID: usize = 2;
    pub const RATING: usize = 3;
    pub const LAST_UPDATED_AT: usize = 4;
    pub const LAST_UPDATED_BY: usize = 5;
    pub const PROVENANCE: usize = 6;

    pub fn table() -> TableSchema {
        TableSchema::new(
            TABLE,
            vec![
                Column::new("measurable_id", DataType::Integer).not_null(),
                Column::new("entity_kind", DataType::Text).not_null(),
                Column::new("entity_id", DataType::Integer).not_null(),
                Column::new("rating", DataType::Text).not_null(),
                Column::new("last_updated_at", DataType::Timestamp).not_null(),
                Column::new("last_updated_by", DataType::Text).not_null(),
                Column::new("provenance", DataType::Text).not_null(),
            ],
        )
        .primary_key(&[MEASURABLE_ID, ENTITY_KIND, ENTITY_ID])
        .index(MEASURABLE_ID)
    }
}

pub fn all_tables() -> Vec<TableSchema> {
    vec![
        allocation_scheme::table(),
        measurable_category::table(),
        measurable::table(),
        measurable_rating::table(),
        allocation::table(),
    ]
}
