// ============================================================================
// Transaction Change Tracking
// ============================================================================
//
// Every write made through a transaction is recorded as a Change carrying
// enough of the previous state to reverse it. Rollback replays the log
// backwards.
//
// ============================================================================

use crate::core::{DbError, Result, Row};
use crate::storage::{Catalog, RowId};

#[derive(Debug, Clone)]
pub enum Change {
    InsertRow {
        table: String,
        row_id: RowId,
    },

    UpdateRow {
        table: String,
        row_id: RowId,
        old_row: Row,
    },

    DeleteRow {
        table: String,
        row_id: RowId,
        old_row: Row,
    },
}

impl Change {
    pub fn table_name(&self) -> &str {
        match self {
            Change::InsertRow { table, .. } => table,
            Change::UpdateRow { table, .. } => table,
            Change::DeleteRow { table, .. } => table,
        }
    }

    /// Reverse this change against the catalog.
    pub(crate) fn undo(self, catalog: &mut Catalog) -> Result<()> {
        match self {
            Change::InsertRow { table, row_id } => {
                catalog
                    .table_mut(&table)?
                    .delete(row_id)
                    .map(|_| ())
                    .ok_or_else(|| {
                        DbError::TransactionError(format!(
                            "Cannot undo insert: row {} missing from '{}'",
                            row_id, table
                        ))
                    })
            }
            Change::UpdateRow {
                table,
                row_id,
                old_row,
            } => catalog.table_mut(&table)?.update(row_id, old_row).map(|_| ()),
            Change::DeleteRow {
                table,
                row_id,
                old_row,
            } => catalog.table_mut(&table)?.restore(row_id, old_row),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Column, DataType, Value};
    use crate::storage::TableSchema;

    fn catalog() -> Catalog {
        let mut catalog = Catalog::new();
        catalog
            .create_table(
                TableSchema::new("t", vec![Column::new("id", DataType::Integer).not_null()])
                    .primary_key(&[0]),
            )
            .unwrap();
        catalog
    }

    #[test]
    fn test_undo_insert() {
        let mut catalog = catalog();
        let row_id = catalog.table_mut("t").unwrap().insert(vec![Value::Integer(1)]).unwrap();

        let change = Change::InsertRow {
            table: "t".into(),
            row_id,
        };
        assert_eq!(change.table_name(), "t");
        change.undo(&mut catalog).unwrap();
        assert_eq!(catalog.table("t").unwrap().row_count(), 0);
    }

    #[test]
    fn test_undo_delete_restores_row() {
        let mut catalog = catalog();
        let table = catalog.table_mut("t").unwrap();
        let row_id = table.insert(vec![Value::Integer(7)]).unwrap();
        let old_row = table.delete(row_id).unwrap();

        Change::DeleteRow {
            table: "t".into(),
            row_id,
            old_row,
        }
        .undo(&mut catalog)
        .unwrap();

        let table = catalog.table("t").unwrap();
        assert_eq!(table.get(row_id), Some(&vec![Value::Integer(7)]));
    }
}
