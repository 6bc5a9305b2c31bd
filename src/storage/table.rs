use crate::core::{Column, DbError, Result, Row, Value};
use std::collections::{BTreeMap, HashMap};

pub type RowId = usize;

/// Equality predicate on a single column, by column position.
pub type Condition = (usize, Value);

#[derive(Debug, Clone)]
pub struct TableSchema {
    name: String,
    columns: Vec<Column>,
    primary_key: Vec<usize>,
    indexes: Vec<usize>,
}

impl TableSchema {
    /// Create a schema with no key or indexes; add them with the builder methods.
    pub fn new(name: impl Into<String>, columns: Vec<Column>) -> Self {
        Self {
            name: name.into(),
            columns,
            primary_key: Vec::new(),
            indexes: Vec::new(),
        }
    }

    /// Declare the (possibly composite) primary key by column positions.
    pub fn primary_key(mut self, columns: &[usize]) -> Self {
        self.primary_key = columns.to_vec();
        self
    }

    /// Declare a secondary equality index on one column.
    pub fn index(mut self, column: usize) -> Self {
        if !self.indexes.contains(&column) {
            self.indexes.push(column);
        }
        self
    }

    /// Table name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Column definitions in row order
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }
}

#[derive(Debug, Clone)]
pub struct Table {
    schema: TableSchema,
    rows: BTreeMap<RowId, Row>,
    next_row_id: RowId,
    pk_index: HashMap<Vec<Value>, RowId>,
    indexes: HashMap<usize, BTreeMap<Value, Vec<RowId>>>,
}

impl Table {
    /// Create an empty table with the schema's indexes.
    pub fn new(schema: TableSchema) -> Self {
        let indexes = schema
            .indexes
            .iter()
            .map(|col| (*col, BTreeMap::new()))
            .collect();
        Self {
            schema,
            rows: BTreeMap::new(),
            next_row_id: 0,
            pk_index: HashMap::new(),
            indexes,
        }
    }

    pub fn name(&self) -> &str {
        self.schema.name()
    }

    /// Number of live rows
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Get a row by id
    pub fn get(&self, id: RowId) -> Option<&Row> {
        self.rows.get(&id)
    }

    /// Insert a row under a fresh id.
    ///
    /// Fails with `ConstraintViolation` on a schema mismatch or duplicate key.
    pub fn insert(&mut self, row: Row) -> Result<RowId> {
        let id = self.next_row_id;
        self.insert_at(id, row)?;
        self.next_row_id += 1;
        Ok(id)
    }

    /// Re-insert a row under an id it held before. Used to undo a delete.
    pub(crate) fn restore(&mut self, id: RowId, row: Row) -> Result<()> {
        if self.rows.contains_key(&id) {
            return Err(DbError::ConstraintViolation(format!(
                "Row {} already present in table '{}'",
                id,
                self.name()
            )));
        }
        self.insert_at(id, row)?;
        self.next_row_id = self.next_row_id.max(id + 1);
        Ok(())
    }

    fn insert_at(&mut self, id: RowId, row: Row) -> Result<()> {
        self.validate_row(&row)?;
        if let Some(key) = self.key_of(&row) {
            if self.pk_index.contains_key(&key) {
                return Err(self.duplicate_key(&key));
            }
            self.pk_index.insert(key, id);
        }
        self.add_to_indexes(id, &row);
        self.rows.insert(id, row);
        Ok(())
    }

    /// Replace a row, returning the previous version.
    pub fn update(&mut self, id: RowId, new_row: Row) -> Result<Row> {
        self.validate_row(&new_row)?;

        let old_key = match self.rows.get(&id) {
            Some(old) => self.key_of(old),
            None => {
                return Err(DbError::RowNotFound(format!(
                    "Row {} in table '{}'",
                    id,
                    self.name()
                )))
            }
        };
        let new_key = self.key_of(&new_row);

        if new_key != old_key {
            if let Some(key) = &new_key {
                if self.pk_index.contains_key(key) {
                    return Err(self.duplicate_key(key));
                }
            }
            if let Some(key) = &old_key {
                self.pk_index.remove(key);
            }
            if let Some(key) = new_key {
                self.pk_index.insert(key, id);
            }
        }

        let old_row = match self.rows.insert(id, new_row.clone()) {
            Some(old) => old,
            None => {
                return Err(DbError::RowNotFound(format!(
                    "Row {} in table '{}'",
                    id,
                    self.name()
                )))
            }
        };
        self.remove_from_indexes(id, &old_row);
        self.add_to_indexes(id, &new_row);
        Ok(old_row)
    }

    /// Remove a row and its index entries, returning it.
    pub fn delete(&mut self, id: RowId) -> Option<Row> {
        let row = self.rows.remove(&id)?;
        if let Some(key) = self.key_of(&row) {
            self.pk_index.remove(&key);
        }
        self.remove_from_indexes(id, &row);
        Some(row)
    }

    /// Point read by primary key values, in primary-key column order.
    pub fn find_by_key(&self, key: &[Value]) -> Option<(RowId, &Row)> {
        let id = *self.pk_index.get(key)?;
        self.rows.get(&id).map(|row| (id, row))
    }

    /// Rows whose columns equal every condition.
    ///
    /// Uses the primary key when the conditions cover it exactly, then any
    /// secondary index, and falls back to a full scan.
    pub fn select(&self, conditions: &[Condition]) -> Vec<(RowId, Row)> {
        if let Some(key) = self.key_from_conditions(conditions) {
            return self
                .find_by_key(&key)
                .map(|(id, row)| vec![(id, row.clone())])
                .unwrap_or_default();
        }

        let matches = |row: &Row| conditions.iter().all(|(col, value)| &row[*col] == value);

        let indexed = conditions
            .iter()
            .find_map(|(col, value)| self.indexes.get(col).map(|index| index.get(value)));

        match indexed {
            Some(ids) => ids
                .into_iter()
                .flatten()
                .filter_map(|id| self.rows.get(id).map(|row| (*id, row)))
                .filter(|(_, row)| matches(row))
                .map(|(id, row)| (id, row.clone()))
                .collect(),
            None => self
                .rows
                .iter()
                .filter(|(_, row)| matches(row))
                .map(|(id, row)| (*id, row.clone()))
                .collect(),
        }
    }

    fn key_from_conditions(&self, conditions: &[Condition]) -> Option<Vec<Value>> {
        let pk = &self.schema.primary_key;
        if pk.is_empty() || conditions.len() != pk.len() {
            return None;
        }
        pk.iter()
            .map(|col| {
                conditions
                    .iter()
                    .find(|(c, _)| c == col)
                    .map(|(_, v)| v.clone())
            })
            .collect()
    }

    fn key_of(&self, row: &Row) -> Option<Vec<Value>> {
        if self.schema.primary_key.is_empty() {
            return None;
        }
        Some(
            self.schema
                .primary_key
                .iter()
                .map(|col| row[*col].clone())
                .collect(),
        )
    }

    fn duplicate_key(&self, key: &[Value]) -> DbError {
        let rendered: Vec<String> = key.iter().map(|v| v.to_string()).collect();
        DbError::ConstraintViolation(format!(
            "Duplicate key ({}) in table '{}'",
            rendered.join(", "),
            self.name()
        ))
    }

    fn validate_row(&self, row: &Row) -> Result<()> {
        let columns = self.schema.columns();
        if row.len() != columns.len() {
            return Err(DbError::ConstraintViolation(format!(
                "Table '{}' expects {} columns, got {}",
                self.name(),
                columns.len(),
                row.len()
            )));
        }
        for (column, value) in columns.iter().zip(row.iter()) {
            column.validate(value)?;
        }
        Ok(())
    }

    fn add_to_indexes(&mut self, id: RowId, row: &Row) {
        for (col, index) in &mut self.indexes {
            index.entry(row[*col].clone()).or_default().push(id);
        }
    }

    fn remove_from_indexes(&mut self, id: RowId, row: &Row) {
        for (col, index) in &mut self.indexes {
            if let Some(ids) = index.get_mut(&row[*col]) {
                ids.retain(|&x| x != id);
                if ids.is_empty() {
                    index.remove(&row[*col]);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::DataType;

    fn pair_table() -> Table {
        Table::new(
            TableSchema::new(
                "pairs",
                vec![
                    Column::new("a", DataType::Integer).not_null(),
                    Column::new("b", DataType::Integer).not_null(),
                    Column::new("label", DataType::Text),
                ],
            )
            .primary_key(&[0, 1])
            .index(0),
        )
    }

    fn row(a: i64, b: i64, label: &str) -> Row {
        vec![Value::Integer(a), Value::Integer(b), Value::from(label)]
    }

    #[test]
    fn test_insert_rejects_duplicate_key() {
        let mut table = pair_table();
        table.insert(row(1, 2, "x")).unwrap();
        let err = table.insert(row(1, 2, "y")).unwrap_err();
        assert!(matches!(err, DbError::ConstraintViolation(_)));
        assert_eq!(table.row_count(), 1);
    }

    #[test]
    fn test_select_by_full_key_and_index() {
        let mut table = pair_table();
        table.insert(row(1, 2, "x")).unwrap();
        table.insert(row(1, 3, "y")).unwrap();
        table.insert(row(2, 3, "z")).unwrap();

        let exact = table.select(&[(1, Value::Integer(3)), (0, Value::Integer(1))]);
        assert_eq!(exact.len(), 1);
        assert_eq!(exact[0].1[2], Value::from("y"));

        let by_a = table.select(&[(0, Value::Integer(1))]);
        assert_eq!(by_a.len(), 2);

        let by_b = table.select(&[(1, Value::Integer(3))]);
        assert_eq!(by_b.len(), 2);
    }

    #[test]
    fn test_update_moves_key() {
        let mut table = pair_table();
        let id = table.insert(row(1, 2, "x")).unwrap();
        let old = table.update(id, row(5, 6, "x")).unwrap();
        assert_eq!(old, row(1, 2, "x"));
        assert!(table.find_by_key(&[Value::Integer(1), Value::Integer(2)]).is_none());
        assert!(table.find_by_key(&[Value::Integer(5), Value::Integer(6)]).is_some());
        assert!(table.select(&[(0, Value::Integer(1))]).is_empty());
    }

    #[test]
    fn test_delete_then_restore() {
        let mut table = pair_table();
        let id = table.insert(row(1, 2, "x")).unwrap();
        let removed = table.delete(id).unwrap();
        assert_eq!(table.row_count(), 0);

        table.restore(id, removed).unwrap();
        assert_eq!(table.get(id), Some(&row(1, 2, "x")));
        assert!(table.restore(id, row(9, 9, "dup")).is_err());
    }

    #[test]
    fn test_validate_column_count() {
        let mut table = pair_table();
        assert!(table.insert(vec![Value::Integer(1)]).is_err());
    }
}
