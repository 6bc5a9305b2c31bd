use super::{Table, TableSchema};
use crate::core::{DbError, Result};
use std::collections::HashMap;

/// Owns every table of a database instance.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    tables: HashMap<String, Table>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new, empty table.
    pub fn create_table(&mut self, schema: TableSchema) -> Result<()> {
        let name = schema.name().to_string();
        if self.tables.contains_key(&name) {
            return Err(DbError::ConstraintViolation(format!(
                "Table '{}' already exists",
                name
            )));
        }
        self.tables.insert(name, Table::new(schema));
        Ok(())
    }

    /// Get a table by name
    pub fn table(&self, name: &str) -> Result<&Table> {
        self.tables
            .get(name)
            .ok_or_else(|| DbError::TableNotFound(name.to_string()))
    }

    /// Get a mutable table by name
    pub fn table_mut(&mut self, name: &str) -> Result<&mut Table> {
        self.tables
            .get_mut(name)
            .ok_or_else(|| DbError::TableNotFound(name.to_string()))
    }

    pub fn table_exists(&self, name: &str) -> bool {
        self.tables.contains_key(name)
    }

    /// Table names, sorted
    pub fn list_tables(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tables.keys().cloned().collect();
        names.sort();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Column, DataType};

    #[test]
    fn test_create_and_lookup() {
        let mut catalog = Catalog::new();
        catalog
            .create_table(TableSchema::new("t", vec![Column::new("id", DataType::Integer)]))
            .unwrap();
        assert!(catalog.table_exists("t"));
        assert!(catalog.table("t").is_ok());
        assert!(matches!(catalog.table("missing"), Err(DbError::TableNotFound(_))));
    }

    #[test]
    fn test_duplicate_table() {
        let mut catalog = Catalog::new();
        let schema = TableSchema::new("t", vec![]);
        catalog.create_table(schema.clone()).unwrap();
        assert!(catalog.create_table(schema).is_err());
    }
}
