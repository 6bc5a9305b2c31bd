pub mod config;

use crate::core::{DbError, Result, Row};
use crate::storage::{schema, Catalog, Condition, RowId, Table};
use crate::transaction::Transaction;
use log::warn;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

pub use config::AllocationConfig;

/// Read access shared by read sessions and transactions.
///
/// Store and projector reads take `&impl Reader` so the same query runs
/// against committed state or inside a transaction that has uncommitted
/// writes of its own.
pub trait Reader {
    fn catalog(&self) -> &Catalog;

    fn table(&self, name: &str) -> Result<&Table> {
        self.catalog().table(name)
    }

    fn select(&self, table: &str, conditions: &[Condition]) -> Result<Vec<(RowId, Row)>> {
        Ok(self.table(table)?.select(conditions))
    }
}

/// Shared read lock over the catalog.
pub struct ReadSession<'db> {
    catalog: RwLockReadGuard<'db, Catalog>,
}

impl Reader for ReadSession<'_> {
    fn catalog(&self) -> &Catalog {
        &self.catalog
    }
}

impl Reader for Transaction<'_> {
    fn catalog(&self) -> &Catalog {
        self.catalog_ref()
    }
}

/// Handle to one in-process allocation database.
///
/// Cloning is cheap and every clone sees the same tables. Any number of read
/// sessions may run together; a transaction excludes everything else until
/// it commits or rolls back, so concurrent writers apply in lock order.
#[derive(Clone)]
pub struct Database {
    catalog: Arc<RwLock<Catalog>>,
}

impl Database {
    /// Create a database with every allocation-domain table.
    pub fn new() -> Result<Self> {
        let mut catalog = Catalog::new();
        for table in schema::all_tables() {
            catalog.create_table(table)?;
        }
        Ok(Self {
            catalog: Arc::new(RwLock::new(catalog)),
        })
    }

    /// Open a read session; blocks while a transaction is running.
    pub fn begin_read(&self) -> Result<ReadSession<'_>> {
        let catalog = self.catalog.read().unwrap_or_else(|poisoned| {
            self.recover_poisoned();
            poisoned.into_inner()
        });
        Ok(ReadSession { catalog })
    }

    /// Start an exclusive transaction; blocks until every other session ends.
    pub fn begin(&self) -> Result<Transaction<'_>> {
        Ok(Transaction::begin(self.write_catalog()))
    }

    fn write_catalog(&self) -> RwLockWriteGuard<'_, Catalog> {
        self.catalog.write().unwrap_or_else(|poisoned| {
            self.recover_poisoned();
            poisoned.into_inner()
        })
    }

    // A writer that panicked was rolled back by `Transaction`'s drop before
    // its guard was released, so the catalog is consistent again.
    fn recover_poisoned(&self) {
        warn!("Catalog lock poisoned by a panicked transaction, recovering");
        self.catalog.clear_poison();
    }

    /// Run `work` against a read session released when it returns.
    pub fn read<T, F>(&self, work: F) -> Result<T>
    where
        F: FnOnce(&ReadSession<'_>) -> Result<T>,
    {
        let session = self.begin_read()?;
        work(&session)
    }

    /// Run `work` in a transaction: committed on `Ok`, rolled back on `Err`.
    ///
    /// The transaction holds the catalog lock, which is not reentrant. Inside
    /// `work`, use the `tx` handle with the store and DAO components; calling
    /// [`Database::read`], [`Database::transaction`] or any
    /// `AllocationService` method on the same thread deadlocks.
    pub fn transaction<T, F>(&self, work: F) -> Result<T>
    where
        F: FnOnce(&mut Transaction<'_>) -> Result<T>,
    {
        let mut txn = self.begin()?;
        match work(&mut txn) {
            Ok(value) => {
                txn.commit()?;
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback_err) = txn.rollback() {
                    return Err(DbError::TransactionError(format!(
                        "{} (rollback failed: {})",
                        err, rollback_err
                    )));
                }
                Err(err)
            }
        }
    }

    pub fn row_count(&self, table: &str) -> Result<usize> {
        self.read(|session| Ok(session.table(table)?.row_count()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Value;
    use crate::storage::schema::measurable_category;

    fn category(id: i64) -> Row {
        vec![Value::Integer(id), Value::from("Capabilities")]
    }

    #[test]
    fn test_creates_domain_tables() {
        let db = Database::new().unwrap();
        let tables = db.read(|s| Ok(s.catalog().list_tables())).unwrap();
        assert_eq!(tables.len(), 5);
        assert!(tables.contains(&"allocation".to_string()));
    }

    #[test]
    fn test_transaction_commits_on_ok() {
        let db = Database::new().unwrap();
        db.transaction(|tx| tx.insert(measurable_category::TABLE, category(1)))
            .unwrap();
        assert_eq!(db.row_count(measurable_category::TABLE).unwrap(), 1);
    }

    #[test]
    fn test_transaction_rolls_back_on_err() {
        let db = Database::new().unwrap();
        let result: Result<()> = db.transaction(|tx| {
            tx.insert(measurable_category::TABLE, category(1))?;
            tx.insert(measurable_category::TABLE, category(1))?;
            Ok(())
        });
        assert!(matches!(result, Err(DbError::ConstraintViolation(_))));
        assert_eq!(db.row_count(measurable_category::TABLE).unwrap(), 0);
    }

    #[test]
    fn test_reads_inside_transaction_see_own_writes() {
        let db = Database::new().unwrap();
        db.transaction(|tx| {
            tx.insert(measurable_category::TABLE, category(3))?;
            let rows = tx.select(measurable_category::TABLE, &[(0, Value::Integer(3))])?;
            assert_eq!(rows.len(), 1);
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn test_panic_in_transaction_leaves_database_usable() {
        let db = Database::new().unwrap();
        let shared = db.clone();
        let outcome = std::thread::spawn(move || {
            let _: Result<()> = shared.transaction(|tx| {
                tx.insert(measurable_category::TABLE, category(9))?;
                panic!("writer failed");
            });
        })
        .join();
        assert!(outcome.is_err());

        assert_eq!(db.row_count(measurable_category::TABLE).unwrap(), 0);
        db.transaction(|tx| tx.insert(measurable_category::TABLE, category(9)))
            .unwrap();
        assert_eq!(db.row_count(measurable_category::TABLE).unwrap(), 1);
    }

    #[test]
    fn test_clones_share_state() {
        let db = Database::new().unwrap();
        let other = db.clone();
        db.transaction(|tx| tx.insert(measurable_category::TABLE, category(2)))
            .unwrap();
        assert_eq!(other.row_count(measurable_category::TABLE).unwrap(), 1);
    }
}
