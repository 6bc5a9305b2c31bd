// ============================================================================
// Transaction State Management
// ============================================================================
//
// A transaction owns the catalog write lock for its whole lifetime, so
// transactions are serialized in the order they acquire it. Writes are
// applied in place and journaled; rollback replays the journal backwards.
//
// State transitions:
//
//   Active ──commit──> Committed
//     │
//     └──rollback──> Aborted
//
// A transaction dropped while still Active is rolled back.
//
// ============================================================================

use super::Change;
use crate::core::{DbError, Result, Row};
use crate::storage::{Catalog, Condition, RowId, Table};
use log::{debug, warn};
use std::sync::RwLockWriteGuard;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

static NEXT_TXN_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TransactionId(pub u64);

impl TransactionId {
    /// Generate a new unique transaction ID
    pub fn new() -> Self {
        TransactionId(NEXT_TXN_ID.fetch_add(1, Ordering::SeqCst))
    }

    /// Get the raw ID value
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl Default for TransactionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TransactionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "txn_{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionState {
    Active,
    Committed,
    Aborted,
}

impl TransactionState {
    /// Check if the transaction can still accept writes
    pub fn is_active(&self) -> bool {
        matches!(self, TransactionState::Active)
    }
}

impl std::fmt::Display for TransactionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransactionState::Active => write!(f, "ACTIVE"),
            TransactionState::Committed => write!(f, "COMMITTED"),
            TransactionState::Aborted => write!(f, "ABORTED"),
        }
    }
}

/// An exclusive, journaled unit of work against the catalog.
pub struct Transaction<'db> {
    id: TransactionId,
    state: TransactionState,
    catalog: RwLockWriteGuard<'db, Catalog>,
    changes: Vec<Change>,
    start_time: Instant,
}

impl<'db> Transaction<'db> {
    pub(crate) fn begin(catalog: RwLockWriteGuard<'db, Catalog>) -> Self {
        let id = TransactionId::new();
        debug!("Transaction {} started", id);
        Self {
            id,
            state: TransactionState::Active,
            catalog,
            changes: Vec::new(),
            start_time: Instant::now(),
        }
    }

    /// Get transaction ID
    pub fn id(&self) -> TransactionId {
        self.id
    }

    /// Get current state
    pub fn state(&self) -> TransactionState {
        self.state
    }

    /// Journaled changes, oldest first
    pub fn changes(&self) -> &[Change] {
        &self.changes
    }

    /// Number of journaled changes
    pub fn change_count(&self) -> usize {
        self.changes.len()
    }

    /// Time since the transaction started
    pub fn duration(&self) -> Duration {
        self.start_time.elapsed()
    }

    pub(crate) fn catalog_ref(&self) -> &Catalog {
        &self.catalog
    }

    fn ensure_active(&self) -> Result<()> {
        if !self.state.is_active() {
            return Err(DbError::TransactionError(format!(
                "Transaction {} is {}",
                self.id, self.state
            )));
        }
        Ok(())
    }

    fn table_mut(&mut self, table: &str) -> Result<&mut Table> {
        self.ensure_active()?;
        self.catalog.table_mut(table)
    }

    /// Insert a row and journal its removal.
    pub fn insert(&mut self, table: &str, row: Row) -> Result<RowId> {
        let row_id = self.table_mut(table)?.insert(row)?;
        self.changes.push(Change::InsertRow {
            table: table.to_string(),
            row_id,
        });
        Ok(row_id)
    }

    /// Replace a row by id and journal the previous version.
    pub fn update(&mut self, table: &str, row_id: RowId, row: Row) -> Result<()> {
        let old_row = self.table_mut(table)?.update(row_id, row)?;
        self.changes.push(Change::UpdateRow {
            table: table.to_string(),
            row_id,
            old_row,
        });
        Ok(())
    }

    /// Delete one row by id; false if it does not exist.
    pub fn delete(&mut self, table: &str, row_id: RowId) -> Result<bool> {
        match self.table_mut(table)?.delete(row_id) {
            Some(old_row) => {
                self.changes.push(Change::DeleteRow {
                    table: table.to_string(),
                    row_id,
                    old_row,
                });
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Rewrite every row matching the conditions; returns the number changed.
    pub fn update_where<F>(&mut self, table: &str, conditions: &[Condition], rewrite: F) -> Result<usize>
    where
        F: Fn(&Row) -> Row,
    {
        let targets = self.table_mut(table)?.select(conditions);
        for (row_id, row) in &targets {
            self.update(table, *row_id, rewrite(row))?;
        }
        Ok(targets.len())
    }

    /// Delete every row matching the conditions; returns the number removed.
    pub fn delete_where(&mut self, table: &str, conditions: &[Condition]) -> Result<usize> {
        let targets = self.table_mut(table)?.select(conditions);
        let mut removed = 0;
        for (row_id, _) in targets {
            if self.delete(table, row_id)? {
                removed += 1;
            }
        }
        Ok(removed)
    }

    /// Commit the transaction; its writes are already in place.
    pub fn commit(mut self) -> Result<()> {
        self.ensure_active()?;
        self.state = TransactionState::Committed;
        debug!(
            "Transaction {} committed ({} changes, {:?})",
            self.id,
            self.changes.len(),
            self.duration()
        );
        self.changes.clear();
        Ok(())
    }

    /// Undo every journaled change, newest first.
    pub fn rollback(mut self) -> Result<()> {
        self.ensure_active()?;
        self.abort()
    }

    fn abort(&mut self) -> Result<()> {
        let undone = self.changes.len();
        let mut first_error = None;
        while let Some(change) = self.changes.pop() {
            if let Err(err) = change.undo(&mut self.catalog) {
                first_error.get_or_insert(err);
            }
        }
        self.state = TransactionState::Aborted;
        debug!("Transaction {} rolled back ({} changes)", self.id, undone);
        match first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

impl Drop for Transaction<'_> {
    fn drop(&mut self) {
        if self.state.is_active() {
            warn!("Transaction {} dropped while active, rolling back", self.id);
            if let Err(err) = self.abort() {
                warn!("Rollback of {} incomplete: {}", self.id, err);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Column, DataType, Value};
    use crate::storage::TableSchema;
    use std::sync::RwLock;

    fn catalog() -> RwLock<Catalog> {
        let mut catalog = Catalog::new();
        catalog
            .create_table(
                TableSchema::new(
                    "t",
                    vec![
                        Column::new("id", DataType::Integer).not_null(),
                        Column::new("v", DataType::Integer).not_null(),
                    ],
                )
                .primary_key(&[0]),
            )
            .unwrap();
        RwLock::new(catalog)
    }

    fn row(id: i64, v: i64) -> Row {
        vec![Value::Integer(id), Value::Integer(v)]
    }

    #[test]
    fn test_transaction_id_generation() {
        let id1 = TransactionId::new();
        let id2 = TransactionId::new();
        assert!(id2.as_u64() > id1.as_u64());
    }

    #[test]
    fn test_commit_keeps_writes() {
        let lock = catalog();
        let mut txn = Transaction::begin(lock.write().unwrap());
        let other = TransactionId::new();
        assert!(txn.id() < other);
        txn.insert("t", row(1, 10)).unwrap();
        assert_eq!(txn.state(), TransactionState::Active);
        txn.commit().unwrap();

        assert_eq!(lock.read().unwrap().table("t").unwrap().row_count(), 1);
    }

    #[test]
    fn test_rollback_reverses_all_kinds() {
        let lock = catalog();
        {
            let mut txn = Transaction::begin(lock.write().unwrap());
            txn.insert("t", row(1, 10)).unwrap();
            txn.insert("t", row(2, 20)).unwrap();
            txn.commit().unwrap();
        }

        let mut txn = Transaction::begin(lock.write().unwrap());
        txn.delete_where("t", &[(0, Value::Integer(1))]).unwrap();
        let changed = txn
            .update_where("t", &[(0, Value::Integer(2))], |_| row(2, 99))
            .unwrap();
        assert_eq!(changed, 1);
        txn.insert("t", row(3, 30)).unwrap();
        assert_eq!(txn.change_count(), 3);
        txn.rollback().unwrap();

        let catalog = lock.read().unwrap();
        let table = catalog.table("t").unwrap();
        assert_eq!(table.row_count(), 2);
        assert_eq!(table.find_by_key(&[Value::Integer(2)]).unwrap().1, &row(2, 20));
        assert!(table.find_by_key(&[Value::Integer(3)]).is_none());
    }

    #[test]
    fn test_drop_while_active_rolls_back() {
        let lock = catalog();
        {
            let mut txn = Transaction::begin(lock.write().unwrap());
            txn.insert("t", row(1, 10)).unwrap();
        }
        assert_eq!(lock.read().unwrap().table("t").unwrap().row_count(), 0);
    }

    #[test]
    fn test_failed_write_is_not_journaled() {
        let lock = catalog();
        let mut txn = Transaction::begin(lock.write().unwrap());
        txn.insert("t", row(1, 10)).unwrap();
        assert!(txn.insert("t", row(1, 11)).is_err());
        assert_eq!(txn.change_count(), 1);
        assert!(matches!(
            txn.changes(),
            [Change::InsertRow { row_id: 0, .. }]
        ));
        assert!(txn.insert("missing", row(1, 1)).is_err());
    }
}
