// ============================================================================
// Transaction Management Module
// ============================================================================
//
// Exclusive, journaled transactions over the catalog:
// - State Pattern: Active -> Committed/Aborted
// - Command Pattern: every write journals its inverse for rollback
//
// ============================================================================

pub mod change;
pub mod state;

pub use change::Change;
pub use state::{Transaction, TransactionId, TransactionState};
