mod errors;
mod memory;
mod sqlite;

use std::sync::Arc;

use async_trait::async_trait;

use crate::models::{Card, TransactionRecord};

pub use errors::StoreError;
pub use memory::MemoryLedger;
pub use sqlite::SqliteLedger;

pub type DynLedgerStore = Arc<dyn LedgerStore>;

/// Durable record of cards and their append-only transaction log.
///
/// Callers serialize read-modify-write cycles per uid themselves; the store
/// only guarantees that `record_topup` lands the card and its record as one
/// unit.
#[async_trait]
pub trait LedgerStore: Send + Sync + 'static {
    async fn load_card(&self, uid: &str) -> Result<Option<Card>, StoreError>;

    /// All cards, most recently updated first.
    async fn list_cards(&self) -> Result<Vec<Card>, StoreError>;

    /// Persists the updated or created card together with its transaction
    /// record. Either both land or the call reports failure.
    async fn record_topup(&self, card: &Card, record: &TransactionRecord) -> Result<(), StoreError>;

    /// The latest `limit` transactions, newest first.
    async fn list_transactions(&self, limit: usize) -> Result<Vec<TransactionRecord>, StoreError>;

    /// Transaction history for one card, newest first.
    async fn card_transactions(&self, uid: &str) -> Result<Vec<TransactionRecord>, StoreError>;
}
