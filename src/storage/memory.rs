use std::sync::Mutex;

use async_trait::async_trait;
use dashmap::DashMap;

use crate::models::{Card, TransactionRecord};
use crate::storage::{LedgerStore, StoreError};

/// In-memory ledger.
///
/// Primary store for tests and the fallback when the configured database is
/// unreachable at startup (the relay then serves without persistence).
/// Transactions append in chronological order, so reverse iteration yields
/// newest-first listings.
#[derive(Default)]
pub struct MemoryLedger {
    cards: DashMap<String, Card>,
    log: Mutex<Vec<TransactionRecord>>
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self {
            cards: DashMap::new(),
            log: Mutex::new(Vec::new())
        }
    }
}

#[async_trait]
impl LedgerStore for MemoryLedger {
    async fn load_card(&self, uid: &str) -> Result<Option<Card>, StoreError> {
        Ok(self.cards.get(uid).map(|entry| entry.value().clone()))
    }

    async fn list_cards(&self) -> Result<Vec<Card>, StoreError> {
        let mut cards: Vec<Card> = self.cards.iter().map(|entry| entry.value().clone()).collect();
        cards.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));

        Ok(cards)
    }

    async fn record_topup(&self, card: &Card, record: &TransactionRecord) -> Result<(), StoreError> {
        let mut log = self.log.lock()
            .map_err(|error| StoreError::Query(format!("Transaction log poisoned: {error}")))?;

        self.cards.insert(card.uid.clone(), card.clone());
        log.push(record.clone());

        Ok(())
    }

    async fn list_transactions(&self, limit: usize) -> Result<Vec<TransactionRecord>, StoreError> {
        let log = self.log.lock()
            .map_err(|error| StoreError::Query(format!("Transaction log poisoned: {error}")))?;

        Ok(log.iter().rev().take(limit).cloned().collect())
    }

    async fn card_transactions(&self, uid: &str) -> Result<Vec<TransactionRecord>, StoreError> {
        let log = self.log.lock()
            .map_err(|error| StoreError::Query(format!("Transaction log poisoned: {error}")))?;

        Ok(log.iter().rev().filter(|record| record.uid == uid).cloned().collect())
    }
}
