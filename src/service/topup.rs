use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::broker::BrokerClient;
use crate::models::{Card, ServiceError, TransactionRecord};
use crate::protocol::BalanceUpdate;
use crate::storage::DynLedgerStore;
use crate::types::Monetary;

const MIN_UID_LENGTH: usize = 3;
const DEFAULT_HISTORY_LIMIT: usize = 50;

/// A top-up request as posted by the dashboard.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopupRequest {
    pub uid: String,
    pub amount: Monetary,
    #[serde(default)]
    pub holder_name: Option<String>
}

/// What the dashboard gets back for an accepted top-up.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TopupOutcome {
    pub success: bool,
    pub card: Card,
    pub transaction: TransactionSummary
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionSummary {
    pub id: Uuid,
    pub amount: Monetary,
    pub balance_after: Monetary,
    pub timestamp: DateTime<Utc>
}

impl From<&TransactionRecord> for TransactionSummary {
    fn from(record: &TransactionRecord) -> Self {
        Self {
            id: record.id,
            amount: record.amount,
            balance_after: record.balance_after,
            timestamp: record.created_at
        }
    }
}

/// Applies top-ups against the ledger and tells the device side about the
/// new balance.
///
/// The read-modify-write on a card is serialized through a per-uid lock, so
/// concurrent top-ups on one card never lose updates while distinct cards
/// proceed in parallel. The lock table grows with the card population.
pub struct TopupService {
    store: DynLedgerStore,
    broker: Option<BrokerClient>,
    locks: DashMap<String, Arc<Mutex<()>>>
}

impl TopupService {
    /// Creates a service over the given ledger. Without a broker handle the
    /// service still applies top-ups and just skips device notification.
    pub fn new(store: DynLedgerStore, broker: Option<BrokerClient>) -> Self {
        Self {
            store,
            broker,
            locks: DashMap::new()
        }
    }

    /// Validates and applies a top-up: credit the card (creating it on first
    /// top-up), append the transaction record, then notify the device side
    /// best-effort.
    ///
    /// # Errors
    /// `Validation` for a short uid, a non-positive or fractional amount, or
    /// a missing holder name on a new card; `Storage` when persistence
    /// fails, in which case nothing is published.
    pub async fn apply_topup(&self, request: TopupRequest) -> Result<TopupOutcome, ServiceError> {
        let uid = request.uid.trim();

        if uid.len() < MIN_UID_LENGTH {
            return Err(ServiceError::validation("Valid UID required (min 3 chars)"));
        }

        if !request.amount.is_positive() || !request.amount.is_whole() {
            return Err(ServiceError::validation("Amount must be a positive integer"));
        }

        let lock = self.uid_lock(uid);
        let _guard = lock.lock().await;

        let now = Utc::now();

        let mut card = match self.store.load_card(uid).await? {
            Some(card) => card,
            None => {
                let holder = request.holder_name.as_deref().map(str::trim).unwrap_or("");

                if holder.is_empty() {
                    return Err(ServiceError::validation("Holder name required for new card"));
                }

                Card::open(uid.to_string(), holder.to_string(), now)
            }
        };

        let balance_before = card.credit(request.amount, now)?;
        let record = TransactionRecord::topup(&card, request.amount, balance_before, now);

        self.store.record_topup(&card, &record).await?;

        if let Some(broker) = &self.broker {
            broker.publish_balance(&BalanceUpdate::now(card.uid.clone(), card.balance)).await;
        }

        Ok(TopupOutcome {
            success: true,
            transaction: TransactionSummary::from(&record),
            card
        })
    }

    pub async fn card(&self, uid: &str) -> Result<Card, ServiceError> {
        self.store.load_card(uid).await?
            .ok_or_else(|| ServiceError::not_found(uid))
    }

    pub async fn cards(&self) -> Result<Vec<Card>, ServiceError> {
        Ok(self.store.list_cards().await?)
    }

    pub async fn transactions(&self, limit: Option<usize>) -> Result<Vec<TransactionRecord>, ServiceError> {
        Ok(self.store.list_transactions(limit.unwrap_or(DEFAULT_HISTORY_LIMIT)).await?)
    }

    pub async fn card_transactions(&self, uid: &str) -> Result<Vec<TransactionRecord>, ServiceError> {
        Ok(self.store.card_transactions(uid).await?)
    }

    fn uid_lock(&self, uid: &str) -> Arc<Mutex<()>> {
        self.locks.entry(uid.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}
