use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{Card, TransactionType};
use crate::types::Monetary;

/// One append-only entry in the balance change log.
///
/// Records are immutable once created. The holder name is denormalized onto
/// the record so history listings render without a card lookup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRecord {
    pub id: Uuid,
    pub uid: String,
    pub holder_name: String,
    #[serde(rename = "type")]
    pub kind: TransactionType,
    pub amount: Monetary,
    pub balance_before: Monetary,
    pub balance_after: Monetary,
    pub description: String,
    pub created_at: DateTime<Utc>
}

impl TransactionRecord {
    /// Builds the record for an accepted top-up against the already-credited card.
    pub fn topup(card: &Card, amount: Monetary, balance_before: Monetary, created_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            uid: card.uid.clone(),
            holder_name: card.holder_name.clone(),
            kind: TransactionType::Topup,
            amount,
            balance_before,
            balance_after: card.balance,
            description: format!("Top-up of {amount}"),
            created_at
        }
    }
}
