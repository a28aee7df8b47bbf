use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::errors::ServiceError;
use crate::types::Monetary;

/// A physical tap-to-pay token and its ledger state.
///
/// The `uid` comes from the card hardware and never changes; the holder name
/// is fixed at creation. The balance moves only through recorded
/// transactions and never goes negative.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Card {
    pub uid: String,
    pub holder_name: String,
    pub balance: Monetary,
    pub last_topup_amount: Monetary,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>
}

impl Card {
    /// Creates a card with a zero balance, ready for its first credit.
    pub fn open(uid: String, holder_name: String, now: DateTime<Utc>) -> Self {
        Self {
            uid,
            holder_name,
            balance: Monetary::ZERO,
            last_topup_amount: Monetary::ZERO,
            created_at: now,
            updated_at: now
        }
    }

    /// Credits the balance, returning the balance as it stood beforehand.
    ///
    /// # Errors
    /// Returns a validation error if the credit would overflow the balance.
    pub fn credit(&mut self, amount: Monetary, now: DateTime<Utc>) -> Result<Monetary, ServiceError> {
        let balance_before = self.balance;

        self.balance = self.balance.checked_add(amount)
            .ok_or_else(|| ServiceError::validation(format!("Top-up would overflow the balance of card [{}]", self.uid)))?;

        self.last_topup_amount = amount;
        self.updated_at = now;

        Ok(balance_before)
    }
}
