use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::protocol::{BALANCE_SUFFIX, STATUS_SUFFIX};
use crate::types::Monetary;

/// Scan report from the reader: a card was tapped and this is the balance
/// the device knows about. Extra fields from firmware revisions are ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CardStatus {
    pub uid: String,
    pub balance: Monetary
}

/// A balance change, published by this relay after a top-up and echoed by
/// the device. The field is named `balance` in both directions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BalanceUpdate {
    pub uid: String,
    pub balance: Monetary,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>
}

impl BalanceUpdate {
    /// Builds an update stamped with the current time.
    pub fn now(uid: String, balance: Monetary) -> Self {
        Self {
            uid,
            balance,
            timestamp: Some(Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true))
        }
    }
}

/// A broker message decoded into one of the two relayed event kinds.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundEvent {
    Status(CardStatus),
    Balance(BalanceUpdate)
}

impl InboundEvent {
    /// Decodes a broker message by its topic.
    ///
    /// Topics outside the card namespace yield `Ok(None)`; malformed payloads
    /// on a known topic are an error for the caller to log and drop.
    pub fn decode(topic: &str, payload: &[u8]) -> Result<Option<InboundEvent>, serde_json::Error> {
        if topic.ends_with(STATUS_SUFFIX) {
            serde_json::from_slice(payload).map(|status| Some(InboundEvent::Status(status)))
        } else if topic.ends_with(BALANCE_SUFFIX) {
            serde_json::from_slice(payload).map(|update| Some(InboundEvent::Balance(update)))
        } else {
            Ok(None)
        }
    }

    /// Event name used on the dashboard push channel.
    pub fn push_event(&self) -> &'static str {
        match self {
            InboundEvent::Status(_) => "card-status",
            InboundEvent::Balance(_) => "card-balance"
        }
    }

    /// The `{event, data}` envelope broadcast to dashboard sessions.
    pub fn push_frame(&self) -> Value {
        match self {
            InboundEvent::Status(status) => json!({ "event": self.push_event(), "data": status }),
            InboundEvent::Balance(update) => json!({ "event": self.push_event(), "data": update })
        }
    }
}
