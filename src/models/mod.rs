mod card;
mod errors;
#[cfg(test)]
mod tests;
mod transaction;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

pub use card::Card;
pub use errors::ServiceError;
pub use transaction::TransactionRecord;

#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    Topup,
    Debit
}

impl Display for TransactionType {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        match self {
            TransactionType::Topup => formatter.write_str("topup"),
            TransactionType::Debit => formatter.write_str("debit")
        }
    }
}

impl FromStr for TransactionType {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "topup" => Ok(TransactionType::Topup),
            "debit" => Ok(TransactionType::Debit),
            other => Err(format!("Unknown transaction type [{other}]"))
        }
    }
}
