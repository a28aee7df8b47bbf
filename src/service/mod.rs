#[cfg(test)]
mod tests;
mod topup;

pub use topup::{TopupOutcome, TopupRequest, TopupService, TransactionSummary};
