use super::{Card, TransactionRecord, TransactionType};

use std::str::FromStr;

use anyhow::Result;
use chrono::{Duration, Utc};

use crate::models::errors::ServiceError;
use crate::types::Monetary;

fn amount(value: &str) -> Result<Monetary> {
    Ok(Monetary::from_str(value)?)
}

#[test]
fn test_new_card_opens_with_zero_balance() {
    let card = Card::open("CARD001".to_string(), "Alice".to_string(), Utc::now());

    assert_eq!(card.balance, Monetary::ZERO);
    assert_eq!(card.last_topup_amount, Monetary::ZERO);
    assert_eq!(card.created_at, card.updated_at);
}

#[test]
fn test_credit_returns_prior_balance_and_updates_state() -> Result<()> {
    let opened_at = Utc::now();
    let credited_at = opened_at + Duration::seconds(5);
    let mut card = Card::open("CARD001".to_string(), "Alice".to_string(), opened_at);

    let before_first = card.credit(amount("500")?, credited_at)?;

    assert_eq!(before_first, Monetary::ZERO);
    assert_eq!(card.balance, amount("500")?);

    let before_second = card.credit(amount("250")?, credited_at)?;

    assert_eq!(before_second, amount("500")?);
    assert_eq!(card.balance, amount("750")?);
    assert_eq!(card.last_topup_amount, amount("250")?);
    assert_eq!(card.updated_at, credited_at);
    assert_eq!(card.created_at, opened_at);

    Ok(())
}

#[test]
fn test_credit_rejects_balance_overflow() -> Result<()> {
    let mut card = Card::open("CARD001".to_string(), "Alice".to_string(), Utc::now());
    card.balance = Monetary::from_str("92233720368547758.07")?;

    let result = card.credit(amount("1")?, Utc::now());

    assert!(matches!(result, Err(ServiceError::Validation { .. })));

    Ok(())
}

#[test]
fn test_topup_record_snapshots_card_state() -> Result<()> {
    let mut card = Card::open("CARD001".to_string(), "Alice".to_string(), Utc::now());
    let credited = amount("500")?;
    let balance_before = card.credit(credited, Utc::now())?;

    let record = TransactionRecord::topup(&card, credited, balance_before, Utc::now());

    assert_eq!(record.uid, "CARD001");
    assert_eq!(record.holder_name, "Alice");
    assert_eq!(record.kind, TransactionType::Topup);
    assert_eq!(record.balance_before, Monetary::ZERO);
    assert_eq!(record.balance_after, amount("500")?);
    assert_eq!(record.balance_after, record.balance_before.checked_add(record.amount).unwrap());
    assert_eq!(record.description, "Top-up of 500");

    Ok(())
}

#[test]
fn test_records_serialize_with_wire_field_names() -> Result<()> {
    let mut card = Card::open("CARD001".to_string(), "Alice".to_string(), Utc::now());
    let balance_before = card.credit(amount("500")?, Utc::now())?;
    let record = TransactionRecord::topup(&card, amount("500")?, balance_before, Utc::now());

    let card_json = serde_json::to_value(&card)?;
    let record_json = serde_json::to_value(&record)?;

    assert_eq!(card_json["holderName"], "Alice");
    assert_eq!(card_json["balance"], 500);
    assert_eq!(record_json["type"], "topup");
    assert_eq!(record_json["balanceBefore"], 0);
    assert_eq!(record_json["balanceAfter"], 500);

    Ok(())
}
