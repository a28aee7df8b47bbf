use super::{TopupRequest, TopupService};

use std::str::FromStr;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use futures_util::future::join_all;

use crate::models::{Card, ServiceError, TransactionRecord};
use crate::storage::{LedgerStore, MemoryLedger, StoreError};
use crate::types::Monetary;

fn request(uid: &str, amount: &str, holder_name: Option<&str>) -> Result<TopupRequest> {
    Ok(TopupRequest {
        uid: uid.to_string(),
        amount: Monetary::from_str(amount)?,
        holder_name: holder_name.map(str::to_string)
    })
}

fn service_over_memory() -> (Arc<MemoryLedger>, TopupService) {
    let ledger = Arc::new(MemoryLedger::new());
    let service = TopupService::new(ledger.clone(), None);

    (ledger, service)
}

#[tokio::test]
async fn test_first_topup_creates_the_card() -> Result<()> {
    let (_ledger, service) = service_over_memory();

    let outcome = service.apply_topup(request("CARD001", "500", Some("Alice"))?).await?;

    assert!(outcome.success);
    assert_eq!(outcome.card.uid, "CARD001");
    assert_eq!(outcome.card.holder_name, "Alice");
    assert_eq!(outcome.card.balance, Monetary::from_str("500")?);
    assert_eq!(outcome.transaction.balance_after, Monetary::from_str("500")?);

    let record = &service.card_transactions("CARD001").await?[0];

    assert_eq!(record.balance_before, Monetary::ZERO);
    assert_eq!(record.balance_after, Monetary::from_str("500")?);

    Ok(())
}

#[tokio::test]
async fn test_topup_on_existing_card_adds_to_balance() -> Result<()> {
    let (_ledger, service) = service_over_memory();

    service.apply_topup(request("CARD001", "500", Some("Alice"))?).await?;
    let outcome = service.apply_topup(request("CARD001", "250", None)?).await?;

    assert_eq!(outcome.card.balance, Monetary::from_str("750")?);
    assert_eq!(outcome.card.last_topup_amount, Monetary::from_str("250")?);

    let record = &service.card_transactions("CARD001").await?[0];

    assert_eq!(record.balance_before, Monetary::from_str("500")?);
    assert_eq!(record.balance_after, Monetary::from_str("750")?);

    Ok(())
}

#[tokio::test]
async fn test_holder_name_is_fixed_at_creation() -> Result<()> {
    let (_ledger, service) = service_over_memory();

    service.apply_topup(request("CARD001", "500", Some("Alice"))?).await?;
    let outcome = service.apply_topup(request("CARD001", "100", Some("Mallory"))?).await?;

    assert_eq!(outcome.card.holder_name, "Alice");

    Ok(())
}

#[tokio::test]
async fn test_uid_is_trimmed_before_lookup() -> Result<()> {
    let (_ledger, service) = service_over_memory();

    service.apply_topup(request("  CARD001  ", "500", Some("Alice"))?).await?;
    let outcome = service.apply_topup(request("CARD001", "250", None)?).await?;

    assert_eq!(outcome.card.balance, Monetary::from_str("750")?);

    Ok(())
}

#[tokio::test]
async fn test_short_uid_is_rejected_before_persistence() -> Result<()> {
    let (ledger, service) = service_over_memory();

    for uid in ["", "AB", "  A1  "] {
        let result = service.apply_topup(request(uid, "500", Some("Alice"))?).await;

        assert!(matches!(result, Err(ServiceError::Validation { .. })));
    }

    assert!(ledger.list_cards().await?.is_empty());
    assert!(ledger.list_transactions(10).await?.is_empty());

    Ok(())
}

#[tokio::test]
async fn test_invalid_amounts_are_rejected_before_persistence() -> Result<()> {
    let (ledger, service) = service_over_memory();

    for amount in ["0", "-50", "10.50"] {
        let result = service.apply_topup(request("CARD001", amount, Some("Alice"))?).await;

        assert!(matches!(result, Err(ServiceError::Validation { .. })));
    }

    assert!(ledger.list_cards().await?.is_empty());
    assert!(ledger.list_transactions(10).await?.is_empty());

    Ok(())
}

#[tokio::test]
async fn test_new_card_without_holder_name_is_rejected() -> Result<()> {
    let (ledger, service) = service_over_memory();

    for holder_name in [None, Some(""), Some("   ")] {
        let result = service.apply_topup(request("CARD001", "500", holder_name)?).await;

        assert!(matches!(result, Err(ServiceError::Validation { .. })));
    }

    assert!(ledger.list_cards().await?.is_empty());

    Ok(())
}

#[tokio::test]
async fn test_repeated_topups_are_not_deduplicated() -> Result<()> {
    let (_ledger, service) = service_over_memory();

    service.apply_topup(request("CARD001", "500", Some("Alice"))?).await?;
    service.apply_topup(request("CARD001", "500", Some("Alice"))?).await?;

    let card = service.card("CARD001").await?;
    let history = service.card_transactions("CARD001").await?;

    assert_eq!(card.balance, Monetary::from_str("1000")?);
    assert_eq!(history.len(), 2);
    assert_ne!(history[0].id, history[1].id);

    Ok(())
}

#[tokio::test]
async fn test_concurrent_topups_on_one_card_lose_no_updates() -> Result<()> {
    let (_ledger, service) = service_over_memory();
    let service = Arc::new(service);

    service.apply_topup(request("CARD001", "10", Some("Alice"))?).await?;

    let tasks: Vec<_> = (0..15)
        .map(|_| {
            let service = service.clone();
            tokio::spawn(async move {
                service.apply_topup(request("CARD001", "10", None)?).await?;
                Ok::<(), anyhow::Error>(())
            })
        })
        .collect();

    for joined in join_all(tasks).await {
        joined??;
    }

    let card = service.card("CARD001").await?;

    assert_eq!(card.balance, Monetary::from_str("160")?);
    assert_eq!(service.card_transactions("CARD001").await?.len(), 16);

    Ok(())
}

#[tokio::test]
async fn test_unknown_card_lookup_reports_not_found() {
    let (_ledger, service) = service_over_memory();

    let result = service.card("CARD404").await;

    assert!(matches!(result, Err(ServiceError::NotFound { .. })));
}

#[tokio::test]
async fn test_history_limit_defaults_to_fifty() -> Result<()> {
    let (_ledger, service) = service_over_memory();

    service.apply_topup(request("CARD001", "10", Some("Alice"))?).await?;
    for _ in 0..59 {
        service.apply_topup(request("CARD001", "10", None)?).await?;
    }

    assert_eq!(service.transactions(None).await?.len(), 50);
    assert_eq!(service.transactions(Some(5)).await?.len(), 5);

    Ok(())
}

struct FailingStore;

#[async_trait]
impl LedgerStore for FailingStore {
    async fn load_card(&self, _uid: &str) -> Result<Option<Card>, StoreError> {
        Ok(None)
    }

    async fn list_cards(&self) -> Result<Vec<Card>, StoreError> {
        Err(StoreError::Connection("ledger offline".to_string()))
    }

    async fn record_topup(&self, _card: &Card, _record: &TransactionRecord) -> Result<(), StoreError> {
        Err(StoreError::Query("write failed".to_string()))
    }

    async fn list_transactions(&self, _limit: usize) -> Result<Vec<TransactionRecord>, StoreError> {
        Err(StoreError::Connection("ledger offline".to_string()))
    }

    async fn card_transactions(&self, _uid: &str) -> Result<Vec<TransactionRecord>, StoreError> {
        Err(StoreError::Connection("ledger offline".to_string()))
    }
}

#[tokio::test]
async fn test_persistence_failure_surfaces_as_storage_error() -> Result<()> {
    let service = TopupService::new(Arc::new(FailingStore), None);

    let result = service.apply_topup(request("CARD001", "500", Some("Alice"))?).await;

    assert!(matches!(result, Err(ServiceError::Storage(_))));

    Ok(())
}
