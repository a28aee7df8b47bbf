use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Result};
use tempfile::NamedTempFile;
use tokio::sync::mpsc;
use tokio::time::timeout;
use uuid::Uuid;

use tap_relay::models::ServiceError;
use tap_relay::notifier::{self, SessionRegistry};
use tap_relay::protocol::{BalanceUpdate, InboundEvent};
use tap_relay::service::{TopupRequest, TopupService};
use tap_relay::storage::SqliteLedger;
use tap_relay::types::Monetary;

fn request(uid: &str, amount: &str, holder_name: Option<&str>) -> Result<TopupRequest> {
    Ok(TopupRequest {
        uid: uid.to_string(),
        amount: Monetary::from_str(amount)?,
        holder_name: holder_name.map(str::to_string)
    })
}

async fn sqlite_service() -> Result<(TopupService, NamedTempFile)> {
    let file = NamedTempFile::new()?;
    let url = format!("sqlite://{}", file.path().display());
    let ledger = SqliteLedger::connect(&url).await?;

    Ok((TopupService::new(Arc::new(ledger), None), file))
}

#[tokio::test]
async fn test_topup_lifecycle_against_durable_storage() -> Result<()> {
    let (service, _file) = sqlite_service().await?;

    let first = service.apply_topup(request("CARD001", "500", Some("Alice"))?).await?;

    assert!(first.success);
    assert_eq!(first.card.balance, Monetary::from_str("500")?);

    let second = service.apply_topup(request("CARD001", "250", None)?).await?;

    assert_eq!(second.card.balance, Monetary::from_str("750")?);

    let history = service.card_transactions("CARD001").await?;

    assert_eq!(history.len(), 2);
    assert_eq!(history[0].balance_before, Monetary::from_str("500")?);
    assert_eq!(history[0].balance_after, Monetary::from_str("750")?);
    assert_eq!(history[1].balance_before, Monetary::ZERO);
    assert_eq!(history[1].balance_after, Monetary::from_str("500")?);

    let cards = service.cards().await?;

    assert_eq!(cards.len(), 1);
    assert_eq!(cards[0].holder_name, "Alice");

    Ok(())
}

#[tokio::test]
async fn test_rejected_topups_leave_durable_storage_untouched() -> Result<()> {
    let (service, _file) = sqlite_service().await?;

    let missing_holder = service.apply_topup(request("CARD001", "500", None)?).await;
    let bad_amount = service.apply_topup(request("CARD001", "0", Some("Alice"))?).await;

    assert!(matches!(missing_holder, Err(ServiceError::Validation { .. })));
    assert!(matches!(bad_amount, Err(ServiceError::Validation { .. })));
    assert!(service.cards().await?.is_empty());
    assert!(service.transactions(None).await?.is_empty());

    Ok(())
}

#[tokio::test]
async fn test_broker_events_reach_connected_dashboard_sessions() -> Result<()> {
    let sessions = SessionRegistry::new();
    let (event_sender, event_receiver) = mpsc::channel(8);
    let relay = tokio::spawn(notifier::run(event_receiver, sessions.clone()));

    let (dashboard_sender, mut dashboard_receiver) = mpsc::unbounded_channel();
    sessions.add(Uuid::new_v4(), dashboard_sender);

    let update = BalanceUpdate {
        uid: "CARD001".to_string(),
        balance: Monetary::from_str("750")?,
        timestamp: Some("2026-08-06T12:00:00Z".to_string())
    };
    event_sender.send(InboundEvent::Balance(update)).await?;

    let message = timeout(Duration::from_secs(1), dashboard_receiver.recv()).await?
        .ok_or_else(|| anyhow!("Dashboard channel closed"))?;

    let frame: serde_json::Value = match message {
        axum::extract::ws::Message::Text(text) => serde_json::from_str(&text)?,
        other => return Err(anyhow!("Expected a text frame, got {other:?}"))
    };

    assert_eq!(frame["event"], "card-balance");
    assert_eq!(frame["data"]["uid"], "CARD001");
    assert_eq!(frame["data"]["balance"], 750);

    drop(event_sender);
    relay.await?;

    Ok(())
}
