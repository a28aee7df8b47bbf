use std::process::exit;
use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use tracing::{error, info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use tap_relay::api::{app_router, AppState};
use tap_relay::broker::BrokerClient;
use tap_relay::config::Config;
use tap_relay::notifier::{self, SessionRegistry};
use tap_relay::service::TopupService;
use tap_relay::storage::{DynLedgerStore, MemoryLedger, SqliteLedger};

#[tokio::main]
async fn main() -> Result<()> {
    setup_logging();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(error) => {
            error!("Configuration error: {error:#}");
            exit(1);
        }
    };

    // A reachable database is preferred but not required: without one the
    // relay still forwards live events, it just keeps the ledger in memory.
    let (store, persistent): (DynLedgerStore, bool) = match SqliteLedger::connect(&config.database_url).await {
        Ok(ledger) => {
            info!("Ledger opened at [{}]", config.database_url);
            (Arc::new(ledger), true)
        }
        Err(error) => {
            warn!("Storage connection failed: {error}");
            warn!("Continuing without persistence, ledger is in-memory only");
            (Arc::new(MemoryLedger::new()), false)
        }
    };

    let (broker, inbound) = BrokerClient::start(&config);
    let sessions = SessionRegistry::new();
    tokio::spawn(notifier::run(inbound, sessions.clone()));

    let service = Arc::new(TopupService::new(store, Some(broker.clone())));

    let state = AppState {
        service,
        sessions,
        broker: Some(broker),
        persistent,
        started_at: Instant::now()
    };

    let router = app_router(state, &config.allowed_origins);

    info!("Listening on {}", config.listen_addr);
    info!("MQTT topic prefix [{}]", config.mqtt_topic_prefix);

    let listener = tokio::net::TcpListener::bind(config.listen_addr).await?;
    axum::serve(listener, router).await?;

    Ok(())
}

fn setup_logging() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "tap_relay=info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();
}
