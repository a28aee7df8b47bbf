use std::sync::Arc;
use std::time::Instant;

use axum::extract::{Path, Query, State};
use axum::http::{HeaderValue, Method};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

use crate::api::error::ApiError;
use crate::api::ws;
use crate::broker::BrokerClient;
use crate::models::{Card, TransactionRecord};
use crate::notifier::SessionRegistry;
use crate::service::{TopupOutcome, TopupRequest, TopupService};

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<TopupService>,
    pub sessions: SessionRegistry,
    pub broker: Option<BrokerClient>,
    pub persistent: bool,
    pub started_at: Instant
}

pub fn app_router(state: AppState, allowed_origins: &[String]) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/topup", post(topup))
        .route("/cards", get(cards))
        .route("/card/:uid", get(card))
        .route("/transactions", get(transactions))
        .route("/transactions/:uid", get(card_transactions))
        .route("/ws", get(ws::ws_handler))
        .layer(cors_layer(allowed_origins))
        .with_state(state)
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any);

    if allowed_origins.iter().any(|origin| origin == "*") {
        layer.allow_origin(Any)
    } else {
        let origins: Vec<HeaderValue> = allowed_origins
            .iter()
            .filter_map(|origin| origin.parse().ok())
            .collect();

        layer.allow_origin(AllowOrigin::list(origins))
    }
}

async fn root() -> Json<Value> {
    Json(json!({
        "status": "online",
        "message": "Tap-to-Pay relay is running",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "health": "/health",
            "cards": "/cards",
            "transactions": "/transactions",
            "push": "/ws"
        }
    }))
}

async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "uptimeSecs": state.started_at.elapsed().as_secs(),
        "mqttConnected": state.broker.as_ref().map(BrokerClient::is_connected).unwrap_or(false),
        "persistence": state.persistent
    }))
}

async fn topup(
    State(state): State<AppState>,
    Json(request): Json<TopupRequest>
) -> Result<Json<TopupOutcome>, ApiError> {
    Ok(Json(state.service.apply_topup(request).await?))
}

async fn cards(State(state): State<AppState>) -> Result<Json<Vec<Card>>, ApiError> {
    Ok(Json(state.service.cards().await?))
}

async fn card(
    State(state): State<AppState>,
    Path(uid): Path<String>
) -> Result<Json<Card>, ApiError> {
    Ok(Json(state.service.card(&uid).await?))
}

#[derive(Debug, Deserialize)]
struct TransactionsQuery {
    limit: Option<usize>
}

async fn transactions(
    State(state): State<AppState>,
    Query(query): Query<TransactionsQuery>
) -> Result<Json<Vec<TransactionRecord>>, ApiError> {
    Ok(Json(state.service.transactions(query.limit).await?))
}

async fn card_transactions(
    State(state): State<AppState>,
    Path(uid): Path<String>
) -> Result<Json<Vec<TransactionRecord>>, ApiError> {
    Ok(Json(state.service.card_transactions(&uid).await?))
}
