//! Management HTTP API
//!
//! Lets operators list, add and remove channels on running connectors.

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tracing::{debug, info, warn};

use crate::error::{ConfigurationError, RegistryError};
use crate::metrics::encode_metrics;
use crate::registry::{ConnectorRegistry, ConnectorSummary};
use crate::runner::build_spec;
use crate::types::{channel_pairs, parse_channel_kinds, parse_symbols, WireChannel};

/// Shared state for management endpoints
#[derive(Clone)]
pub struct ManagementState {
    pub registry: Arc<ConnectorRegistry>,
    /// Orderbook depth when a request does not give one
    pub default_depth: usize,
}

impl ManagementState {
    pub fn new(registry: Arc<ConnectorRegistry>, default_depth: usize) -> Self {
        Self {
            registry,
            default_depth,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct AddChannelsRequest {
    #[serde(alias = "platform")]
    pub exchange: String,
    pub symbols: Vec<String>,
    #[serde(alias = "channelKinds")]
    pub channels: Vec<String>,
    #[serde(default)]
    pub orderbook_length: Option<usize>,
    #[serde(default)]
    pub wss: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RemoveChannelsRequest {
    #[serde(alias = "platform")]
    pub exchange: String,
    pub symbols: Vec<String>,
    #[serde(alias = "channelKinds")]
    pub channels: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct SubscribeRequest {
    pub symbols: Vec<String>,
    #[serde(alias = "channelKinds")]
    pub channels: Vec<String>,
}

#[derive(Serialize)]
pub struct AddChannelsResponse {
    pub status: &'static str,
    pub id: u64,
    pub channels: Vec<WireChannel>,
    pub skipped: Vec<String>,
}

#[derive(Serialize)]
pub struct RemoveChannelsResponse {
    pub status: &'static str,
    pub closed: Vec<WireChannel>,
}

#[derive(Serialize)]
pub struct SubscribeResponse {
    pub status: &'static str,
    pub subscribed: Vec<WireChannel>,
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub connectors: usize,
}

fn skipped_names(rejected: Vec<ConfigurationError>) -> Vec<String> {
    rejected
        .into_iter()
        .filter_map(|e| match e {
            ConfigurationError::UnknownChannelKind(name) => Some(name),
            ConfigurationError::EmptyChannelSet => None,
        })
        .collect()
}

fn error_response(err: RegistryError) -> Response {
    match err {
        RegistryError::DuplicateSubscription { symbol, kind, .. } => (
            StatusCode::CONFLICT,
            Json(json!({ "status": "exists", "symbol": symbol, "channel": kind })),
        )
            .into_response(),
        RegistryError::NotFound(what) => (
            StatusCode::NOT_FOUND,
            Json(json!({ "status": "error", "error": format!("not found: {}", what) })),
        )
            .into_response(),
        RegistryError::Connector(e) => (
            StatusCode::BAD_GATEWAY,
            Json(json!({ "status": "error", "error": e.to_string() })),
        )
            .into_response(),
        other => (
            StatusCode::BAD_REQUEST,
            Json(json!({ "status": "error", "error": other.to_string() })),
        )
            .into_response(),
    }
}

async fn list_channels(State(state): State<ManagementState>) -> Json<Vec<String>> {
    Json(state.registry.channel_listing().await)
}

async fn add_channels(
    State(state): State<ManagementState>,
    Json(req): Json<AddChannelsRequest>,
) -> Response {
    let depth = req.orderbook_length.unwrap_or(state.default_depth).max(1);
    let (spec, rejected) = build_spec(&req.exchange, req.wss, &req.symbols, &req.channels, depth);

    match state.registry.create_connector(spec).await {
        Ok(connector) => {
            let channels: Vec<WireChannel> = connector.active_channels().await.into_iter().collect();
            info!(
                connector = connector.id(),
                exchange = %req.exchange,
                channels = channels.len(),
                "Channels added"
            );
            Json(AddChannelsResponse {
                status: "ok",
                id: connector.id(),
                channels,
                skipped: skipped_names(rejected),
            })
            .into_response()
        }
        Err(e) => {
            warn!(exchange = %req.exchange, error = %e, "Add channels rejected");
            error_response(e)
        }
    }
}

async fn remove_channels(
    State(state): State<ManagementState>,
    Json(req): Json<RemoveChannelsRequest>,
) -> Json<RemoveChannelsResponse> {
    let (kinds, _) = parse_channel_kinds(&req.channels);
    let symbols = parse_symbols(&req.symbols);

    let mut closed = Vec::new();
    for (symbol, kind) in channel_pairs(&symbols, &kinds) {
        match state.registry.remove_channels(&req.exchange, &symbol, kind).await {
            Ok(wire) => closed.push(wire),
            Err(RegistryError::NotFound(what)) => {
                debug!(%what, "No connector owns channel, skipping");
            }
            Err(e) => {
                warn!(%symbol, %kind, error = %e, "Failed to remove channel");
            }
        }
    }

    Json(RemoveChannelsResponse {
        status: "ok",
        closed,
    })
}

async fn list_connectors(State(state): State<ManagementState>) -> Json<Vec<ConnectorSummary>> {
    Json(state.registry.snapshot().await)
}

async fn subscribe_connector(
    State(state): State<ManagementState>,
    Path(id): Path<u64>,
    Json(req): Json<SubscribeRequest>,
) -> Response {
    let (kinds, _) = parse_channel_kinds(&req.channels);
    let symbols = parse_symbols(&req.symbols);

    match state.registry.add_channels(id, &symbols, &kinds).await {
        Ok(subscribed) => Json(SubscribeResponse {
            status: "ok",
            subscribed,
        })
        .into_response(),
        Err(e) => {
            warn!(connector = id, error = %e, "Subscribe rejected");
            error_response(e)
        }
    }
}

async fn health(State(state): State<ManagementState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        connectors: state.registry.len().await,
    })
}

async fn metrics() -> Response {
    match encode_metrics() {
        Ok(body) => (
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            body,
        )
            .into_response(),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
    }
}

/// Create the management router
pub fn create_router(state: ManagementState) -> Router {
    Router::new()
        .route(
            "/channels",
            get(list_channels).post(add_channels).delete(remove_channels),
        )
        .route("/connectors", get(list_connectors))
        .route("/connectors/:id/channels", post(subscribe_connector))
        .route("/health", get(health))
        .route("/metrics", get(metrics))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

/// Run the management server
pub async fn run_server(addr: SocketAddr, state: ManagementState) -> std::io::Result<()> {
    let app = create_router(state);
    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "Management server listening");
    axum::serve(listener, app).await
}
