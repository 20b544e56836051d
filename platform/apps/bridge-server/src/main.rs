use anyhow::{Context, Result};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use bridge_adapters::{
    AdapterResult, BridgeContext, BridgeError, BridgeOrchestrator, ConnectorConfig, NetworkMonitor,
};
use chrono::Utc;
use domain::{BridgeReference, BridgeRequest, BridgeVendor, ChainConfig};
use dotenvy::dotenv;
use ethers_core::types::{Bytes, H256};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Clone)]
struct AppState {
    ctx: BridgeContext,
    orchestrators: Arc<HashMap<BridgeVendor, BridgeOrchestrator>>,
    network: NetworkMonitor,
}

impl AppState {
    fn new(ctx: BridgeContext, config: &ConnectorConfig) -> Self {
        let mut orchestrators = HashMap::new();
        for vendor in BridgeVendor::ALL {
            match BridgeOrchestrator::for_vendor(vendor, ctx.clone(), config) {
                Ok(orchestrator) => {
                    orchestrators.insert(vendor, orchestrator);
                }
                Err(err) => warn!(vendor = %vendor, error = %err, "bridge disabled"),
            }
        }
        Self {
            network: NetworkMonitor::new(ctx.clone(), &config.network),
            ctx,
            orchestrators: Arc::new(orchestrators),
        }
    }

    fn orchestrator(&self, bridge: &str) -> Result<&BridgeOrchestrator, BridgeError> {
        let vendor = bridge
            .parse::<BridgeVendor>()
            .map_err(BridgeError::UnsupportedBridge)?;
        self.orchestrators
            .get(&vendor)
            .ok_or_else(|| BridgeError::UnsupportedBridge(format!("{vendor} is not configured")))
    }
}

#[derive(Debug, Serialize)]
struct ApiErrorBody {
    error: String,
}

#[derive(Debug, Deserialize)]
struct QuoteInput {
    bridge: String,
    #[serde(flatten)]
    request: BridgeRequest,
}

#[derive(Debug, Deserialize)]
struct ReferenceInput {
    bridge: String,
    #[serde(flatten)]
    reference: BridgeReference,
}

#[derive(Debug, Deserialize)]
struct ExecuteInput {
    chain: String,
    signed_transaction: Bytes,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    init_tracing();

    let config = ConnectorConfig::from_env().context("loading bridge connector config")?;
    let ctx = BridgeContext::connect(&config).context("connecting chain rpc clients")?;
    let state = AppState::new(ctx, &config);
    if state.orchestrators.is_empty() {
        warn!("no bridge adapters available; every bridge request will be rejected");
    }
    serve_api(state).await
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn router(state: AppState) -> Router {
    Router::new()
        .route("/v1/health", get(api_health))
        .route("/v1/chains", get(api_chains))
        .route("/v1/chains/status", get(api_network_status))
        .route("/v1/chains/:chain/status", get(api_chain_status))
        .route("/v1/chains/:chain/gas", get(api_chain_gas))
        .route("/v1/bridge/quote", post(api_quote))
        .route("/v1/bridge/status", post(api_status))
        .route("/v1/bridge/claim", post(api_claim))
        .route("/v1/bridge/execute", post(api_execute))
        .with_state(state)
}

async fn serve_api(state: AppState) -> Result<()> {
    let app = router(state);
    let bind = std::env::var("SERVER_ADDR").unwrap_or_else(|_| "127.0.0.1:8080".to_string());
    let addr: SocketAddr = bind
        .parse()
        .with_context(|| format!("invalid SERVER_ADDR: {bind}"))?;
    info!(address = %addr, "bridge server listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

async fn api_health(State(state): State<AppState>) -> impl IntoResponse {
    let mut vendors: Vec<&'static str> = state.orchestrators.keys().map(|v| v.as_str()).collect();
    vendors.sort_unstable();
    Json(serde_json::json!({
        "ok": true,
        "timestamp": Utc::now(),
        "bridges": vendors,
        "chains": state.ctx.registry.names(),
    }))
}

async fn api_chains(State(state): State<AppState>) -> impl IntoResponse {
    let chains: Vec<ChainConfig> = state.ctx.registry.all().into_iter().cloned().collect();
    Json(chains)
}

async fn api_network_status(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.network.all_status().await)
}

async fn api_chain_status(State(state): State<AppState>, Path(chain): Path<String>) -> Response {
    match state.network.status(&chain).await {
        Ok(status) => Json(status).into_response(),
        Err(err) => bridge_error(err),
    }
}

async fn api_chain_gas(State(state): State<AppState>, Path(chain): Path<String>) -> Response {
    match state.network.gas_prices(&chain).await {
        Ok(prices) => Json(prices).into_response(),
        Err(err) => bridge_error(err),
    }
}

async fn api_quote(State(state): State<AppState>, Json(payload): Json<QuoteInput>) -> Response {
    let orchestrator = match state.orchestrator(&payload.bridge) {
        Ok(orchestrator) => orchestrator,
        Err(err) => return bridge_error(err),
    };
    match orchestrator.create_bridge_transaction(&payload.request).await {
        Ok(quote) => Json(quote).into_response(),
        Err(err) => bridge_error(err),
    }
}

async fn api_status(State(state): State<AppState>, Json(payload): Json<ReferenceInput>) -> Response {
    let orchestrator = match state.orchestrator(&payload.bridge) {
        Ok(orchestrator) => orchestrator,
        Err(err) => return bridge_error(err),
    };
    match orchestrator.listen_bridge_result(&payload.reference).await {
        Ok(result) => Json(result).into_response(),
        Err(err) => bridge_error(err),
    }
}

async fn api_claim(State(state): State<AppState>, Json(payload): Json<ReferenceInput>) -> Response {
    let orchestrator = match state.orchestrator(&payload.bridge) {
        Ok(orchestrator) => orchestrator,
        Err(err) => return bridge_error(err),
    };
    match orchestrator.claim_bridge_result(&payload.reference).await {
        Ok(tx) => Json(tx).into_response(),
        Err(err) => bridge_error(err),
    }
}

/// Relays a transaction the caller already signed.
async fn api_execute(State(state): State<AppState>, Json(payload): Json<ExecuteInput>) -> Response {
    match broadcast(&state.ctx, &payload.chain, payload.signed_transaction.clone()).await {
        Ok(hash) => {
            info!(chain = %payload.chain, tx = ?hash, "signed transaction broadcast");
            Json(serde_json::json!({ "chain": payload.chain, "transaction_hash": hash }))
                .into_response()
        }
        Err(err) => bridge_error(err),
    }
}

async fn broadcast(ctx: &BridgeContext, chain: &str, raw: Bytes) -> AdapterResult<H256> {
    let chain = ctx.chain(chain)?;
    ctx.rpc(chain)?.send_raw_transaction(raw).await
}

fn error_status(err: &BridgeError) -> StatusCode {
    match err {
        BridgeError::Validation(_)
        | BridgeError::UnsupportedOperation(_)
        | BridgeError::UnsupportedBridge(_) => StatusCode::BAD_REQUEST,
        BridgeError::UnknownChain(_) => StatusCode::NOT_FOUND,
        BridgeError::NotClaimable(_) => StatusCode::CONFLICT,
        BridgeError::Http(_)
        | BridgeError::Quote(_)
        | BridgeError::Rpc(_)
        | BridgeError::Finalization(_) => StatusCode::BAD_GATEWAY,
        BridgeError::Serialization(_) | BridgeError::Config(_) | BridgeError::Abi(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

fn bridge_error(err: BridgeError) -> Response {
    let status = error_status(&err);
    if status.is_server_error() {
        warn!(error = %err, retryable = err.is_retryable(), "bridge request failed");
    }
    api_error(status, err.to_string())
}

fn api_error(status: StatusCode, message: String) -> Response {
    (status, Json(ApiErrorBody { error: message })).into_response()
}
