use super::{
    collect_fees, intent_from_json, origin_receipt_status, parse_json_address, parse_u256,
    require_hash, validate_request, vendor_json, ValidatedRequest,
};
use crate::context::BridgeContext;
use crate::error::{AdapterResult, BridgeError};
use crate::traits::BridgeAdapter;
use async_trait::async_trait;
use chrono::Utc;
use domain::{
    BridgeQuote, BridgeReference, BridgeRequest, BridgeResult, BridgeVendor, TransactionIntent,
    UnsignedTransaction,
};
use ethers_core::types::U256;
use indexmap::IndexMap;
use serde_json::{json, Value};
use tracing::{debug, info};
use uuid::Uuid;

const DEFAULT_INTEGRATOR_ID: &str = "0x8888";

#[derive(Clone)]
pub struct AcrossAdapter {
    ctx: BridgeContext,
    base_url: String,
}

#[derive(Debug)]
struct AcrossQuote {
    steps: Vec<TransactionIntent>,
    output_amount: Option<U256>,
    fees: IndexMap<String, String>,
}

impl AcrossAdapter {
    pub fn new(ctx: BridgeContext, base_url: impl Into<String>) -> Self {
        Self {
            ctx,
            base_url: base_url.into(),
        }
    }

    fn base_url(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }

    async fn fetch_quote(&self, req: &ValidatedRequest) -> AdapterResult<Value> {
        let body = json!({
            "originChainId": req.origin.chain_id,
            "destinationChainId": req.destination.chain_id,
            "originToken": format!("{:?}", req.source_token),
            "destinationToken": format!("{:?}", req.destination_token),
            "originAmount": req.amount.to_string(),
            "integratorId": req.integrator_id.as_deref().unwrap_or(DEFAULT_INTEGRATOR_ID),
            "feeRefundAddress": format!("{:?}", req.user),
            "recipient": format!("{:?}", req.recipient),
        });
        debug!(target: "bridge_adapters", ?body, "requesting across quote");
        let response = self
            .ctx
            .http
            .post(format!("{}/quote", self.base_url()))
            .json(&body)
            .send()
            .await?;
        vendor_json(BridgeVendor::Across, response).await
    }
}

/// Accepts both the swap-style payload (`approvalTxns` + `swapTx`) and the
/// older single-deposit payload (`depositCalldata`).
fn parse_quote(payload: &Value, req: &ValidatedRequest) -> AdapterResult<AcrossQuote> {
    let vendor = BridgeVendor::Across;
    let mut steps = Vec::new();

    if let Some(swap_tx) = payload.get("swapTx") {
        if let Some(approvals) = payload.get("approvalTxns").and_then(Value::as_array) {
            for approval in approvals {
                steps.push(intent_from_json(vendor, req.user, approval)?);
            }
        }
        steps.push(intent_from_json(vendor, req.user, swap_tx)?);
    } else if let Some(calldata) = payload.get("depositCalldata") {
        let to = payload
            .get("spokePoolAddress")
            .or_else(|| payload.get("relayer"))
            .cloned()
            .unwrap_or(Value::Null);
        let legacy = json!({
            "to": to,
            "data": calldata,
            "value": payload.get("value").cloned().unwrap_or(Value::Null),
        });
        steps.push(intent_from_json(vendor, req.user, &legacy)?);
    } else {
        return Err(BridgeError::Quote(
            "across quote carries no transaction data".to_string(),
        ));
    }

    if req.is_native() {
        if let Some(bridge_step) = steps.last_mut() {
            if bridge_step.value.is_zero() {
                bridge_step.value = req.amount;
            }
        }
    }

    let output_amount = payload
        .get("expectedOutputAmount")
        .or_else(|| payload.get("outputAmount"))
        .and_then(parse_u256);
    let mut fees = collect_fees(payload.get("fees"));
    fees.extend(collect_fees(Some(&json!({
        "totalRelayFee": payload.get("totalRelayFee").cloned().unwrap_or(Value::Null),
        "relayerCapitalFee": payload.get("relayerCapitalFee").cloned().unwrap_or(Value::Null),
        "lpFee": payload.get("lpFee").cloned().unwrap_or(Value::Null),
    }))));

    Ok(AcrossQuote {
        steps,
        output_amount,
        fees,
    })
}

#[async_trait]
impl BridgeAdapter for AcrossAdapter {
    fn vendor(&self) -> BridgeVendor {
        BridgeVendor::Across
    }

    async fn create_bridge_transaction(&self, request: &BridgeRequest) -> AdapterResult<BridgeQuote> {
        let req = validate_request(&self.ctx.registry, request)?;
        let payload = self.fetch_quote(&req).await?;
        let quote = parse_quote(&payload, &req)?;
        let bridge_address = quote.steps.last().map(|step| step.to);
        let transactions = self
            .ctx
            .finalizer
            .finalize_sequence(&quote.steps, &req.origin)
            .await?;
        info!(
            target: "bridge_adapters",
            origin = %req.origin.name,
            destination = %req.destination.name,
            steps = transactions.len(),
            "across quote built"
        );
        Ok(BridgeQuote {
            quote_id: Uuid::new_v4(),
            vendor: BridgeVendor::Across,
            origin_chain: req.origin.name.clone(),
            destination_chain: req.destination.name.clone(),
            source_amount: req.amount,
            destination_amount: quote.output_amount,
            fees: quote.fees,
            transactions,
            request_id: payload.get("id").and_then(Value::as_str).map(str::to_string),
            bridge_address: bridge_address.or_else(|| {
                payload.get("spokePoolAddress").and_then(parse_json_address)
            }),
            needs_manual_claim: false,
            lock_period_secs: 0,
            quoted_at: Utc::now(),
        })
    }

    async fn listen_bridge_result(&self, reference: &BridgeReference) -> AdapterResult<BridgeResult> {
        let hash = require_hash(reference.transaction_hash, BridgeVendor::Across)?;
        let origin = self.ctx.chain(&reference.origin_chain)?;
        let rpc = self.ctx.rpc(origin)?;
        origin_receipt_status(rpc.as_ref(), hash, BridgeVendor::Across).await
    }

    async fn claim_bridge_result(&self, _reference: &BridgeReference) -> AdapterResult<UnsignedTransaction> {
        Err(BridgeError::UnsupportedOperation(
            "across settles automatically; nothing to claim".to_string(),
        ))
    }
}
