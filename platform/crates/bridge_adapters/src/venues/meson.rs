use super::{
    collect_fees, intent_from_json, origin_receipt_status, require_hash, validate_request,
    vendor_json, ValidatedRequest,
};
use crate::context::BridgeContext;
use crate::error::{AdapterResult, BridgeError};
use crate::traits::BridgeAdapter;
use crate::units::{is_native_token, to_decimal_string};
use async_trait::async_trait;
use chrono::Utc;
use domain::{
    BridgeQuote, BridgeReference, BridgeRequest, BridgeResult, BridgeVendor, ChainConfig,
    UnsignedTransaction,
};
use ethers_core::types::{Address, U256};
use ethers_core::utils::parse_units;
use serde_json::{json, Value};
use tracing::{debug, info};
use uuid::Uuid;

#[derive(Clone)]
pub struct MesonAdapter {
    ctx: BridgeContext,
    base_url: String,
}

/// Meson names tokens `<chain slug>:<symbol>`, e.g. `arb-sepolia:usdc`.
fn token_id(chain: &ChainConfig, token: Address) -> AdapterResult<String> {
    let slug = chain
        .meson_slug
        .as_deref()
        .ok_or_else(|| BridgeError::Validation(format!("meson does not serve {}", chain.name)))?;
    let symbol = if is_native_token(token) {
        chain.native_symbol.to_lowercase()
    } else {
        chain
            .token(token)
            .map(|t| t.symbol.to_lowercase())
            .ok_or_else(|| {
                BridgeError::Validation(format!(
                    "token {token:?} is not listed for {}",
                    chain.name
                ))
            })?
    };
    Ok(format!("{slug}:{symbol}"))
}

fn fee_units(value: Option<&Value>, decimals: u32) -> Option<U256> {
    let raw = match value? {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    parse_units(raw.trim(), decimals).ok().map(U256::from)
}

impl MesonAdapter {
    pub fn new(ctx: BridgeContext, base_url: impl Into<String>) -> Self {
        Self {
            ctx,
            base_url: base_url.into(),
        }
    }

    fn base_url(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }

    async fn fetch_swap(&self, req: &ValidatedRequest, decimals: u32) -> AdapterResult<Value> {
        let body = json!({
            "from": token_id(&req.origin, req.source_token)?,
            "to": token_id(&req.destination, req.destination_token)?,
            "amount": to_decimal_string(req.amount, decimals)?,
            "fromAddress": format!("{:?}", req.user),
            "recipient": format!("{:?}", req.recipient),
        });
        debug!(target: "bridge_adapters", ?body, "requesting meson swap");
        let response = self
            .ctx
            .http
            .post(format!("{}/swap", self.base_url()))
            .json(&body)
            .send()
            .await?;
        let payload = vendor_json(BridgeVendor::Meson, response).await?;
        if let Some(error) = payload.get("error") {
            return Err(BridgeError::Quote(format!("meson rejected swap: {error}")));
        }
        Ok(payload.get("result").cloned().unwrap_or(payload))
    }

    async fn fetch_status(&self, encoded: &str) -> AdapterResult<BridgeResult> {
        let response = self
            .ctx
            .http
            .get(format!("{}/swap/{}", self.base_url(), encoded))
            .send()
            .await?;
        let payload = vendor_json(BridgeVendor::Meson, response).await?;
        let result = payload.get("result").unwrap_or(&payload);
        if result.get("expired").and_then(Value::as_bool) == Some(true) {
            return Ok(BridgeResult::failed("meson swap expired"));
        }
        let status = result
            .get("status")
            .and_then(Value::as_str)
            .unwrap_or("PENDING")
            .to_uppercase();
        Ok(match status.as_str() {
            "RELEASED" | "DONE" => BridgeResult::settled("meson released funds"),
            "CANCELLED" | "EXPIRED" | "FAILED" => {
                BridgeResult::failed(format!("meson swap ended with {status}"))
            }
            other => BridgeResult::pending(format!("meson swap is {other}")),
        })
    }
}

#[async_trait]
impl BridgeAdapter for MesonAdapter {
    fn vendor(&self) -> BridgeVendor {
        BridgeVendor::Meson
    }

    async fn create_bridge_transaction(&self, request: &BridgeRequest) -> AdapterResult<BridgeQuote> {
        let req = validate_request(&self.ctx.registry, request)?;
        let decimals = req.decimals.ok_or_else(|| {
            BridgeError::Validation("meson amounts need the source token decimals".to_string())
        })?;
        let result = self.fetch_swap(&req, decimals).await?;
        let tx = result
            .get("tx")
            .ok_or_else(|| BridgeError::Quote("meson swap carries no transaction".to_string()))?;
        let mut intent = intent_from_json(BridgeVendor::Meson, req.user, tx)?;
        if req.is_native() && intent.value.is_zero() {
            intent.value = req.amount;
        }
        let bridge_address = intent.to;
        let transaction = self.ctx.finalizer.finalize(&intent, &req.origin).await?;

        let total_fee = fee_units(result.pointer("/fees/totalFee"), decimals);
        let destination_amount = total_fee.map(|fee| req.amount.saturating_sub(fee));
        let request_id = result
            .get("encoded")
            .and_then(Value::as_str)
            .map(str::to_string);
        info!(
            target: "bridge_adapters",
            origin = %req.origin.name,
            destination = %req.destination.name,
            request_id = ?request_id,
            "meson swap built"
        );
        Ok(BridgeQuote {
            quote_id: Uuid::new_v4(),
            vendor: BridgeVendor::Meson,
            origin_chain: req.origin.name.clone(),
            destination_chain: req.destination.name.clone(),
            source_amount: req.amount,
            destination_amount,
            fees: collect_fees(result.get("fees")),
            transactions: vec![transaction],
            request_id,
            bridge_address: Some(bridge_address),
            needs_manual_claim: false,
            lock_period_secs: 0,
            quoted_at: Utc::now(),
        })
    }

    async fn listen_bridge_result(&self, reference: &BridgeReference) -> AdapterResult<BridgeResult> {
        if let Some(encoded) = reference.request_id.as_deref() {
            return self.fetch_status(encoded).await;
        }
        let hash = require_hash(reference.transaction_hash, BridgeVendor::Meson)?;
        let origin = self.ctx.chain(&reference.origin_chain)?;
        let rpc = self.ctx.rpc(origin)?;
        origin_receipt_status(rpc.as_ref(), hash, BridgeVendor::Meson).await
    }

    async fn claim_bridge_result(&self, _reference: &BridgeReference) -> AdapterResult<UnsignedTransaction> {
        Err(BridgeError::UnsupportedOperation(
            "meson settles automatically; nothing to claim".to_string(),
        ))
    }
}
