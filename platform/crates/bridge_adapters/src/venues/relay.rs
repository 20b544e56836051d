use super::{
    collect_fees, intent_from_json, origin_receipt_status, parse_u256, require_hash,
    validate_request, vendor_json, ValidatedRequest,
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
use serde_json::{json, Value};
use tracing::{debug, info, warn};
use uuid::Uuid;

#[derive(Clone)]
pub struct RelayAdapter {
    ctx: BridgeContext,
    base_url: String,
}

impl RelayAdapter {
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
            "user": format!("{:?}", req.user),
            "originChainId": req.origin.chain_id,
            "destinationChainId": req.destination.chain_id,
            "originCurrency": format!("{:?}", req.source_token),
            "destinationCurrency": format!("{:?}", req.destination_token),
            "amount": req.amount.to_string(),
            "tradeType": "EXACT_INPUT",
            "recipient": format!("{:?}", req.recipient),
            "useDepositAddress": false,
            "useExternalLiquidity": false,
        });
        debug!(target: "bridge_adapters", ?body, "requesting relay quote");
        let response = self
            .ctx
            .http
            .post(format!("{}/quote", self.base_url()))
            .json(&body)
            .send()
            .await?;
        vendor_json(BridgeVendor::Relay, response).await
    }

    async fn fetch_status(&self, request_id: &str) -> AdapterResult<BridgeResult> {
        let response = self
            .ctx
            .http
            .get(format!("{}/intents/status/v2", self.base_url()))
            .query(&[("requestId", request_id)])
            .send()
            .await?;
        let payload = vendor_json(BridgeVendor::Relay, response).await?;
        let status = payload
            .get("status")
            .and_then(Value::as_str)
            .unwrap_or("unknown")
            .to_lowercase();
        debug!(target: "bridge_adapters", request_id, %status, "relay status");
        Ok(match status.as_str() {
            "success" => BridgeResult::settled("relay filled the request"),
            "failure" | "refund" => BridgeResult::failed(format!("relay request ended with {status}")),
            other => BridgeResult::pending(format!("relay request is {other}")),
        })
    }
}

/// Every transaction item of every step, in vendor order.
fn collect_steps(payload: &Value, req: &ValidatedRequest) -> AdapterResult<Vec<TransactionIntent>> {
    let steps = payload
        .get("steps")
        .and_then(Value::as_array)
        .ok_or_else(|| BridgeError::Quote("relay quote carries no steps".to_string()))?;

    let mut intents = Vec::new();
    for step in steps {
        let kind = step.get("kind").and_then(Value::as_str).unwrap_or("transaction");
        if kind != "transaction" {
            warn!(
                target: "bridge_adapters",
                step = ?step.get("id"),
                kind,
                "skipping relay step that is not an on-chain transaction"
            );
            continue;
        }
        let items = step.get("items").and_then(Value::as_array).cloned().unwrap_or_default();
        for item in items {
            let data = item.get("data").ok_or_else(|| {
                BridgeError::Quote("relay step item is missing transaction data".to_string())
            })?;
            if let Some(chain_id) = data.get("chainId").and_then(parse_u256) {
                if chain_id != U256::from(req.origin.chain_id) {
                    return Err(BridgeError::Quote(format!(
                        "relay step targets chain {chain_id}, expected {}",
                        req.origin.chain_id
                    )));
                }
            }
            intents.push(intent_from_json(BridgeVendor::Relay, req.user, data)?);
        }
    }

    if intents.is_empty() {
        return Err(BridgeError::Quote(
            "relay quote has no executable transaction".to_string(),
        ));
    }
    Ok(intents)
}

fn request_id(payload: &Value) -> Option<String> {
    payload
        .get("steps")
        .and_then(Value::as_array)?
        .iter()
        .find_map(|step| step.get("requestId").and_then(Value::as_str))
        .map(str::to_string)
}

#[async_trait]
impl BridgeAdapter for RelayAdapter {
    fn vendor(&self) -> BridgeVendor {
        BridgeVendor::Relay
    }

    async fn create_bridge_transaction(&self, request: &BridgeRequest) -> AdapterResult<BridgeQuote> {
        let req = validate_request(&self.ctx.registry, request)?;
        let payload = self.fetch_quote(&req).await?;
        let steps = collect_steps(&payload, &req)?;
        let bridge_address = steps.last().map(|step| step.to);
        let transactions = self
            .ctx
            .finalizer
            .finalize_sequence(&steps, &req.origin)
            .await?;
        let request_id = request_id(&payload);
        info!(
            target: "bridge_adapters",
            origin = %req.origin.name,
            destination = %req.destination.name,
            steps = transactions.len(),
            request_id = ?request_id,
            "relay quote built"
        );
        Ok(BridgeQuote {
            quote_id: Uuid::new_v4(),
            vendor: BridgeVendor::Relay,
            origin_chain: req.origin.name.clone(),
            destination_chain: req.destination.name.clone(),
            source_amount: req.amount,
            destination_amount: payload
                .pointer("/details/currencyOut/amount")
                .and_then(parse_u256),
            fees: collect_fees(payload.get("fees")),
            transactions,
            request_id,
            bridge_address,
            needs_manual_claim: false,
            lock_period_secs: 0,
            quoted_at: Utc::now(),
        })
    }

    async fn listen_bridge_result(&self, reference: &BridgeReference) -> AdapterResult<BridgeResult> {
        if let Some(request_id) = reference.request_id.as_deref() {
            return self.fetch_status(request_id).await;
        }
        let hash = require_hash(reference.transaction_hash, BridgeVendor::Relay)?;
        let origin = self.ctx.chain(&reference.origin_chain)?;
        let rpc = self.ctx.rpc(origin)?;
        origin_receipt_status(rpc.as_ref(), hash, BridgeVendor::Relay).await
    }

    async fn claim_bridge_result(&self, _reference: &BridgeReference) -> AdapterResult<UnsignedTransaction> {
        Err(BridgeError::UnsupportedOperation(
            "relay settles automatically; nothing to claim".to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{context, MockRpc, NATIVE, USER};
    use assert_matches::assert_matches;
    use domain::{BridgeStatus, DestinationToken, SourceToken};
    use ethers_core::types::{Address, H256};
    use mockito::Matcher;

    fn native_request() -> BridgeRequest {
        BridgeRequest {
            user_address: USER.to_string(),
            origin_chain: "arb_sepolia".to_string(),
            destination_chain: "eth_sepolia".to_string(),
            source_token: SourceToken {
                address: NATIVE.to_string(),
                amount: "0.0001".to_string(),
                decimals: None,
            },
            destination_token: DestinationToken {
                address: NATIVE.to_string(),
            },
            integrator_id: None,
            recipient_address: None,
            finality: None,
        }
    }

    fn quote_body() -> String {
        json!({
            "steps": [
                {
                    "id": "authorize",
                    "kind": "signature",
                    "items": [{"data": {"sign": {}}}]
                },
                {
                    "id": "approve",
                    "kind": "transaction",
                    "requestId": "0xreq42",
                    "items": [{
                        "status": "incomplete",
                        "data": {
                            "to": "0x3333333333333333333333333333333333333333",
                            "data": "0x095ea7b3",
                            "value": "0",
                            "chainId": 421614
                        }
                    }]
                },
                {
                    "id": "deposit",
                    "kind": "transaction",
                    "requestId": "0xreq42",
                    "items": [{
                        "status": "incomplete",
                        "data": {
                            "to": "0x4444444444444444444444444444444444444444",
                            "data": "0x58109c",
                            "value": "100000000000000",
                            "chainId": 421614,
                            "gas": "210000"
                        }
                    }]
                }
            ],
            "fees": {
                "gas": {"amount": "2100000000000"},
                "relayer": {"amount": "1000000000"}
            },
            "details": {"currencyOut": {"amount": "99000000000000"}}
        })
        .to_string()
    }

    #[tokio::test]
    async fn steps_are_finalized_in_vendor_order() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/quote")
            .match_body(Matcher::PartialJson(json!({
                "amount": "100000000000000",
                "tradeType": "EXACT_INPUT",
                "originChainId": 421614
            })))
            .with_status(200)
            .with_body(quote_body())
            .create_async()
            .await;

        let adapter = RelayAdapter::new(
            context(MockRpc::healthy(), MockRpc::healthy()),
            server.url(),
        );
        let quote = adapter
            .create_bridge_transaction(&native_request())
            .await
            .unwrap();
        mock.assert_async().await;

        assert_eq!(quote.transactions.len(), 2);
        assert_eq!(quote.transactions[0].to, Address::repeat_byte(0x33));
        assert_eq!(quote.transactions[1].to, Address::repeat_byte(0x44));
        assert_eq!(quote.transactions[1].gas_limit, U256::from(210_000u64));
        assert_eq!(quote.transactions[1].value, U256::from(100_000_000_000_000u64));
        assert!(quote.transactions.iter().all(|tx| tx.chain_id == 421614));
        assert_eq!(quote.request_id.as_deref(), Some("0xreq42"));
        assert_eq!(quote.destination_amount, Some(U256::from(99_000_000_000_000u64)));
        assert_eq!(quote.fees.get("relayer").map(String::as_str), Some("1000000000"));
        assert_eq!(quote.bridge_address, Some(Address::repeat_byte(0x44)));
    }

    #[tokio::test]
    async fn empty_body_is_a_quote_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/quote")
            .with_status(200)
            .with_body("")
            .create_async()
            .await;
        let adapter = RelayAdapter::new(
            context(MockRpc::healthy(), MockRpc::healthy()),
            server.url(),
        );
        assert_matches!(
            adapter.create_bridge_transaction(&native_request()).await,
            Err(BridgeError::Quote(_))
        );
    }

    #[tokio::test]
    async fn status_endpoint_maps_vendor_states() {
        let mut server = mockito::Server::new_async().await;
        for (id, status) in [("done", "success"), ("bad", "refund"), ("wait", "waiting")] {
            server
                .mock("GET", "/intents/status/v2")
                .match_query(Matcher::UrlEncoded("requestId".into(), id.into()))
                .with_status(200)
                .with_body(json!({ "status": status }).to_string())
                .create_async()
                .await;
        }
        let adapter = RelayAdapter::new(
            context(MockRpc::healthy(), MockRpc::healthy()),
            server.url(),
        );
        let reference = |id: &str| {
            BridgeReference::by_hash(H256::zero(), "arb_sepolia", "eth_sepolia")
                .with_request_id(Some(id.to_string()))
        };

        let done = adapter.listen_bridge_result(&reference("done")).await.unwrap();
        assert_eq!(done.status, BridgeStatus::Success);
        let refunded = adapter.listen_bridge_result(&reference("bad")).await.unwrap();
        assert_eq!(refunded.status, BridgeStatus::Failed);
        let waiting = adapter.listen_bridge_result(&reference("wait")).await.unwrap();
        assert_eq!(waiting.status, BridgeStatus::Pending);
        assert!(!waiting.claimable);
    }

    #[tokio::test]
    async fn claim_is_unsupported() {
        let adapter = RelayAdapter::new(
            context(MockRpc::healthy(), MockRpc::healthy()),
            "http://unused",
        );
        let reference = BridgeReference::by_hash(H256::zero(), "arb_sepolia", "eth_sepolia");
        assert_matches!(
            adapter.claim_bridge_result(&reference).await,
            Err(BridgeError::UnsupportedOperation(_))
        );
    }
}
