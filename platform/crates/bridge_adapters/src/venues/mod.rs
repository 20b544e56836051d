mod across;
mod arbitrum;
mod cctp;
mod meson;
mod relay;

pub use across::AcrossAdapter;
pub use arbitrum::ArbitrumNativeAdapter;
pub use cctp::CctpAdapter;
pub use meson::MesonAdapter;
pub use relay::RelayAdapter;

use crate::error::{AdapterResult, BridgeError};
use crate::registry::ChainRegistry;
use crate::rpc::ChainRpc;
use crate::units::{is_native_token, parse_address, to_minimal_units, NATIVE_DECIMALS};
use domain::{BridgeRequest, BridgeResult, BridgeVendor, ChainConfig, FinalityMode, TransactionIntent};
use ethers_core::types::{Address, Bytes, H256, U256, U64};
use indexmap::IndexMap;
use serde_json::Value;
use std::str::FromStr;

/// A request after address, amount and chain checks.
#[derive(Debug, Clone)]
pub(crate) struct ValidatedRequest {
    pub user: Address,
    pub recipient: Address,
    pub origin: ChainConfig,
    pub destination: ChainConfig,
    pub source_token: Address,
    pub destination_token: Address,
    pub amount: U256,
    pub decimals: Option<u32>,
    pub integrator_id: Option<String>,
    pub finality: FinalityMode,
}

impl ValidatedRequest {
    pub fn is_native(&self) -> bool {
        is_native_token(self.source_token)
    }
}

/// Runs before any network access: malformed input never reaches a vendor.
pub(crate) fn validate_request(
    registry: &ChainRegistry,
    request: &BridgeRequest,
) -> AdapterResult<ValidatedRequest> {
    let user = parse_address("user_address", &request.user_address)?;
    let source_token = parse_address("source_token.address", &request.source_token.address)?;
    let destination_token =
        parse_address("destination_token.address", &request.destination_token.address)?;
    let recipient = match request.recipient_address.as_deref() {
        Some(raw) if !raw.trim().is_empty() => parse_address("recipient_address", raw)?,
        _ => user,
    };

    let origin = registry.resolve(&request.origin_chain)?.clone();
    let destination = registry.resolve(&request.destination_chain)?.clone();
    if origin.name == destination.name {
        return Err(BridgeError::Validation(format!(
            "origin and destination are both {}",
            origin.name
        )));
    }

    let decimals = request
        .source_token
        .decimals
        .or_else(|| origin.token(source_token).map(|token| token.decimals))
        .or_else(|| is_native_token(source_token).then_some(NATIVE_DECIMALS));
    let amount = to_minimal_units(&request.source_token.amount, decimals)?;

    Ok(ValidatedRequest {
        user,
        recipient,
        origin,
        destination,
        source_token,
        destination_token,
        amount,
        decimals,
        integrator_id: request.integrator_id.clone(),
        finality: request.finality.unwrap_or_default(),
    })
}

pub(crate) fn require_hash(hash: Option<H256>, vendor: BridgeVendor) -> AdapterResult<H256> {
    hash.ok_or_else(|| {
        BridgeError::Validation(format!("{vendor} status needs a transaction hash"))
    })
}

/// Settlement inferred from the origin transaction alone.
pub(crate) async fn origin_receipt_status(
    rpc: &dyn ChainRpc,
    hash: H256,
    vendor: BridgeVendor,
) -> AdapterResult<BridgeResult> {
    let receipt = rpc.transaction_receipt(hash).await?;
    Ok(match receipt {
        None => BridgeResult::pending("transaction not found or not yet confirmed"),
        Some(receipt) if receipt.status == Some(U64::from(1u64)) => {
            BridgeResult::settled(format!("origin transaction confirmed, {vendor} settles automatically"))
        }
        Some(_) => BridgeResult::failed("origin transaction reverted"),
    })
}

/// Reads a vendor response, turning HTTP failures and empty bodies into quote errors.
pub(crate) async fn vendor_json(
    vendor: BridgeVendor,
    response: reqwest::Response,
) -> AdapterResult<Value> {
    let status = response.status();
    let body = response.text().await?;
    if !status.is_success() {
        return Err(BridgeError::Quote(format!(
            "{vendor} api request failed: {} - {}",
            status.as_u16(),
            body
        )));
    }
    if body.trim().is_empty() {
        return Err(BridgeError::Quote(format!("{vendor} api returned an empty payload")));
    }
    let payload: Value = serde_json::from_str(&body)?;
    if payload.is_null() {
        return Err(BridgeError::Quote(format!("{vendor} api returned an empty payload")));
    }
    Ok(payload)
}

pub(crate) fn parse_u256(value: &Value) -> Option<U256> {
    match value {
        Value::Number(n) => n.as_u64().map(U256::from),
        Value::String(s) => {
            let s = s.trim();
            if let Some(hex) = s.strip_prefix("0x") {
                U256::from_str_radix(hex, 16).ok()
            } else {
                U256::from_dec_str(s).ok()
            }
        }
        _ => None,
    }
}

pub(crate) fn parse_json_address(value: &Value) -> Option<Address> {
    value.as_str().and_then(|s| Address::from_str(s.trim()).ok())
}

pub(crate) fn parse_json_bytes(value: &Value) -> Option<Bytes> {
    value.as_str().and_then(|s| Bytes::from_str(s.trim()).ok())
}

/// Builds an intent from a vendor `{to, data, value, gas?}` object.
pub(crate) fn intent_from_json(
    vendor: BridgeVendor,
    from: Address,
    tx: &Value,
) -> AdapterResult<TransactionIntent> {
    let to = tx
        .get("to")
        .and_then(parse_json_address)
        .ok_or_else(|| BridgeError::Quote(format!("{vendor} transaction is missing `to`")))?;
    let data = tx
        .get("data")
        .and_then(parse_json_bytes)
        .ok_or_else(|| BridgeError::Quote(format!("{vendor} transaction is missing `data`")))?;
    let value = tx.get("value").and_then(parse_u256).unwrap_or_default();
    let gas_limit = tx
        .get("gas")
        .or_else(|| tx.get("gasLimit"))
        .and_then(parse_u256)
        .filter(|gas| !gas.is_zero());
    Ok(TransactionIntent::call(from, to, data)
        .with_value(value)
        .with_gas_limit(gas_limit))
}

/// Flattens a vendor fee object into `name -> amount` strings.
pub(crate) fn collect_fees(fees: Option<&Value>) -> IndexMap<String, String> {
    let mut out = IndexMap::new();
    let Some(Value::Object(map)) = fees else {
        return out;
    };
    for (name, value) in map {
        let amount = match value {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Object(inner) => ["amount", "total"]
                .iter()
                .find_map(|key| inner.get(*key))
                .and_then(|v| match v {
                    Value::String(s) => Some(s.clone()),
                    Value::Number(n) => Some(n.to_string()),
                    _ => None,
                }),
            _ => None,
        };
        if let Some(amount) = amount {
            out.insert(name.clone(), amount);
        }
    }
    out
}
