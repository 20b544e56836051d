use super::{parse_json_bytes, require_hash, validate_request, vendor_json, ValidatedRequest};
use crate::abi;
use crate::config::CctpConfig;
use crate::context::BridgeContext;
use crate::error::{AdapterResult, BridgeError};
use crate::traits::BridgeAdapter;
use crate::units::address_to_bytes32;
use async_trait::async_trait;
use chrono::Utc;
use domain::{
    BridgeQuote, BridgeReference, BridgeRequest, BridgeResult, BridgeVendor, ChainConfig,
    ClaimProof, FinalityMode, TransactionIntent, UnsignedTransaction,
};
use ethers_core::abi::Token;
use ethers_core::types::{Address, H256, U256, U64};
use indexmap::IndexMap;
use reqwest::StatusCode;
use serde_json::Value;
use tracing::{debug, info, warn};
use uuid::Uuid;

const DEPOSIT_FOR_BURN: &str = "function depositForBurn(uint256 amount, uint32 destinationDomain, bytes32 mintRecipient, address burnToken, bytes32 destinationCaller, uint256 maxFee, uint32 minFinalityThreshold)";
const RECEIVE_MESSAGE: &str =
    "function receiveMessage(bytes message, bytes attestation) returns (bool)";
const ALLOWANCE: &str =
    "function allowance(address owner, address spender) view returns (uint256)";
const APPROVE: &str = "function approve(address spender, uint256 amount) returns (bool)";
const USED_NONCES: &str = "function usedNonces(bytes32 nonce) view returns (uint256)";

/// Nonce position inside the message header, after version and both domains.
const NONCE_RANGE: std::ops::Range<usize> = 12..44;

#[derive(Clone)]
pub struct CctpAdapter {
    ctx: BridgeContext,
    config: CctpConfig,
}

fn domain_of(chain: &ChainConfig) -> AdapterResult<u32> {
    chain.domain_id.ok_or_else(|| {
        BridgeError::Validation(format!("{} has no cctp domain", chain.name))
    })
}

/// `ceil(amount * fee_bps / 10000)`, with the fee kept to hundredths of a basis point.
fn fee_for_bps(amount: U256, fee_bps: f64) -> AdapterResult<U256> {
    let centi_bps = U256::from((fee_bps.max(0.0) * 100.0).round() as u64);
    let denominator = U256::from(1_000_000u64);
    amount
        .checked_mul(centi_bps)
        .and_then(|scaled| scaled.checked_add(denominator - U256::one()))
        .map(|scaled| scaled / denominator)
        .ok_or_else(|| BridgeError::Validation(format!("fast transfer fee on {amount} overflows uint256")))
}

fn message_nonce(message: &[u8]) -> AdapterResult<H256> {
    message
        .get(NONCE_RANGE)
        .map(H256::from_slice)
        .ok_or_else(|| BridgeError::Quote("attested message is shorter than its header".to_string()))
}

impl CctpAdapter {
    pub fn new(ctx: BridgeContext, config: CctpConfig) -> Self {
        Self { ctx, config }
    }

    fn base_url(&self) -> &str {
        self.config.attestation_base_url.trim_end_matches('/')
    }

    fn lock_period(&self, finality: FinalityMode) -> u64 {
        match finality {
            FinalityMode::Fast => self.config.fast_lock_period_secs,
            FinalityMode::Standard => self.config.standard_lock_period_secs,
        }
    }

    async fn fast_transfer_fee_bps(&self, source: u32, destination: u32) -> AdapterResult<Option<f64>> {
        let url = format!("{}/burn/USDC/fees/{}/{}", self.base_url(), source, destination);
        let response = self.ctx.http.get(url).send().await?;
        let payload = vendor_json(BridgeVendor::Cctp, response).await?;
        let fee = payload.as_array().and_then(|entries| {
            entries.iter().find_map(|entry| {
                let threshold = entry.get("finalityThreshold").and_then(Value::as_u64)?;
                if threshold != u64::from(FinalityMode::Fast.threshold()) {
                    return None;
                }
                match entry.get("minimumFee")? {
                    Value::Number(n) => n.as_f64(),
                    Value::String(s) => s.parse::<f64>().ok(),
                    _ => None,
                }
            })
        });
        Ok(fee)
    }

    async fn max_fee(&self, req: &ValidatedRequest, source: u32, destination: u32) -> AdapterResult<U256> {
        if req.finality == FinalityMode::Standard {
            return Ok(U256::zero());
        }
        Ok(match self.fast_transfer_fee_bps(source, destination).await {
            Ok(Some(bps)) => fee_for_bps(req.amount, bps)?,
            Ok(None) => self.config.default_fast_max_fee,
            Err(err) => {
                warn!(
                    target: "bridge_adapters",
                    error = %err,
                    "cctp fee lookup failed, using default fast max fee"
                );
                self.config.default_fast_max_fee
            }
        })
    }

    async fn allowance(&self, req: &ValidatedRequest, spender: Address) -> AdapterResult<U256> {
        let rpc = self.ctx.rpc(&req.origin)?;
        let data = abi::encode_call(ALLOWANCE, &[Token::Address(req.user), Token::Address(spender)])?;
        let output = rpc.call(req.source_token, data).await?;
        abi::decode_return(ALLOWANCE, &output)?
            .into_iter()
            .next()
            .and_then(Token::into_uint)
            .ok_or_else(|| BridgeError::Abi("allowance returned no value".to_string()))
    }

    async fn fetch_attestation(&self, domain: u32, hash: H256) -> AdapterResult<Option<Value>> {
        let url = format!("{}/messages/{}", self.base_url(), domain);
        let response = self
            .ctx
            .http
            .get(url)
            .query(&[("transactionHash", format!("{hash:?}"))])
            .send()
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let payload = vendor_json(BridgeVendor::Cctp, response).await?;
        Ok(payload
            .get("messages")
            .and_then(Value::as_array)
            .and_then(|messages| messages.first().cloned()))
    }

    /// Whether the destination transmitter has already consumed this message.
    async fn already_received(&self, destination: &ChainConfig, message: &[u8]) -> AdapterResult<bool> {
        let nonce = message_nonce(message)?;
        let transmitter = self
            .config
            .contracts_for(&destination.name)?
            .message_transmitter;
        let data = abi::encode_call(USED_NONCES, &[Token::FixedBytes(nonce.as_bytes().to_vec())])?;
        let output = self.ctx.rpc(destination)?.call(transmitter, data).await?;
        let used = abi::decode_return(USED_NONCES, &output)?
            .into_iter()
            .next()
            .and_then(Token::into_uint)
            .ok_or_else(|| BridgeError::Abi("usedNonces returned no value".to_string()))?;
        Ok(!used.is_zero())
    }

    async fn burn_status(&self, origin: &ChainConfig, hash: H256) -> AdapterResult<BridgeResult> {
        let rpc = self.ctx.rpc(origin)?;
        Ok(match rpc.transaction_receipt(hash).await? {
            Some(receipt) if receipt.status != Some(U64::from(1u64)) => {
                BridgeResult::failed("burn transaction reverted")
            }
            Some(_) => BridgeResult::pending("burn confirmed, waiting for attestation"),
            None => BridgeResult::pending("waiting for attestation"),
        })
    }
}

#[async_trait]
impl BridgeAdapter for CctpAdapter {
    fn vendor(&self) -> BridgeVendor {
        BridgeVendor::Cctp
    }

    async fn create_bridge_transaction(&self, request: &BridgeRequest) -> AdapterResult<BridgeQuote> {
        let req = validate_request(&self.ctx.registry, request)?;
        if req.is_native() {
            return Err(BridgeError::Validation(
                "cctp burns tokens only, not the native asset".to_string(),
            ));
        }
        let source_domain = domain_of(&req.origin)?;
        let destination_domain = domain_of(&req.destination)?;
        let messenger = self.config.contracts_for(&req.origin.name)?.token_messenger;
        self.config.contracts_for(&req.destination.name)?;

        let max_fee = self.max_fee(&req, source_domain, destination_domain).await?;
        if max_fee >= req.amount {
            return Err(BridgeError::Validation(format!(
                "amount {} does not cover the fast transfer fee {max_fee}",
                req.amount
            )));
        }

        let mut steps = Vec::with_capacity(2);
        let allowance = self.allowance(&req, messenger).await?;
        if allowance < req.amount {
            let approve = abi::encode_call(
                APPROVE,
                &[Token::Address(messenger), Token::Uint(req.amount)],
            )?;
            steps.push(TransactionIntent::call(req.user, req.source_token, approve));
        }
        let burn = abi::encode_call(
            DEPOSIT_FOR_BURN,
            &[
                Token::Uint(req.amount),
                Token::Uint(U256::from(destination_domain)),
                Token::FixedBytes(address_to_bytes32(req.recipient).as_bytes().to_vec()),
                Token::Address(req.source_token),
                Token::FixedBytes(H256::zero().as_bytes().to_vec()),
                Token::Uint(max_fee),
                Token::Uint(U256::from(req.finality.threshold())),
            ],
        )?;
        steps.push(TransactionIntent::call(req.user, messenger, burn));

        let transactions = self
            .ctx
            .finalizer
            .finalize_sequence(&steps, &req.origin)
            .await?;
        info!(
            target: "bridge_adapters",
            origin = %req.origin.name,
            destination = %req.destination.name,
            finality = ?req.finality,
            %max_fee,
            approval = transactions.len() > 1,
            "cctp burn built"
        );

        let mut fees = IndexMap::new();
        fees.insert("max_fee".to_string(), max_fee.to_string());
        Ok(BridgeQuote {
            quote_id: Uuid::new_v4(),
            vendor: BridgeVendor::Cctp,
            origin_chain: req.origin.name.clone(),
            destination_chain: req.destination.name.clone(),
            source_amount: req.amount,
            destination_amount: Some(req.amount - max_fee),
            fees,
            transactions,
            request_id: None,
            bridge_address: Some(messenger),
            needs_manual_claim: true,
            lock_period_secs: self.lock_period(req.finality),
            quoted_at: Utc::now(),
        })
    }

    async fn listen_bridge_result(&self, reference: &BridgeReference) -> AdapterResult<BridgeResult> {
        let hash = require_hash(reference.transaction_hash, BridgeVendor::Cctp)?;
        let origin = self.ctx.chain(&reference.origin_chain)?;
        let domain = domain_of(origin)?;

        let Some(message) = self.fetch_attestation(domain, hash).await? else {
            return self.burn_status(origin, hash).await;
        };
        let status = message.get("status").and_then(Value::as_str).unwrap_or_default();
        let attestation = message
            .get("attestation")
            .and_then(Value::as_str)
            .unwrap_or("PENDING");
        debug!(target: "bridge_adapters", %hash, status, "cctp attestation");
        if status != "complete" || attestation.eq_ignore_ascii_case("PENDING") {
            return Ok(BridgeResult::pending(format!("attestation is {status}")));
        }

        let message_bytes = message
            .get("message")
            .and_then(parse_json_bytes)
            .ok_or_else(|| BridgeError::Quote("attested message is not hex".to_string()))?;
        let attestation_bytes = parse_json_bytes(&Value::String(attestation.to_string()))
            .ok_or_else(|| BridgeError::Quote("attestation is not hex".to_string()))?;
        let destination = self.ctx.chain(&reference.destination_chain)?;
        if self.already_received(destination, &message_bytes).await? {
            return Ok(BridgeResult::settled("message already received on destination"));
        }
        Ok(BridgeResult::claimable(
            ClaimProof::Attestation {
                message: message_bytes,
                attestation: attestation_bytes,
            },
            "attestation complete, ready to mint on destination",
        ))
    }

    async fn claim_bridge_result(&self, reference: &BridgeReference) -> AdapterResult<UnsignedTransaction> {
        let user = reference.user_address.ok_or_else(|| {
            BridgeError::Validation("claim needs the user address".to_string())
        })?;
        let proof = match &reference.proof {
            Some(proof) => proof.clone(),
            None => {
                let result = self.listen_bridge_result(reference).await?;
                match result.proof {
                    Some(proof) if result.claimable => proof,
                    _ => return Err(BridgeError::NotClaimable(result.message)),
                }
            }
        };
        let ClaimProof::Attestation {
            message,
            attestation,
        } = proof
        else {
            return Err(BridgeError::Validation(
                "cctp claim needs an attestation proof".to_string(),
            ));
        };

        let destination = self.ctx.chain(&reference.destination_chain)?;
        if self.already_received(destination, &message).await? {
            return Err(BridgeError::NotClaimable(
                "message already received on destination".to_string(),
            ));
        }
        let transmitter = self
            .config
            .contracts_for(&destination.name)?
            .message_transmitter;
        let data = abi::encode_call(
            RECEIVE_MESSAGE,
            &[Token::Bytes(message.to_vec()), Token::Bytes(attestation.to_vec())],
        )?;
        let intent = TransactionIntent::call(user, transmitter, data);
        self.ctx.finalizer.finalize(&intent, destination).await
    }
}
