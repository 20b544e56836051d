use super::{origin_receipt_status, require_hash, validate_request};
use crate::abi;
use crate::config::ArbitrumConfig;
use crate::context::BridgeContext;
use crate::error::{AdapterResult, BridgeError};
use crate::rpc::ChainRpc;
use crate::traits::BridgeAdapter;
use async_trait::async_trait;
use chrono::Utc;
use domain::{
    BridgeQuote, BridgeReference, BridgeRequest, BridgeResult, BridgeVendor, ChainConfig,
    ClaimProof, TransactionIntent, UnsignedTransaction,
};
use ethers_core::abi::Token;
use ethers_core::types::{Address, Bytes, Filter, TransactionReceipt, H256, U256, U64};
use indexmap::IndexMap;
use std::time::Duration;
use tracing::{debug, info};
use uuid::Uuid;

const WITHDRAW_ETH: &str = "function withdrawEth(address destination) payable returns (uint256)";
const CREATE_RETRYABLE_TICKET: &str = "function createRetryableTicket(address to, uint256 l2CallValue, uint256 maxSubmissionCost, address excessFeeRefundAddress, address callValueRefundAddress, uint256 gasLimit, uint256 maxFeePerGas, bytes data) payable returns (uint256)";
const IS_SPENT: &str = "function isSpent(uint256 index) view returns (bool)";
const CONSTRUCT_OUTBOX_PROOF: &str = "function constructOutboxProof(uint64 size, uint64 leaf) view returns (bytes32 send, bytes32 root, bytes32[] proof)";
const EXECUTE_TRANSACTION: &str = "function executeTransaction(bytes32[] proof, uint256 index, address l2Sender, address to, uint256 l2Block, uint256 l1Block, uint256 l2Timestamp, uint256 value, bytes data)";
const L2_TO_L1_TX: &str = "event L2ToL1Tx(address caller, address indexed destination, uint256 indexed hash, uint256 indexed position, uint256 arbBlockNum, uint256 ethBlockNum, uint256 timestamp, uint256 callvalue, bytes data)";
const ASSERTION_CONFIRMED: &str =
    "event AssertionConfirmed(bytes32 indexed assertionHash, bytes32 blockHash, bytes32 sendRoot)";

/// Per-byte calldata cost used to size the retryable submission fee.
const SUBMISSION_BYTE_COST: u64 = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Withdrawal,
    Deposit,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct RetryableParams {
    l2_call_value: U256,
    max_submission_cost: U256,
    gas_limit: U256,
    max_fee_per_gas: U256,
    l2_execution_cost: U256,
    total_value: U256,
}

fn retryable_params(
    l2_call_value: U256,
    data_len: usize,
    max_fee_per_gas: U256,
    gas_limit: u64,
) -> AdapterResult<RetryableParams> {
    let overflow = || BridgeError::Validation("retryable ticket value overflows uint256".to_string());
    let gas_limit = U256::from(gas_limit);
    let l2_execution_cost = gas_limit.checked_mul(max_fee_per_gas).ok_or_else(overflow)?;
    let max_submission_cost = max_fee_per_gas
        .checked_mul(U256::from(data_len.max(1)))
        .and_then(|cost| cost.checked_mul(U256::from(SUBMISSION_BYTE_COST)))
        .ok_or_else(overflow)?;
    let total_value = l2_call_value
        .checked_add(max_submission_cost)
        .and_then(|value| value.checked_add(l2_execution_cost))
        .ok_or_else(overflow)?;
    Ok(RetryableParams {
        l2_call_value,
        max_submission_cost,
        gas_limit,
        max_fee_per_gas,
        l2_execution_cost,
        total_value,
    })
}

/// Fields of the `L2ToL1Tx` event that the outbox needs to execute the message.
#[derive(Debug, Clone, PartialEq, Eq)]
struct WithdrawalMessage {
    position: U256,
    caller: Address,
    destination: Address,
    arb_block_num: U256,
    eth_block_num: U256,
    timestamp: U256,
    callvalue: U256,
    data: Bytes,
}

impl WithdrawalMessage {
    fn into_proof(self, proof: Vec<H256>) -> ClaimProof {
        ClaimProof::Outbox {
            proof,
            position: self.position,
            caller: self.caller,
            destination: self.destination,
            arb_block_num: self.arb_block_num,
            eth_block_num: self.eth_block_num,
            timestamp: self.timestamp,
            callvalue: self.callvalue,
            data: self.data,
        }
    }
}

fn uint_param(log: &ethers_core::abi::Log, name: &str) -> AdapterResult<U256> {
    abi::param(log, name)?
        .into_uint()
        .ok_or_else(|| BridgeError::Abi(format!("{name} is not a uint")))
}

fn address_param(log: &ethers_core::abi::Log, name: &str) -> AdapterResult<Address> {
    abi::param(log, name)?
        .into_address()
        .ok_or_else(|| BridgeError::Abi(format!("{name} is not an address")))
}

fn word(token: Token) -> AdapterResult<H256> {
    match token.into_fixed_bytes() {
        Some(bytes) if bytes.len() == 32 => Ok(H256::from_slice(&bytes)),
        _ => Err(BridgeError::Abi("expected a bytes32 value".to_string())),
    }
}

#[derive(Clone)]
pub struct ArbitrumNativeAdapter {
    ctx: BridgeContext,
    config: ArbitrumConfig,
}

impl ArbitrumNativeAdapter {
    pub fn new(ctx: BridgeContext, config: ArbitrumConfig) -> Self {
        Self { ctx, config }
    }

    fn l1(&self) -> AdapterResult<&ChainConfig> {
        self.ctx.chain(&self.config.l1_chain)
    }

    fn l2(&self) -> AdapterResult<&ChainConfig> {
        self.ctx.chain(&self.config.l2_chain)
    }

    fn direction(&self, origin: &ChainConfig, destination: &ChainConfig) -> AdapterResult<Direction> {
        let l1 = self.config.l1_chain.as_str();
        let l2 = self.config.l2_chain.as_str();
        match (origin.name.as_str(), destination.name.as_str()) {
            (o, d) if o == l2 && d == l1 => Ok(Direction::Withdrawal),
            (o, d) if o == l1 && d == l2 => Ok(Direction::Deposit),
            (o, d) => Err(BridgeError::Validation(format!(
                "arbitrum native bridge only serves {l1} <-> {l2}, not {o} -> {d}"
            ))),
        }
    }

    fn parse_message(&self, receipt: &TransactionReceipt) -> AdapterResult<WithdrawalMessage> {
        let event = abi::event(L2_TO_L1_TX)?;
        let topic = event.signature();
        let log = receipt
            .logs
            .iter()
            .find(|log| log.address == self.config.arb_sys && log.topics.first() == Some(&topic))
            .ok_or_else(|| {
                BridgeError::Validation(format!(
                    "transaction {:?} emitted no L2-to-L1 message",
                    receipt.transaction_hash
                ))
            })?;
        let decoded = abi::decode_log(&event, log)?;
        let data = abi::param(&decoded, "data")?
            .into_bytes()
            .ok_or_else(|| BridgeError::Abi("data is not bytes".to_string()))?;
        Ok(WithdrawalMessage {
            position: uint_param(&decoded, "position")?,
            caller: address_param(&decoded, "caller")?,
            destination: address_param(&decoded, "destination")?,
            arb_block_num: uint_param(&decoded, "arbBlockNum")?,
            eth_block_num: uint_param(&decoded, "ethBlockNum")?,
            timestamp: uint_param(&decoded, "timestamp")?,
            callvalue: uint_param(&decoded, "callvalue")?,
            data: Bytes::from(data),
        })
    }

    async fn is_spent(&self, l1: &dyn ChainRpc, position: U256) -> AdapterResult<bool> {
        let data = abi::encode_call(IS_SPENT, &[Token::Uint(position)])?;
        let output = l1.call(self.config.outbox, data).await?;
        abi::decode_return(IS_SPENT, &output)?
            .into_iter()
            .next()
            .and_then(Token::into_bool)
            .ok_or_else(|| BridgeError::Abi("isSpent returned no value".to_string()))
    }

    /// Send count of the newest L2 block confirmed on L1 within the lookback window.
    async fn confirmed_send_count(
        &self,
        l1: &dyn ChainRpc,
        l2: &dyn ChainRpc,
    ) -> AdapterResult<Option<u64>> {
        let event = abi::event(ASSERTION_CONFIRMED)?;
        let current = l1.block_number().await?;
        let filter = Filter::new()
            .address(self.config.rollup)
            .topic0(event.signature())
            .from_block(current.saturating_sub(self.config.confirmed_lookback_blocks))
            .to_block(current);
        let logs = l1.logs(&filter).await?;
        let Some(latest) = logs.iter().max_by_key(|log| (log.block_number, log.log_index)) else {
            return Ok(None);
        };
        let decoded = abi::decode_log(&event, latest)?;
        let block_hash = word(abi::param(&decoded, "blockHash")?)?;
        let send_count = l2.block_send_count(block_hash).await?;
        debug!(target: "bridge_adapters", ?block_hash, ?send_count, "latest confirmed assertion");
        Ok(send_count)
    }

    async fn outbox_proof(&self, l2: &dyn ChainRpc, send_count: u64, position: u64) -> AdapterResult<Vec<H256>> {
        let data = abi::encode_call(
            CONSTRUCT_OUTBOX_PROOF,
            &[Token::Uint(U256::from(send_count)), Token::Uint(U256::from(position))],
        )?;
        let output = l2.call(self.config.node_interface, data).await?;
        let proof = abi::decode_return(CONSTRUCT_OUTBOX_PROOF, &output)?
            .into_iter()
            .nth(2)
            .and_then(Token::into_array)
            .ok_or_else(|| BridgeError::Abi("outbox proof is missing".to_string()))?;
        proof.into_iter().map(word).collect()
    }

    /// Initiated -> Ready -> Executed, checking Executed first.
    async fn withdrawal_status(&self, hash: H256, max_polls: u32) -> AdapterResult<BridgeResult> {
        let l1_rpc = self.ctx.rpc(self.l1()?)?;
        let l2_rpc = self.ctx.rpc(self.l2()?)?;

        let receipt = match l2_rpc.transaction_receipt(hash).await? {
            None => return Ok(BridgeResult::pending("withdrawal not yet mined on L2")),
            Some(receipt) => receipt,
        };
        if receipt.status != Some(U64::from(1u64)) {
            return Ok(BridgeResult::failed("withdrawal transaction reverted on L2"));
        }
        let message = self.parse_message(&receipt)?;
        if self.is_spent(l1_rpc.as_ref(), message.position).await? {
            return Ok(BridgeResult::settled("withdrawal already executed on L1"));
        }

        let position = u64::try_from(message.position)
            .map_err(|_| BridgeError::Abi(format!("position {} overflows u64", message.position)))?;
        let attempts = max_polls.max(1);
        for attempt in 0..attempts {
            if let Some(send_count) = self
                .confirmed_send_count(l1_rpc.as_ref(), l2_rpc.as_ref())
                .await?
            {
                if send_count > position {
                    let proof = self.outbox_proof(l2_rpc.as_ref(), send_count, position).await?;
                    info!(target: "bridge_adapters", %hash, position, "withdrawal ready to execute");
                    return Ok(BridgeResult::claimable(
                        message.into_proof(proof),
                        "challenge period elapsed, withdrawal can be executed on L1",
                    ));
                }
            }
            if attempt + 1 < attempts {
                tokio::time::sleep(Duration::from_secs(self.config.ready_poll_interval_secs)).await;
            }
        }

        let ready_at = message
            .eth_block_num
            .low_u64()
            .saturating_add(self.config.confirm_period_blocks);
        Ok(BridgeResult::pending("withdrawal is waiting for the challenge period").ready_at(ready_at))
    }
}

#[async_trait]
impl BridgeAdapter for ArbitrumNativeAdapter {
    fn vendor(&self) -> BridgeVendor {
        BridgeVendor::ArbitrumNative
    }

    async fn create_bridge_transaction(&self, request: &BridgeRequest) -> AdapterResult<BridgeQuote> {
        let req = validate_request(&self.ctx.registry, request)?;
        if !req.is_native() {
            return Err(BridgeError::Validation(
                "arbitrum native bridge moves the native asset only".to_string(),
            ));
        }
        let direction = self.direction(&req.origin, &req.destination)?;

        let mut fees = IndexMap::new();
        let (intent, bridge_address, lock_period_secs, l1_state) = match direction {
            Direction::Withdrawal => {
                let data = abi::encode_call(WITHDRAW_ETH, &[Token::Address(req.recipient)])?;
                let intent = TransactionIntent::call(req.user, self.config.arb_sys, data)
                    .with_value(req.amount);
                (intent, self.config.arb_sys, self.config.withdrawal_lock_period_secs, None)
            }
            Direction::Deposit => {
                let l2_rpc = self.ctx.rpc(&req.destination)?;
                let (l2_fees, l1_state) = tokio::join!(
                    l2_rpc.fee_data(),
                    self.ctx.finalizer.account_state(req.user, &req.origin),
                );
                let params = retryable_params(
                    req.amount,
                    0,
                    l2_fees?.max_fee_per_gas,
                    self.config.retryable_gas_limit,
                )?;
                let data = abi::encode_call(
                    CREATE_RETRYABLE_TICKET,
                    &[
                        Token::Address(req.recipient),
                        Token::Uint(params.l2_call_value),
                        Token::Uint(params.max_submission_cost),
                        Token::Address(req.user),
                        Token::Address(req.user),
                        Token::Uint(params.gas_limit),
                        Token::Uint(params.max_fee_per_gas),
                        Token::Bytes(Vec::new()),
                    ],
                )?;
                fees.insert(
                    "max_submission_cost".to_string(),
                    params.max_submission_cost.to_string(),
                );
                fees.insert(
                    "l2_execution_cost".to_string(),
                    params.l2_execution_cost.to_string(),
                );
                let intent = TransactionIntent::call(req.user, self.config.inbox, data)
                    .with_value(params.total_value);
                (intent, self.config.inbox, self.config.deposit_lock_period_secs, Some(l1_state?))
            }
        };

        let finalizer = &self.ctx.finalizer;
        let transaction = match l1_state {
            Some(state) => finalizer.finalize_with(&intent, &req.origin, state).await?,
            None => finalizer.finalize(&intent, &req.origin).await?,
        };
        info!(
            target: "bridge_adapters",
            direction = ?direction,
            origin = %req.origin.name,
            value = %transaction.value,
            "arbitrum native bridge transaction built"
        );
        Ok(BridgeQuote {
            quote_id: Uuid::new_v4(),
            vendor: BridgeVendor::ArbitrumNative,
            origin_chain: req.origin.name.clone(),
            destination_chain: req.destination.name.clone(),
            source_amount: req.amount,
            destination_amount: Some(req.amount),
            fees,
            transactions: vec![transaction],
            request_id: None,
            bridge_address: Some(bridge_address),
            needs_manual_claim: direction == Direction::Withdrawal,
            lock_period_secs,
            quoted_at: Utc::now(),
        })
    }

    async fn listen_bridge_result(&self, reference: &BridgeReference) -> AdapterResult<BridgeResult> {
        let hash = require_hash(reference.transaction_hash, BridgeVendor::ArbitrumNative)?;
        let origin = self.ctx.chain(&reference.origin_chain)?;
        let destination = self.ctx.chain(&reference.destination_chain)?;
        match self.direction(origin, destination)? {
            Direction::Withdrawal => {
                self.withdrawal_status(hash, self.config.ready_max_polls)
                    .await
            }
            Direction::Deposit => {
                let rpc = self.ctx.rpc(origin)?;
                origin_receipt_status(rpc.as_ref(), hash, BridgeVendor::ArbitrumNative).await
            }
        }
    }

    async fn claim_bridge_result(&self, reference: &BridgeReference) -> AdapterResult<UnsignedTransaction> {
        let origin = self.ctx.chain(&reference.origin_chain)?;
        let destination = self.ctx.chain(&reference.destination_chain)?;
        if self.direction(origin, destination)? == Direction::Deposit {
            return Err(BridgeError::UnsupportedOperation(
                "deposits are redeemed on L2 automatically".to_string(),
            ));
        }
        let user = reference.user_address.ok_or_else(|| {
            BridgeError::Validation("claim needs the user address".to_string())
        })?;

        let proof = match &reference.proof {
            Some(proof) => proof.clone(),
            None => {
                let hash = require_hash(reference.transaction_hash, BridgeVendor::ArbitrumNative)?;
                let result = self.withdrawal_status(hash, 1).await?;
                if result.claimed {
                    return Err(BridgeError::NotClaimable(
                        "withdrawal already executed".to_string(),
                    ));
                }
                match result.proof {
                    Some(proof) if result.claimable => proof,
                    _ => return Err(BridgeError::NotClaimable(result.message)),
                }
            }
        };
        let ClaimProof::Outbox {
            proof,
            position,
            caller,
            destination: to,
            arb_block_num,
            eth_block_num,
            timestamp,
            callvalue,
            data,
        } = proof
        else {
            return Err(BridgeError::Validation(
                "arbitrum claim needs an outbox proof".to_string(),
            ));
        };

        let calldata = abi::encode_call(
            EXECUTE_TRANSACTION,
            &[
                Token::Array(
                    proof
                        .iter()
                        .map(|node| Token::FixedBytes(node.as_bytes().to_vec()))
                        .collect(),
                ),
                Token::Uint(position),
                Token::Address(caller),
                Token::Address(to),
                Token::Uint(arb_block_num),
                Token::Uint(eth_block_num),
                Token::Uint(timestamp),
                Token::Uint(callvalue),
                Token::Bytes(data.to_vec()),
            ],
        )?;
        let intent = TransactionIntent::call(user, self.config.outbox, calldata);
        self.ctx.finalizer.finalize(&intent, self.l1()?).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rpc::FeeData;
    use crate::test_utils::{context, receipt, user, MockRpc, ARB_USDC, ETH_USDC, NATIVE, USER};
    use crate::units::address_to_bytes32;
    use assert_matches::assert_matches;
    use domain::{BridgeStatus, DestinationToken, SourceToken};
    use ethers_core::abi::encode;
    use ethers_core::types::Log;
    use ethers_core::utils::keccak256;
    use std::sync::Arc;
    use tokio::sync::Barrier;

    const POSITION: u64 = 5;
    const ETH_BLOCK: u64 = 500;

    fn config() -> ArbitrumConfig {
        ArbitrumConfig {
            l1_chain: "eth_sepolia".to_string(),
            l2_chain: "arb_sepolia".to_string(),
            inbox: Address::repeat_byte(0x1b),
            outbox: Address::repeat_byte(0x0b),
            rollup: Address::repeat_byte(0x4e),
            arb_sys: Address::from_low_u64_be(0x64),
            node_interface: Address::from_low_u64_be(0xc8),
            retryable_gas_limit: 27514,
            confirm_period_blocks: 20,
            confirmed_lookback_blocks: 7200,
            ready_poll_interval_secs: 0,
            ready_max_polls: 2,
            withdrawal_lock_period_secs: 604_800,
            deposit_lock_period_secs: 900,
        }
    }

    fn request(origin: &str, destination: &str, token: &str) -> BridgeRequest {
        BridgeRequest {
            user_address: USER.to_string(),
            origin_chain: origin.to_string(),
            destination_chain: destination.to_string(),
            source_token: SourceToken {
                address: token.to_string(),
                amount: "0.0001".to_string(),
                decimals: None,
            },
            destination_token: DestinationToken {
                address: token.to_string(),
            },
            integrator_id: None,
            recipient_address: None,
            finality: None,
        }
    }

    fn withdrawal_log() -> Log {
        let event = abi::event(L2_TO_L1_TX).unwrap();
        Log {
            address: Address::from_low_u64_be(0x64),
            topics: vec![
                event.signature(),
                address_to_bytes32(user()),
                H256::from_low_u64_be(0xabc),
                H256::from_low_u64_be(POSITION),
            ],
            data: Bytes::from(encode(&[
                Token::Address(user()),
                Token::Uint(U256::from(9_000u64)),
                Token::Uint(U256::from(ETH_BLOCK)),
                Token::Uint(U256::from(1_700_000_000u64)),
                Token::Uint(U256::from(100_000_000_000_000u64)),
                Token::Bytes(Vec::new()),
            ])),
            ..Default::default()
        }
    }

    fn assertion_log(block_hash: H256) -> Log {
        let event = abi::event(ASSERTION_CONFIRMED).unwrap();
        Log {
            address: Address::repeat_byte(0x4e),
            topics: vec![event.signature(), H256::repeat_byte(0x77)],
            data: Bytes::from(encode(&[
                Token::FixedBytes(block_hash.as_bytes().to_vec()),
                Token::FixedBytes(H256::repeat_byte(0x88).as_bytes().to_vec()),
            ])),
            block_number: Some(U64::from(990u64)),
            ..Default::default()
        }
    }

    fn spent(value: bool) -> Vec<u8> {
        encode(&[Token::Bool(value)])
    }

    fn proof_output() -> Vec<u8> {
        encode(&[
            Token::FixedBytes(vec![1u8; 32]),
            Token::FixedBytes(vec![2u8; 32]),
            Token::Array(vec![
                Token::FixedBytes(vec![3u8; 32]),
                Token::FixedBytes(vec![4u8; 32]),
            ]),
        ])
    }

    fn withdrawal_rpcs(is_spent: bool, send_count: u64) -> (MockRpc, MockRpc, H256) {
        let hash = H256::repeat_byte(0x42);
        let confirmed_block = H256::repeat_byte(0x55);
        let l2 = MockRpc::healthy()
            .with_receipt(receipt(hash, true, vec![withdrawal_log()]))
            .with_send_count(confirmed_block, send_count)
            .with_call(
                Address::from_low_u64_be(0xc8),
                "constructOutboxProof(uint64,uint64)",
                proof_output(),
            );
        let l1 = MockRpc::healthy()
            .with_call(Address::repeat_byte(0x0b), "isSpent(uint256)", spent(is_spent))
            .with_log(assertion_log(confirmed_block));
        (l2, l1, hash)
    }

    #[test]
    fn retryable_total_covers_value_submission_and_execution() {
        let l2_max_fee = U256::from(100_000_000u64);
        let amount = U256::from(100_000_000_000_000u64);
        let params = retryable_params(amount, 0, l2_max_fee, 27514).unwrap();
        assert_eq!(params.l2_execution_cost, U256::from(27514u64) * l2_max_fee);
        assert_eq!(params.max_submission_cost, l2_max_fee * U256::from(16u64));
        assert_eq!(
            params.total_value,
            amount + params.max_submission_cost + U256::from(27514u64) * l2_max_fee
        );
        assert!(params.total_value > params.l2_call_value);
    }

    #[tokio::test]
    async fn withdrawal_calls_arbsys_with_value_on_l2() {
        let adapter = ArbitrumNativeAdapter::new(
            context(MockRpc::healthy(), MockRpc::healthy()),
            config(),
        );
        let quote = adapter
            .create_bridge_transaction(&request("arb_sepolia", "eth_sepolia", NATIVE))
            .await
            .unwrap();
        let tx = &quote.transactions[0];
        assert_eq!(tx.to, Address::from_low_u64_be(0x64));
        assert_eq!(tx.chain_id, 421614);
        assert_eq!(tx.value, U256::from(100_000_000_000_000u64));
        assert_eq!(&tx.data[..4], &keccak256("withdrawEth(address)")[..4]);
        assert!(quote.needs_manual_claim);
        assert_eq!(quote.lock_period_secs, 604_800);
    }

    #[tokio::test]
    async fn deposit_builds_retryable_ticket_on_l1() {
        let l2_fees = FeeData {
            max_fee_per_gas: U256::from(100_000_000u64),
            max_priority_fee_per_gas: U256::zero(),
        };
        let adapter = ArbitrumNativeAdapter::new(
            context(MockRpc::healthy().with_fees(l2_fees), MockRpc::healthy()),
            config(),
        );
        let quote = adapter
            .create_bridge_transaction(&request("eth_sepolia", "arb_sepolia", NATIVE))
            .await
            .unwrap();
        let tx = &quote.transactions[0];
        let amount = U256::from(100_000_000_000_000u64);
        let expected = amount + U256::from(1_600_000_000u64) + U256::from(27514u64) * U256::from(100_000_000u64);
        assert_eq!(tx.to, Address::repeat_byte(0x1b));
        assert_eq!(tx.chain_id, 11155111);
        assert_eq!(tx.value, expected);
        assert!(tx.value > amount);
        assert!(!quote.needs_manual_claim);
        assert_eq!(quote.lock_period_secs, 900);
        assert_eq!(
            quote.fees.get("l2_execution_cost").map(String::as_str),
            Some("2751400000000")
        );
    }

    #[tokio::test]
    async fn deposit_reads_l2_fees_while_l1_account_state_loads() {
        let gate = Arc::new(Barrier::new(2));
        let l2 = MockRpc::healthy().gated_fee_data(gate.clone());
        let l1 = MockRpc::healthy().gated_nonce(gate);
        let adapter = ArbitrumNativeAdapter::new(context(l2, l1), config());
        let quote = tokio::time::timeout(
            Duration::from_secs(5),
            adapter.create_bridge_transaction(&request("eth_sepolia", "arb_sepolia", NATIVE)),
        )
        .await
        .expect("l2 fee read and l1 nonce read ran one after the other")
        .unwrap();
        assert_eq!(quote.transactions[0].nonce, U256::from(7u64));
        assert_eq!(quote.transactions[0].chain_id, 11155111);
    }

    #[test]
    fn retryable_overflow_is_a_validation_error() {
        assert_matches!(
            retryable_params(U256::MAX - U256::one(), 0, U256::from(10u64), 27514),
            Err(BridgeError::Validation(_))
        );
        assert_matches!(
            retryable_params(U256::one(), 0, U256::MAX, 27514),
            Err(BridgeError::Validation(_))
        );
    }

    #[tokio::test]
    async fn erc20_and_foreign_routes_are_rejected() {
        let adapter = ArbitrumNativeAdapter::new(
            context(MockRpc::healthy(), MockRpc::healthy()),
            config(),
        );
        let mut usdc = request("arb_sepolia", "eth_sepolia", ARB_USDC);
        usdc.destination_token.address = ETH_USDC.to_string();
        usdc.source_token.decimals = Some(6);
        assert_matches!(
            adapter.create_bridge_transaction(&usdc).await,
            Err(BridgeError::Validation(_))
        );

        let arb = adapter.ctx.chain("arb_sepolia").unwrap().clone();
        assert_matches!(adapter.direction(&arb, &arb), Err(BridgeError::Validation(_)));
    }

    #[tokio::test]
    async fn executed_withdrawal_is_reported_identically_on_every_poll() {
        let (l2, l1, hash) = withdrawal_rpcs(true, 10);
        let adapter = ArbitrumNativeAdapter::new(context(l2, l1), config());
        let reference = BridgeReference::by_hash(hash, "arb_sepolia", "eth_sepolia");

        let first = adapter.listen_bridge_result(&reference).await.unwrap();
        let second = adapter.listen_bridge_result(&reference).await.unwrap();
        for result in [&first, &second] {
            assert_eq!(result.status, BridgeStatus::Success);
            assert!(result.claimed);
            assert!(!result.claimable);
            assert!(result.proof.is_none());
        }
        assert_eq!(first.message, second.message);
    }

    #[tokio::test]
    async fn confirmed_withdrawal_is_claimable_and_executes_on_outbox() {
        let (l2, l1, hash) = withdrawal_rpcs(false, 10);
        let adapter = ArbitrumNativeAdapter::new(context(l2, l1), config());
        let reference =
            BridgeReference::by_hash(hash, "arb_sepolia", "eth_sepolia").with_user(user());

        let result = adapter.listen_bridge_result(&reference).await.unwrap();
        assert!(result.claimable);
        assert!(!result.claimed);
        let proof = result.proof.clone().unwrap();
        assert_matches!(
            &proof,
            ClaimProof::Outbox { proof, position, caller, .. }
                if proof.len() == 2 && *position == U256::from(POSITION) && *caller == user()
        );

        let claim = adapter
            .claim_bridge_result(&reference.clone().with_proof(Some(proof)))
            .await
            .unwrap();
        assert_eq!(claim.to, Address::repeat_byte(0x0b));
        assert_eq!(claim.chain_id, 11155111);
        assert_eq!(
            &claim.data[..4],
            &keccak256(
                "executeTransaction(bytes32[],uint256,address,address,uint256,uint256,uint256,uint256,bytes)"
            )[..4]
        );
    }

    #[tokio::test]
    async fn unconfirmed_withdrawal_stays_pending_with_ready_block() {
        let (l2, l1, hash) = withdrawal_rpcs(false, POSITION);
        let adapter = ArbitrumNativeAdapter::new(context(l2, l1), config());
        let reference =
            BridgeReference::by_hash(hash, "arb_sepolia", "eth_sepolia").with_user(user());

        let result = adapter.listen_bridge_result(&reference).await.unwrap();
        assert_eq!(result.status, BridgeStatus::Pending);
        assert!(!result.claimable);
        assert_eq!(result.ready_at_block, Some(ETH_BLOCK + 20));

        assert_matches!(
            adapter.claim_bridge_result(&reference).await,
            Err(BridgeError::NotClaimable(_))
        );
    }

    #[tokio::test]
    async fn executed_withdrawal_cannot_be_claimed_again() {
        let (l2, l1, hash) = withdrawal_rpcs(true, 10);
        let adapter = ArbitrumNativeAdapter::new(context(l2, l1), config());
        let reference =
            BridgeReference::by_hash(hash, "arb_sepolia", "eth_sepolia").with_user(user());
        assert_matches!(
            adapter.claim_bridge_result(&reference).await,
            Err(BridgeError::NotClaimable(_))
        );
    }

    #[tokio::test]
    async fn deposits_settle_from_l1_receipt_and_have_no_claim() {
        let hash = H256::repeat_byte(0x21);
        let l1 = MockRpc::healthy().with_receipt(receipt(hash, true, vec![]));
        let adapter = ArbitrumNativeAdapter::new(context(MockRpc::healthy(), l1), config());
        let reference =
            BridgeReference::by_hash(hash, "eth_sepolia", "arb_sepolia").with_user(user());

        let result = adapter.listen_bridge_result(&reference).await.unwrap();
        assert_eq!(result.status, BridgeStatus::Success);
        assert_matches!(
            adapter.claim_bridge_result(&reference).await,
            Err(BridgeError::UnsupportedOperation(_))
        );
    }
}
