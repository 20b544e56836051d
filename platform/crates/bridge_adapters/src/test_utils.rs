use crate::config::FinalizerConfig;
use crate::context::BridgeContext;
use crate::error::{AdapterResult, BridgeError};
use crate::registry::ChainRegistry;
use crate::rpc::{ChainClients, ChainRpc, FeeData};
use async_trait::async_trait;
use domain::{ChainConfig, TokenConfig, TransactionIntent};
use ethers_core::types::{Address, Bytes, Filter, Log, TransactionReceipt, H256, U256, U64};
use ethers_core::utils::keccak256;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Barrier;

pub const USER: &str = "0x1111111111111111111111111111111111111111";
pub const ARB_USDC: &str = "0x75faf114eafb1bdbe2f0316df893fd58ce46aa4d";
pub const ETH_USDC: &str = "0x1c7d4b196cb0c7b01d743fbc6116a902379c7238";
pub const NATIVE: &str = "0x0000000000000000000000000000000000000000";

pub fn chain(name: &str, chain_id: u64) -> ChainConfig {
    ChainConfig {
        name: name.to_string(),
        chain_id,
        rpc_url: format!("http://{name}.invalid"),
        domain_id: None,
        meson_slug: None,
        native_symbol: "eth".to_string(),
        tokens: Vec::new(),
    }
}

pub fn usdc(address: &str) -> TokenConfig {
    TokenConfig {
        symbol: "usdc".to_string(),
        address: address.parse().unwrap(),
        decimals: 6,
    }
}

pub fn arb_sepolia() -> ChainConfig {
    let mut config = chain("arb_sepolia", 421614);
    config.domain_id = Some(3);
    config.meson_slug = Some("arb-sepolia".to_string());
    config.tokens.push(usdc(ARB_USDC));
    config
}

pub fn eth_sepolia() -> ChainConfig {
    let mut config = chain("eth_sepolia", 11155111);
    config.domain_id = Some(0);
    config.meson_slug = Some("sepolia".to_string());
    config.tokens.push(usdc(ETH_USDC));
    config
}

pub fn user() -> Address {
    USER.parse().unwrap()
}

pub fn selector(signature: &str) -> [u8; 4] {
    let hash = keccak256(signature.as_bytes());
    [hash[0], hash[1], hash[2], hash[3]]
}

pub fn receipt(hash: H256, success: bool, logs: Vec<Log>) -> TransactionReceipt {
    TransactionReceipt {
        transaction_hash: hash,
        status: Some(U64::from(u64::from(success))),
        logs,
        ..Default::default()
    }
}

/// Context over the two Sepolia chains with the given RPC doubles.
pub fn context(arb: MockRpc, eth: MockRpc) -> BridgeContext {
    context_with(Arc::new(arb), Arc::new(eth))
}

pub fn context_with(arb: Arc<MockRpc>, eth: Arc<MockRpc>) -> BridgeContext {
    let registry = ChainRegistry::new(vec![arb_sepolia(), eth_sepolia()]).unwrap();
    let clients = ChainClients::new()
        .with("arb_sepolia", arb)
        .with("eth_sepolia", eth);
    BridgeContext::new(registry, clients, FinalizerConfig::default(), 5).unwrap()
}

pub struct MockRpc {
    nonce: Option<U256>,
    gas_estimate: Option<U256>,
    fees: Option<FeeData>,
    block_number: u64,
    receipts: HashMap<H256, TransactionReceipt>,
    call_results: HashMap<(Address, [u8; 4]), Bytes>,
    logs: Vec<Log>,
    send_counts: HashMap<H256, u64>,
    fee_gate: Option<Arc<Barrier>>,
    nonce_gate: Option<Arc<Barrier>>,
    fee_reads: AtomicUsize,
    pub calls: Mutex<Vec<(Address, Bytes)>>,
    pub broadcasts: Mutex<Vec<Bytes>>,
}

impl MockRpc {
    pub fn healthy() -> Self {
        Self {
            nonce: Some(U256::from(7u64)),
            gas_estimate: Some(U256::from(60_000u64)),
            fees: Some(FeeData {
                max_fee_per_gas: U256::from(30_000_000_000u64),
                max_priority_fee_per_gas: U256::from(1_000_000_000u64),
            }),
            block_number: 1_000,
            receipts: HashMap::new(),
            call_results: HashMap::new(),
            logs: Vec::new(),
            send_counts: HashMap::new(),
            fee_gate: None,
            nonce_gate: None,
            fee_reads: AtomicUsize::new(0),
            calls: Mutex::new(Vec::new()),
            broadcasts: Mutex::new(Vec::new()),
        }
    }

    pub fn failing_gas_estimate(mut self) -> Self {
        self.gas_estimate = None;
        self
    }

    pub fn failing_fee_data(mut self) -> Self {
        self.fees = None;
        self
    }

    pub fn failing_nonce(mut self) -> Self {
        self.nonce = None;
        self
    }

    pub fn with_fees(mut self, fees: FeeData) -> Self {
        self.fees = Some(fees);
        self
    }

    pub fn at_block(mut self, block_number: u64) -> Self {
        self.block_number = block_number;
        self
    }

    pub fn with_receipt(mut self, receipt: TransactionReceipt) -> Self {
        self.receipts.insert(receipt.transaction_hash, receipt);
        self
    }

    pub fn with_call(mut self, to: Address, signature: &str, output: impl Into<Bytes>) -> Self {
        self.call_results
            .insert((to, selector(signature)), output.into());
        self
    }

    pub fn with_log(mut self, log: Log) -> Self {
        self.logs.push(log);
        self
    }

    pub fn with_send_count(mut self, block_hash: H256, send_count: u64) -> Self {
        self.send_counts.insert(block_hash, send_count);
        self
    }

    /// `fee_data` waits on `gate` until every other party has arrived.
    pub fn gated_fee_data(mut self, gate: Arc<Barrier>) -> Self {
        self.fee_gate = Some(gate);
        self
    }

    pub fn gated_nonce(mut self, gate: Arc<Barrier>) -> Self {
        self.nonce_gate = Some(gate);
        self
    }

    pub fn fee_read_count(&self) -> usize {
        self.fee_reads.load(Ordering::SeqCst)
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl ChainRpc for MockRpc {
    async fn transaction_count(&self, _address: Address) -> AdapterResult<U256> {
        if let Some(gate) = &self.nonce_gate {
            gate.wait().await;
        }
        self.nonce
            .ok_or_else(|| BridgeError::Rpc("nonce unavailable".to_string()))
    }

    async fn estimate_gas(&self, _intent: &TransactionIntent, _chain_id: u64) -> AdapterResult<U256> {
        self.gas_estimate
            .ok_or_else(|| BridgeError::Rpc("execution reverted".to_string()))
    }

    async fn fee_data(&self) -> AdapterResult<FeeData> {
        self.fee_reads.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.fee_gate {
            gate.wait().await;
        }
        self.fees
            .ok_or_else(|| BridgeError::Rpc("fee history unavailable".to_string()))
    }

    async fn transaction_receipt(&self, hash: H256) -> AdapterResult<Option<TransactionReceipt>> {
        Ok(self.receipts.get(&hash).cloned())
    }

    async fn block_number(&self) -> AdapterResult<u64> {
        Ok(self.block_number)
    }

    async fn call(&self, to: Address, data: Bytes) -> AdapterResult<Bytes> {
        self.calls.lock().unwrap().push((to, data.clone()));
        let mut key = [0u8; 4];
        key.copy_from_slice(&data[..4]);
        self.call_results
            .get(&(to, key))
            .cloned()
            .ok_or_else(|| BridgeError::Rpc(format!("unexpected call to {to:?}")))
    }

    async fn logs(&self, _filter: &Filter) -> AdapterResult<Vec<Log>> {
        Ok(self.logs.clone())
    }

    async fn block_send_count(&self, block_hash: H256) -> AdapterResult<Option<u64>> {
        Ok(self.send_counts.get(&block_hash).copied())
    }

    async fn send_raw_transaction(&self, raw: Bytes) -> AdapterResult<H256> {
        let hash = H256::from(keccak256(&raw));
        self.broadcasts.lock().unwrap().push(raw);
        Ok(hash)
    }
}
