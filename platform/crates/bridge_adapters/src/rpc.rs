use crate::error::{AdapterResult, BridgeError};
use crate::registry::ChainRegistry;
use async_trait::async_trait;
use domain::{ChainConfig, TransactionIntent};
use ethers_core::types::transaction::eip2718::TypedTransaction;
use ethers_core::types::{
    Address, Bytes, Eip1559TransactionRequest, Filter, Log, TransactionReceipt, H256, U256,
};
use ethers_providers::{Http, Middleware, Provider};
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeeData {
    pub max_fee_per_gas: U256,
    pub max_priority_fee_per_gas: U256,
}

/// Chain reads and raw broadcast for a single chain.
#[async_trait]
pub trait ChainRpc: Send + Sync {
    async fn transaction_count(&self, address: Address) -> AdapterResult<U256>;
    async fn estimate_gas(&self, intent: &TransactionIntent, chain_id: u64) -> AdapterResult<U256>;
    async fn fee_data(&self) -> AdapterResult<FeeData>;
    async fn transaction_receipt(&self, hash: H256) -> AdapterResult<Option<TransactionReceipt>>;
    async fn block_number(&self) -> AdapterResult<u64>;
    async fn call(&self, to: Address, data: Bytes) -> AdapterResult<Bytes>;
    async fn logs(&self, filter: &Filter) -> AdapterResult<Vec<Log>>;
    /// Rollup-specific `sendCount` header field of an L2 block.
    async fn block_send_count(&self, block_hash: H256) -> AdapterResult<Option<u64>>;
    async fn send_raw_transaction(&self, raw: Bytes) -> AdapterResult<H256>;
}

#[derive(Debug, Clone)]
pub struct EthersRpc {
    provider: Provider<Http>,
}

impl EthersRpc {
    pub fn connect(rpc_url: &str) -> AdapterResult<Self> {
        let provider = Provider::<Http>::try_from(rpc_url)
            .map_err(|e| BridgeError::Config(format!("invalid rpc url {rpc_url}: {e}")))?;
        Ok(Self { provider })
    }
}

fn rpc_error(context: &str, err: impl std::fmt::Display) -> BridgeError {
    BridgeError::Rpc(format!("{context}: {err}"))
}

#[async_trait]
impl ChainRpc for EthersRpc {
    async fn transaction_count(&self, address: Address) -> AdapterResult<U256> {
        self.provider
            .get_transaction_count(address, None)
            .await
            .map_err(|e| rpc_error("eth_getTransactionCount", e))
    }

    async fn estimate_gas(&self, intent: &TransactionIntent, chain_id: u64) -> AdapterResult<U256> {
        let request = Eip1559TransactionRequest::new()
            .from(intent.from)
            .to(intent.to)
            .data(intent.data.clone())
            .value(intent.value)
            .chain_id(chain_id);
        self.provider
            .estimate_gas(&TypedTransaction::Eip1559(request), None)
            .await
            .map_err(|e| rpc_error("eth_estimateGas", e))
    }

    async fn fee_data(&self) -> AdapterResult<FeeData> {
        let (max_fee_per_gas, max_priority_fee_per_gas) = self
            .provider
            .estimate_eip1559_fees(None)
            .await
            .map_err(|e| rpc_error("fee history", e))?;
        Ok(FeeData {
            max_fee_per_gas,
            max_priority_fee_per_gas,
        })
    }

    async fn transaction_receipt(&self, hash: H256) -> AdapterResult<Option<TransactionReceipt>> {
        self.provider
            .get_transaction_receipt(hash)
            .await
            .map_err(|e| rpc_error("eth_getTransactionReceipt", e))
    }

    async fn block_number(&self) -> AdapterResult<u64> {
        let number = self
            .provider
            .get_block_number()
            .await
            .map_err(|e| rpc_error("eth_blockNumber", e))?;
        Ok(number.as_u64())
    }

    async fn call(&self, to: Address, data: Bytes) -> AdapterResult<Bytes> {
        let request = Eip1559TransactionRequest::new().to(to).data(data);
        self.provider
            .call(&TypedTransaction::Eip1559(request), None)
            .await
            .map_err(|e| rpc_error("eth_call", e))
    }

    async fn logs(&self, filter: &Filter) -> AdapterResult<Vec<Log>> {
        self.provider
            .get_logs(filter)
            .await
            .map_err(|e| rpc_error("eth_getLogs", e))
    }

    async fn block_send_count(&self, block_hash: H256) -> AdapterResult<Option<u64>> {
        let block = self
            .provider
            .get_block(block_hash)
            .await
            .map_err(|e| rpc_error("eth_getBlockByHash", e))?;
        let Some(block) = block else {
            return Ok(None);
        };
        let send_count = block
            .other
            .get("sendCount")
            .and_then(|value| value.as_str())
            .and_then(|raw| u64::from_str_radix(raw.trim_start_matches("0x"), 16).ok());
        Ok(send_count)
    }

    async fn send_raw_transaction(&self, raw: Bytes) -> AdapterResult<H256> {
        let pending = self
            .provider
            .send_raw_transaction(raw)
            .await
            .map_err(|e| rpc_error("eth_sendRawTransaction", e))?;
        Ok(*pending)
    }
}

/// Per-chain RPC handles, keyed by chain name.
#[derive(Clone, Default)]
pub struct ChainClients {
    clients: HashMap<String, Arc<dyn ChainRpc>>,
}

impl ChainClients {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn connect(registry: &ChainRegistry) -> AdapterResult<Self> {
        let mut clients = Self::new();
        for chain in registry.all() {
            clients.insert(&chain.name, Arc::new(EthersRpc::connect(&chain.rpc_url)?));
        }
        Ok(clients)
    }

    pub fn insert(&mut self, chain_name: &str, rpc: Arc<dyn ChainRpc>) {
        self.clients.insert(chain_name.to_string(), rpc);
    }

    pub fn with(mut self, chain_name: &str, rpc: Arc<dyn ChainRpc>) -> Self {
        self.insert(chain_name, rpc);
        self
    }

    pub fn get(&self, chain: &ChainConfig) -> AdapterResult<Arc<dyn ChainRpc>> {
        self.clients
            .get(&chain.name)
            .cloned()
            .ok_or_else(|| BridgeError::Config(format!("no rpc client for chain {}", chain.name)))
    }
}
