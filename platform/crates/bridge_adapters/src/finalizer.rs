use crate::config::FinalizerConfig;
use crate::error::{AdapterResult, BridgeError};
use crate::rpc::{ChainClients, ChainRpc, FeeData};
use domain::{ChainConfig, TransactionIntent, UnsignedTransaction, EIP1559_TX_TYPE};
use ethers_core::types::{Address, U256};
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccountState {
    pub nonce: U256,
    pub fees: FeeData,
}

#[derive(Clone)]
pub struct TransactionFinalizer {
    clients: ChainClients,
    config: FinalizerConfig,
}

impl TransactionFinalizer {
    pub fn new(clients: ChainClients, config: FinalizerConfig) -> Self {
        Self { clients, config }
    }

    pub async fn finalize(
        &self,
        intent: &TransactionIntent,
        chain: &ChainConfig,
    ) -> AdapterResult<UnsignedTransaction> {
        let rpc = self.clients.get(chain)?;
        let (state, gas_limit) = tokio::join!(
            self.account_state(intent.from, chain),
            self.gas_limit(rpc.as_ref(), intent, chain),
        );
        Ok(self.assemble(intent, chain, state?, gas_limit))
    }

    /// Nonce and fee data of `from` on `chain`. Callers that need other chain
    /// reads before the intent exists can run this alongside them and finish
    /// with [`finalize_with`](Self::finalize_with).
    pub async fn account_state(&self, from: Address, chain: &ChainConfig) -> AdapterResult<AccountState> {
        let rpc = self.clients.get(chain)?;
        let (nonce, fees) = tokio::join!(rpc.transaction_count(from), rpc.fee_data());
        let nonce = nonce.map_err(|e| {
            BridgeError::Finalization(format!("nonce lookup on {} failed: {e}", chain.name))
        })?;
        let fees = fees.map_err(|e| {
            BridgeError::Finalization(format!("fee data on {} failed: {e}", chain.name))
        })?;
        Ok(AccountState { nonce, fees })
    }

    pub async fn finalize_with(
        &self,
        intent: &TransactionIntent,
        chain: &ChainConfig,
        state: AccountState,
    ) -> AdapterResult<UnsignedTransaction> {
        let rpc = self.clients.get(chain)?;
        let gas_limit = self.gas_limit(rpc.as_ref(), intent, chain).await;
        Ok(self.assemble(intent, chain, state, gas_limit))
    }

    fn assemble(
        &self,
        intent: &TransactionIntent,
        chain: &ChainConfig,
        state: AccountState,
        gas_limit: U256,
    ) -> UnsignedTransaction {
        debug!(
            target: "bridge_adapters",
            chain = %chain.name,
            nonce = %state.nonce,
            %gas_limit,
            max_fee = %state.fees.max_fee_per_gas,
            "finalized transaction"
        );
        UnsignedTransaction {
            from: intent.from,
            to: intent.to,
            data: intent.data.clone(),
            value: intent.value,
            chain_id: chain.chain_id,
            nonce: state.nonce,
            gas_limit,
            max_fee_per_gas: state.fees.max_fee_per_gas,
            max_priority_fee_per_gas: state.fees.max_priority_fee_per_gas,
            tx_type: EIP1559_TX_TYPE,
        }
    }

    /// Finalizes steps in order. Nothing is broadcast in between, so step `i`
    /// takes the first step's nonce plus `i`.
    pub async fn finalize_sequence(
        &self,
        intents: &[TransactionIntent],
        chain: &ChainConfig,
    ) -> AdapterResult<Vec<UnsignedTransaction>> {
        let mut finalized: Vec<UnsignedTransaction> = Vec::with_capacity(intents.len());
        for (index, intent) in intents.iter().enumerate() {
            let mut tx = self.finalize(intent, chain).await?;
            if let Some(first) = finalized.first() {
                tx.nonce = first.nonce + U256::from(index);
            }
            finalized.push(tx);
        }
        Ok(finalized)
    }

    async fn gas_limit(
        &self,
        rpc: &dyn ChainRpc,
        intent: &TransactionIntent,
        chain: &ChainConfig,
    ) -> U256 {
        if let Some(gas_limit) = intent.gas_limit {
            return gas_limit;
        }
        match rpc.estimate_gas(intent, chain.chain_id).await {
            Ok(estimate) => {
                estimate * U256::from(self.config.gas_limit_multiplier_bps) / U256::from(10_000u64)
            }
            Err(err) => {
                warn!(
                    target: "bridge_adapters",
                    chain = %chain.name,
                    error = %err,
                    default = self.config.default_gas_limit,
                    "gas estimation failed, using default gas limit"
                );
                U256::from(self.config.default_gas_limit)
            }
        }
    }
}
