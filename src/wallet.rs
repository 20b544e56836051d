use crate::error::AgentError;
use bridge_adapters::units::is_native_token;
use bridge_adapters::ChainRpc;
use domain::{ChainConfig, UnsignedTransaction};
use ethers_contract::Contract;
use ethers_core::abi::AbiParser;
use ethers_core::types::{Address, Bytes, H256, U256};
use ethers_core::utils::keccak256;
use ethers_providers::{Http, Middleware, Provider};
use ethers_signers::{LocalWallet, Signer};
use log::info;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Submission {
    pub hash: H256,
    pub broadcast: bool,
}

/// Signs finalized bridge transactions; the adapters never see the key.
pub struct AgentWallet {
    wallet: LocalWallet,
    dry_run: bool,
}

impl AgentWallet {
    pub fn new(wallet: LocalWallet, dry_run: bool) -> Self {
        Self { wallet, dry_run }
    }

    pub fn address(&self) -> Address {
        self.wallet.address()
    }

    pub async fn sign(&self, tx: &UnsignedTransaction) -> Result<Bytes, AgentError> {
        if tx.from != self.address() {
            return Err(AgentError::Wallet(format!(
                "transaction is from {:?}, wallet is {:?}",
                tx.from,
                self.address()
            )));
        }
        let typed = tx.to_typed();
        let signature = self
            .wallet
            .clone()
            .with_chain_id(tx.chain_id)
            .sign_transaction(&typed)
            .await
            .map_err(|e| AgentError::Wallet(e.to_string()))?;
        Ok(typed.rlp_signed(&signature))
    }

    /// Signs and, unless running dry, broadcasts. The returned hash is the
    /// signed payload's hash either way.
    pub async fn submit(
        &self,
        rpc: &dyn ChainRpc,
        tx: &UnsignedTransaction,
    ) -> Result<Submission, AgentError> {
        let raw = self.sign(tx).await?;
        let hash = H256::from(keccak256(&raw));
        if self.dry_run {
            info!(
                "[DRY RUN] Would broadcast tx={:?} chain_id={} nonce={} to={:?}",
                hash, tx.chain_id, tx.nonce, tx.to
            );
            return Ok(Submission {
                hash,
                broadcast: false,
            });
        }
        let sent = rpc.send_raw_transaction(raw).await?;
        info!("Broadcast tx={:?} chain_id={} nonce={}", sent, tx.chain_id, tx.nonce);
        Ok(Submission {
            hash: sent,
            broadcast: true,
        })
    }

    /// Native or ERC-20 balance of the wallet on `chain`.
    pub async fn balance(&self, chain: &ChainConfig, token: Address) -> Result<U256, AgentError> {
        let provider = Provider::<Http>::try_from(chain.rpc_url.as_str())
            .map_err(|e| AgentError::Config(e.to_string()))?;
        if is_native_token(token) {
            return provider
                .get_balance(self.address(), None)
                .await
                .map_err(|e| AgentError::Wallet(e.to_string()));
        }
        let abi = AbiParser::default()
            .parse_str("function balanceOf(address) view returns (uint256)")
            .map_err(|e| AgentError::Wallet(e.to_string()))?;
        let contract = Contract::new(token, abi, Arc::new(provider));
        contract
            .method::<_, U256>("balanceOf", self.address())
            .map_err(|e| AgentError::Wallet(e.to_string()))?
            .call()
            .await
            .map_err(|e| AgentError::Wallet(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use bridge_adapters::EthersRpc;
    use domain::EIP1559_TX_TYPE;
    use ethers_core::types::transaction::eip2718::TypedTransaction;
    use ethers_core::utils::rlp::Rlp;

    const KEY: &str = "4c0883a69102937d6231471b5dbb6204fe5129617082792ae468d01a3f362318";

    fn wallet() -> AgentWallet {
        AgentWallet::new(KEY.parse().unwrap(), true)
    }

    fn unsigned(from: Address) -> UnsignedTransaction {
        UnsignedTransaction {
            from,
            to: Address::repeat_byte(0x22),
            data: Bytes::from(vec![0xde, 0xad, 0xbe, 0xef]),
            value: U256::from(1_000u64),
            chain_id: 421614,
            nonce: U256::from(3u64),
            gas_limit: U256::from(60_000u64),
            max_fee_per_gas: U256::from(30_000_000_000u64),
            max_priority_fee_per_gas: U256::from(1_000_000_000u64),
            tx_type: EIP1559_TX_TYPE,
        }
    }

    #[tokio::test]
    async fn signed_payload_is_typed_and_recovers_to_wallet() {
        let wallet = wallet();
        let tx = unsigned(wallet.address());
        let raw = wallet.sign(&tx).await.unwrap();
        assert_eq!(raw[0], EIP1559_TX_TYPE);

        let (decoded, signature) = TypedTransaction::decode_signed(&Rlp::new(&raw)).unwrap();
        assert_eq!(decoded.chain_id(), Some(421614u64.into()));
        assert_eq!(decoded.nonce(), Some(&U256::from(3u64)));
        assert_eq!(signature.recover(decoded.sighash()).unwrap(), wallet.address());
    }

    #[tokio::test]
    async fn foreign_sender_is_refused() {
        let tx = unsigned(Address::repeat_byte(0x99));
        assert_matches!(wallet().sign(&tx).await, Err(AgentError::Wallet(_)));
    }

    #[tokio::test]
    async fn dry_run_never_touches_the_chain() {
        let wallet = wallet();
        let tx = unsigned(wallet.address());
        let rpc = EthersRpc::connect("http://127.0.0.1:1").unwrap();
        let submission = wallet.submit(&rpc, &tx).await.unwrap();
        assert!(!submission.broadcast);
        let raw = wallet.sign(&tx).await.unwrap();
        assert_eq!(submission.hash, H256::from(keccak256(&raw)));
    }
}
