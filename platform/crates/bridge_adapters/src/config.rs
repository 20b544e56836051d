use crate::error::{AdapterResult, BridgeError};
use domain::ChainConfig;
use ethers_core::types::{Address, U256};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::HashMap;
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VendorEndpoints {
    #[serde(default = "default_across_base_url")]
    pub across_base_url: String,
    #[serde(default = "default_relay_base_url")]
    pub relay_base_url: String,
    #[serde(default = "default_meson_base_url")]
    pub meson_base_url: String,
}

fn default_across_base_url() -> String {
    "https://across.to/api/v2".to_string()
}

fn default_relay_base_url() -> String {
    "https://api.testnets.relay.link".to_string()
}

fn default_meson_base_url() -> String {
    "https://testnet-relayer.meson.fi/api/v1".to_string()
}

impl Default for VendorEndpoints {
    fn default() -> Self {
        Self {
            across_base_url: default_across_base_url(),
            relay_base_url: default_relay_base_url(),
            meson_base_url: default_meson_base_url(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CctpContracts {
    pub token_messenger: Address,
    pub message_transmitter: Address,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CctpConfig {
    pub attestation_base_url: String,
    /// Keyed by chain name.
    #[serde(default)]
    pub contracts: HashMap<String, CctpContracts>,
    #[serde(default = "default_fast_max_fee")]
    pub default_fast_max_fee: U256,
    #[serde(default = "default_fast_lock_period_secs")]
    pub fast_lock_period_secs: u64,
    #[serde(default = "default_standard_lock_period_secs")]
    pub standard_lock_period_secs: u64,
}

fn default_fast_max_fee() -> U256 {
    U256::from(100u64)
}

fn default_fast_lock_period_secs() -> u64 {
    20
}

fn default_standard_lock_period_secs() -> u64 {
    1140
}

impl CctpConfig {
    pub fn contracts_for(&self, chain: &str) -> AdapterResult<&CctpContracts> {
        self.contracts.get(chain).ok_or_else(|| {
            BridgeError::Validation(format!("cctp contracts are not configured for {chain}"))
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArbitrumConfig {
    pub l1_chain: String,
    pub l2_chain: String,
    pub inbox: Address,
    pub outbox: Address,
    pub rollup: Address,
    #[serde(default = "default_arb_sys")]
    pub arb_sys: Address,
    #[serde(default = "default_node_interface")]
    pub node_interface: Address,
    #[serde(default = "default_retryable_gas_limit")]
    pub retryable_gas_limit: u64,
    pub confirm_period_blocks: u64,
    #[serde(default = "default_confirmed_lookback_blocks")]
    pub confirmed_lookback_blocks: u64,
    #[serde(default = "default_ready_poll_interval_secs")]
    pub ready_poll_interval_secs: u64,
    #[serde(default = "default_ready_max_polls")]
    pub ready_max_polls: u32,
    #[serde(default = "default_withdrawal_lock_period_secs")]
    pub withdrawal_lock_period_secs: u64,
    #[serde(default = "default_deposit_lock_period_secs")]
    pub deposit_lock_period_secs: u64,
}

fn default_arb_sys() -> Address {
    Address::from_low_u64_be(0x64)
}

fn default_node_interface() -> Address {
    Address::from_low_u64_be(0xc8)
}

fn default_retryable_gas_limit() -> u64 {
    27514
}

fn default_confirmed_lookback_blocks() -> u64 {
    7200
}

fn default_ready_poll_interval_secs() -> u64 {
    20
}

fn default_ready_max_polls() -> u32 {
    3
}

fn default_withdrawal_lock_period_secs() -> u64 {
    604_800
}

fn default_deposit_lock_period_secs() -> u64 {
    900
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinalizerConfig {
    #[serde(default = "default_gas_limit")]
    pub default_gas_limit: u64,
    /// Applied to estimated gas only; 10000 leaves the estimate unchanged.
    #[serde(default = "default_gas_limit_multiplier_bps")]
    pub gas_limit_multiplier_bps: u64,
}

fn default_gas_limit() -> u64 {
    250_000
}

fn default_gas_limit_multiplier_bps() -> u64 {
    10_000
}

impl Default for FinalizerConfig {
    fn default() -> Self {
        Self {
            default_gas_limit: default_gas_limit(),
            gas_limit_multiplier_bps: default_gas_limit_multiplier_bps(),
        }
    }
}

/// Freshness windows for the per-chain status and gas price reads.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    #[serde(default = "default_gas_cache_secs")]
    pub gas_cache_secs: u64,
    #[serde(default = "default_status_cache_secs")]
    pub status_cache_secs: u64,
}

fn default_gas_cache_secs() -> u64 {
    60
}

fn default_status_cache_secs() -> u64 {
    120
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            gas_cache_secs: default_gas_cache_secs(),
            status_cache_secs: default_status_cache_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectorConfig {
    pub chains: Vec<ChainConfig>,
    #[serde(default)]
    pub endpoints: VendorEndpoints,
    pub cctp: CctpConfig,
    #[serde(default)]
    pub arbitrum: Option<ArbitrumConfig>,
    #[serde(default)]
    pub finalizer: FinalizerConfig,
    #[serde(default)]
    pub network: NetworkConfig,
    #[serde(default = "default_http_timeout_secs")]
    pub http_timeout_secs: u64,
}

fn default_http_timeout_secs() -> u64 {
    15
}

impl ConnectorConfig {
    pub fn from_json_file(path: impl AsRef<Path>) -> AdapterResult<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            BridgeError::Config(format!("cannot read {}: {e}", path.display()))
        })?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// `BRIDGE_CONFIG_PATH` when set, otherwise the Sepolia wiring with RPC
    /// endpoints taken from `ETH_SEPOLIA_RPC_URL`, `ARB_SEPOLIA_RPC_URL` and
    /// `BASE_SEPOLIA_RPC_URL`.
    pub fn from_env() -> AdapterResult<Self> {
        if let Ok(path) = std::env::var("BRIDGE_CONFIG_PATH") {
            return Self::from_json_file(path);
        }
        let rpc = |key: &str, default: &str| std::env::var(key).unwrap_or_else(|_| default.to_string());
        Self::sepolia_defaults(
            &rpc("ETH_SEPOLIA_RPC_URL", "https://ethereum-sepolia-rpc.publicnode.com"),
            &rpc("ARB_SEPOLIA_RPC_URL", "https://sepolia-rollup.arbitrum.io/rpc"),
            &rpc("BASE_SEPOLIA_RPC_URL", "https://sepolia.base.org"),
        )
    }

    /// Sepolia testnet wiring: Ethereum Sepolia, Arbitrum Sepolia and Base Sepolia.
    pub fn sepolia_defaults(
        eth_rpc_url: &str,
        arb_rpc_url: &str,
        base_rpc_url: &str,
    ) -> AdapterResult<Self> {
        let cctp_contracts = json!({
            "token_messenger": "0x8FE6B999Dc680CcFDD5Bf7EB0974218be2542DAA",
            "message_transmitter": "0xE737e5cEBEEBa77EFE34D4aa090756590b1CE275"
        });
        let value = json!({
            "chains": [
                {
                    "name": "eth_sepolia",
                    "chain_id": 11155111,
                    "rpc_url": eth_rpc_url,
                    "domain_id": 0,
                    "meson_slug": "sepolia",
                    "tokens": [{
                        "symbol": "usdc",
                        "address": "0x1c7d4b196cb0c7b01d743fbc6116a902379c7238",
                        "decimals": 6
                    }]
                },
                {
                    "name": "arb_sepolia",
                    "chain_id": 421614,
                    "rpc_url": arb_rpc_url,
                    "domain_id": 3,
                    "meson_slug": "arb-sepolia",
                    "tokens": [{
                        "symbol": "usdc",
                        "address": "0x75faf114eafb1bdbe2f0316df893fd58ce46aa4d",
                        "decimals": 6
                    }]
                },
                {
                    "name": "base_sepolia",
                    "chain_id": 84532,
                    "rpc_url": base_rpc_url,
                    "domain_id": 6,
                    "meson_slug": "base-sepolia",
                    "tokens": [{
                        "symbol": "usdc",
                        "address": "0x036CbD53842c5426634e7929541eC2318f3dCF7e",
                        "decimals": 6
                    }]
                }
            ],
            "cctp": {
                "attestation_base_url": "https://iris-api-sandbox.circle.com/v2",
                "contracts": {
                    "eth_sepolia": cctp_contracts,
                    "arb_sepolia": cctp_contracts,
                    "base_sepolia": cctp_contracts
                }
            },
            "arbitrum": {
                "l1_chain": "eth_sepolia",
                "l2_chain": "arb_sepolia",
                "inbox": "0xaAe29B0366299461418F5324a79Afc425BE5ae21",
                "outbox": "0x65f07C7D521164a4d5DaC6eB8Fac8DA067A3B78F",
                "rollup": "0x042B2E6C5E99d4c521bd49beeD5E99651D9B0Cf4",
                "confirm_period_blocks": 20
            }
        });
        Ok(serde_json::from_value(value)?)
    }
}
