use chrono::{DateTime, Utc};
use ethers_core::types::transaction::eip2718::TypedTransaction;
use ethers_core::types::{Address, Bytes, Eip1559TransactionRequest, H256, U256};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

pub const EIP1559_TX_TYPE: u8 = 2;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum BridgeVendor {
    ArbitrumNative,
    Across,
    Relay,
    Meson,
    Cctp,
}

impl BridgeVendor {
    pub const ALL: [BridgeVendor; 5] = [
        BridgeVendor::ArbitrumNative,
        BridgeVendor::Across,
        BridgeVendor::Relay,
        BridgeVendor::Meson,
        BridgeVendor::Cctp,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::ArbitrumNative => "arbitrum_native",
            Self::Across => "across",
            Self::Relay => "relay",
            Self::Meson => "meson",
            Self::Cctp => "cctp",
        }
    }
}

impl fmt::Display for BridgeVendor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BridgeVendor {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace([' ', '-'], "_");
        match normalized.as_str() {
            "arbitrum_native" | "arb_native_bridge" | "arbitrum" | "arb_native" => {
                Ok(Self::ArbitrumNative)
            }
            "across" | "across_bridge" => Ok(Self::Across),
            "relay" | "relay_bridge" => Ok(Self::Relay),
            "meson" | "meson_bridge" => Ok(Self::Meson),
            "cctp" | "cctp_bridge" | "cctp_testnet_bridge" => Ok(Self::Cctp),
            _ => Err(s.to_string()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TokenConfig {
    pub symbol: String,
    pub address: Address,
    pub decimals: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChainConfig {
    pub name: String,
    pub chain_id: u64,
    pub rpc_url: String,
    /// Burn/mint messaging domain of this chain, when it has one.
    #[serde(default)]
    pub domain_id: Option<u32>,
    #[serde(default)]
    pub meson_slug: Option<String>,
    #[serde(default = "default_native_symbol")]
    pub native_symbol: String,
    #[serde(default)]
    pub tokens: Vec<TokenConfig>,
}

fn default_native_symbol() -> String {
    "eth".to_string()
}

impl ChainConfig {
    pub fn token(&self, address: Address) -> Option<&TokenConfig> {
        self.tokens.iter().find(|token| token.address == address)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum FinalityMode {
    Fast,
    #[default]
    Standard,
}

impl FinalityMode {
    pub fn threshold(self) -> u32 {
        match self {
            Self::Fast => 1000,
            Self::Standard => 2000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SourceToken {
    pub address: String,
    pub amount: String,
    #[serde(default)]
    pub decimals: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DestinationToken {
    pub address: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BridgeRequest {
    pub user_address: String,
    pub origin_chain: String,
    pub destination_chain: String,
    pub source_token: SourceToken,
    pub destination_token: DestinationToken,
    #[serde(default)]
    pub integrator_id: Option<String>,
    #[serde(default)]
    pub recipient_address: Option<String>,
    #[serde(default)]
    pub finality: Option<FinalityMode>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TransactionIntent {
    pub from: Address,
    pub to: Address,
    #[serde(default)]
    pub data: Bytes,
    #[serde(default)]
    pub value: U256,
    #[serde(default)]
    pub gas_limit: Option<U256>,
}

impl TransactionIntent {
    pub fn call(from: Address, to: Address, data: impl Into<Bytes>) -> Self {
        Self {
            from,
            to,
            data: data.into(),
            value: U256::zero(),
            gas_limit: None,
        }
    }

    pub fn with_value(mut self, value: U256) -> Self {
        self.value = value;
        self
    }

    pub fn with_gas_limit(mut self, gas_limit: Option<U256>) -> Self {
        self.gas_limit = gas_limit;
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UnsignedTransaction {
    pub from: Address,
    pub to: Address,
    pub data: Bytes,
    pub value: U256,
    pub chain_id: u64,
    pub nonce: U256,
    pub gas_limit: U256,
    pub max_fee_per_gas: U256,
    pub max_priority_fee_per_gas: U256,
    #[serde(rename = "type")]
    pub tx_type: u8,
}

impl UnsignedTransaction {
    pub fn to_typed(&self) -> TypedTransaction {
        let request = Eip1559TransactionRequest::new()
            .from(self.from)
            .to(self.to)
            .data(self.data.clone())
            .value(self.value)
            .chain_id(self.chain_id)
            .nonce(self.nonce)
            .gas(self.gas_limit)
            .max_fee_per_gas(self.max_fee_per_gas)
            .max_priority_fee_per_gas(self.max_priority_fee_per_gas);
        TypedTransaction::Eip1559(request)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BridgeQuote {
    pub quote_id: Uuid,
    pub vendor: BridgeVendor,
    pub origin_chain: String,
    pub destination_chain: String,
    pub source_amount: U256,
    pub destination_amount: Option<U256>,
    #[serde(default)]
    pub fees: IndexMap<String, String>,
    /// Execution order; step N may depend on state produced by step N-1.
    pub transactions: Vec<UnsignedTransaction>,
    pub request_id: Option<String>,
    pub bridge_address: Option<Address>,
    pub needs_manual_claim: bool,
    pub lock_period_secs: u64,
    pub quoted_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BridgeStatus {
    Pending,
    Success,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ClaimProof {
    Outbox {
        proof: Vec<H256>,
        position: U256,
        caller: Address,
        destination: Address,
        arb_block_num: U256,
        eth_block_num: U256,
        timestamp: U256,
        callvalue: U256,
        data: Bytes,
    },
    Attestation {
        message: Bytes,
        attestation: Bytes,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BridgeResult {
    pub status: BridgeStatus,
    pub claimed: bool,
    pub claimable: bool,
    #[serde(default)]
    pub proof: Option<ClaimProof>,
    pub message: String,
    #[serde(default)]
    pub ready_at_block: Option<u64>,
    pub checked_at: DateTime<Utc>,
}

impl BridgeResult {
    fn with_state(status: BridgeStatus, claimed: bool, message: impl Into<String>) -> Self {
        Self {
            status,
            claimed,
            claimable: false,
            proof: None,
            message: message.into(),
            ready_at_block: None,
            checked_at: Utc::now(),
        }
    }

    pub fn pending(message: impl Into<String>) -> Self {
        Self::with_state(BridgeStatus::Pending, false, message)
    }

    /// Funds delivered, either by the vendor or by an executed claim.
    pub fn settled(message: impl Into<String>) -> Self {
        Self::with_state(BridgeStatus::Success, true, message)
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self::with_state(BridgeStatus::Failed, false, message)
    }

    pub fn claimable(proof: ClaimProof, message: impl Into<String>) -> Self {
        let mut result = Self::with_state(BridgeStatus::Pending, false, message);
        result.claimable = true;
        result.proof = Some(proof);
        result
    }

    pub fn ready_at(mut self, block: u64) -> Self {
        self.ready_at_block = Some(block);
        self
    }

    pub fn is_terminal(&self) -> bool {
        self.status != BridgeStatus::Pending || self.claimable
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BridgeReference {
    #[serde(default)]
    pub transaction_hash: Option<H256>,
    #[serde(default)]
    pub request_id: Option<String>,
    pub origin_chain: String,
    pub destination_chain: String,
    #[serde(default)]
    pub user_address: Option<Address>,
    #[serde(default)]
    pub proof: Option<ClaimProof>,
}

impl BridgeReference {
    pub fn by_hash(hash: H256, origin_chain: &str, destination_chain: &str) -> Self {
        Self {
            transaction_hash: Some(hash),
            request_id: None,
            origin_chain: origin_chain.to_string(),
            destination_chain: destination_chain.to_string(),
            user_address: None,
            proof: None,
        }
    }

    pub fn with_request_id(mut self, request_id: Option<String>) -> Self {
        self.request_id = request_id;
        self
    }

    pub fn with_user(mut self, user: Address) -> Self {
        self.user_address = Some(user);
        self
    }

    pub fn with_proof(mut self, proof: Option<ClaimProof>) -> Self {
        self.proof = proof;
        self
    }
}
