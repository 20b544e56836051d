use crate::error::AgentError;
use bridge_adapters::units::NATIVE_PLACEHOLDER;
use domain::{BridgeRequest, DestinationToken, FinalityMode, SourceToken};
use ethers_core::types::Address;
use ethers_signers::LocalWallet;
use std::env;

#[derive(Clone, Debug)]
pub struct AgentConfig {
    pub private_key: Option<String>,
    pub vendor: String,
    pub origin_chain: String,
    pub destination_chain: String,
    pub source_token: String,
    pub destination_token: String,
    pub amount: String,
    pub decimals: Option<u32>,
    pub finality: Option<FinalityMode>,
    pub integrator_id: Option<String>,
    pub recipient: Option<String>,
    /// Sign everything but never broadcast.
    pub dry_run: bool,
    pub poll_interval_secs: u64,
    pub poll_max_attempts: u32,
}

impl AgentConfig {
    pub fn from_env() -> Result<Self, AgentError> {
        let native = format!("{NATIVE_PLACEHOLDER:?}");
        let finality = env_opt("BRIDGE_FINALITY")
            .map(|raw| parse_finality(&raw))
            .transpose()?;
        let decimals = env_opt("BRIDGE_DECIMALS")
            .map(|raw| {
                raw.parse::<u32>()
                    .map_err(|_| AgentError::Config(format!("BRIDGE_DECIMALS is not a number: {raw}")))
            })
            .transpose()?;

        Ok(Self {
            private_key: env_opt("PRIVATE_KEY"),
            vendor: env_opt("BRIDGE_VENDOR").unwrap_or_else(|| "across".to_string()),
            origin_chain: env_opt("BRIDGE_ORIGIN_CHAIN").unwrap_or_else(|| "arb_sepolia".to_string()),
            destination_chain: env_opt("BRIDGE_DESTINATION_CHAIN")
                .unwrap_or_else(|| "eth_sepolia".to_string()),
            source_token: env_opt("BRIDGE_SOURCE_TOKEN").unwrap_or_else(|| native.clone()),
            destination_token: env_opt("BRIDGE_DESTINATION_TOKEN").unwrap_or(native),
            amount: env_opt("BRIDGE_AMOUNT").unwrap_or_else(|| "0.0001".to_string()),
            decimals,
            finality,
            integrator_id: env_opt("BRIDGE_INTEGRATOR_ID"),
            recipient: env_opt("BRIDGE_RECIPIENT"),
            dry_run: env_bool("DRY_RUN", true),
            poll_interval_secs: env_u64("POLL_INTERVAL_SECS", 30),
            poll_max_attempts: env_u32("POLL_MAX_ATTEMPTS", 40),
        })
    }

    pub fn wallet(&self) -> Result<LocalWallet, AgentError> {
        let key = self
            .private_key
            .as_deref()
            .ok_or_else(|| AgentError::Config("PRIVATE_KEY is required to sign".to_string()))?;
        key.trim_start_matches("0x")
            .parse::<LocalWallet>()
            .map_err(|e| AgentError::Wallet(e.to_string()))
    }

    pub fn bridge_request(&self, user: Address) -> BridgeRequest {
        BridgeRequest {
            user_address: format!("{user:?}"),
            origin_chain: self.origin_chain.clone(),
            destination_chain: self.destination_chain.clone(),
            source_token: SourceToken {
                address: self.source_token.clone(),
                amount: self.amount.clone(),
                decimals: self.decimals,
            },
            destination_token: DestinationToken {
                address: self.destination_token.clone(),
            },
            integrator_id: self.integrator_id.clone(),
            recipient_address: self.recipient.clone(),
            finality: self.finality,
        }
    }
}

fn parse_finality(raw: &str) -> Result<FinalityMode, AgentError> {
    match raw.trim().to_lowercase().as_str() {
        "fast" | "1000" => Ok(FinalityMode::Fast),
        "standard" | "2000" => Ok(FinalityMode::Standard),
        other => Err(AgentError::Config(format!("unknown BRIDGE_FINALITY: {other}"))),
    }
}

fn env_bool(key: &str, default: bool) -> bool {
    match env::var(key).ok().as_deref() {
        Some("1") | Some("true") | Some("TRUE") | Some("yes") | Some("YES") => true,
        Some("0") | Some("false") | Some("FALSE") | Some("no") | Some("NO") => false,
        _ => default,
    }
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().and_then(|value| normalize_env_value(&value))
}

fn normalize_env_value(input: &str) -> Option<String> {
    let value = input.trim().trim_matches('"').trim_matches('\'').trim();
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

fn env_u64(key: &str, default: u64) -> u64 {
    env::var(key)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(default)
}

fn env_u32(key: &str, default: u32) -> u32 {
    env::var(key)
        .ok()
        .and_then(|v| v.parse::<u32>().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn base_config() -> AgentConfig {
        AgentConfig {
            private_key: None,
            vendor: "across".to_string(),
            origin_chain: "arb_sepolia".to_string(),
            destination_chain: "eth_sepolia".to_string(),
            source_token: "0x75faf114eafb1bdbe2f0316df893fd58ce46aa4d".to_string(),
            destination_token: "0x1c7d4b196cb0c7b01d743fbc6116a902379c7238".to_string(),
            amount: "1.0".to_string(),
            decimals: Some(6),
            finality: Some(FinalityMode::Fast),
            integrator_id: None,
            recipient: None,
            dry_run: true,
            poll_interval_secs: 1,
            poll_max_attempts: 2,
        }
    }

    #[test]
    fn finality_accepts_names_and_thresholds() {
        assert_eq!(parse_finality("fast").unwrap(), FinalityMode::Fast);
        assert_eq!(parse_finality(" Standard ").unwrap(), FinalityMode::Standard);
        assert_eq!(parse_finality("1000").unwrap(), FinalityMode::Fast);
        assert_matches!(parse_finality("instant"), Err(AgentError::Config(_)));
    }

    #[test]
    fn env_values_are_unquoted() {
        assert_eq!(normalize_env_value(" \"cctp\" "), Some("cctp".to_string()));
        assert_eq!(normalize_env_value("''"), None);
    }

    #[test]
    fn request_carries_wallet_address_and_raw_amount() {
        let user = Address::repeat_byte(0x11);
        let request = base_config().bridge_request(user);
        assert_eq!(request.user_address, format!("{user:?}"));
        assert_eq!(request.source_token.amount, "1.0");
        assert_eq!(request.source_token.decimals, Some(6));
        assert_eq!(request.finality, Some(FinalityMode::Fast));
        assert_eq!(request.recipient_address, None);
    }

    #[test]
    fn wallet_requires_a_key() {
        assert_matches!(base_config().wallet(), Err(AgentError::Config(_)));
        let mut config = base_config();
        config.private_key =
            Some("0x4c0883a69102937d6231471b5dbb6204fe5129617082792ae468d01a3f362318".to_string());
        assert!(config.wallet().is_ok());
    }
}
