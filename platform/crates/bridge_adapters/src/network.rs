use crate::config::NetworkConfig;
use crate::context::BridgeContext;
use crate::error::AdapterResult;
use crate::rpc::FeeData;
use crate::units::to_decimal_string;
use chrono::{DateTime, Utc};
use domain::ChainConfig;
use ethers_core::types::U256;
use futures::future::join_all;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::{debug, warn};

const GWEI_DECIMALS: u32 = 9;

/// Suggested max fee per gas in gwei, scaled from the chain's current estimate.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct GasPrices {
    pub slow: String,
    pub standard: String,
    pub fast: String,
    pub instant: String,
}

impl GasPrices {
    fn from_fees(fees: &FeeData) -> AdapterResult<Self> {
        let tier = |bps: u64| {
            let scaled = fees.max_fee_per_gas.saturating_mul(U256::from(bps)) / U256::from(10_000u64);
            to_decimal_string(scaled, GWEI_DECIMALS)
        };
        Ok(Self {
            slow: tier(10_000)?,
            standard: tier(11_000)?,
            fast: tier(12_000)?,
            instant: tier(15_000)?,
        })
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct NetworkStatus {
    pub chain: String,
    pub chain_id: u64,
    pub healthy: bool,
    pub block_number: Option<u64>,
    pub gas: Option<GasPrices>,
    pub latency_ms: Option<u128>,
    pub error: Option<String>,
    pub checked_at: DateTime<Utc>,
}

impl NetworkStatus {
    fn unhealthy(chain: &ChainConfig, error: String) -> Self {
        Self {
            chain: chain.name.clone(),
            chain_id: chain.chain_id,
            healthy: false,
            block_number: None,
            gas: None,
            latency_ms: None,
            error: Some(error),
            checked_at: Utc::now(),
        }
    }
}

struct Cached<T> {
    value: T,
    stored_at: Instant,
}

type Cache<T> = Arc<RwLock<HashMap<String, Cached<T>>>>;

async fn fresh<T: Clone>(cache: &Cache<T>, key: &str, ttl: Duration) -> Option<T> {
    let guard = cache.read().await;
    guard
        .get(key)
        .filter(|entry| entry.stored_at.elapsed() < ttl)
        .map(|entry| entry.value.clone())
}

async fn store<T>(cache: &Cache<T>, key: &str, value: T) {
    cache.write().await.insert(
        key.to_string(),
        Cached {
            value,
            stored_at: Instant::now(),
        },
    );
}

/// Liveness and gas price reads across the registry. Only successful reads
/// are cached, so a failing chain is read again on the next request.
#[derive(Clone)]
pub struct NetworkMonitor {
    ctx: BridgeContext,
    gas_ttl: Duration,
    status_ttl: Duration,
    gas: Cache<GasPrices>,
    status: Cache<NetworkStatus>,
}

impl NetworkMonitor {
    pub fn new(ctx: BridgeContext, config: &NetworkConfig) -> Self {
        Self {
            ctx,
            gas_ttl: Duration::from_secs(config.gas_cache_secs),
            status_ttl: Duration::from_secs(config.status_cache_secs),
            gas: Arc::default(),
            status: Arc::default(),
        }
    }

    pub async fn gas_prices(&self, name_or_id: &str) -> AdapterResult<GasPrices> {
        let chain = self.ctx.chain(name_or_id)?;
        if let Some(prices) = fresh(&self.gas, &chain.name, self.gas_ttl).await {
            return Ok(prices);
        }
        let fees = self.ctx.rpc(chain)?.fee_data().await?;
        let prices = GasPrices::from_fees(&fees)?;
        store(&self.gas, &chain.name, prices.clone()).await;
        Ok(prices)
    }

    pub async fn status(&self, name_or_id: &str) -> AdapterResult<NetworkStatus> {
        let chain = self.ctx.chain(name_or_id)?;
        Ok(self.chain_status(chain).await)
    }

    /// Every configured chain, read concurrently, ordered by name.
    pub async fn all_status(&self) -> Vec<NetworkStatus> {
        let chains = self.ctx.registry.all();
        join_all(chains.into_iter().map(|chain| self.chain_status(chain))).await
    }

    async fn chain_status(&self, chain: &ChainConfig) -> NetworkStatus {
        if let Some(status) = fresh(&self.status, &chain.name, self.status_ttl).await {
            return status;
        }
        let started = Instant::now();
        match self.read_chain(chain).await {
            Ok((block_number, gas)) => {
                let status = NetworkStatus {
                    chain: chain.name.clone(),
                    chain_id: chain.chain_id,
                    healthy: true,
                    block_number: Some(block_number),
                    gas: Some(gas.clone()),
                    latency_ms: Some(started.elapsed().as_millis()),
                    error: None,
                    checked_at: Utc::now(),
                };
                debug!(target: "bridge_adapters", chain = %chain.name, block_number, "network status");
                store(&self.gas, &chain.name, gas).await;
                store(&self.status, &chain.name, status.clone()).await;
                status
            }
            Err(err) => {
                warn!(target: "bridge_adapters", chain = %chain.name, error = %err, "network status read failed");
                NetworkStatus::unhealthy(chain, err.to_string())
            }
        }
    }

    async fn read_chain(&self, chain: &ChainConfig) -> AdapterResult<(u64, GasPrices)> {
        let rpc = self.ctx.rpc(chain)?;
        let (block_number, fees) = tokio::join!(rpc.block_number(), rpc.fee_data());
        Ok((block_number?, GasPrices::from_fees(&fees?)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BridgeError;
    use crate::test_utils::{context_with, MockRpc};
    use assert_matches::assert_matches;

    fn monitor(arb: Arc<MockRpc>, eth: Arc<MockRpc>, ttl_secs: u64) -> NetworkMonitor {
        let config = NetworkConfig {
            gas_cache_secs: ttl_secs,
            status_cache_secs: ttl_secs,
        };
        NetworkMonitor::new(context_with(arb, eth), &config)
    }

    #[tokio::test]
    async fn gas_tiers_scale_the_current_max_fee() {
        let arb = Arc::new(MockRpc::healthy());
        let prices = monitor(arb, Arc::new(MockRpc::healthy()), 60)
            .gas_prices("421614")
            .await
            .unwrap();
        assert_eq!(prices.slow, "30");
        assert_eq!(prices.standard, "33");
        assert_eq!(prices.fast, "36");
        assert_eq!(prices.instant, "45");
    }

    #[tokio::test]
    async fn gas_reads_are_cached_within_the_window() {
        let arb = Arc::new(MockRpc::healthy());
        let cached = monitor(arb.clone(), Arc::new(MockRpc::healthy()), 60);
        cached.gas_prices("arb_sepolia").await.unwrap();
        cached.gas_prices("arb_sepolia").await.unwrap();
        assert_eq!(arb.fee_read_count(), 1);

        let uncached = monitor(arb.clone(), Arc::new(MockRpc::healthy()), 0);
        uncached.gas_prices("arb_sepolia").await.unwrap();
        uncached.gas_prices("arb_sepolia").await.unwrap();
        assert_eq!(arb.fee_read_count(), 3);
    }

    #[tokio::test]
    async fn all_status_reports_each_chain_and_retries_failures() {
        let arb = Arc::new(MockRpc::healthy().at_block(4_242));
        let eth = Arc::new(MockRpc::healthy().failing_fee_data());
        let monitor = monitor(arb.clone(), eth.clone(), 60);

        let statuses = monitor.all_status().await;
        assert_eq!(statuses.len(), 2);
        assert_eq!(statuses[0].chain, "arb_sepolia");
        assert!(statuses[0].healthy);
        assert_eq!(statuses[0].block_number, Some(4_242));
        assert_eq!(statuses[0].gas.as_ref().map(|g| g.slow.as_str()), Some("30"));
        assert_eq!(statuses[1].chain, "eth_sepolia");
        assert!(!statuses[1].healthy);
        assert!(statuses[1].error.is_some());

        monitor.all_status().await;
        assert_eq!(arb.fee_read_count(), 1);
        assert_eq!(eth.fee_read_count(), 2);

        monitor.gas_prices("arb_sepolia").await.unwrap();
        assert_eq!(arb.fee_read_count(), 1);
    }

    #[tokio::test]
    async fn unknown_chain_is_a_resolution_error() {
        let monitor = monitor(Arc::new(MockRpc::healthy()), Arc::new(MockRpc::healthy()), 60);
        assert_matches!(monitor.status("polygon").await, Err(BridgeError::UnknownChain(_)));
        assert_matches!(monitor.gas_prices("polygon").await, Err(BridgeError::UnknownChain(_)));
    }
}
