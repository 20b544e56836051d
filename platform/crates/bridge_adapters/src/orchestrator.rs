use crate::config::ConnectorConfig;
use crate::context::BridgeContext;
use crate::error::{AdapterResult, BridgeError};
use crate::traits::BridgeAdapter;
use crate::venues::{AcrossAdapter, ArbitrumNativeAdapter, CctpAdapter, MesonAdapter, RelayAdapter};
use domain::{BridgeQuote, BridgeReference, BridgeRequest, BridgeResult, BridgeVendor, UnsignedTransaction};
use std::fmt;
use std::sync::Arc;
use tracing::info;

/// Single entry point bound to one bridge vendor.
#[derive(Clone)]
pub struct BridgeOrchestrator {
    adapter: Arc<dyn BridgeAdapter>,
}

impl BridgeOrchestrator {
    pub fn new(vendor_name: &str, ctx: BridgeContext, config: &ConnectorConfig) -> AdapterResult<Self> {
        let vendor = vendor_name
            .parse::<BridgeVendor>()
            .map_err(BridgeError::UnsupportedBridge)?;
        Self::for_vendor(vendor, ctx, config)
    }

    pub fn for_vendor(
        vendor: BridgeVendor,
        ctx: BridgeContext,
        config: &ConnectorConfig,
    ) -> AdapterResult<Self> {
        let endpoints = &config.endpoints;
        let adapter: Arc<dyn BridgeAdapter> = match vendor {
            BridgeVendor::Across => Arc::new(AcrossAdapter::new(ctx, endpoints.across_base_url.clone())),
            BridgeVendor::Relay => Arc::new(RelayAdapter::new(ctx, endpoints.relay_base_url.clone())),
            BridgeVendor::Meson => Arc::new(MesonAdapter::new(ctx, endpoints.meson_base_url.clone())),
            BridgeVendor::Cctp => Arc::new(CctpAdapter::new(ctx, config.cctp.clone())),
            BridgeVendor::ArbitrumNative => {
                let arbitrum = config.arbitrum.clone().ok_or_else(|| {
                    BridgeError::Config("arbitrum native bridge is not configured".to_string())
                })?;
                Arc::new(ArbitrumNativeAdapter::new(ctx, arbitrum))
            }
        };
        Ok(Self::with_adapter(adapter))
    }

    pub fn with_adapter(adapter: Arc<dyn BridgeAdapter>) -> Self {
        Self { adapter }
    }

    pub fn vendor(&self) -> BridgeVendor {
        self.adapter.vendor()
    }

    pub async fn create_bridge_transaction(&self, request: &BridgeRequest) -> AdapterResult<BridgeQuote> {
        info!(
            target: "bridge_adapters",
            vendor = %self.vendor(),
            origin = %request.origin_chain,
            destination = %request.destination_chain,
            amount = %request.source_token.amount,
            "create bridge transaction"
        );
        self.adapter.create_bridge_transaction(request).await
    }

    pub async fn listen_bridge_result(&self, reference: &BridgeReference) -> AdapterResult<BridgeResult> {
        self.adapter.listen_bridge_result(reference).await
    }

    pub async fn claim_bridge_result(&self, reference: &BridgeReference) -> AdapterResult<UnsignedTransaction> {
        info!(
            target: "bridge_adapters",
            vendor = %self.vendor(),
            tx = ?reference.transaction_hash,
            "claim bridge result"
        );
        self.adapter.claim_bridge_result(reference).await
    }
}

impl fmt::Debug for BridgeOrchestrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BridgeOrchestrator")
            .field("vendor", &self.vendor().as_str())
            .finish()
    }
}
