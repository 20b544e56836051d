use crate::error::AdapterResult;
use async_trait::async_trait;
use domain::{BridgeQuote, BridgeReference, BridgeRequest, BridgeResult, BridgeVendor, UnsignedTransaction};

#[async_trait]
pub trait BridgeAdapter: Send + Sync {
    fn vendor(&self) -> BridgeVendor;
    async fn create_bridge_transaction(&self, request: &BridgeRequest) -> AdapterResult<BridgeQuote>;
    async fn listen_bridge_result(&self, reference: &BridgeReference) -> AdapterResult<BridgeResult>;
    async fn claim_bridge_result(&self, reference: &BridgeReference) -> AdapterResult<UnsignedTransaction>;
}
