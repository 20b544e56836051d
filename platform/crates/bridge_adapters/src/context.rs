use crate::config::{ConnectorConfig, FinalizerConfig};
use crate::error::{AdapterResult, BridgeError};
use crate::finalizer::TransactionFinalizer;
use crate::registry::ChainRegistry;
use crate::rpc::{ChainClients, ChainRpc};
use domain::ChainConfig;
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;

/// Read-only collaborators shared by every adapter.
#[derive(Clone)]
pub struct BridgeContext {
    pub registry: Arc<ChainRegistry>,
    pub clients: ChainClients,
    pub finalizer: TransactionFinalizer,
    pub http: Client,
}

impl BridgeContext {
    pub fn new(
        registry: ChainRegistry,
        clients: ChainClients,
        finalizer: FinalizerConfig,
        http_timeout_secs: u64,
    ) -> AdapterResult<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(http_timeout_secs))
            .build()
            .map_err(BridgeError::Http)?;
        Ok(Self {
            registry: Arc::new(registry),
            finalizer: TransactionFinalizer::new(clients.clone(), finalizer),
            clients,
            http,
        })
    }

    pub fn connect(config: &ConnectorConfig) -> AdapterResult<Self> {
        let registry = ChainRegistry::new(config.chains.clone())?;
        let clients = ChainClients::connect(&registry)?;
        Self::new(
            registry,
            clients,
            config.finalizer.clone(),
            config.http_timeout_secs,
        )
    }

    pub fn chain(&self, name_or_id: &str) -> AdapterResult<&ChainConfig> {
        self.registry.resolve(name_or_id)
    }

    pub fn rpc(&self, chain: &ChainConfig) -> AdapterResult<Arc<dyn ChainRpc>> {
        self.clients.get(chain)
    }
}
