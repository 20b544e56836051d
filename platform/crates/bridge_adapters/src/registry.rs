use crate::error::{AdapterResult, BridgeError};
use domain::ChainConfig;
use std::collections::HashMap;

#[derive(Debug, Clone, Default)]
pub struct ChainRegistry {
    chains: HashMap<String, ChainConfig>,
}

impl ChainRegistry {
    pub fn new(chains: Vec<ChainConfig>) -> AdapterResult<Self> {
        let mut registry = Self::default();
        for chain in chains {
            registry.register(chain)?;
        }
        Ok(registry)
    }

    fn register(&mut self, chain: ChainConfig) -> AdapterResult<()> {
        if self.chains.contains_key(&chain.name) {
            return Err(BridgeError::Config(format!(
                "duplicate chain name {}",
                chain.name
            )));
        }
        if self.resolve_id(chain.chain_id).is_ok() {
            return Err(BridgeError::Config(format!(
                "duplicate chain id {}",
                chain.chain_id
            )));
        }
        self.chains.insert(chain.name.clone(), chain);
        Ok(())
    }

    /// Numeric input is treated as a chain id, anything else as a name.
    pub fn resolve(&self, name_or_id: &str) -> AdapterResult<&ChainConfig> {
        let key = name_or_id.trim();
        if let Ok(chain_id) = key.parse::<u64>() {
            return self.resolve_id(chain_id);
        }
        self.chains
            .get(key)
            .ok_or_else(|| BridgeError::UnknownChain(key.to_string()))
    }

    pub fn resolve_id(&self, chain_id: u64) -> AdapterResult<&ChainConfig> {
        self.chains
            .values()
            .find(|chain| chain.chain_id == chain_id)
            .ok_or_else(|| BridgeError::UnknownChain(chain_id.to_string()))
    }

    pub fn all(&self) -> Vec<&ChainConfig> {
        let mut chains: Vec<&ChainConfig> = self.chains.values().collect();
        chains.sort_by(|a, b| a.name.cmp(&b.name));
        chains
    }

    pub fn names(&self) -> Vec<String> {
        self.all().into_iter().map(|chain| chain.name.clone()).collect()
    }
}
