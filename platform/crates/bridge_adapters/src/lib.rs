mod abi;
mod config;
mod context;
mod error;
mod finalizer;
mod network;
mod orchestrator;
mod registry;
mod rpc;
mod traits;
pub mod units;
mod venues;

#[cfg(test)]
mod test_utils;

pub use config::{
    ArbitrumConfig, CctpConfig, CctpContracts, ConnectorConfig, FinalizerConfig, NetworkConfig,
    VendorEndpoints,
};
pub use context::BridgeContext;
pub use error::{AdapterResult, BridgeError};
pub use finalizer::{AccountState, TransactionFinalizer};
pub use network::{GasPrices, NetworkMonitor, NetworkStatus};
pub use orchestrator::BridgeOrchestrator;
pub use registry::ChainRegistry;
pub use rpc::{ChainClients, ChainRpc, EthersRpc, FeeData};
pub use traits::BridgeAdapter;
pub use venues::{AcrossAdapter, ArbitrumNativeAdapter, CctpAdapter, MesonAdapter, RelayAdapter};
