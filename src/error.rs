use bridge_adapters::BridgeError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AgentError {
    #[error("bridge error: {0}")]
    Bridge(#[from] BridgeError),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("config error: {0}")]
    Config(String),
    #[error("wallet error: {0}")]
    Wallet(String),
    #[error("usage: {0}")]
    Usage(String),
    #[error("bridge did not settle: {0}")]
    Unsettled(String),
}
