use thiserror::Error;

#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("invalid request: {0}")]
    Validation(String),
    #[error("unknown chain: {0}")]
    UnknownChain(String),
    #[error("quote failed: {0}")]
    Quote(String),
    #[error("transaction finalization failed: {0}")]
    Finalization(String),
    #[error("unsupported bridge operation: {0}")]
    UnsupportedOperation(String),
    #[error("unsupported bridge: {0}")]
    UnsupportedBridge(String),
    #[error("not claimable yet: {0}")]
    NotClaimable(String),
    #[error("rpc error: {0}")]
    Rpc(String),
    #[error("config error: {0}")]
    Config(String),
    #[error("abi error: {0}")]
    Abi(String),
}

impl BridgeError {
    /// Transient failures a caller may retry with the same input.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Http(_) | Self::Quote(_) | Self::Rpc(_))
    }
}

impl From<ethers_core::abi::Error> for BridgeError {
    fn from(err: ethers_core::abi::Error) -> Self {
        Self::Abi(err.to_string())
    }
}

pub type AdapterResult<T> = Result<T, BridgeError>;
