use crate::config::AgentConfig;
use crate::error::AgentError;
use crate::wallet::{AgentWallet, Submission};
use bridge_adapters::units::parse_address;
use bridge_adapters::{BridgeContext, BridgeOrchestrator};
use domain::{BridgeQuote, BridgeReference, BridgeResult, BridgeStatus, UnsignedTransaction};
use ethers_core::types::{Address, H256, U256};
use log::{info, warn};
use tokio::time::{sleep, Duration};

pub struct BridgeAgent {
    config: AgentConfig,
    ctx: BridgeContext,
    orchestrator: BridgeOrchestrator,
}

impl BridgeAgent {
    pub fn new(config: AgentConfig, ctx: BridgeContext, orchestrator: BridgeOrchestrator) -> Self {
        Self {
            config,
            ctx,
            orchestrator,
        }
    }

    fn wallet(&self) -> Result<AgentWallet, AgentError> {
        Ok(AgentWallet::new(self.config.wallet()?, self.config.dry_run))
    }

    pub async fn quote(&self) -> Result<BridgeQuote, AgentError> {
        let wallet = self.wallet()?;
        let request = self.config.bridge_request(wallet.address());
        let quote = self.orchestrator.create_bridge_transaction(&request).await?;
        info!(
            "Quote {} via {}: {} step(s), source={} destination={:?} manual_claim={}",
            quote.quote_id,
            quote.vendor,
            quote.transactions.len(),
            quote.source_amount,
            quote.destination_amount,
            quote.needs_manual_claim
        );
        Ok(quote)
    }

    pub async fn listen(&self, args: &[String]) -> Result<BridgeResult, AgentError> {
        let user = self.wallet().ok().map(|w| w.address());
        let reference = reference_from_args(&self.config, args, user)?;
        Ok(self.orchestrator.listen_bridge_result(&reference).await?)
    }

    pub async fn claim(&self, args: &[String]) -> Result<Submission, AgentError> {
        let wallet = self.wallet()?;
        let reference = reference_from_args(&self.config, args, Some(wallet.address()))?;
        let tx = self.orchestrator.claim_bridge_result(&reference).await?;
        self.submit(&wallet, &tx).await
    }

    /// Quote, sign and send every step, then follow the transfer to the end,
    /// claiming on the destination when the vendor requires it.
    pub async fn run(&self) -> Result<BridgeResult, AgentError> {
        let wallet = self.wallet()?;
        self.log_source_balance(&wallet).await;

        let quote = self.quote().await?;
        let mut last: Option<Submission> = None;
        for tx in &quote.transactions {
            last = Some(self.submit(&wallet, tx).await?);
        }
        let last = last.ok_or_else(|| AgentError::Unsettled("quote carried no transactions".to_string()))?;
        if !last.broadcast {
            info!("[DRY RUN] Signed {} step(s); nothing to follow", quote.transactions.len());
            return Ok(BridgeResult::pending("dry run"));
        }

        let reference = BridgeReference::by_hash(last.hash, &quote.origin_chain, &quote.destination_chain)
            .with_request_id(quote.request_id.clone())
            .with_user(wallet.address());
        let result = poll_until_terminal(
            &self.orchestrator,
            &reference,
            Duration::from_secs(self.config.poll_interval_secs),
            self.config.poll_max_attempts,
        )
        .await?;

        match result.status {
            BridgeStatus::Failed => Err(AgentError::Unsettled(result.message)),
            _ if result.claimable => {
                let claim = self
                    .orchestrator
                    .claim_bridge_result(&reference.with_proof(result.proof.clone()))
                    .await?;
                let submission = self.submit(&wallet, &claim).await?;
                info!("Claim submitted tx={:?}", submission.hash);
                Ok(result)
            }
            _ => Ok(result),
        }
    }

    async fn submit(&self, wallet: &AgentWallet, tx: &UnsignedTransaction) -> Result<Submission, AgentError> {
        let chain = self.ctx.registry.resolve_id(tx.chain_id)?;
        let rpc = self.ctx.rpc(chain)?;
        wallet.submit(rpc.as_ref(), tx).await
    }

    async fn log_source_balance(&self, wallet: &AgentWallet) {
        match self.source_balance(wallet).await {
            Ok(balance) => info!("Source balance on {}: {}", self.config.origin_chain, balance),
            Err(err) => warn!("Failed to read source balance: {}", err),
        }
    }

    async fn source_balance(&self, wallet: &AgentWallet) -> Result<U256, AgentError> {
        let chain = self.ctx.chain(&self.config.origin_chain)?;
        let token = parse_address("source_token", &self.config.source_token)?;
        wallet.balance(chain, token).await
    }
}

/// `<tx hash> [request id]`, on the configured route.
fn reference_from_args(
    config: &AgentConfig,
    args: &[String],
    user: Option<Address>,
) -> Result<BridgeReference, AgentError> {
    let raw = args
        .first()
        .ok_or_else(|| AgentError::Usage("expected <tx hash> [request id]".to_string()))?;
    let hash: H256 = raw
        .parse()
        .map_err(|_| AgentError::Usage(format!("not a transaction hash: {raw}")))?;
    let mut reference = BridgeReference::by_hash(hash, &config.origin_chain, &config.destination_chain)
        .with_request_id(args.get(1).cloned());
    if let Some(user) = user {
        reference = reference.with_user(user);
    }
    Ok(reference)
}

/// Fixed-interval polling, bounded by `max_attempts`.
pub async fn poll_until_terminal(
    orchestrator: &BridgeOrchestrator,
    reference: &BridgeReference,
    interval: Duration,
    max_attempts: u32,
) -> Result<BridgeResult, AgentError> {
    let attempts = max_attempts.max(1);
    for attempt in 1..=attempts {
        match orchestrator.listen_bridge_result(reference).await {
            Ok(result) if result.is_terminal() => return Ok(result),
            Ok(result) => info!("Attempt {}/{}: {}", attempt, attempts, result.message),
            Err(err) if err.is_retryable() => warn!("Attempt {}/{} failed: {}", attempt, attempts, err),
            Err(err) => return Err(err.into()),
        }
        if attempt < attempts {
            sleep(interval).await;
        }
    }
    Err(AgentError::Unsettled(format!(
        "still pending after {attempts} attempts"
    )))
}
