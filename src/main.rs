mod agent;
mod config;
mod error;
mod wallet;

use crate::agent::BridgeAgent;
use crate::config::AgentConfig;
use crate::error::AgentError;
use bridge_adapters::{BridgeContext, BridgeOrchestrator, ConnectorConfig};
use log::{error, info};
use std::io::Write;

const USAGE: &str = "bridge-agent [quote | listen <tx hash> [request id] | claim <tx hash> [request id] | run]";

#[tokio::main]
async fn main() -> Result<(), AgentError> {
    dotenv::dotenv().ok();
    init_logging();

    let mut args = std::env::args().skip(1);
    let command = args.next().unwrap_or_else(|| "run".to_string());
    let rest: Vec<String> = args.collect();

    let config = AgentConfig::from_env()?;
    let connector = ConnectorConfig::from_env()?;
    let ctx = BridgeContext::connect(&connector)?;
    let orchestrator = BridgeOrchestrator::new(&config.vendor, ctx.clone(), &connector)?;
    info!(
        "Bridge agent: vendor={} route={} -> {} dry_run={}",
        orchestrator.vendor(),
        config.origin_chain,
        config.destination_chain,
        config.dry_run
    );
    let agent = BridgeAgent::new(config, ctx, orchestrator);

    let outcome = match command.as_str() {
        "quote" => agent
            .quote()
            .await
            .and_then(|quote| Ok(serde_json::to_string_pretty(&quote)?)),
        "listen" => agent
            .listen(&rest)
            .await
            .and_then(|result| Ok(serde_json::to_string_pretty(&result)?)),
        "claim" => agent
            .claim(&rest)
            .await
            .map(|submission| format!("{:?} broadcast={}", submission.hash, submission.broadcast)),
        "run" => agent
            .run()
            .await
            .and_then(|result| Ok(serde_json::to_string_pretty(&result)?)),
        other => Err(AgentError::Usage(format!("unknown command {other}; {USAGE}"))),
    };

    match outcome {
        Ok(output) => {
            println!("{output}");
            Ok(())
        }
        Err(err) => {
            error!("{} failed: {}", command, err);
            Err(err)
        }
    }
}

fn init_logging() {
    let mut builder = env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or("info"),
    );
    builder.format(|buf, record| {
        writeln!(buf, "[{}] {}", record.level(), record.args())
    });
    builder.init();
}
