//! Mempool LP Sniper
//!
//! Main entry point. Watches the node's pending-transaction stream for a
//! liquidity call to the router, decodes it and buys the target token once.
//!
//! Architecture:
//! - ConnectionManager: raw WS session, ping/pong heartbeat, endless reconnect
//! - OpportunityFilter: resolve hash, router + payload-shape check, decode
//! - TriggerGuard: one buy sequence per process
//! - BuyExecutor: swapExactETHForTokens with bounded retry, then exit
//!
//! Exit codes: 0 buy submitted, 1 retries exhausted or fatal error,
//! 130 interrupted.
//!
//! Created: 2026-10-12

use anyhow::Result;
use clap::Parser;
use lp_sniper::config::load_config_from_file;
use lp_sniper::connection::{ConnectionManager, ConnectionSettings, WsConnector};
use lp_sniper::executor::{BuyExecutor, OrderTemplate, RetryPolicy};
use lp_sniper::mempool::{FilterSettings, OpportunityFilter, TriggerGuard};
use lp_sniper::rpc::RpcClient;
use std::process::ExitCode;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

const EXIT_INTERRUPTED: u8 = 130;

/// Mempool LP Sniper
#[derive(Parser)]
#[command(name = "lp-sniper")]
struct Args {
    /// Env file with NODE_WSS, PRIVATE_KEY, RECIPIENT, TARGET_TOKEN, ...
    #[arg(long, env = "ENV_FILE", default_value = ".env")]
    env_file: String,

    /// Emit logs as JSON lines
    #[arg(long)]
    json: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let args = Args::parse();
    init_tracing(args.json);

    // Ctrl-C covers startup too, including a node that is still unreachable
    tokio::select! {
        result = run(&args) => match result {
            Ok(code) => ExitCode::from(code),
            Err(e) => {
                error!("Fatal: {:#}", e);
                ExitCode::FAILURE
            }
        },
        _ = tokio::signal::ctrl_c() => {
            warn!("Interrupted, shutting down");
            ExitCode::from(EXIT_INTERRUPTED)
        }
    }
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,alloy=warn"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(false);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

async fn run(args: &Args) -> Result<u8> {
    info!("LP Sniper starting...");

    let config = load_config_from_file(&args.env_file)?;
    info!("Configuration loaded from {}", args.env_file);
    info!("Router: {}", config.router);
    info!("Pair: {} -> {}", config.pair.base, config.pair.token);
    info!(
        "Purchase: {} wei | gas limit {} | gas price {} wei",
        config.purchase_amount, config.gas_limit, config.gas_price
    );
    info!(
        "Retry: delay {}s, {} retries, backoff {}-{}ms, deadline {}s",
        config.buy_delay.as_secs(),
        config.buy_retries,
        config.retry_min_timeout.as_millis(),
        config.retry_max_timeout.as_millis(),
        config.deadline.as_secs()
    );
    if config.strict_selector {
        info!("Strict selector matching enabled (exactOutputSingle only)");
    }

    let rpc = Arc::new(RpcClient::connect_persistent(&config).await);

    // ── Pipeline ──────────────────────────────────────────────────────
    let guard = Arc::new(TriggerGuard::new());
    let (hash_tx, hash_rx) = mpsc::channel(config.channel_capacity);
    let (opportunity_tx, mut opportunity_rx) = mpsc::channel(1);

    let filter = Arc::new(OpportunityFilter::new(
        rpc.clone(),
        rpc.clone(),
        FilterSettings {
            router: config.router,
            strict_selector: config.strict_selector,
            stats_interval: config.stats_interval,
        },
        Arc::clone(&guard),
        opportunity_tx,
    ));
    let manager = ConnectionManager::new(WsConnector, ConnectionSettings::from_config(&config));
    let executor = BuyExecutor::new(
        rpc,
        OrderTemplate::from_config(&config),
        RetryPolicy::from_config(&config),
    );

    let manager_task = tokio::spawn(async move { manager.run(hash_tx).await });
    let filter_task = tokio::spawn(Arc::clone(&filter).run(hash_rx));

    let snipe = async {
        let opportunity = opportunity_rx.recv().await?;
        Some(executor.execute(&opportunity).await)
    };

    let code = match snipe.await {
        Some(outcome) => outcome.exit_code(),
        None => {
            error!("Opportunity filter stopped without a match");
            1
        }
    };

    info!("Filter stats: {}", filter.stats().summary());
    filter_task.abort();
    manager_task.abort();
    Ok(code)
}
