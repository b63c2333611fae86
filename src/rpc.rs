//! Node RPC collaborators
//!
//! Purpose:
//!     alloy-backed implementations of the filter's and executor's seams:
//!     pending-tx lookup, ERC-20 metadata reads and swap submission. One
//!     long-lived WS provider with the signer attached, separate from the
//!     raw heartbeat session in `connection::ws`.
//!
//! Created: 2026-10-12
//!
//! Dependencies:
//!     - alloy (provider-ws, signer-local, contract)

use alloy::consensus::Transaction as _;
use alloy::network::EthereumWallet;
use alloy::primitives::{Address, TxHash};
use alloy::providers::{DynProvider, Provider, ProviderBuilder, WsConnect};
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use std::future::Future;
use std::time::Duration;
use tracing::{info, warn};

use crate::config::SniperConfig;
use crate::contracts::{IUniswapV2Router02, IERC20};
use crate::executor::SwapSubmitter;
use crate::mempool::{TokenMetadataReader, TxResolver};
use crate::types::{BuyOrder, RawTransaction, TokenMetadata};

/// Pause between provider connection attempts, at startup and after a drop
pub const RPC_RETRY_INTERVAL: Duration = Duration::from_secs(3);

#[derive(Clone)]
pub struct RpcClient {
    provider: DynProvider,
    /// Per-call cap for lookups (pending-tx fetch, metadata)
    timeout: Duration,
}

impl RpcClient {
    /// Connect, retrying until the node answers. Like the heartbeat
    /// session, an unreachable node is waited out rather than fatal.
    pub async fn connect_persistent(config: &SniperConfig) -> Self {
        retry_until_ok("RPC provider", RPC_RETRY_INTERVAL, || Self::connect(config)).await
    }

    /// Connect the signing provider and report the chain.
    /// Once up, the WS transport redials on its own with no retry cap.
    pub async fn connect(config: &SniperConfig) -> Result<Self> {
        let wallet = EthereumWallet::from(config.signer.clone());
        let ws = WsConnect::new(config.node_uri.clone())
            .with_max_retries(u32::MAX)
            .with_retry_interval(RPC_RETRY_INTERVAL);
        let provider = ProviderBuilder::new()
            .wallet(wallet)
            .connect_ws(ws)
            .await
            .context("Failed to connect RPC provider")?
            .erased();

        let chain_id = provider
            .get_chain_id()
            .await
            .context("eth_chainId failed")?;
        info!("RPC provider connected (chain_id: {})", chain_id);
        info!("Wallet: {}", config.signer.address());

        Ok(Self {
            provider,
            timeout: config.resolve_timeout,
        })
    }
}

/// Run `attempt` until it succeeds, pausing `interval` after each failure
pub async fn retry_until_ok<T, F, Fut>(what: &str, interval: Duration, mut attempt: F) -> T
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut failures: u64 = 0;
    loop {
        match attempt().await {
            Ok(value) => return value,
            Err(e) => {
                failures += 1;
                warn!(
                    "{} unavailable (attempt {}): {:#}. Retrying in {}s",
                    what,
                    failures,
                    e,
                    interval.as_secs()
                );
                tokio::time::sleep(interval).await;
            }
        }
    }
}

#[async_trait]
impl TxResolver for RpcClient {
    async fn resolve(&self, hash: TxHash) -> Result<Option<RawTransaction>> {
        let tx = tokio::time::timeout(self.timeout, self.provider.get_transaction_by_hash(hash))
            .await
            .map_err(|_| anyhow!("lookup timed out after {}ms", self.timeout.as_millis()))??;

        Ok(tx.map(|tx| RawTransaction {
            hash,
            to: tx.to(),
            input: tx.input().clone(),
            value: tx.value(),
        }))
    }
}

#[async_trait]
impl TokenMetadataReader for RpcClient {
    async fn read(&self, token: Address) -> Result<TokenMetadata> {
        let erc20 = IERC20::new(token, self.provider.clone());
        let lookup = async {
            tokio::try_join!(
                async { erc20.symbol().call().await },
                async { erc20.decimals().call().await },
            )
        };
        let (symbol, decimals) = tokio::time::timeout(self.timeout, lookup)
            .await
            .map_err(|_| anyhow!("metadata lookup for {} timed out", token))?
            .with_context(|| format!("ERC20 metadata call failed for {}", token))?;

        Ok(TokenMetadata { symbol, decimals })
    }
}

#[async_trait]
impl SwapSubmitter for RpcClient {
    async fn submit(&self, order: &BuyOrder) -> Result<TxHash> {
        let router = IUniswapV2Router02::new(order.router, self.provider.clone());
        let pending = router
            .swapExactETHForTokens(
                order.amount_out_min,
                order.path.clone(),
                order.recipient,
                order.deadline,
            )
            .value(order.value)
            .gas(order.gas_limit)
            .gas_price(order.gas_price)
            .send()
            .await
            .context("swapExactETHForTokens send failed")?;

        Ok(*pending.tx_hash())
    }
}
