//! Mempool Filter: Opportunity Detection
//!
//! Purpose:
//!     For every pending tx hash delivered by the connection manager, fetch
//!     the transaction, check it targets the router, decode the payload and,
//!     on the first match, hand a single `Opportunity` to the buy executor.
//!
//! Concurrency:
//!     Each hash is evaluated in its own task, so several lookups can be in
//!     flight at once and complete in any order. The `TriggerGuard` makes
//!     sure only one of them ever reaches the executor.
//!
//! Errors:
//!     Nothing escapes a pass. Resolve failures, foreign txs and decode errors
//!     are classified as a `DiscardReason` and counted.

use alloy::primitives::utils::{format_ether, format_units};
use alloy::primitives::{Address, TxHash, U256};
use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info, trace, warn};

use super::decoder::{self, DecodeError};
use super::stats::FilterStats;
use super::trigger::TriggerGuard;
use super::types::{DecodedSwapParams, DiscardReason, Opportunity};
use crate::types::{RawTransaction, TokenMetadata};

/// Resolves a pending tx hash to the full transaction.
/// `Ok(None)` means the node does not (or no longer) know the hash.
#[async_trait]
pub trait TxResolver: Send + Sync {
    async fn resolve(&self, hash: TxHash) -> Result<Option<RawTransaction>>;
}

/// Reads ERC-20 symbol/decimals for display
#[async_trait]
pub trait TokenMetadataReader: Send + Sync {
    async fn read(&self, token: Address) -> Result<TokenMetadata>;
}

/// Filter settings (subset of SniperConfig)
#[derive(Debug, Clone)]
pub struct FilterSettings {
    pub router: Address,
    pub strict_selector: bool,
    /// Log discard stats every N passes (0 = never)
    pub stats_interval: u64,
}

pub struct OpportunityFilter {
    resolver: Arc<dyn TxResolver>,
    metadata: Arc<dyn TokenMetadataReader>,
    settings: FilterSettings,
    guard: Arc<TriggerGuard>,
    stats: Arc<FilterStats>,
    detected: mpsc::Sender<Opportunity>,
}

impl OpportunityFilter {
    pub fn new(
        resolver: Arc<dyn TxResolver>,
        metadata: Arc<dyn TokenMetadataReader>,
        settings: FilterSettings,
        guard: Arc<TriggerGuard>,
        detected: mpsc::Sender<Opportunity>,
    ) -> Self {
        Self {
            resolver,
            metadata,
            settings,
            guard,
            stats: Arc::new(FilterStats::new()),
            detected,
        }
    }

    pub fn stats(&self) -> Arc<FilterStats> {
        Arc::clone(&self.stats)
    }

    /// Dispatch loop. Spawns one pass per hash until the trigger fires or the
    /// hash stream ends. Dropping `hashes` on return lets the connection
    /// manager shut down.
    pub async fn run(self: Arc<Self>, mut hashes: mpsc::Receiver<TxHash>) {
        while let Some(hash) = hashes.recv().await {
            if self.guard.is_fired() {
                break;
            }
            let filter = Arc::clone(&self);
            tokio::spawn(async move {
                let _ = filter.process(hash).await;
            });
        }
        info!("Opportunity filter stopped ({})", self.stats.summary());
    }

    /// One filter pass: evaluate, count the outcome, forward a match.
    pub async fn process(&self, hash: TxHash) -> Result<Opportunity, DiscardReason> {
        let pass = self.stats.record_pass();
        if self.settings.stats_interval > 0 && pass % self.settings.stats_interval == 0 {
            info!("MEMPOOL STATS | {}", self.stats.summary());
        }

        match self.evaluate(hash).await {
            Ok(opportunity) => {
                if self.detected.send(opportunity.clone()).await.is_err() {
                    error!("Buy executor is gone, opportunity {:?} dropped", hash);
                }
                // Display only; runs while the executor is already working
                self.describe(&opportunity.params).await;
                Ok(opportunity)
            }
            Err(reason) => {
                self.stats.record_discard(reason);
                Err(reason)
            }
        }
    }

    async fn evaluate(&self, hash: TxHash) -> Result<Opportunity, DiscardReason> {
        let tx = match self.resolver.resolve(hash).await {
            Ok(Some(tx)) => tx,
            Ok(None) => {
                trace!("{:?} dropped before fetch", hash);
                return Err(DiscardReason::NotFound);
            }
            Err(e) => {
                trace!("{:?} resolve failed: {:#}", hash, e);
                return Err(DiscardReason::ResolveFailed);
            }
        };

        let to = tx.to.ok_or(DiscardReason::NoDestination)?;
        if to != self.settings.router {
            return Err(DiscardReason::WrongDestination);
        }

        let decoded = if self.settings.strict_selector {
            decoder::decode_swap_strict(&tx.input)
        } else {
            decoder::decode_swap(&tx.input)
        };
        let params = match decoded {
            Ok(Some(params)) => params,
            Ok(None) => {
                trace!(
                    "{:?} router call {} ({} bytes) is not the watched shape",
                    hash,
                    decoder::selector_hex(&tx.input),
                    tx.input.len()
                );
                return Err(DiscardReason::ShapeMismatch);
            }
            Err(DecodeError::SelectorMismatch { found }) => {
                debug!("{:?} right size, foreign selector {}", hash, found);
                return Err(DiscardReason::SelectorMismatch);
            }
            Err(e) => {
                debug!("{:?} decode failed: {}", hash, e);
                return Err(DiscardReason::DecodeFailed);
            }
        };

        if !self.guard.try_fire() {
            debug!("{:?} matched but a buy is already underway", hash);
            return Err(DiscardReason::AlreadyTriggered);
        }

        info!("Open Transaction: {:?}", tx.hash);
        info!("Value: {} ETH", format_ether(tx.value));
        info!("{:?}", params);

        Ok(Opportunity {
            trigger: tx.hash,
            params,
        })
    }

    /// Best-effort token readout for a matched call
    async fn describe(&self, params: &DecodedSwapParams) {
        let (token_in_meta, token_out_meta) =
            tokio::join!(self.lookup(params.token_in()), self.lookup(params.token_out()));
        log_readout(params, token_in_meta.as_ref(), token_out_meta.as_ref());
    }

    /// Best-effort metadata: a failure only loses the pretty print
    async fn lookup(&self, token: Address) -> Option<TokenMetadata> {
        match self.metadata.read(token).await {
            Ok(meta) => Some(meta),
            Err(e) => {
                warn!("Token metadata lookup failed for {}: {:#}", token, e);
                None
            }
        }
    }
}

fn log_readout(
    params: &DecodedSwapParams,
    token_in: Option<&TokenMetadata>,
    token_out: Option<&TokenMetadata>,
) {
    if let Some(meta) = token_in {
        info!("symbol0: {}", meta);
    }
    if let Some(meta) = token_out {
        info!("symbol1: {}", meta);
    }
    info!(
        "amountOut: {}",
        scaled(params.amount_out, token_out.map(|m| m.decimals))
    );
    info!(
        "amountInMax: {}",
        scaled(params.amount_in_maximum, token_in.map(|m| m.decimals))
    );
}

/// Human amount when decimals are known, raw units otherwise
fn scaled(amount: U256, decimals: Option<u8>) -> String {
    match decimals.map(|d| format_units(amount, d)) {
        Some(Ok(s)) => s,
        _ => amount.to_string(),
    }
}
