//! Buy Executor
//!
//! Purpose:
//!     Submit the purchase for a detected opportunity: a fixed native amount
//!     swapped into the target token through the configured router, retried
//!     with bounded backoff until it is accepted or the retry budget is spent.
//!
//! Created: 2026-10-12
//!
//! Notes:
//!     - amountOutMin is always 0 (no slippage protection)
//!     - Success means the node accepted the tx, not that it was mined
//!     - The order is rebuilt per attempt so the deadline is always
//!       now + DEADLINE_SECS at submission time

use alloy::primitives::{Address, TxHash, U256};
use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

use super::backoff::RetryPolicy;
use crate::config::SniperConfig;
use crate::mempool::Opportunity;
use crate::types::{BuyOrder, TradingPair};

/// Sends a signed swap to the node. Returns the hash of the accepted tx.
#[async_trait]
pub trait SwapSubmitter: Send + Sync {
    async fn submit(&self, order: &BuyOrder) -> Result<TxHash>;
}

/// One failed try inside the retry loop
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionAttempt {
    /// 1-based
    pub number: u32,
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuyOutcome {
    Submitted {
        trigger: TxHash,
        tx_hash: TxHash,
        /// Attempts used, including the successful one
        attempts: u32,
    },
    /// Every attempt failed; the last entry holds the final error
    Exhausted { attempts: Vec<SubmissionAttempt> },
}

impl BuyOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, BuyOutcome::Submitted { .. })
    }

    /// Process exit status for this outcome
    pub fn exit_code(&self) -> u8 {
        match self {
            BuyOutcome::Submitted { .. } => 0,
            BuyOutcome::Exhausted { .. } => 1,
        }
    }
}

/// Static part of every buy order
#[derive(Debug, Clone)]
pub struct OrderTemplate {
    pub router: Address,
    pub pair: TradingPair,
    pub recipient: Address,
    pub value: U256,
    pub gas_limit: u64,
    pub gas_price: u128,
    /// Validity window added to the submission time
    pub deadline: Duration,
}

impl OrderTemplate {
    pub fn from_config(config: &SniperConfig) -> Self {
        Self {
            router: config.router,
            pair: config.pair,
            recipient: config.recipient,
            value: config.purchase_amount,
            gas_limit: config.gas_limit,
            gas_price: config.gas_price,
            deadline: config.deadline,
        }
    }

    /// Concrete order with deadline = `now_secs` + window (unix seconds)
    pub fn order_at(&self, now_secs: u64) -> BuyOrder {
        BuyOrder {
            router: self.router,
            amount_out_min: U256::ZERO,
            path: self.pair.path(),
            recipient: self.recipient,
            deadline: U256::from(now_secs.saturating_add(self.deadline.as_secs())),
            value: self.value,
            gas_limit: self.gas_limit,
            gas_price: self.gas_price,
        }
    }
}

pub struct BuyExecutor {
    submitter: Arc<dyn SwapSubmitter>,
    template: OrderTemplate,
    policy: RetryPolicy,
}

impl BuyExecutor {
    pub fn new(submitter: Arc<dyn SwapSubmitter>, template: OrderTemplate, policy: RetryPolicy) -> Self {
        Self {
            submitter,
            template,
            policy,
        }
    }

    /// Run the full attempt sequence for one opportunity
    pub async fn execute(&self, opportunity: &Opportunity) -> BuyOutcome {
        if !self.policy.buy_delay.is_zero() {
            info!("Waiting {}s before buying", self.policy.buy_delay.as_secs_f64());
            tokio::time::sleep(self.policy.buy_delay).await;
        }

        let total = self.policy.total_attempts();
        let mut failures: Vec<SubmissionAttempt> = Vec::new();

        for number in 1..=total {
            let now = u64::try_from(Utc::now().timestamp()).unwrap_or_default();
            let order = self.template.order_at(now);

            match self.submitter.submit(&order).await {
                Ok(tx_hash) => {
                    info!("Associated LP Event txHash: {:?}", opportunity.trigger);
                    info!("Your [pending] txHash: {:?}", tx_hash);
                    return BuyOutcome::Submitted {
                        trigger: opportunity.trigger,
                        tx_hash,
                        attempts: number,
                    };
                }
                Err(e) => {
                    failures.push(SubmissionAttempt {
                        number,
                        error: Some(format!("{:#}", e)),
                    });
                    if number == total {
                        break;
                    }
                    warn!("Buy failed - retrying {}", number);
                    warn!("Error: {:#}", e);
                    tokio::time::sleep(self.policy.next_delay(number)).await;
                }
            }
        }

        if let Some(last) = failures.last().and_then(|a| a.error.as_deref()) {
            error!("Last error: {}", last);
        }
        error!("Sniping has failed... ({} attempts)", failures.len());
        BuyOutcome::Exhausted { attempts: failures }
    }
}
