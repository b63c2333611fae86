//! Core data structures shared across the sniper
//!
//! Purpose:
//!     Plain records passed between the RPC collaborators, the opportunity
//!     filter and the buy executor.
//!
//! Created: 2026-10-12

use alloy::primitives::{Address, Bytes, TxHash, U256};
use std::fmt;

/// Fetched pending transaction, reduced to what the filter inspects.
/// Held only for the duration of one filter pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawTransaction {
    pub hash: TxHash,
    /// None for contract creations
    pub to: Option<Address>,
    pub input: Bytes,
    pub value: U256,
}

/// ERC-20 display metadata (best-effort, never required for a buy)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenMetadata {
    pub symbol: String,
    pub decimals: u8,
}

impl fmt::Display for TokenMetadata {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} ({} decimals)", self.symbol, self.decimals)
    }
}

/// Trading pair the sniper buys into: wrapped native token → target token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TradingPair {
    pub base: Address,
    pub token: Address,
}

impl TradingPair {
    pub fn new(base: Address, token: Address) -> Self {
        Self { base, token }
    }

    /// Swap path in router order (base first)
    pub fn path(&self) -> Vec<Address> {
        vec![self.base, self.token]
    }
}

/// One fully-specified purchase request, rebuilt on every attempt so the
/// deadline is always measured from the moment of submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuyOrder {
    pub router: Address,
    /// Always zero: no slippage protection
    pub amount_out_min: U256,
    pub path: Vec<Address>,
    pub recipient: Address,
    /// Unix timestamp (seconds)
    pub deadline: U256,
    /// Native value sent with the swap (wei)
    pub value: U256,
    pub gas_limit: u64,
    /// Legacy gas price (wei)
    pub gas_price: u128,
}
