//! Mempool Filter: Type Definitions
//!
//! Purpose:
//!     Decoded swap parameters, the detected opportunity handed to the
//!     executor, and the classification of every discarded pending tx.
//!
//! Dependencies:
//!     - alloy (Address, TxHash, U256)

use alloy::primitives::aliases::U160;
use alloy::primitives::{Address, TxHash, U256};
use std::fmt;

/// Parameters of the watched router call, in declared ABI order:
/// (address, address, uint24, address, uint256, uint256, uint256, uint160)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedSwapParams {
    /// [tokenIn, tokenOut]
    pub tokens: [Address; 2],
    /// Pool fee tier in hundredths of a bip (500 = 0.05%)
    pub fee: u32,
    pub recipient: Address,
    pub deadline: U256,
    pub amount_out: U256,
    pub amount_in_maximum: U256,
    pub sqrt_price_limit_x96: U160,
}

impl DecodedSwapParams {
    pub fn token_in(&self) -> Address {
        self.tokens[0]
    }

    pub fn token_out(&self) -> Address {
        self.tokens[1]
    }
}

/// A matching pending transaction, decoded.
/// Produced once per process; consumed by the buy executor.
#[derive(Debug, Clone)]
pub struct Opportunity {
    /// Hash of the triggering (liquidity) transaction
    pub trigger: TxHash,
    pub params: DecodedSwapParams,
}

/// Why a pending transaction was dropped by the filter.
/// Everything except `AlreadyTriggered` is normal mempool churn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DiscardReason {
    /// Node no longer knows the tx (mined or evicted before fetch)
    NotFound,
    /// RPC error or timeout while fetching
    ResolveFailed,
    /// Contract creation
    NoDestination,
    WrongDestination,
    /// Payload length is not the watched call's size
    ShapeMismatch,
    /// Right size, wrong selector (strict mode only)
    SelectorMismatch,
    /// Right size, but the words do not decode as the expected tuple
    DecodeFailed,
    /// A buy was already triggered by an earlier match
    AlreadyTriggered,
}

impl DiscardReason {
    pub const ALL: [DiscardReason; 8] = [
        DiscardReason::NotFound,
        DiscardReason::ResolveFailed,
        DiscardReason::NoDestination,
        DiscardReason::WrongDestination,
        DiscardReason::ShapeMismatch,
        DiscardReason::SelectorMismatch,
        DiscardReason::DecodeFailed,
        DiscardReason::AlreadyTriggered,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DiscardReason::NotFound => "not_found",
            DiscardReason::ResolveFailed => "resolve_failed",
            DiscardReason::NoDestination => "no_destination",
            DiscardReason::WrongDestination => "wrong_destination",
            DiscardReason::ShapeMismatch => "shape_mismatch",
            DiscardReason::SelectorMismatch => "selector_mismatch",
            DiscardReason::DecodeFailed => "decode_failed",
            DiscardReason::AlreadyTriggered => "already_triggered",
        }
    }
}

impl fmt::Display for DiscardReason {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
