//! Mempool Filter Module
//!
//! Purpose:
//!     Turn the stream of pending tx hashes into at most one buy opportunity:
//!     resolve each hash, keep only calls to the watched router with the
//!     exactOutputSingle payload shape, decode them, and fire once.
//!
//! Created: 2026-10-12
//!
//! Architecture:
//!     types.rs    : DecodedSwapParams, Opportunity, DiscardReason
//!     decoder.rs  : calldata to DecodedSwapParams (length gate + ABI decode)
//!     filter.rs   : per-hash evaluation, resolver/metadata seams
//!     trigger.rs  : one-shot atomic guard
//!     stats.rs    : per-reason discard counters

pub mod decoder;
pub mod filter;
pub mod stats;
pub mod trigger;
pub mod types;

pub use filter::{FilterSettings, OpportunityFilter, TokenMetadataReader, TxResolver};
pub use trigger::TriggerGuard;
pub use types::{DecodedSwapParams, DiscardReason, Opportunity};
