//! Mempool LP Sniper Library
//!
//! Watches pending transactions for a liquidity call to the configured
//! router, decodes it and fires a single buy through a bounded-retry
//! executor.
//!
//! Created: 2026-10-12

pub mod config;
pub mod connection;
pub mod contracts;
pub mod executor;
pub mod mempool;
pub mod rpc;
pub mod types;

// Re-export commonly used types
pub use config::{load_config, load_config_from_file, ConfigError, SniperConfig};
pub use connection::{ConnectionManager, ConnectionSettings, WsConnector};
pub use executor::{BuyExecutor, BuyOutcome, OrderTemplate, RetryPolicy};
pub use mempool::{FilterSettings, Opportunity, OpportunityFilter, TriggerGuard};
pub use rpc::RpcClient;
pub use types::{BuyOrder, RawTransaction, TokenMetadata, TradingPair};
