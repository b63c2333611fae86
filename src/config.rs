//! Configuration management
//! Load settings from .env file / process environment
//!
//! All values are read once at startup into an immutable `SniperConfig`.
//! Missing credentials, recipient or target token abort before any
//! connection is made.

use alloy::primitives::utils::{parse_ether, parse_units};
use alloy::primitives::{address, Address, U256};
use alloy::signers::local::PrivateKeySigner;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

use crate::types::TradingPair;

/// Uniswap V3 SwapRouter (mainnet)
pub const DEFAULT_ROUTER: Address = address!("0xE592427A0AEce92De3Edee1F18E0157C05861564");

/// WETH (mainnet), base side of the trading pair
pub const DEFAULT_WETH: Address = address!("0xC02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2");

/// Keepalive ping cadence
pub const KEEP_ALIVE_CHECK_INTERVAL_MS: u64 = 15_000;

/// Time allowed for a pong after a ping before the session is killed
pub const EXPECTED_PONG_BACK_MS: u64 = 30_000;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} not set - add it to your .env")]
    Missing(&'static str),
    #[error("invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

fn invalid(key: &'static str, reason: impl fmt::Display) -> ConfigError {
    ConfigError::Invalid {
        key,
        reason: reason.to_string(),
    }
}

/// Process-wide sniper settings. Immutable after `load_config`.
#[derive(Clone)]
pub struct SniperConfig {
    /// Streaming + RPC endpoint (ws:// or wss://)
    pub node_uri: String,
    pub signer: PrivateKeySigner,
    pub recipient: Address,
    pub router: Address,
    pub pair: TradingPair,

    /// Native value per buy attempt (wei)
    pub purchase_amount: U256,
    pub gas_limit: u64,
    /// Gas price (wei)
    pub gas_price: u128,

    pub buy_delay: Duration,
    pub buy_retries: u32,
    pub retry_min_timeout: Duration,
    pub retry_max_timeout: Duration,
    /// Swap deadline window, added to submission time
    pub deadline: Duration,

    pub heartbeat_interval: Duration,
    pub pong_timeout: Duration,
    /// Pause between sessions (zero = reconnect immediately)
    pub reconnect_delay: Duration,
    /// Timeout for a single pending-tx lookup
    pub resolve_timeout: Duration,

    /// Also require the exactOutputSingle selector, not just payload length
    pub strict_selector: bool,
    /// Capacity of the hash channel between connection and filter
    pub channel_capacity: usize,
    /// Log discard stats every N filter passes
    pub stats_interval: u64,
}

impl fmt::Debug for SniperConfig {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("SniperConfig")
            .field("node_uri", &self.node_uri)
            .field("wallet", &self.signer.address())
            .field("recipient", &self.recipient)
            .field("router", &self.router)
            .field("pair", &self.pair)
            .field("purchase_amount", &self.purchase_amount)
            .field("gas_limit", &self.gas_limit)
            .field("gas_price", &self.gas_price)
            .field("buy_delay", &self.buy_delay)
            .field("buy_retries", &self.buy_retries)
            .field("retry_min_timeout", &self.retry_min_timeout)
            .field("retry_max_timeout", &self.retry_max_timeout)
            .field("deadline", &self.deadline)
            .field("strict_selector", &self.strict_selector)
            .finish_non_exhaustive()
    }
}

/// Load config from `.env` (if present) and the process environment
pub fn load_config() -> Result<SniperConfig, ConfigError> {
    dotenv::dotenv().ok();
    SniperConfig::from_lookup(|key| std::env::var(key).ok())
}

/// Load config from a specific env file, falling back to the process environment
pub fn load_config_from_file(path: &str) -> Result<SniperConfig, ConfigError> {
    dotenv::from_filename(path).ok();
    SniperConfig::from_lookup(|key| std::env::var(key).ok())
}

impl SniperConfig {
    /// Build the config from an arbitrary key lookup (env, map in tests).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        // Required, checked in the order an operator fills in .env
        let token = get("TARGET_TOKEN").ok_or(ConfigError::Missing("TARGET_TOKEN"))?;
        let private_key = get("PRIVATE_KEY").ok_or(ConfigError::Missing("PRIVATE_KEY"))?;
        let recipient = get("RECIPIENT").ok_or(ConfigError::Missing("RECIPIENT"))?;
        let node_uri = get("NODE_WSS").ok_or(ConfigError::Missing("NODE_WSS"))?;

        if !(node_uri.starts_with("ws://") || node_uri.starts_with("wss://")) {
            return Err(invalid("NODE_WSS", "expected a ws:// or wss:// endpoint"));
        }

        let token = parse_address("TARGET_TOKEN", &token)?;
        let recipient = parse_address("RECIPIENT", &recipient)?;
        let signer = private_key
            .parse::<PrivateKeySigner>()
            .map_err(|e| invalid("PRIVATE_KEY", e))?;

        let router = match get("ROUTER") {
            Some(v) => parse_address("ROUTER", &v)?,
            None => DEFAULT_ROUTER,
        };
        let base = match get("WETH") {
            Some(v) => parse_address("WETH", &v)?,
            None => DEFAULT_WETH,
        };

        let purchase_amount = {
            let raw = get("PURCHASEAMOUNT").unwrap_or_else(|| "0.01".to_string());
            parse_ether(&raw).map_err(|e| invalid("PURCHASEAMOUNT", e))?
        };
        let gas_limit: u64 = parse_or("GASLIMIT", get("GASLIMIT"), 1_000_000)?;
        let gas_price = {
            let raw = get("GASPRICE").unwrap_or_else(|| "5".to_string());
            let wei = parse_units(&raw, "gwei")
                .map_err(|e| invalid("GASPRICE", e))?
                .get_absolute();
            u128::try_from(wei).map_err(|e| invalid("GASPRICE", e))?
        };

        let config = SniperConfig {
            node_uri,
            signer,
            recipient,
            router,
            pair: TradingPair::new(base, token),
            purchase_amount,
            gas_limit,
            gas_price,
            buy_delay: Duration::from_secs(parse_or("BUY_DELAY_SECS", get("BUY_DELAY_SECS"), 1)?),
            buy_retries: parse_or("BUY_RETRIES", get("BUY_RETRIES"), 3)?,
            retry_min_timeout: Duration::from_millis(parse_or(
                "RETRY_MIN_TIMEOUT_MS",
                get("RETRY_MIN_TIMEOUT_MS"),
                250,
            )?),
            retry_max_timeout: Duration::from_millis(parse_or(
                "RETRY_MAX_TIMEOUT_MS",
                get("RETRY_MAX_TIMEOUT_MS"),
                3_000,
            )?),
            deadline: Duration::from_secs(parse_or("DEADLINE_SECS", get("DEADLINE_SECS"), 60)?),
            heartbeat_interval: Duration::from_millis(parse_or(
                "HEARTBEAT_INTERVAL_MS",
                get("HEARTBEAT_INTERVAL_MS"),
                KEEP_ALIVE_CHECK_INTERVAL_MS,
            )?),
            pong_timeout: Duration::from_millis(parse_or(
                "PONG_TIMEOUT_MS",
                get("PONG_TIMEOUT_MS"),
                EXPECTED_PONG_BACK_MS,
            )?),
            reconnect_delay: Duration::from_millis(parse_or(
                "RECONNECT_DELAY_MS",
                get("RECONNECT_DELAY_MS"),
                0,
            )?),
            resolve_timeout: Duration::from_millis(parse_or(
                "RESOLVE_TIMEOUT_MS",
                get("RESOLVE_TIMEOUT_MS"),
                5_000,
            )?),
            strict_selector: parse_or("STRICT_SELECTOR", get("STRICT_SELECTOR"), false)?,
            channel_capacity: parse_or("CHANNEL_CAPACITY", get("CHANNEL_CAPACITY"), 4_096)?,
            stats_interval: parse_or("STATS_INTERVAL", get("STATS_INTERVAL"), 10_000)?,
        };

        config.validate()?;
        Ok(config)
    }

    /// Non-zero invariants that must hold before the connection starts
    fn validate(&self) -> Result<(), ConfigError> {
        if self.purchase_amount.is_zero() {
            return Err(invalid("PURCHASEAMOUNT", "must be greater than zero"));
        }
        if self.gas_limit == 0 {
            return Err(invalid("GASLIMIT", "must be greater than zero"));
        }
        if self.gas_price == 0 {
            return Err(invalid("GASPRICE", "must be greater than zero"));
        }
        if self.recipient.is_zero() {
            return Err(invalid("RECIPIENT", "zero address"));
        }
        if self.pair.token.is_zero() {
            return Err(invalid("TARGET_TOKEN", "zero address"));
        }
        if self.buy_delay.is_zero() {
            return Err(invalid("BUY_DELAY_SECS", "must be greater than zero"));
        }
        if self.buy_retries == 0 {
            return Err(invalid("BUY_RETRIES", "must be greater than zero"));
        }
        if self.retry_min_timeout.is_zero() || self.retry_min_timeout > self.retry_max_timeout {
            return Err(invalid(
                "RETRY_MIN_TIMEOUT_MS",
                "must be non-zero and <= RETRY_MAX_TIMEOUT_MS",
            ));
        }
        if self.deadline.is_zero() {
            return Err(invalid("DEADLINE_SECS", "must be greater than zero"));
        }
        if self.heartbeat_interval.is_zero() || self.pong_timeout.is_zero() {
            return Err(invalid("HEARTBEAT_INTERVAL_MS", "heartbeat and pong timeout must be non-zero"));
        }
        if self.channel_capacity == 0 {
            return Err(invalid("CHANNEL_CAPACITY", "must be greater than zero"));
        }
        Ok(())
    }
}

fn parse_address(key: &'static str, raw: &str) -> Result<Address, ConfigError> {
    Address::from_str(raw).map_err(|e| invalid(key, e))
}

fn parse_or<T>(key: &'static str, raw: Option<String>, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    match raw {
        Some(v) => v.parse::<T>().map_err(|e| invalid(key, e)),
        None => Ok(default),
    }
}
