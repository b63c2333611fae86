//! Buy Executor Module
//!
//! backoff.rs : RetryPolicy (bounded exponential backoff with jitter)
//! buyer.rs   : BuyExecutor, SwapSubmitter seam, BuyOutcome

pub mod backoff;
pub mod buyer;

pub use backoff::RetryPolicy;
pub use buyer::{BuyExecutor, BuyOutcome, OrderTemplate, SubmissionAttempt, SwapSubmitter};
