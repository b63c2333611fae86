//! Per-connection state
//!
//! A `ConnectionState` is built for every session and dropped with it.
//! Timers belong to the state, so tearing it down cancels the heartbeat and
//! any armed pong deadline in one step and nothing from a dead session can
//! fire into its successor.

use std::pin::Pin;
use std::time::Duration;
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior, Sleep};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionPhase {
    Connecting,
    Open,
    Closing,
    Closed,
}

pub struct ConnectionState<S> {
    pub phase: ConnectionPhase,
    pub session: S,
    /// First tick one period after creation
    pub heartbeat: Interval,
    /// Armed by a ping, cleared by a pong
    pub pong_deadline: Option<Pin<Box<Sleep>>>,
    pong_timeout: Duration,
    first_tx_seen: bool,
}

impl<S> ConnectionState<S> {
    pub fn new(session: S, heartbeat_interval: Duration, pong_timeout: Duration) -> Self {
        let mut heartbeat = interval_at(Instant::now() + heartbeat_interval, heartbeat_interval);
        heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);

        Self {
            phase: ConnectionPhase::Connecting,
            session,
            heartbeat,
            pong_deadline: None,
            pong_timeout,
            first_tx_seen: false,
        }
    }

    /// Arm the pong deadline unless one is already running. A ping sent while
    /// waiting for an earlier pong must not push the deadline back.
    pub fn arm_pong_deadline(&mut self) {
        if self.pong_deadline.is_none() {
            self.pong_deadline = Some(Box::pin(tokio::time::sleep(self.pong_timeout)));
        }
    }

    pub fn clear_pong_deadline(&mut self) {
        self.pong_deadline = None;
    }

    pub fn pong_pending(&self) -> bool {
        self.pong_deadline.is_some()
    }

    /// Returns true the first time only
    pub fn mark_first_tx(&mut self) -> bool {
        !std::mem::replace(&mut self.first_tx_seen, true)
    }
}

/// Resolves when the armed deadline passes; never resolves while unarmed.
pub async fn pong_expired(deadline: &mut Option<Pin<Box<Sleep>>>) {
    match deadline {
        Some(sleep) => sleep.as_mut().await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_arm_does_not_extend_deadline() {
        let mut state = ConnectionState::new((), Duration::from_secs(15), Duration::from_secs(30));
        let start = Instant::now();

        state.arm_pong_deadline();
        tokio::time::sleep(Duration::from_secs(15)).await;
        state.arm_pong_deadline();
        assert!(state.pong_pending());

        pong_expired(&mut state.pong_deadline).await;
        assert_eq!(start.elapsed(), Duration::from_secs(30));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cleared_deadline_never_fires() {
        let mut state = ConnectionState::new((), Duration::from_secs(15), Duration::from_secs(30));
        state.arm_pong_deadline();
        state.clear_pong_deadline();
        assert!(!state.pong_pending());

        let fired = tokio::time::timeout(
            Duration::from_secs(120),
            pong_expired(&mut state.pong_deadline),
        )
        .await;
        assert!(fired.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_heartbeat_first_tick_after_one_period() {
        let mut state = ConnectionState::new((), Duration::from_secs(15), Duration::from_secs(30));
        let start = Instant::now();
        state.heartbeat.tick().await;
        assert_eq!(start.elapsed(), Duration::from_secs(15));
        state.heartbeat.tick().await;
        assert_eq!(start.elapsed(), Duration::from_secs(30));
    }

    #[tokio::test]
    async fn test_first_tx_flag() {
        let mut state = ConnectionState::new((), Duration::from_secs(15), Duration::from_secs(30));
        assert_eq!(state.phase, ConnectionPhase::Connecting);
        assert!(state.mark_first_tx());
        assert!(!state.mark_first_tx());
    }
}
