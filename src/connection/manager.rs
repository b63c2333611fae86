//! Connection supervisor
//!
//! Purpose:
//!     Open a session, subscribe to pending transactions, keep it alive with
//!     ping/pong and replace it whenever it dies. Never gives up: the only
//!     way out of `run` is the downstream channel closing.
//!
//! Heartbeat:
//!     Every `heartbeat_interval` a ping is sent and, if none is armed yet, a
//!     pong deadline of `pong_timeout` starts. A pong clears it. An expired
//!     deadline terminates the session and counts as a close.

use alloy::primitives::{Address, TxHash};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, info, warn};

use super::state::{pong_expired, ConnectionPhase, ConnectionState};
use super::{Session, SessionConnector, SessionError, SessionEvent};
use crate::config::SniperConfig;

#[derive(Debug, Clone)]
pub struct ConnectionSettings {
    pub uri: String,
    /// Only used for the readiness log
    pub router: Address,
    pub heartbeat_interval: Duration,
    pub pong_timeout: Duration,
    /// Pause before reopening (zero = immediately)
    pub reconnect_delay: Duration,
}

impl ConnectionSettings {
    pub fn from_config(config: &SniperConfig) -> Self {
        Self {
            uri: config.node_uri.clone(),
            router: config.router,
            heartbeat_interval: config.heartbeat_interval,
            pong_timeout: config.pong_timeout,
            reconnect_delay: config.reconnect_delay,
        }
    }
}

/// Why a session ended
#[derive(Debug)]
pub enum SessionEnd {
    Closed(Option<String>),
    Failed(SessionError),
    PongTimeout,
    /// Nobody is listening any more; stop for good
    SinkClosed,
}

pub struct ConnectionManager<C: SessionConnector> {
    connector: C,
    settings: ConnectionSettings,
}

impl<C: SessionConnector> ConnectionManager<C> {
    pub fn new(connector: C, settings: ConnectionSettings) -> Self {
        Self {
            connector,
            settings,
        }
    }

    /// Supervisor loop. Returns the number of sessions opened once `sink`
    /// is closed.
    pub async fn run(&self, sink: mpsc::Sender<TxHash>) -> u64 {
        let mut sessions = 0u64;

        loop {
            if sink.is_closed() {
                break;
            }
            sessions += 1;

            match self.watch(&sink).await {
                SessionEnd::SinkClosed => break,
                SessionEnd::Closed(reason) => {
                    warn!(
                        "WebSocket closed ({}), reconnecting",
                        reason.as_deref().unwrap_or("no reason")
                    );
                }
                SessionEnd::Failed(e) => {
                    warn!("WebSocket error: {}, reconnecting", e);
                }
                SessionEnd::PongTimeout => {
                    warn!(
                        "No pong within {}ms, terminating and reconnecting",
                        self.settings.pong_timeout.as_millis()
                    );
                }
            }

            if self.settings.reconnect_delay.is_zero() {
                tokio::task::yield_now().await;
            } else {
                tokio::time::sleep(self.settings.reconnect_delay).await;
            }
        }

        info!("Connection manager stopped after {} session(s)", sessions);
        sessions
    }

    /// One full session: open, subscribe, then pump events until it ends.
    /// The `ConnectionState` (and its timers) is dropped on every return path.
    async fn watch(&self, sink: &mpsc::Sender<TxHash>) -> SessionEnd {
        let session = match self.connector.open(&self.settings.uri).await {
            Ok(session) => session,
            Err(e) => return SessionEnd::Failed(e),
        };
        let mut state = ConnectionState::new(
            session,
            self.settings.heartbeat_interval,
            self.settings.pong_timeout,
        );

        info!("WebSocket connected");
        info!("Watching router {}", self.settings.router.to_checksum(None));

        if let Err(e) = state.session.subscribe_pending().await {
            return Self::shut(&mut state, SessionEnd::Failed(e)).await;
        }
        state.phase = ConnectionPhase::Open;

        loop {
            tokio::select! {
                event = state.session.next_event() => match event {
                    SessionEvent::PendingTx(hash) => {
                        if state.mark_first_tx() {
                            info!("Still watching for liquidity...");
                        }
                        match sink.try_send(hash) {
                            Ok(()) => {}
                            Err(TrySendError::Full(_)) => {
                                debug!("Filter backlog full, dropping {:?}", hash);
                            }
                            Err(TrySendError::Closed(_)) => {
                                return Self::shut(&mut state, SessionEnd::SinkClosed).await;
                            }
                        }
                    }
                    SessionEvent::Pong => state.clear_pong_deadline(),
                    SessionEvent::Closed(reason) => {
                        state.phase = ConnectionPhase::Closed;
                        return Self::shut(&mut state, SessionEnd::Closed(reason)).await;
                    }
                    SessionEvent::Error(e) => {
                        return Self::shut(&mut state, SessionEnd::Failed(e)).await;
                    }
                },
                _ = state.heartbeat.tick() => {
                    if let Err(e) = state.session.ping().await {
                        return Self::shut(&mut state, SessionEnd::Failed(e)).await;
                    }
                    state.arm_pong_deadline();
                }
                _ = pong_expired(&mut state.pong_deadline) => {
                    return Self::shut(&mut state, SessionEnd::PongTimeout).await;
                }
                _ = sink.closed() => {
                    return Self::shut(&mut state, SessionEnd::SinkClosed).await;
                }
            }
        }
    }

    /// Terminate the session once; a session the peer already closed is
    /// left alone.
    async fn shut(state: &mut ConnectionState<C::Session>, end: SessionEnd) -> SessionEnd {
        if matches!(state.phase, ConnectionPhase::Connecting | ConnectionPhase::Open) {
            state.phase = ConnectionPhase::Closing;
            state.session.terminate().await;
        }
        state.phase = ConnectionPhase::Closed;
        debug!("Session ended: {:?}", end);
        end
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::B256;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct Counters {
        opens: AtomicUsize,
        subscribes: AtomicUsize,
        pings: AtomicUsize,
        terminates: AtomicUsize,
    }

    fn count(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }

    /// Scripted session: replays its events, then either goes silent or
    /// answers pings, depending on `responsive`.
    struct FakeSession {
        events: VecDeque<SessionEvent>,
        responsive: bool,
        pong_owed: bool,
        fail_subscribe: bool,
        counters: Arc<Counters>,
    }

    #[async_trait]
    impl Session for FakeSession {
        async fn subscribe_pending(&mut self) -> Result<(), SessionError> {
            self.counters.subscribes.fetch_add(1, Ordering::SeqCst);
            if self.fail_subscribe {
                return Err(SessionError::Rpc("subscription limit reached".to_string()));
            }
            Ok(())
        }

        async fn ping(&mut self) -> Result<(), SessionError> {
            self.counters.pings.fetch_add(1, Ordering::SeqCst);
            if self.responsive {
                self.pong_owed = true;
            }
            Ok(())
        }

        async fn next_event(&mut self) -> SessionEvent {
            tokio::task::yield_now().await;
            if std::mem::take(&mut self.pong_owed) {
                return SessionEvent::Pong;
            }
            match self.events.pop_front() {
                Some(event) => event,
                None => std::future::pending().await,
            }
        }

        async fn terminate(&mut self) {
            self.counters.terminates.fetch_add(1, Ordering::SeqCst);
        }
    }

    struct FakeConnector {
        scripts: Mutex<VecDeque<(Vec<SessionEvent>, bool)>>,
        /// Used once the scripts run out
        default_responsive: bool,
        /// Number of leading opens that fail outright
        open_failures: AtomicUsize,
        /// Number of following sessions whose subscribe fails
        subscribe_failures: AtomicUsize,
        counters: Arc<Counters>,
    }

    impl FakeConnector {
        fn new(scripts: Vec<(Vec<SessionEvent>, bool)>, default_responsive: bool) -> Self {
            Self {
                scripts: Mutex::new(scripts.into()),
                default_responsive,
                open_failures: AtomicUsize::new(0),
                subscribe_failures: AtomicUsize::new(0),
                counters: Arc::new(Counters::default()),
            }
        }
    }

    #[async_trait]
    impl SessionConnector for FakeConnector {
        type Session = FakeSession;

        async fn open(&self, _uri: &str) -> Result<FakeSession, SessionError> {
            self.counters.opens.fetch_add(1, Ordering::SeqCst);
            if take_one(&self.open_failures) {
                return Err(SessionError::Closed);
            }
            let fail_subscribe = take_one(&self.subscribe_failures);
            let (events, responsive) = self
                .scripts
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or((Vec::new(), self.default_responsive));
            Ok(FakeSession {
                events: events.into(),
                responsive,
                pong_owed: false,
                fail_subscribe,
                counters: Arc::clone(&self.counters),
            })
        }
    }

    /// Decrement a failure budget; true while it was non-zero
    fn take_one(budget: &AtomicUsize) -> bool {
        budget
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }

    fn settings() -> ConnectionSettings {
        ConnectionSettings {
            uri: "ws://localhost:8546".to_string(),
            router: crate::config::DEFAULT_ROUTER,
            heartbeat_interval: Duration::from_secs(15),
            pong_timeout: Duration::from_secs(30),
            reconnect_delay: Duration::ZERO,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_pong_timeout_reconnects_exactly_once() {
        // First session never answers; the second does
        let connector = FakeConnector::new(vec![(Vec::new(), false)], true);
        let counters = Arc::clone(&connector.counters);
        let manager = Arc::new(ConnectionManager::new(connector, settings()));
        let (tx, _rx) = mpsc::channel(8);

        let task = tokio::spawn({
            let manager = Arc::clone(&manager);
            async move { manager.run(tx).await }
        });

        // Pings at 15s and 30s, deadline (armed at 15s) expires at 45s
        tokio::time::sleep(Duration::from_secs(44)).await;
        assert_eq!(count(&counters.opens), 1);
        assert_eq!(count(&counters.terminates), 0);

        tokio::time::sleep(Duration::from_secs(56)).await;
        assert_eq!(count(&counters.terminates), 1);
        assert_eq!(count(&counters.opens), 2);
        assert_eq!(count(&counters.subscribes), 2);

        task.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn test_silent_sessions_keep_reconnecting() {
        let connector = FakeConnector::new(Vec::new(), false);
        let counters = Arc::clone(&connector.counters);
        let manager = ConnectionManager::new(connector, settings());
        let (tx, _rx) = mpsc::channel(8);

        let task = tokio::spawn(async move { manager.run(tx).await });

        // Deadlines at 45s and 90s
        tokio::time::sleep(Duration::from_secs(100)).await;
        assert_eq!(count(&counters.terminates), 2);
        assert_eq!(count(&counters.opens), 3);

        task.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn test_n_closes_give_n_plus_one_sessions() {
        let n = 5;
        let scripts = (0..n)
            .map(|i| {
                let end = if i % 2 == 0 {
                    SessionEvent::Closed(Some("going away".to_string()))
                } else {
                    SessionEvent::Error(SessionError::Closed)
                };
                (vec![end], true)
            })
            .collect();
        let connector = FakeConnector::new(scripts, true);
        let counters = Arc::clone(&connector.counters);
        let manager = ConnectionManager::new(connector, settings());
        let (tx, _rx) = mpsc::channel(8);

        let task = tokio::spawn(async move { manager.run(tx).await });
        tokio::time::sleep(Duration::from_secs(10)).await;

        assert_eq!(count(&counters.opens), n + 1);
        assert_eq!(count(&counters.subscribes), n + 1);
        task.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn test_responsive_session_stays_up() {
        let connector = FakeConnector::new(Vec::new(), true);
        let counters = Arc::clone(&connector.counters);
        let manager = ConnectionManager::new(connector, settings());
        let (tx, _rx) = mpsc::channel(8);

        let task = tokio::spawn(async move { manager.run(tx).await });
        tokio::time::sleep(Duration::from_secs(310)).await;

        assert_eq!(count(&counters.opens), 1);
        assert_eq!(count(&counters.pings), 20);
        assert_eq!(count(&counters.terminates), 0);
        task.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_open_and_subscribe_still_reconnect() {
        let connector = FakeConnector::new(Vec::new(), true);
        connector.open_failures.store(2, Ordering::SeqCst);
        connector.subscribe_failures.store(1, Ordering::SeqCst);
        let counters = Arc::clone(&connector.counters);
        let manager = ConnectionManager::new(connector, settings());
        let (tx, _rx) = mpsc::channel(8);

        let task = tokio::spawn(async move { manager.run(tx).await });
        tokio::time::sleep(Duration::from_secs(10)).await;

        // 2 refused opens, 1 rejected subscribe, then a healthy session
        assert_eq!(count(&counters.opens), 4);
        assert_eq!(count(&counters.subscribes), 2);
        assert_eq!(count(&counters.terminates), 1);
        task.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn test_peer_close_is_not_terminated_again() {
        let script = vec![SessionEvent::Closed(None)];
        let connector = FakeConnector::new(vec![(script, true)], true);
        let counters = Arc::clone(&connector.counters);
        let manager = ConnectionManager::new(connector, settings());
        let (tx, _rx) = mpsc::channel(8);

        let task = tokio::spawn(async move { manager.run(tx).await });
        tokio::time::sleep(Duration::from_secs(10)).await;

        assert_eq!(count(&counters.opens), 2);
        assert_eq!(count(&counters.terminates), 0);
        task.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn test_hashes_delivered_and_sink_close_stops() {
        let h1 = B256::repeat_byte(1);
        let h2 = B256::repeat_byte(2);
        let script = vec![SessionEvent::PendingTx(h1), SessionEvent::PendingTx(h2)];
        let connector = FakeConnector::new(vec![(script, true)], true);
        let counters = Arc::clone(&connector.counters);
        let manager = ConnectionManager::new(connector, settings());
        let (tx, mut rx) = mpsc::channel(8);

        let task = tokio::spawn(async move { manager.run(tx).await });

        assert_eq!(rx.recv().await, Some(h1));
        assert_eq!(rx.recv().await, Some(h2));
        drop(rx);

        let sessions = task.await.unwrap();
        assert_eq!(sessions, 1);
        assert_eq!(count(&counters.terminates), 1);
    }
}
