//! Reconnecting consumer for the viewer event stream.
//!
//! The agent owns the retry discipline: exponential backoff doubling from a
//! base delay up to a cap, reset after every successful connection, and at
//! most one pending reconnect at a time because the loop itself is the only
//! place a retry is ever scheduled. Frames with unknown event types are
//! skipped so old clients survive server upgrades.

use std::{
    collections::HashMap,
    sync::Mutex,
    time::Duration,
};

use futures::future::BoxFuture;
use thiserror::Error;
use tokio::{sync::mpsc, time::sleep};
use tracing::{debug, info, warn};

use crate::dto::events::{ContestStatusUpdate, WireEvent, parse_known};

/// Failure to establish a stream connection.
#[derive(Debug, Error)]
#[error("connection failed: {message}")]
pub struct ConnectError {
    /// Human-readable cause.
    pub message: String,
}

/// Source of event frames. Implementations wrap an actual WebSocket dial;
/// tests script sequences of failures and frame batches.
pub trait EventConnector: Send + Sync {
    /// Establish a connection, yielding a channel of raw text frames that
    /// closes when the connection drops.
    fn connect(&self) -> BoxFuture<'static, Result<mpsc::UnboundedReceiver<String>, ConnectError>>;
}

/// Retry delay schedule: doubles from `base` and saturates at `cap`.
#[derive(Debug, Clone, Copy)]
pub struct BackoffPolicy {
    /// Delay before the first retry.
    pub base: Duration,
    /// Largest delay ever waited.
    pub cap: Duration,
}

impl BackoffPolicy {
    /// Schedule taken from the shared application configuration.
    pub fn from_config(config: &crate::config::AppConfig) -> Self {
        Self {
            base: config.reconnect_base,
            cap: config.reconnect_cap,
        }
    }

    /// Delay before retry number `attempt` (zero-based).
    pub fn delay(&self, attempt: u32) -> Duration {
        let doubled = self
            .base
            .checked_mul(1u32 << attempt.min(31))
            .unwrap_or(self.cap);
        doubled.min(self.cap)
    }
}

type Handler = Box<dyn Fn(&WireEvent) + Send + Sync>;

/// Event-stream consumer that survives connection loss.
pub struct ReconnectAgent<C> {
    connector: C,
    policy: BackoffPolicy,
    handlers: HashMap<&'static str, Handler>,
    last_status: Mutex<Option<ContestStatusUpdate>>,
}

impl<C: EventConnector> ReconnectAgent<C> {
    pub fn new(connector: C, policy: BackoffPolicy) -> Self {
        Self {
            connector,
            policy,
            handlers: HashMap::new(),
            last_status: Mutex::new(None),
        }
    }

    /// Register a handler for one event tag, replacing any previous one.
    pub fn on(mut self, tag: &'static str, handler: impl Fn(&WireEvent) + Send + Sync + 'static) -> Self {
        self.handlers.insert(tag, Box::new(handler));
        self
    }

    /// Mirror of the server's contest status, merged from received
    /// `CONTEST_STATUS_UPDATE` events.
    pub fn last_status(&self) -> Option<ContestStatusUpdate> {
        self.last_status
            .lock()
            .ok()
            .and_then(|guard| guard.clone())
    }

    /// Consume the stream until `shutdown` resolves, reconnecting with
    /// backoff whenever the connection fails or closes.
    pub async fn run(&self, mut shutdown: tokio::sync::watch::Receiver<bool>) {
        let mut attempt: u32 = 0;

        loop {
            match self.connector.connect().await {
                Ok(mut frames) => {
                    info!("event stream connected");
                    attempt = 0;

                    loop {
                        tokio::select! {
                            frame = frames.recv() => match frame {
                                Some(text) => self.dispatch(&text),
                                None => {
                                    warn!("event stream closed, scheduling reconnect");
                                    break;
                                }
                            },
                            _ = shutdown.changed() => {
                                if *shutdown.borrow() {
                                    return;
                                }
                            }
                        }
                    }
                }
                Err(err) => {
                    warn!(error = %err, "event stream connection failed");
                }
            }

            let delay = self.policy.delay(attempt);
            attempt = attempt.saturating_add(1);
            debug!(attempt, delay_ms = delay.as_millis() as u64, "waiting before reconnect");

            tokio::select! {
                _ = sleep(delay) => {}
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        return;
                    }
                }
            }
        }
    }

    fn dispatch(&self, text: &str) {
        match parse_known(text) {
            Ok(Some(event)) => {
                if let Some(update) = event.kind.status_update()
                    && let Ok(mut guard) = self.last_status.lock()
                {
                    match guard.as_mut() {
                        Some(existing) => existing.merge_from(update),
                        None => *guard = Some(update.clone()),
                    }
                }

                if let Some(handler) = self.handlers.get(event.kind.tag()) {
                    handler(&event);
                } else {
                    debug!(tag = event.kind.tag(), "no handler registered for event");
                }
            }
            // Unknown event types are skipped, not errors.
            Ok(None) => debug!("ignoring unknown event type"),
            Err(err) => warn!(error = %err, "dropping malformed frame"),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        Arc,
        atomic::{AtomicU32, Ordering},
    };

    use super::*;
    use crate::{dto::events::EventKind, state::clock::ContestStatus};
    use tokio::sync::watch;

    /// Scripted connector: a sequence of connection outcomes, each either a
    /// failure or a batch of frames delivered before the stream closes.
    struct Scripted {
        outcomes: Mutex<Vec<Option<Vec<String>>>>,
        attempts: Arc<AtomicU32>,
    }

    impl Scripted {
        fn new(outcomes: Vec<Option<Vec<String>>>) -> Self {
            Self {
                outcomes: Mutex::new(outcomes),
                attempts: Arc::new(AtomicU32::new(0)),
            }
        }
    }

    impl EventConnector for Scripted {
        fn connect(
            &self,
        ) -> BoxFuture<'static, Result<mpsc::UnboundedReceiver<String>, ConnectError>> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            let next = self.outcomes.lock().unwrap().pop();
            Box::pin(async move {
                match next.flatten() {
                    Some(frames) => {
                        let (tx, rx) = mpsc::unbounded_channel();
                        for frame in frames {
                            let _ = tx.send(frame);
                        }
                        // Dropping tx closes the stream after the batch.
                        Ok(rx)
                    }
                    None => Err(ConnectError {
                        message: "refused".into(),
                    }),
                }
            })
        }
    }

    fn policy() -> BackoffPolicy {
        BackoffPolicy {
            base: Duration::from_secs(1),
            cap: Duration::from_secs(30),
        }
    }

    fn status_frame(paused: bool) -> String {
        serde_json::to_string(&WireEvent {
            kind: EventKind::ContestStatusUpdate(ContestStatusUpdate {
                status: Some(ContestStatus::Paused),
                is_paused: Some(paused),
                ..Default::default()
            }),
            timestamp: "2026-08-24T12:00:00Z".into(),
        })
        .unwrap()
    }

    #[test]
    fn backoff_doubles_and_saturates_at_the_cap() {
        let policy = policy();
        let delays: Vec<u64> = (0..7).map(|n| policy.delay(n).as_secs()).collect();
        assert_eq!(delays, vec![1, 2, 4, 8, 16, 30, 30]);
    }

    #[test]
    fn huge_attempt_counts_do_not_overflow() {
        assert_eq!(policy().delay(u32::MAX), Duration::from_secs(30));
    }

    #[tokio::test(start_paused = true)]
    async fn failures_back_off_and_success_resets_the_schedule() {
        // Scripts pop from the back: two failures, a success, a failure,
        // then endless failures once the script is exhausted.
        let connector = Scripted::new(vec![
            None,
            Some(vec![]),
            None,
            None,
        ]);
        let attempts = connector.attempts.clone();

        let agent = Arc::new(ReconnectAgent::new(connector, policy()));
        let (stop_tx, stop_rx) = watch::channel(false);
        let runner = {
            let agent = agent.clone();
            tokio::spawn(async move { agent.run(stop_rx).await })
        };

        // Paused time auto-advances through the sleeps; after the two
        // initial failures (1s, 2s) the third attempt connects, the stream
        // closes immediately and the next delay starts back at the base.
        tokio::time::sleep(Duration::from_secs(60)).await;
        assert!(attempts.load(Ordering::SeqCst) >= 4);

        let _ = stop_tx.send(true);
        let _ = runner.await;
    }

    #[tokio::test(start_paused = true)]
    async fn status_events_update_the_mirror_and_reach_handlers() {
        let seen = Arc::new(AtomicU32::new(0));
        let connector = Scripted::new(vec![Some(vec![
            status_frame(true),
            r#"{"type": "SOME_FUTURE_EVENT", "payload": {}, "timestamp": "x"}"#.into(),
            "{not json".into(),
        ])]);

        let handler_seen = seen.clone();
        let agent = Arc::new(
            ReconnectAgent::new(connector, policy()).on("CONTEST_STATUS_UPDATE", move |_| {
                handler_seen.fetch_add(1, Ordering::SeqCst);
            }),
        );

        let (stop_tx, stop_rx) = watch::channel(false);
        let runner = {
            let agent = agent.clone();
            tokio::spawn(async move { agent.run(stop_rx).await })
        };

        tokio::time::sleep(Duration::from_secs(5)).await;
        let _ = stop_tx.send(true);
        let _ = runner.await;

        // One known frame dispatched; the unknown and malformed ones skipped.
        assert_eq!(seen.load(Ordering::SeqCst), 1);
        let status = agent.last_status().expect("mirror populated");
        assert_eq!(status.is_paused, Some(true));
        assert_eq!(status.status, Some(ContestStatus::Paused));
    }
}
