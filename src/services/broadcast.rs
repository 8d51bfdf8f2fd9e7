//! Connection registry and fan-out engine for viewer WebSockets.
//!
//! Each connection owns a dedicated writer task fed through an unbounded
//! channel; the engine only ever touches the channel sender, so one slow or
//! dead socket can never stall delivery to the others.

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use axum::extract::ws::Message;
use dashmap::DashMap;
use tokio::sync::{RwLock, mpsc};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    dto::events::{ConnectionEstablished, ContestStatusUpdate, EventKind, WireEvent},
    state::SharedState,
};

/// Handle used to push frames to one connected viewer.
#[derive(Clone)]
pub struct ClientConnection {
    tx: mpsc::UnboundedSender<Message>,
    /// Flipped false at each heartbeat tick, set true again by a pong.
    alive: Arc<AtomicBool>,
}

/// Registry of live viewer connections plus the last-known contest status.
pub struct BroadcastEngine {
    connections: DashMap<Uuid, ClientConnection>,
    cached_status: RwLock<Option<ContestStatusUpdate>>,
}

impl BroadcastEngine {
    pub fn new() -> Self {
        Self {
            connections: DashMap::new(),
            cached_status: RwLock::new(None),
        }
    }

    /// Register a connection and greet it: a `CONNECTION_ESTABLISHED` frame
    /// first, then the cached contest status so late joiners render current
    /// state without waiting for the next change.
    pub async fn register(&self, tx: mpsc::UnboundedSender<Message>) -> Uuid {
        let id = Uuid::new_v4();
        let connection = ClientConnection {
            tx: tx.clone(),
            alive: Arc::new(AtomicBool::new(true)),
        };
        self.connections.insert(id, connection);
        info!(connection_id = %id, total = self.connections.len(), "viewer connected");

        send_frame(
            &tx,
            &WireEvent::now(EventKind::ConnectionEstablished(ConnectionEstablished {
                connection_id: id,
            })),
        );

        let cached = { self.cached_status.read().await.clone() };
        if let Some(status) = cached {
            send_frame(
                &tx,
                &WireEvent::now(EventKind::ContestStatusUpdate(status)),
            );
        }

        id
    }

    /// Drop a connection from the registry. Idempotent.
    pub fn deregister(&self, id: Uuid) {
        if self.connections.remove(&id).is_some() {
            info!(connection_id = %id, total = self.connections.len(), "viewer disconnected");
        }
    }

    /// Record a liveness proof (a pong) for the given connection.
    pub fn mark_alive(&self, id: Uuid) {
        if let Some(connection) = self.connections.get(&id) {
            connection.alive.store(true, Ordering::Relaxed);
        }
    }

    /// Number of currently registered connections.
    pub fn client_count(&self) -> usize {
        self.connections.len()
    }

    /// Last contest status pushed through the engine, if any.
    pub async fn cached_status(&self) -> Option<ContestStatusUpdate> {
        self.cached_status.read().await.clone()
    }

    /// Fan an event out to every registered connection, returning how many
    /// deliveries were queued. Connections whose writer is gone are pruned;
    /// a contest-status event also refreshes the late-joiner cache before
    /// delivery.
    pub async fn publish(&self, kind: EventKind) -> usize {
        if let Some(update) = kind.status_update() {
            let mut cached = self.cached_status.write().await;
            match cached.as_mut() {
                Some(existing) => existing.merge_from(update),
                None => *cached = Some(update.clone()),
            }
        }

        let event = WireEvent::now(kind);
        let payload = match serde_json::to_string(&event) {
            Ok(payload) => payload,
            Err(err) => {
                warn!(error = %err, tag = event.kind.tag(), "failed to serialize event, dropping");
                return 0;
            }
        };

        let mut delivered = 0;
        let mut stale = Vec::new();
        for entry in self.connections.iter() {
            if entry
                .value()
                .tx
                .send(Message::Text(payload.clone().into()))
                .is_ok()
            {
                delivered += 1;
            } else {
                stale.push(*entry.key());
            }
        }

        for id in stale {
            warn!(connection_id = %id, "writer gone, pruning connection");
            self.connections.remove(&id);
        }

        debug!(tag = event.kind.tag(), delivered, "event published");
        delivered
    }

    /// One heartbeat pass: connections that never answered the previous ping
    /// are closed and dropped, survivors get a fresh ping and must pong
    /// before the next pass. A viewer is declared dead after at most two
    /// intervals without proof of life.
    fn sweep(&self) {
        let mut dead = Vec::new();
        for entry in self.connections.iter() {
            let connection = entry.value();
            if connection.alive.swap(false, Ordering::Relaxed) {
                let _ = connection.tx.send(Message::Ping(Vec::new().into()));
            } else {
                dead.push(*entry.key());
            }
        }

        for id in dead {
            if let Some((_, connection)) = self.connections.remove(&id) {
                info!(connection_id = %id, "no pong since last ping, closing connection");
                let _ = connection.tx.send(Message::Close(None));
            }
        }
    }
}

impl Default for BroadcastEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// Periodic liveness sweep over all viewer connections. Runs until the
/// process shuts down.
pub async fn run_heartbeat(state: SharedState) {
    let mut ticker = tokio::time::interval(state.config().heartbeat_interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    // First tick fires immediately; skip it so connections get a full
    // interval before the first ping.
    ticker.tick().await;

    loop {
        ticker.tick().await;
        state.broadcast().sweep();
    }
}

/// Serialize a frame and queue it on a single connection's writer.
fn send_frame(tx: &mpsc::UnboundedSender<Message>, event: &WireEvent) {
    match serde_json::to_string(event) {
        Ok(payload) => {
            let _ = tx.send(Message::Text(payload.into()));
        }
        Err(err) => {
            warn!(error = %err, tag = event.kind.tag(), "failed to serialize frame");
        }
    }
}
