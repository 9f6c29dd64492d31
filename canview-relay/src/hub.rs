//! ## canview-relay::hub
//! **Broadcast hub with publish-to-all semantics**
//!
//! Every published envelope is delivered to every party connected at the
//! time of publishing, the publisher included. There is no backlog: a party
//! that connects later sees only what is published after it subscribed.
//!
//! Fan-out happens inside a single `broadcast::Sender::send`, so one
//! envelope is queued for all parties before the next publish starts and
//! every party observes the same order. Delivery is best-effort: a party
//! that falls more than `capacity` envelopes behind skips the overflow.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, info, warn};

use canview_core::events::Envelope;
use canview_telemetry::MetricsRecorder;

pub type ConnectionId = u64;

#[derive(Debug, Clone)]
pub struct ConnectionInfo {
    pub id: ConnectionId,
    pub peer: Option<SocketAddr>,
    pub connected_at: DateTime<Utc>,
}

pub struct RelayHub {
    sender: broadcast::Sender<Arc<Envelope>>,
    connections: Mutex<HashMap<ConnectionId, ConnectionInfo>>,
    next_id: AtomicU64,
    metrics: Arc<MetricsRecorder>,
}

impl RelayHub {
    pub fn new(capacity: usize, metrics: Arc<MetricsRecorder>) -> Arc<Self> {
        // The initial receiver is dropped so that only connected parties count.
        let (sender, _) = broadcast::channel(capacity.max(1));
        Arc::new(Self {
            sender,
            connections: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            metrics,
        })
    }

    /// Registers a party. Dropping the returned subscription disconnects it.
    pub fn connect(self: &Arc<Self>, peer: Option<SocketAddr>) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let receiver = self.sender.subscribe();
        let info = ConnectionInfo {
            id,
            peer,
            connected_at: Utc::now(),
        };

        self.connections.lock().insert(id, info);
        self.metrics.connections.inc();
        info!(connection = id, peer = ?peer, "Party connected");

        Subscription {
            id,
            receiver,
            hub: Arc::clone(self),
        }
    }

    /// Forwards `envelope` under its own event name to every connected party.
    ///
    /// Returns the number of deliveries queued, which equals the number of
    /// connected parties (zero when nobody is connected).
    pub fn publish(&self, origin: ConnectionId, envelope: Envelope) -> usize {
        let event = envelope.event.clone();
        let delivered = self.sender.send(Arc::new(envelope)).unwrap_or(0);
        self.metrics.record_fanout(delivered);
        debug!(
            origin,
            event = %event,
            delivered,
            "Relayed envelope"
        );
        delivered
    }

    pub fn connected(&self) -> usize {
        self.connections.lock().len()
    }

    fn release(&self, id: ConnectionId) {
        if let Some(info) = self.connections.lock().remove(&id) {
            self.metrics.connections.dec();
            let session = Utc::now() - info.connected_at;
            info!(
                connection = id,
                peer = ?info.peer,
                session_ms = session.num_milliseconds(),
                "Party disconnected"
            );
        }
    }

    pub fn metrics(&self) -> &Arc<MetricsRecorder> {
        &self.metrics
    }
}

/// A connected party's inbox.
pub struct Subscription {
    id: ConnectionId,
    receiver: broadcast::Receiver<Arc<Envelope>>,
    hub: Arc<RelayHub>,
}

impl Subscription {
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Next delivered envelope, or `None` once the hub is gone.
    ///
    /// Envelopes lost to lag are logged and skipped.
    pub async fn recv(&mut self) -> Option<Arc<Envelope>> {
        loop {
            match self.receiver.recv().await {
                Ok(envelope) => return Some(envelope),
                Err(RecvError::Lagged(skipped)) => {
                    warn!(connection = self.id, skipped, "Consumer lagged, envelopes dropped");
                    self.hub.metrics.lagged_deliveries.inc_by(skipped);
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }

    /// Non-blocking variant used by tests and benches.
    pub fn try_recv(&mut self) -> Option<Arc<Envelope>> {
        loop {
            match self.receiver.try_recv() {
                Ok(envelope) => return Some(envelope),
                Err(broadcast::error::TryRecvError::Lagged(skipped)) => {
                    self.hub.metrics.lagged_deliveries.inc_by(skipped);
                }
                Err(_) => return None,
            }
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.hub.release(self.id);
    }
}
