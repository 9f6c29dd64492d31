//! ## canview-relay::client
//! **Websocket client for producers and dashboards**
//!
//! A [`RelayClient`] is an explicitly owned connection handle: whoever needs
//! to publish or consume gets it passed in. The background task connects,
//! forwards inbound envelopes to the consumer channel and publishes outbound
//! ones. A failed or lost connection is retried; once `reconnect_attempts`
//! consecutive retries have failed the client settles in `Disconnected`
//! and stops.

use std::time::Duration;

use futures::{SinkExt, StreamExt};
use opentelemetry::KeyValue;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, instrument, warn};

use canview_config::DashboardConfig;
use canview_core::events::Envelope;
use canview_telemetry::EventLogger;

use crate::RelayError;

/// Observable state of one consumer's relay connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    Connected,
    Disconnected,
    Errored,
}

#[derive(Debug, Clone)]
pub struct ClientOptions {
    pub url: String,
    /// Retries allowed after a failed or lost connection.
    pub reconnect_attempts: u32,
    pub reconnect_delay: Duration,
}

impl ClientOptions {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            reconnect_attempts: 5,
            reconnect_delay: Duration::from_millis(1000),
        }
    }
}

impl From<&DashboardConfig> for ClientOptions {
    fn from(config: &DashboardConfig) -> Self {
        Self {
            url: config.relay_url.clone(),
            reconnect_attempts: config.reconnect_attempts,
            reconnect_delay: Duration::from_millis(config.reconnect_delay_ms),
        }
    }
}

pub struct RelayClient {
    attempts: u32,
    outbound: mpsc::Sender<Envelope>,
    state: watch::Receiver<ConnectionState>,
    task: JoinHandle<()>,
}

impl RelayClient {
    /// Starts the connection task. Relayed envelopes are pushed into `inbound`.
    pub fn spawn(options: ClientOptions, inbound: mpsc::Sender<Envelope>) -> Self {
        let (outbound, outbound_rx) = mpsc::channel(64);
        let (state_tx, state) = watch::channel(ConnectionState::Connecting);
        let attempts = options.reconnect_attempts + 1;
        let task = tokio::spawn(run_connection(options, inbound, outbound_rx, state_tx));
        Self {
            attempts,
            outbound,
            state,
            task,
        }
    }

    pub async fn publish(&self, envelope: Envelope) -> Result<(), RelayError> {
        self.outbound
            .send(envelope)
            .await
            .map_err(|_| RelayError::Closed)
    }

    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.state.clone()
    }

    /// Waits until the connection is up, or fails once the task has given up.
    pub async fn wait_connected(&self) -> Result<(), RelayError> {
        let mut state = self.state.clone();
        loop {
            match *state.borrow_and_update() {
                ConnectionState::Connected => return Ok(()),
                ConnectionState::Disconnected if self.task.is_finished() => {
                    return Err(RelayError::ConnectExhausted {
                        attempts: self.attempts,
                    })
                }
                _ => {}
            }
            if state.changed().await.is_err() {
                return Err(RelayError::ConnectExhausted {
                    attempts: self.attempts,
                });
            }
        }
    }

    /// Closes the connection and waits for the task to finish.
    pub async fn close(self) {
        drop(self.outbound);
        let _ = self.task.await;
    }
}

/// One-shot publish for command line producers.
///
/// Connects, sends `envelope` and waits for the relay to echo it back, which
/// proves that the envelope reached the hub before the socket closes.
#[instrument(skip(envelope), fields(event = %envelope.event))]
pub async fn publish_once(
    url: &str,
    envelope: &Envelope,
    timeout: Duration,
) -> Result<(), RelayError> {
    let text = envelope.to_json()?;
    let (mut socket, _) = tokio::time::timeout(timeout, connect_async(url))
        .await
        .map_err(|_| RelayError::Timeout)??;

    socket.send(Message::Text(text.into())).await?;

    let echoed = tokio::time::timeout(timeout, async {
        while let Some(frame) = socket.next().await {
            if let Message::Text(text) = frame? {
                if Envelope::from_json(text.as_str()).ok().as_ref() == Some(envelope) {
                    return Ok(());
                }
            }
        }
        Err::<(), RelayError>(RelayError::Closed)
    })
    .await
    .map_err(|_| RelayError::Timeout)?;

    let _ = socket.close(None).await;
    echoed
}

enum SessionEnd {
    /// The owner dropped the client or the consumer channel.
    Shutdown,
    /// The relay went away; worth reconnecting.
    Lost,
}

#[instrument(skip_all, fields(url = %options.url))]
async fn run_connection(
    options: ClientOptions,
    inbound: mpsc::Sender<Envelope>,
    mut outbound: mpsc::Receiver<Envelope>,
    state: watch::Sender<ConnectionState>,
) {
    let mut failures = 0u32;

    loop {
        state.send_replace(ConnectionState::Connecting);
        match connect_async(options.url.as_str()).await {
            Ok((socket, _)) => {
                failures = 0;
                state.send_replace(ConnectionState::Connected);
                info!("Connected to relay");

                match run_session(socket, &inbound, &mut outbound).await {
                    SessionEnd::Shutdown => {
                        state.send_replace(ConnectionState::Disconnected);
                        return;
                    }
                    SessionEnd::Lost => {
                        state.send_replace(ConnectionState::Disconnected);
                        warn!("Relay connection lost");
                    }
                }
            }
            Err(e) => {
                failures += 1;
                state.send_replace(ConnectionState::Errored);
                EventLogger::record_event(
                    "connect_error",
                    &[
                        KeyValue::new("error", e.to_string()),
                        KeyValue::new("attempt", i64::from(failures)),
                    ],
                );
            }
        }

        if failures > options.reconnect_attempts {
            warn!(
                attempts = failures,
                "Reconnection budget exhausted, staying disconnected"
            );
            state.send_replace(ConnectionState::Disconnected);
            return;
        }

        // A dropped owner ends the retry loop as well.
        tokio::select! {
            _ = tokio::time::sleep(options.reconnect_delay) => {}
            _ = inbound.closed() => {
                state.send_replace(ConnectionState::Disconnected);
                return;
            }
        }
    }
}

async fn run_session<S>(
    socket: tokio_tungstenite::WebSocketStream<S>,
    inbound: &mpsc::Sender<Envelope>,
    outbound: &mut mpsc::Receiver<Envelope>,
) -> SessionEnd
where
    S: tokio::io::AsyncRead + tokio::io::AsyncWrite + Unpin,
{
    let (mut sink, mut stream) = socket.split();

    loop {
        tokio::select! {
            next = outbound.recv() => {
                let Some(envelope) = next else {
                    let _ = sink.send(Message::Close(None)).await;
                    return SessionEnd::Shutdown;
                };
                let text = match envelope.to_json() {
                    Ok(text) => text,
                    Err(e) => {
                        warn!(error = %e, "Skipping unencodable envelope");
                        continue;
                    }
                };
                if let Err(e) = sink.send(Message::Text(text.into())).await {
                    warn!(error = %e, "Publish failed");
                    return SessionEnd::Lost;
                }
            }
            frame = stream.next() => match frame {
                Some(Ok(Message::Text(text))) => match Envelope::from_json(text.as_str()) {
                    Ok(envelope) => {
                        debug!(event = %envelope.event, "Envelope received");
                        if inbound.send(envelope).await.is_err() {
                            return SessionEnd::Shutdown;
                        }
                    }
                    Err(e) => warn!(error = %e, "Dropping malformed frame"),
                },
                Some(Ok(Message::Close(_))) | None => return SessionEnd::Lost,
                Some(Err(e)) => {
                    warn!(error = %e, "Relay socket error");
                    return SessionEnd::Lost;
                }
                Some(Ok(_)) => {}
            }
        }
    }
}
