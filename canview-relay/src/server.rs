//! ## canview-relay::server
//! **axum listener for the relay hub**
//!
//! Routes:
//! - `GET /ws` websocket relay; each text frame is an envelope
//! - `GET /send/{command}` command endpoint
//! - `GET /metrics` prometheus scrape, when enabled

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{ConnectInfo, Path, State};
use axum::http::{HeaderValue, Method, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use chrono::Local;
use futures::{SinkExt, StreamExt};
use opentelemetry::KeyValue;
use tokio::net::TcpListener;
use tower_http::cors::{AllowMethods, AllowOrigin, CorsLayer};
use tracing::{debug, error, info, instrument, warn};

use canview_config::{CanviewConfig, CorsConfig};
use canview_core::events::Envelope;
use canview_telemetry::{EventLogger, MetricsRecorder};

use crate::commands::{CommandDispatcher, CommandSink};
use crate::hub::RelayHub;
use crate::RelayError;

struct RelayState {
    hub: Arc<RelayHub>,
    commands: CommandDispatcher,
    metrics: Arc<MetricsRecorder>,
}

pub struct RelayServer {
    state: Arc<RelayState>,
    cors: CorsLayer,
    expose_metrics: bool,
    listen_address: String,
}

impl RelayServer {
    pub fn new(config: &CanviewConfig, sink: Arc<dyn CommandSink>) -> Result<Self, RelayError> {
        let metrics = Arc::new(MetricsRecorder::new()?);
        let hub = RelayHub::new(config.relay.channel_capacity, Arc::clone(&metrics));

        Ok(Self {
            state: Arc::new(RelayState {
                hub,
                commands: CommandDispatcher::new(sink),
                metrics,
            }),
            cors: cors_layer(&config.relay.cors)?,
            expose_metrics: config.telemetry.metrics,
            listen_address: config.relay.listen_address(),
        })
    }

    pub fn hub(&self) -> Arc<RelayHub> {
        Arc::clone(&self.state.hub)
    }

    pub fn router(&self) -> Router {
        let mut router = Router::new()
            .route("/ws", get(ws_upgrade))
            .route("/send/{command}", get(send_command));
        if self.expose_metrics {
            router = router.route("/metrics", get(metrics));
        }
        router
            .layer(self.cors.clone())
            .with_state(Arc::clone(&self.state))
    }

    pub async fn bind(&self) -> Result<TcpListener, RelayError> {
        Ok(TcpListener::bind(&self.listen_address).await?)
    }

    /// Serves until `shutdown` resolves.
    #[instrument(skip_all, fields(addr = ?listener.local_addr().ok()))]
    pub async fn serve<F>(self, listener: TcpListener, shutdown: F) -> Result<(), RelayError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        info!("Relay listening");
        axum::serve(
            listener,
            self.router()
                .into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown)
        .await?;
        info!("Relay shut down");
        Ok(())
    }
}

fn cors_layer(config: &CorsConfig) -> Result<CorsLayer, RelayError> {
    let origins = if config.allowed_origins.iter().any(|o| o == "*") {
        AllowOrigin::any()
    } else {
        let list = config
            .allowed_origins
            .iter()
            .map(|o| {
                HeaderValue::from_str(o)
                    .map_err(|e| RelayError::Config(format!("origin {o:?}: {e}")))
            })
            .collect::<Result<Vec<_>, _>>()?;
        AllowOrigin::list(list)
    };

    let methods = config
        .allowed_methods
        .iter()
        .map(|m| {
            Method::from_bytes(m.to_ascii_uppercase().as_bytes())
                .map_err(|e| RelayError::Config(format!("method {m:?}: {e}")))
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(AllowMethods::list(methods)))
}

async fn ws_upgrade(
    ws: WebSocketUpgrade,
    State(state): State<Arc<RelayState>>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| relay_socket(socket, state, peer))
}

/// Per-connection loop: forwards hub deliveries to the socket and publishes
/// inbound envelopes to the hub.
async fn relay_socket(socket: WebSocket, state: Arc<RelayState>, peer: SocketAddr) {
    let mut subscription = state.hub.connect(Some(peer));
    let id = subscription.id();
    EventLogger::log_event(
        "relay_connect",
        vec![
            KeyValue::new("connection", id as i64),
            KeyValue::new("peer", peer.to_string()),
        ],
    )
    .await;

    let (mut sender, mut receiver) = socket.split();

    loop {
        tokio::select! {
            delivered = subscription.recv() => {
                let Some(envelope) = delivered else { break };
                let text = match envelope.to_json() {
                    Ok(text) => text,
                    Err(e) => {
                        error!(connection = id, error = %e, "Failed to encode envelope");
                        continue;
                    }
                };
                if sender.send(Message::Text(text.into())).await.is_err() {
                    break;
                }
            }
            inbound = receiver.next() => {
                match inbound {
                    Some(Ok(Message::Text(text))) => match Envelope::from_json(text.as_str()) {
                        Ok(envelope) => {
                            debug!(connection = id, event = %envelope.event, "Inbound envelope");
                            state.hub.publish(id, envelope);
                        }
                        Err(e) => warn!(connection = id, error = %e, "Dropping malformed frame"),
                    },
                    Some(Ok(Message::Ping(data))) => {
                        if sender.send(Message::Pong(data)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(e)) => {
                        warn!(connection = id, error = %e, "Socket error");
                        break;
                    }
                    Some(Ok(_)) => {}
                }
            }
        }
    }

    EventLogger::log_event("relay_disconnect", vec![KeyValue::new("connection", id as i64)]).await;
}

async fn send_command(
    State(state): State<Arc<RelayState>>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    Path(command): Path<String>,
) -> (StatusCode, String) {
    let timestamp = Local::now().format("%H:%M:%S%.3f");
    let ip = peer.ip();

    match state.commands.dispatch(&command).await {
        Ok(receipt) => {
            state.metrics.record_command("sent");
            info!(
                "[{timestamp}] {ip} -> Sent CAN command: {command} (counter {})",
                receipt.counter
            );
            (StatusCode::OK, format!("Sent: {command}"))
        }
        Err(RelayError::UnknownCommand(_)) => {
            state.metrics.record_command("invalid");
            warn!("[{timestamp}] Invalid command from {ip}: {command}");
            (StatusCode::BAD_REQUEST, format!("Invalid command: {command}"))
        }
        Err(e) => {
            state.metrics.record_command("failed");
            error!("[{timestamp}] {ip} -> Failed to send {command}: {e}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to send: {command}"),
            )
        }
    }
}

async fn metrics(State(state): State<Arc<RelayState>>) -> impl IntoResponse {
    match state.metrics.gather_metrics() {
        Ok(text) => (StatusCode::OK, text),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use tracing_test::traced_test;

    use crate::commands::LoggingCommandSink;

    #[test]
    fn cors_accepts_explicit_origins() {
        let config = CorsConfig {
            allowed_origins: vec!["http://localhost:3000".into()],
            allowed_methods: vec!["get".into()],
        };
        assert!(cors_layer(&config).is_ok());
    }

    #[test]
    fn cors_rejects_unencodable_origin() {
        let config = CorsConfig {
            allowed_origins: vec!["http://bad\norigin".into()],
            allowed_methods: vec!["GET".into()],
        };
        assert!(matches!(cors_layer(&config), Err(RelayError::Config(_))));
    }

    #[tokio::test]
    #[traced_test]
    async fn socket_lifecycle_is_logged_as_security_events() {
        let server =
            RelayServer::new(&CanviewConfig::default(), Arc::new(LoggingCommandSink)).unwrap();
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(server.serve(listener, std::future::pending()));

        let (mut socket, _) = tokio_tungstenite::connect_async(format!("ws://{addr}/ws"))
            .await
            .unwrap();
        socket.close(None).await.unwrap();
        drop(socket);

        for _ in 0..200 {
            if logs_contain("relay_disconnect") {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert!(logs_contain("relay_connect"));
        assert!(logs_contain("relay_disconnect"));
    }
}
