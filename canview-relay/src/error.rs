use thiserror::Error;

use canview_core::CoreError;
use canview_telemetry::TelemetryError;

#[derive(Debug, Error)]
pub enum RelayError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid relay configuration: {0}")]
    Config(String),

    #[error("Envelope error: {0}")]
    Envelope(#[from] CoreError),

    #[error("Websocket error: {0}")]
    WebSocket(#[from] Box<tokio_tungstenite::tungstenite::Error>),

    #[error("Relay unreachable after {attempts} attempts")]
    ConnectExhausted { attempts: u32 },

    #[error("Relay connection closed")]
    Closed,

    #[error("Timed out waiting for the relay")]
    Timeout,

    #[error("Unknown command: {0}")]
    UnknownCommand(String),

    #[error("Command transmission failed: {0}")]
    Transmit(String),

    #[error("Telemetry error: {0}")]
    Telemetry(#[from] TelemetryError),
}

impl From<tokio_tungstenite::tungstenite::Error> for RelayError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        RelayError::WebSocket(Box::new(err))
    }
}
