use thiserror::Error;

use canview_relay::RelayError;

#[derive(Debug, Error)]
pub enum DashboardError {
    #[error("Relay error: {0}")]
    Relay(#[from] RelayError),

    #[error("Command request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Command endpoint answered {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("Invalid command endpoint URL: {0}")]
    Endpoint(String),
}
