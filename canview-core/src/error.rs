use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Malformed envelope: {0}")]
    Envelope(#[from] serde_json::Error),

    #[error("Malformed payload: {0}")]
    Payload(String),
}
