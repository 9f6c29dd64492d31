use thiserror::Error;

use canview_relay::RelayError;

/// Frame decoding failures. Each one is reported as tampering.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("Encrypted frame length must be 40, got {0}")]
    Length(usize),

    #[error("Invalid MAC: message tampered or forged")]
    Authentication,

    #[error("Invalid padding length {0}")]
    Padding(u8),

    #[error("Decrypted frame too short for a counter")]
    MissingCounter,
}

#[derive(Debug, Error)]
pub enum MonitorError {
    #[error("Frame decode error: {0}")]
    Decode(#[from] DecodeError),

    #[error("Payload of {0} bytes does not fit one frame (max 13)")]
    PayloadTooLong(usize),

    #[error("Invalid CAN identifier: {0}")]
    CanId(String),

    #[error("Invalid hex payload: {0}")]
    Hex(#[from] hex::FromHexError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Scenario parse error: {0}")]
    Scenario(#[from] serde_yaml::Error),

    #[error("Relay error: {0}")]
    Relay(#[from] RelayError),
}
