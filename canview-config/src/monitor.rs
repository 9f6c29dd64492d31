//! Frame monitor configuration.
//!
//! Thresholds for duplicate suppression and replay detection on decoded
//! CAN frames.

use serde::{Deserialize, Serialize};
use validator::{self, Validate};

use crate::validation;

#[derive(Debug, Serialize, Deserialize, Validate, Clone)]
pub struct MonitorConfig {
    /// Relay endpoint the monitor publishes to.
    #[serde(default = "default_relay_url")]
    #[validate(custom(function = validation::validate_ws_url))]
    pub relay_url: String,

    /// Shared secret the frame cipher keys are derived from.
    #[serde(default = "default_frame_key")]
    #[validate(length(min = 16))]
    pub frame_key: String,

    /// Identical frames closer together than this are treated as duplicates.
    #[serde(default = "default_duplicate_ttl_ms")]
    #[validate(range(min = 1, max = 60_000))]
    pub duplicate_ttl_ms: u64,

    /// Number of recent frames remembered for duplicate checks.
    #[serde(default = "default_duplicate_window")]
    #[validate(range(min = 1, max = 4096))]
    pub duplicate_window: usize,

    /// A counter this far below the last accepted one is read as a wrap.
    #[serde(default = "default_counter_reset_gap")]
    #[validate(range(min = 1))]
    pub counter_reset_gap: u64,

    /// Wrapped counters must restart below this value.
    #[serde(default = "default_counter_reset_floor")]
    #[validate(range(min = 1))]
    pub counter_reset_floor: u64,
}

fn default_relay_url() -> String {
    "ws://localhost:5001/ws".into()
}

fn default_frame_key() -> String {
    "sixteenbytekey!!".into()
}

fn default_duplicate_ttl_ms() -> u64 {
    300
}

fn default_duplicate_window() -> usize {
    20
}

fn default_counter_reset_gap() -> u64 {
    100
}

fn default_counter_reset_floor() -> u64 {
    20
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            relay_url: default_relay_url(),
            frame_key: default_frame_key(),
            duplicate_ttl_ms: default_duplicate_ttl_ms(),
            duplicate_window: default_duplicate_window(),
            counter_reset_gap: default_counter_reset_gap(),
            counter_reset_floor: default_counter_reset_floor(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_frame_key_is_rejected() {
        let config = MonitorConfig {
            frame_key: "short".into(),
            ..MonitorConfig::default()
        };
        assert!(config.validate().is_err());
        assert!(MonitorConfig::default().validate().is_ok());
    }
}
