//! Dashboard consumer configuration.
//!
//! Timer windows, relay reconnection budget and the clip registry used to
//! resolve animation names.

use serde::{Deserialize, Serialize};
use validator::{self, Validate};

use crate::validation;

#[derive(Debug, Serialize, Deserialize, Validate, Clone)]
pub struct DashboardConfig {
    /// Websocket endpoint of the relay hub.
    #[serde(default = "default_relay_url")]
    #[validate(custom(function = validation::validate_ws_url))]
    pub relay_url: String,

    /// Base URL of the command endpoint (`GET {command_url}/send/{command}`).
    #[serde(default = "default_command_url")]
    #[validate(url)]
    pub command_url: String,

    /// Upper bound on one command request; a hung endpoint counts as failed.
    #[serde(default = "default_command_timeout_ms")]
    #[validate(range(min = 100, max = 60_000))]
    pub command_timeout_ms: u64,

    /// Hard timeout after which the active animation set is cleared.
    #[serde(default = "default_animation_clear_ms")]
    #[validate(range(min = 1, max = 60_000))]
    pub animation_clear_ms: u64,

    /// Visible lifetime of a security alert notice.
    #[serde(default = "default_alert_notice_ms")]
    #[validate(range(min = 1, max = 300_000))]
    pub alert_notice_ms: u64,

    /// Reconnection retries before the dashboard gives up on the relay.
    #[serde(default = "default_reconnect_attempts")]
    #[validate(range(min = 1, max = 100))]
    pub reconnect_attempts: u32,

    /// Delay between connection attempts.
    #[serde(default = "default_reconnect_delay_ms")]
    #[validate(range(min = 10, max = 60_000))]
    pub reconnect_delay_ms: u64,

    /// Clips exported by the vehicle model.
    #[serde(default = "default_clips")]
    #[validate(nested)]
    pub clips: Vec<ClipConfig>,
}

/// A named clip and its length.
#[derive(Debug, Serialize, Deserialize, Validate, Clone, PartialEq)]
pub struct ClipConfig {
    #[validate(custom(function = validation::validate_clip_name))]
    pub name: String,

    #[validate(range(min = 1))]
    pub duration_ms: u64,
}

impl ClipConfig {
    pub fn new(name: impl Into<String>, duration_ms: u64) -> Self {
        Self {
            name: name.into(),
            duration_ms,
        }
    }
}

fn default_relay_url() -> String {
    "ws://localhost:5001/ws".into()
}

fn default_command_url() -> String {
    "http://localhost:5001".into()
}

fn default_command_timeout_ms() -> u64 {
    5000
}

fn default_animation_clear_ms() -> u64 {
    2000
}

fn default_alert_notice_ms() -> u64 {
    6000
}

fn default_reconnect_attempts() -> u32 {
    5
}

fn default_reconnect_delay_ms() -> u64 {
    1000
}

fn default_clips() -> Vec<ClipConfig> {
    vec![
        ClipConfig::new("Doors_LAction", 1500),
        ClipConfig::new("Doors_RAction", 1500),
        ClipConfig::new("hoodAction", 2500),
        ClipConfig::new("chromeAction", 1000),
    ]
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            relay_url: default_relay_url(),
            command_url: default_command_url(),
            command_timeout_ms: default_command_timeout_ms(),
            animation_clear_ms: default_animation_clear_ms(),
            alert_notice_ms: default_alert_notice_ms(),
            reconnect_attempts: default_reconnect_attempts(),
            reconnect_delay_ms: default_reconnect_delay_ms(),
            clips: default_clips(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_default_dashboard_config() {
        DashboardConfig::default()
            .validate()
            .expect("Default config should be valid");
    }

    #[test]
    fn invalid_clip_is_reported() {
        let mut config = DashboardConfig::default();
        config.clips.push(ClipConfig::new("bad name", 10));
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_zero_command_timeout() {
        let config = DashboardConfig {
            command_timeout_ms: 0,
            ..DashboardConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_http_relay_url() {
        let config = DashboardConfig {
            relay_url: "http://localhost:5001".into(),
            ..DashboardConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
