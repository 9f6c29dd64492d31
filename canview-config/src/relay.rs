//! Relay hub configuration.
//!
//! One listening port serves the websocket relay, the command endpoint and,
//! when enabled, the metrics scrape.

use serde::{Deserialize, Serialize};
use validator::{self, Validate};

use crate::validation;

#[derive(Debug, Serialize, Deserialize, Validate, Clone)]
pub struct RelayConfig {
    /// Address to bind the listener on.
    #[serde(default = "default_bind_address")]
    #[validate(length(min = 1))]
    pub bind_address: String,

    /// Listening port.
    #[serde(default = "default_port")]
    #[validate(range(min = 1))]
    pub port: u16,

    /// Per-connection broadcast buffer. Slower consumers skip ahead past what
    /// does not fit.
    #[serde(default = "default_channel_capacity")]
    #[validate(range(min = 16, max = 65536))]
    pub channel_capacity: usize,

    /// Cross-origin policy for browser dashboards.
    #[serde(default)]
    #[validate(nested)]
    pub cors: CorsConfig,
}

fn default_bind_address() -> String {
    "0.0.0.0".into()
}

fn default_port() -> u16 {
    5001
}

fn default_channel_capacity() -> usize {
    256
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            port: default_port(),
            channel_capacity: default_channel_capacity(),
            cors: CorsConfig::default(),
        }
    }
}

impl RelayConfig {
    pub fn listen_address(&self) -> String {
        format!("{}:{}", self.bind_address, self.port)
    }
}

#[derive(Debug, Serialize, Deserialize, Validate, Clone)]
pub struct CorsConfig {
    /// Allowed origins; `*` allows any.
    #[serde(default = "default_origins")]
    #[validate(custom(function = validation::validate_origins))]
    pub allowed_origins: Vec<String>,

    /// Allowed request methods.
    #[serde(default = "default_methods")]
    #[validate(custom(function = validation::validate_methods))]
    pub allowed_methods: Vec<String>,
}

fn default_origins() -> Vec<String> {
    vec!["*".into()]
}

fn default_methods() -> Vec<String> {
    vec!["GET".into(), "POST".into()]
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: default_origins(),
            allowed_methods: default_methods(),
        }
    }
}
