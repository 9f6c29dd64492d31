//! # canview Configuration System
//!
//! Hierarchical configuration for the relay, dashboards and frame monitor.
//!
//! ## Features
//! - **Unified Configuration**: one document covers every process role
//! - **Validation**: ranges and formats checked after extraction
//! - **Environment Awareness**: per-environment YAML overlays and `CANVIEW_*` overrides

#![warn(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use std::path::Path;

use figment::{
    providers::{Env, Format, Serialized, Yaml},
    Figment,
};
use serde::{Deserialize, Serialize};
use validator::Validate;

mod dashboard;
mod error;
mod monitor;
mod relay;
mod telemetry;
mod validation;

pub use dashboard::{ClipConfig, DashboardConfig};
pub use error::ConfigError;
pub use monitor::MonitorConfig;
pub use relay::{CorsConfig, RelayConfig};
pub use telemetry::TelemetryConfig;

const BASE_FILE: &str = "config/canview.yaml";
const ENV_PREFIX: &str = "CANVIEW_";

/// Top‑level configuration container for all canview components.
#[derive(Debug, Serialize, Deserialize, Validate, Default, Clone)]
pub struct CanviewConfig {
    /// Relay hub listener and command endpoint.
    #[validate(nested)]
    #[serde(default)]
    pub relay: RelayConfig,

    /// Dashboard consumer settings (timers, reconnects, clip registry).
    #[validate(nested)]
    #[serde(default)]
    pub dashboard: DashboardConfig,

    /// Frame monitor replay and duplicate detection.
    #[validate(nested)]
    #[serde(default)]
    pub monitor: MonitorConfig,

    /// Logging and metrics.
    #[validate(nested)]
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

impl CanviewConfig {
    /// Load configuration from default files and environment.
    ///
    /// Hierarchy:
    /// 1. Default Values
    /// 2. `config/canview.yaml` - Base settings. If missing, defaults are used.
    /// 3. `config/<environment>.yaml` - Environment‑specific overrides (`CANVIEW_ENV`,
    ///    `production` when unset).
    /// 4. `CANVIEW_*` environment variables, nested keys split on `__`.
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(CanviewConfig::default()));

        if Path::new(BASE_FILE).exists() {
            figment = figment.merge(Yaml::file(BASE_FILE));
        }

        let env = std::env::var("CANVIEW_ENV").unwrap_or_else(|_| "production".into());
        let env_file = format!("config/{}.yaml", env);
        if Path::new(&env_file).exists() {
            figment = figment.merge(Yaml::file(env_file));
        }

        Self::extract(figment.merge(Env::prefixed(ENV_PREFIX).split("__")))
    }

    /// Load configuration from a specific file, still honouring `CANVIEW_*` overrides.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.to_path_buf()));
        }

        Self::extract(
            Figment::from(Serialized::defaults(CanviewConfig::default()))
                .merge(Yaml::file(path))
                .merge(Env::prefixed(ENV_PREFIX).split("__")),
        )
    }

    fn extract(figment: Figment) -> Result<Self, ConfigError> {
        figment
            .extract()
            .map_err(ConfigError::from)
            .and_then(|config: Self| {
                config.validate()?;
                Ok(config)
            })
    }
}
