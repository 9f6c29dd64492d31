//! # canview-core
//!
//! Shared vocabulary for the relay, the dashboards and the frame monitor.
//!
//! ### Key Submodules:
//! - `events`: wire envelope and the `RelayEvent` sum type over known event kinds
//! - `command`: vehicle command catalog and dashboard button list
//! - `error`: core error type

pub mod command;
pub mod error;
pub mod events;

pub mod prelude {
    pub use crate::command::*;
    pub use crate::error::*;
    pub use crate::events::*;
}

pub use error::CoreError;
