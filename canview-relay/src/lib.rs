//! # canview-relay
//!
//! Broadcast relay between event producers and dashboards.
//!
//! ### Key Submodules:
//! - `hub`: in-process fan-out of envelopes to every connected party
//! - `server`: axum listener exposing the hub over websockets, the command
//!   endpoint and the metrics scrape
//! - `commands`: command endpoint dispatch onto a pluggable CAN sink
//! - `client`: websocket client with a bounded reconnection budget

pub mod client;
pub mod commands;
pub mod error;
pub mod hub;
pub mod server;

pub use client::{publish_once, ClientOptions, ConnectionState, RelayClient};
pub use commands::{CommandDispatcher, CommandReceipt, CommandSink, LoggingCommandSink};
pub use error::RelayError;
pub use hub::{ConnectionId, ConnectionInfo, RelayHub, Subscription};
pub use server::RelayServer;
