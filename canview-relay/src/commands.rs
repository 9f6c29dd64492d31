//! Command endpoint dispatch.
//!
//! A dashboard button press arrives as one request naming a command. Known
//! commands are resolved against the catalog and handed to a [`CommandSink`]
//! together with a monotonically increasing message counter; the sink owns
//! the actual CAN transmission.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{info, instrument, warn};

use canview_core::command::{lookup_command, CommandSpec};

use crate::RelayError;

/// Transmits a resolved command onto the vehicle bus.
#[async_trait]
pub trait CommandSink: Send + Sync {
    async fn transmit(&self, spec: &CommandSpec, counter: u64) -> Result<(), RelayError>;
}

/// Sink that only records what would have been written.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingCommandSink;

#[async_trait]
impl CommandSink for LoggingCommandSink {
    async fn transmit(&self, spec: &CommandSpec, counter: u64) -> Result<(), RelayError> {
        let signals = spec
            .signals
            .iter()
            .map(|(name, value)| format!("{name}={value}"))
            .collect::<Vec<_>>()
            .join(",");
        info!(
            command = spec.name,
            can_message = spec.message,
            counter,
            signals = %signals,
            "Command transmitted"
        );
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandReceipt {
    pub command: String,
    pub counter: u64,
}

pub struct CommandDispatcher {
    sink: Arc<dyn CommandSink>,
    // Held across the transmission so that counters go out in order.
    counter: Mutex<u64>,
}

impl CommandDispatcher {
    pub fn new(sink: Arc<dyn CommandSink>) -> Self {
        Self {
            sink,
            counter: Mutex::new(0),
        }
    }

    /// Resolves and transmits `command`. The counter only advances on a
    /// successful transmission.
    #[instrument(skip(self), level = "debug")]
    pub async fn dispatch(&self, command: &str) -> Result<CommandReceipt, RelayError> {
        let spec = lookup_command(command)
            .ok_or_else(|| RelayError::UnknownCommand(command.to_string()))?;

        let mut next = self.counter.lock().await;
        let counter = *next;
        if let Err(e) = self.sink.transmit(spec, counter).await {
            warn!(command, error = %e, "Command sink rejected transmission");
            return Err(e);
        }
        *next += 1;

        Ok(CommandReceipt {
            command: command.to_string(),
            counter,
        })
    }

    pub async fn counter(&self) -> u64 {
        *self.counter.lock().await
    }
}
