//! Transient notices and security alert classification.
//!
//! Each notice carries its own expiry and is never dismissed early. Alerts
//! are neither deduplicated nor rate limited.

use std::time::Duration;

use opentelemetry::KeyValue;
use tokio::time::Instant;
use tracing::{debug, warn};

use canview_core::events::alert::{REPLAY_ATTACK, TAMPER_DETECTED};
use canview_core::events::SecurityAlert;
use canview_telemetry::EventLogger;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub id: u64,
    pub severity: Severity,
    pub message: String,
    pub shown_at: Instant,
    pub expires_at: Instant,
}

#[derive(Debug, Default)]
pub struct NoticeBoard {
    next_id: u64,
    notices: Vec<Notice>,
}

impl NoticeBoard {
    pub fn push(
        &mut self,
        severity: Severity,
        message: impl Into<String>,
        lifetime: Duration,
        now: Instant,
    ) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        let message = message.into();
        debug!(id, ?severity, text = %message, "Notice shown");
        self.notices.push(Notice {
            id,
            severity,
            message,
            shown_at: now,
            expires_at: now + lifetime,
        });
        id
    }

    /// Drops notices whose lifetime has passed; returns how many went.
    pub fn expire(&mut self, now: Instant) -> usize {
        let before = self.notices.len();
        self.notices.retain(|n| n.expires_at > now);
        before - self.notices.len()
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.notices.iter().map(|n| n.expires_at).min()
    }

    pub fn notices(&self) -> &[Notice] {
        &self.notices
    }
}

/// Turns security alerts into error notices.
#[derive(Debug, Clone, Copy)]
pub struct AlertClassifier {
    lifetime: Duration,
}

impl AlertClassifier {
    pub fn new(lifetime: Duration) -> Self {
        Self { lifetime }
    }

    /// Notice text for `alert`, or `None` for types without a notice.
    ///
    /// Only the `type` tag decides; fields that could not be read render as
    /// whatever arrived.
    pub fn describe(alert: &SecurityAlert) -> Option<String> {
        if let SecurityAlert::Unrecognized { .. } = alert {
            return None;
        }
        match alert.kind() {
            REPLAY_ATTACK => Some(format!(
                "Replay Attack!\nCAN ID: {}, Counter: {}",
                alert.field_text("can_id"),
                alert.field_text("counter")
            )),
            TAMPER_DETECTED => Some(format!(
                "Tampering Detected: {}",
                alert.field_text("error")
            )),
            _ => None,
        }
    }

    pub fn on_alert(
        &self,
        alert: &SecurityAlert,
        board: &mut NoticeBoard,
        now: Instant,
    ) -> Option<u64> {
        EventLogger::record_event(
            "security_alert",
            &[KeyValue::new("type", alert.kind().to_string())],
        );
        if let SecurityAlert::Malformed { kind, reason, .. } = alert {
            warn!(kind = %kind, reason = %reason, "Security alert with unreadable fields");
        }
        let Some(message) = Self::describe(alert) else {
            debug!(kind = alert.kind(), "Alert without notice discarded");
            return None;
        };
        Some(board.push(Severity::Error, message, self.lifetime, now))
    }
}
