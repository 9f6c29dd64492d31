//! ## canview-telemetry::logging
//! **Structured logging with tracing and OpenTelemetry attributes**
//!
//! `init` installs the process-wide subscriber. `log_event` records security
//! and connection events inside a `security_event` span so they can be
//! filtered apart from ordinary diagnostics; async tasks such as the relay
//! socket loop await it, state machines call `record_event` instead.

use opentelemetry::KeyValue;
use tracing::{info_span, Instrument};
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Clone)]
pub struct EventLogger;

impl EventLogger {
    /// Installs the global subscriber. `RUST_LOG` overrides `default_level`.
    /// A second call is a no-op.
    pub fn init(default_level: &str) {
        let _ = fmt()
            .with_env_filter(
                EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| EnvFilter::new(default_level)),
            )
            .with_thread_names(true)
            .with_span_events(FmtSpan::NONE)
            .try_init();
    }

    #[inline]
    pub async fn log_event(event_type: &str, metadata: Vec<KeyValue>) {
        let span = info_span!(
            "security_event",
            event_type = event_type,
            otel.kind = "INTERNAL"
        );

        async {
            tracing::info!(
                metadata = ?metadata,
                "Security event occurred"
            );
        }
        .instrument(span)
        .await
    }

    /// Synchronous variant for handlers that must not suspend.
    pub fn record_event(event_type: &str, metadata: &[KeyValue]) {
        let span = info_span!(
            "security_event",
            event_type = event_type,
            otel.kind = "INTERNAL"
        );
        let _entered = span.enter();
        tracing::info!(metadata = ?metadata, "Security event occurred");
    }
}
