//! ## canview-telemetry::metrics
//! **Prometheus counters for the relay and its consumers**

use prometheus::{Encoder, IntCounter, IntCounterVec, IntGauge, Opts, Registry};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("Metrics registry error: {0}")]
    Prometheus(#[from] prometheus::Error),

    #[error("Metrics encoding produced invalid UTF-8")]
    Encoding(#[from] std::string::FromUtf8Error),
}

#[derive(Debug, Clone)]
pub struct MetricsRecorder {
    pub registry: Registry,
    /// Envelopes accepted by the hub.
    pub relayed_events: IntCounter,
    /// Per-connection deliveries produced by fan-out.
    pub deliveries: IntCounter,
    /// Deliveries skipped because a consumer fell behind.
    pub lagged_deliveries: IntCounter,
    /// Currently connected parties.
    pub connections: IntGauge,
    /// Security alerts seen, labelled by alert type.
    pub security_alerts: IntCounterVec,
    /// Command endpoint requests, labelled by outcome.
    pub commands: IntCounterVec,
}

impl MetricsRecorder {
    pub fn new() -> Result<Self, TelemetryError> {
        let registry = Registry::new();

        let relayed_events =
            IntCounter::new("canview_relayed_events_total", "Envelopes accepted by the hub")?;
        let deliveries = IntCounter::new(
            "canview_deliveries_total",
            "Envelopes handed to connected parties",
        )?;
        let lagged_deliveries = IntCounter::new(
            "canview_lagged_deliveries_total",
            "Envelopes skipped by consumers that fell behind",
        )?;
        let connections = IntGauge::new("canview_connections", "Connected relay parties")?;
        let security_alerts = IntCounterVec::new(
            Opts::new("canview_security_alerts_total", "Security alerts by type"),
            &["type"],
        )?;
        let commands = IntCounterVec::new(
            Opts::new("canview_commands_total", "Command endpoint requests by outcome"),
            &["outcome"],
        )?;

        registry.register(Box::new(relayed_events.clone()))?;
        registry.register(Box::new(deliveries.clone()))?;
        registry.register(Box::new(lagged_deliveries.clone()))?;
        registry.register(Box::new(connections.clone()))?;
        registry.register(Box::new(security_alerts.clone()))?;
        registry.register(Box::new(commands.clone()))?;

        Ok(Self {
            registry,
            relayed_events,
            deliveries,
            lagged_deliveries,
            connections,
            security_alerts,
            commands,
        })
    }

    pub fn gather_metrics(&self) -> Result<String, TelemetryError> {
        let encoder = prometheus::TextEncoder::new();
        let mut buffer = Vec::<u8>::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }

    pub fn record_fanout(&self, deliveries: usize) {
        self.relayed_events.inc();
        self.deliveries.inc_by(deliveries as u64);
    }

    pub fn record_alert(&self, kind: &str) {
        self.security_alerts.with_label_values(&[kind]).inc();
    }

    pub fn record_command(&self, outcome: &str) {
        self.commands.with_label_values(&[outcome]).inc();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fanout_is_reflected_in_export() {
        let metrics = MetricsRecorder::new().unwrap();
        metrics.record_fanout(3);
        metrics.record_alert("replay_attack");
        metrics.record_command("sent");

        let text = metrics.gather_metrics().unwrap();
        assert!(text.contains("canview_relayed_events_total 1"));
        assert!(text.contains("canview_deliveries_total 3"));
        assert!(text.contains(r#"canview_security_alerts_total{type="replay_attack"} 1"#));
        assert!(text.contains(r#"canview_commands_total{outcome="sent"} 1"#));
    }

    #[test]
    fn recorders_are_independent() {
        let a = MetricsRecorder::new().unwrap();
        let b = MetricsRecorder::new().unwrap();
        a.connections.inc();
        assert_eq!(b.connections.get(), 0);
    }
}
