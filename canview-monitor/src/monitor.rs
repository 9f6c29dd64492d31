//! ## canview-monitor::monitor
//! **From CAN chunks to relay events**
//!
//! Pipeline per completed frame: authenticate and decode, drop duplicates,
//! check the counter, then look the frame up in the animation map. Decode
//! failures become tamper alerts and stale counters become replay alerts.

use std::sync::Arc;
use std::time::Duration;

use opentelemetry::KeyValue;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use canview_config::MonitorConfig;
use canview_core::events::{AnimationTrigger, Envelope, SecurityAlert};
use canview_telemetry::{EventLogger, MetricsRecorder};

use crate::assembler::{Assembly, ChunkAssembler};
use crate::cipher::FrameCipher;
use crate::duplicates::DuplicateFilter;
use crate::error::DecodeError;
use crate::frame::{SecureFrame, FRAME_LEN};
use crate::mapping::AnimationMap;
use crate::replay_guard::{ReplayGuard, ReplayVerdict};

/// Result of one completed frame.
#[derive(Debug, Clone, PartialEq)]
pub enum FrameOutcome {
    Animation(AnimationTrigger),
    Alert(SecurityAlert),
    Duplicate,
    Unmapped { can_id: String, data: String },
}

impl FrameOutcome {
    /// Relay envelope for outcomes that are published.
    pub fn envelope(&self) -> Option<Envelope> {
        match self {
            Self::Animation(trigger) => Some(Envelope::animation(trigger)),
            Self::Alert(alert) => Some(Envelope::alert(alert)),
            Self::Duplicate | Self::Unmapped { .. } => None,
        }
    }
}

pub struct FrameMonitor {
    assembler: ChunkAssembler,
    cipher: Arc<dyn FrameCipher>,
    duplicates: DuplicateFilter,
    guard: ReplayGuard,
    animations: AnimationMap,
    metrics: Option<Arc<MetricsRecorder>>,
}

impl FrameMonitor {
    pub fn new(config: &MonitorConfig, cipher: Arc<dyn FrameCipher>, animations: AnimationMap) -> Self {
        Self {
            assembler: ChunkAssembler::default(),
            cipher,
            duplicates: DuplicateFilter::new(
                Duration::from_millis(config.duplicate_ttl_ms),
                config.duplicate_window,
            ),
            guard: ReplayGuard::new(config.counter_reset_gap, config.counter_reset_floor),
            animations,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<MetricsRecorder>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Feeds one received CAN chunk. Returns an outcome once a frame completes.
    pub fn on_chunk(&mut self, can_id: u32, chunk: &[u8], now: Instant) -> Option<FrameOutcome> {
        match self.assembler.push(chunk) {
            Assembly::Pending(buffered) => {
                debug!(
                    can_id = %format!("{can_id:#x}"),
                    chunk = %hex::encode(chunk),
                    buffered,
                    "Chunk received"
                );
                None
            }
            Assembly::Overflow => None,
            Assembly::Complete(frame) => Some(self.on_frame(&frame, now)),
        }
    }

    pub fn on_frame(&mut self, bytes: &[u8; FRAME_LEN], now: Instant) -> FrameOutcome {
        let decoded = SecureFrame::parse(bytes).and_then(|frame| frame.open(self.cipher.as_ref()));
        let decoded = match decoded {
            Ok(decoded) => decoded,
            Err(e) => return self.tampered(&e),
        };

        let can_id = decoded.can_id();
        let data = decoded.data_hex();
        let key = (can_id.clone(), data.clone());

        if self.duplicates.is_duplicate(&key, now) {
            debug!(can_id = %can_id, data = %data, "Duplicate detected, skipping");
            return FrameOutcome::Duplicate;
        }

        if let ReplayVerdict::Replay { last } = self.guard.check(decoded.counter) {
            warn!(
                can_id = %can_id,
                counter = decoded.counter,
                last,
                "Replay attack detected"
            );
            return self.alert(SecurityAlert::ReplayAttack {
                can_id,
                counter: u64::from(decoded.counter),
                data: Some(data),
            });
        }

        info!(can_id = %can_id, data = %data, counter = decoded.counter, "Frame accepted");
        match self.animations.trigger_for(&can_id, &data) {
            Some(trigger) => FrameOutcome::Animation(trigger),
            None => {
                info!(can_id = %can_id, data = %data, "No animation mapped");
                FrameOutcome::Unmapped { can_id, data }
            }
        }
    }

    /// Reports a decode failure that happened outside the cipher path.
    pub fn tamper(&mut self, error: impl Into<String>) -> FrameOutcome {
        self.alert(SecurityAlert::TamperDetected {
            error: error.into(),
        })
    }

    fn tampered(&mut self, error: &DecodeError) -> FrameOutcome {
        warn!(error = %error, "Frame failed to decode");
        self.tamper(error.to_string())
    }

    fn alert(&mut self, alert: SecurityAlert) -> FrameOutcome {
        if let Some(metrics) = &self.metrics {
            metrics.record_alert(alert.kind());
        }
        let mut fields = vec![KeyValue::new("type", alert.kind().to_string())];
        match &alert {
            SecurityAlert::ReplayAttack {
                can_id, counter, ..
            } => {
                fields.push(KeyValue::new("can_id", can_id.clone()));
                fields.push(KeyValue::new("counter", *counter as i64));
            }
            SecurityAlert::TamperDetected { error } => {
                fields.push(KeyValue::new("error", error.clone()));
            }
            _ => {}
        }
        EventLogger::record_event("security_alert", &fields);
        FrameOutcome::Alert(alert)
    }

    pub fn last_counter(&self) -> i64 {
        self.guard.last()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assembler::chunk_frame;
    use crate::cipher::Blake3FrameCipher;
    use tracing_test::traced_test;

    fn cipher() -> Arc<dyn FrameCipher> {
        Arc::new(Blake3FrameCipher::new(b"sixteenbytekey!!"))
    }

    fn monitor() -> FrameMonitor {
        FrameMonitor::new(
            &MonitorConfig::default(),
            cipher(),
            AnimationMap::vehicle_defaults(),
        )
    }

    fn sealed(frame_id: u16, counter: u16, data: &str) -> [u8; FRAME_LEN] {
        let data = hex::decode(data).unwrap();
        SecureFrame::seal(cipher().as_ref(), [9; 16], frame_id, counter, &data)
            .unwrap()
            .to_bytes()
    }

    #[test]
    fn chunks_of_a_door_frame_emit_animation() {
        let mut monitor = monitor();
        let frame = sealed(0x12c, 1, "0000008000000000");
        let now = Instant::now();

        let outcomes: Vec<_> = chunk_frame(&frame)
            .filter_map(|chunk| monitor.on_chunk(0x12c, chunk, now))
            .collect();

        assert_eq!(outcomes.len(), 1);
        let FrameOutcome::Animation(trigger) = &outcomes[0] else {
            panic!("expected animation, got {:?}", outcomes[0]);
        };
        assert_eq!(trigger.normalized_names(), vec!["Doors_LAction", "Doors_RAction"]);
        assert!(!trigger.reverse);
        assert_eq!(trigger.data.as_deref(), Some("0000008000000000"));

        let envelope = outcomes[0].envelope().unwrap();
        assert_eq!(envelope.event, "frontend_animation");
        assert_eq!(envelope.data["can_id"], "0x12c");
    }

    #[traced_test]
    #[test]
    fn stale_counter_raises_replay_alert() {
        let mut monitor = monitor();
        let t0 = Instant::now();
        monitor.on_frame(&sealed(0x12c, 5, "0000008000000000"), t0);
        let outcome = monitor.on_frame(
            &sealed(0x12c, 5, "0000000000000000"),
            t0 + Duration::from_secs(1),
        );

        assert_eq!(
            outcome,
            FrameOutcome::Alert(SecurityAlert::ReplayAttack {
                can_id: "0x12c".into(),
                counter: 5,
                data: Some("0000000000000000".into()),
            })
        );
        assert!(logs_contain("Replay attack detected"));
    }

    #[test]
    fn forged_frame_raises_tamper_alert() {
        let mut monitor = monitor();
        let mut frame = sealed(0x1f4, 1, "00000004");
        frame[39] ^= 0xff;

        let outcome = monitor.on_frame(&frame, Instant::now());
        let Some(envelope) = outcome.envelope() else {
            panic!("tamper alert must be published");
        };
        assert_eq!(envelope.event, "security_alert");
        assert_eq!(envelope.data["type"], "tamper_detected");
        assert!(envelope.data["error"].as_str().unwrap().contains("Invalid MAC"));
        assert_eq!(monitor.last_counter(), -1);
    }

    #[test]
    fn duplicate_is_skipped_before_counter_check() {
        let mut monitor = monitor();
        let t0 = Instant::now();
        monitor.on_frame(&sealed(0x354, 1, "00000004"), t0);
        let outcome = monitor.on_frame(&sealed(0x354, 2, "00000004"), t0 + Duration::from_millis(100));
        assert_eq!(outcome, FrameOutcome::Duplicate);
        assert_eq!(monitor.last_counter(), 1);
    }

    #[test]
    fn unmapped_frame_is_not_published() {
        let mut monitor = monitor();
        let outcome = monitor.on_frame(&sealed(0x7df, 1, "0201"), Instant::now());
        assert!(matches!(outcome, FrameOutcome::Unmapped { .. }));
        assert!(outcome.envelope().is_none());
    }

    #[test]
    fn alerts_are_counted() {
        let metrics = Arc::new(MetricsRecorder::new().unwrap());
        let mut monitor = monitor().with_metrics(Arc::clone(&metrics));
        monitor.tamper("bus error");
        assert_eq!(
            metrics
                .security_alerts
                .with_label_values(&["tamper_detected"])
                .get(),
            1
        );
    }
}
