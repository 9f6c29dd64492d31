//! ## canview-monitor::scenario
//! **Scripted frame replay**
//!
//! A scenario is a YAML list of steps. Frame steps are sealed with the
//! monitor's cipher, split into CAN chunks and fed through the monitor, so
//! they exercise the same decode path as live traffic.
//!
//! ```yaml
//! steps:
//!   - frame: { can_id: "0x12c", data: "0000008000000000", counter: 1 }
//!   - delay_ms: 500
//!     frame: { can_id: "0x12c", data: "0000008000000000", counter: 1 }
//!   - tamper: { error: "CRC mismatch" }
//! ```

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{info, instrument};

use canview_core::events::Envelope;
use canview_relay::RelayClient;

use crate::assembler::chunk_frame;
use crate::cipher::FrameCipher;
use crate::error::MonitorError;
use crate::frame::{parse_can_id, SecureFrame};
use crate::monitor::{FrameMonitor, FrameOutcome};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    pub steps: Vec<ScenarioStep>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioStep {
    /// Pause before the step runs.
    #[serde(default)]
    pub delay_ms: u64,
    #[serde(flatten)]
    pub action: StepAction,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepAction {
    Frame(FrameStep),
    Tamper(TamperStep),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameStep {
    pub can_id: String,
    pub data: String,
    pub counter: u16,
    /// Flip one ciphertext bit after sealing.
    #[serde(default)]
    pub corrupt: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TamperStep {
    pub error: String,
}

impl Scenario {
    pub fn from_yaml(text: &str) -> Result<Self, MonitorError> {
        Ok(serde_yaml::from_str(text)?)
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, MonitorError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_yaml(&text)
    }
}

/// Destination of monitor output.
#[async_trait]
pub trait EventSink: Send + Sync {
    async fn emit(&self, envelope: Envelope) -> Result<(), MonitorError>;
}

#[async_trait]
impl EventSink for RelayClient {
    async fn emit(&self, envelope: Envelope) -> Result<(), MonitorError> {
        Ok(self.publish(envelope).await?)
    }
}

#[async_trait]
impl EventSink for mpsc::Sender<Envelope> {
    async fn emit(&self, envelope: Envelope) -> Result<(), MonitorError> {
        self.send(envelope)
            .await
            .map_err(|_| MonitorError::Relay(canview_relay::RelayError::Closed))
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ReplaySummary {
    pub frames: usize,
    pub published: usize,
    pub alerts: usize,
    pub suppressed: usize,
}

pub struct ScenarioPlayer {
    monitor: FrameMonitor,
    cipher: Arc<dyn FrameCipher>,
}

impl ScenarioPlayer {
    /// `cipher` seals the scripted frames; it must match the monitor's.
    pub fn new(monitor: FrameMonitor, cipher: Arc<dyn FrameCipher>) -> Self {
        Self { monitor, cipher }
    }

    #[instrument(skip_all, fields(steps = scenario.steps.len()))]
    pub async fn play(
        &mut self,
        scenario: &Scenario,
        sink: &dyn EventSink,
    ) -> Result<ReplaySummary, MonitorError> {
        let mut summary = ReplaySummary::default();

        for step in &scenario.steps {
            if step.delay_ms > 0 {
                tokio::time::sleep(Duration::from_millis(step.delay_ms)).await;
            }

            let outcomes = match &step.action {
                StepAction::Frame(frame) => {
                    summary.frames += 1;
                    self.feed(frame)?
                }
                StepAction::Tamper(tamper) => vec![self.monitor.tamper(tamper.error.clone())],
            };

            for outcome in outcomes {
                match &outcome {
                    FrameOutcome::Alert(_) => summary.alerts += 1,
                    FrameOutcome::Duplicate | FrameOutcome::Unmapped { .. } => {
                        summary.suppressed += 1
                    }
                    FrameOutcome::Animation(_) => {}
                }
                if let Some(envelope) = outcome.envelope() {
                    sink.emit(envelope).await?;
                    summary.published += 1;
                }
            }
        }

        info!(?summary, "Scenario complete");
        Ok(summary)
    }

    fn feed(&mut self, step: &FrameStep) -> Result<Vec<FrameOutcome>, MonitorError> {
        let frame_id = parse_can_id(&step.can_id)?;
        let data = hex::decode(&step.data)?;
        let iv: [u8; 16] = rand::random();

        let mut bytes = SecureFrame::seal(self.cipher.as_ref(), iv, frame_id, step.counter, &data)?
            .to_bytes();
        if step.corrupt {
            bytes[18] ^= 0x01;
        }

        let now = Instant::now();
        Ok(chunk_frame(&bytes)
            .filter_map(|chunk| self.monitor.on_chunk(u32::from(frame_id), chunk, now))
            .collect())
    }
}
