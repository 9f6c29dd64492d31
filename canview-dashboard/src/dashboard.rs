//! ## canview-dashboard::dashboard
//! **Consumer event loop**
//!
//! [`DashboardState`] holds every piece of consumer state and changes only
//! through its methods, each taking the current instant. [`Dashboard`] owns
//! one state value and drives it from relay envelopes, button presses,
//! connection changes, finished command requests and the earliest pending
//! deadline. After every step it publishes a [`DashboardView`] snapshot;
//! renderers and notifiers watch that channel instead of the state itself.

use std::sync::Arc;
use std::time::Duration;

use opentelemetry::KeyValue;
use tokio::sync::{mpsc, watch};
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info, instrument, warn};

use canview_config::DashboardConfig;
use canview_core::command::{Button, DASHBOARD_BUTTONS};
use canview_core::events::{Envelope, RelayEvent};
use canview_relay::ConnectionState;
use canview_telemetry::EventLogger;

use crate::alerts::{AlertClassifier, Notice, NoticeBoard, Severity};
use crate::gate::{CommandEndpoint, CommandGate, GateDecision};
use crate::playback::{plan_playback, ClipRegistry, PlaybackPlan};
use crate::scheduler::{ActiveAnimationSet, AnimationScheduler};

const READY_NOTICE: Duration = Duration::from_millis(1500);
const SENDING_NOTICE: Duration = Duration::from_millis(800);
const RESULT_NOTICE: Duration = Duration::from_millis(5000);
const HIGHLIGHT: Duration = Duration::from_millis(1200);

/// Snapshot published after every state change.
#[derive(Debug, Clone, PartialEq)]
pub struct DashboardView {
    pub connection: ConnectionState,
    pub engine_on: bool,
    pub highlighted: Option<&'static str>,
    pub active: Option<ActiveAnimationSet>,
    pub playback: Option<Arc<PlaybackPlan>>,
    pub notices: Vec<Notice>,
}

/// What a button press asks the runtime to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PressOutcome {
    Dispatch(Button),
    Rejected,
}

#[derive(Debug)]
struct Highlight {
    command: &'static str,
    until: Option<Instant>,
}

pub struct DashboardState {
    scheduler: AnimationScheduler,
    alerts: AlertClassifier,
    notices: NoticeBoard,
    gate: CommandGate,
    registry: Arc<dyn ClipRegistry>,
    playback: Option<Arc<PlaybackPlan>>,
    generation: u64,
    highlight: Option<Highlight>,
    connection: ConnectionState,
}

impl DashboardState {
    pub fn new(config: &DashboardConfig, registry: Arc<dyn ClipRegistry>) -> Self {
        Self {
            scheduler: AnimationScheduler::new(Duration::from_millis(config.animation_clear_ms)),
            alerts: AlertClassifier::new(Duration::from_millis(config.alert_notice_ms)),
            notices: NoticeBoard::default(),
            gate: CommandGate::default(),
            registry,
            playback: None,
            generation: 0,
            highlight: None,
            connection: ConnectionState::Connecting,
        }
    }

    pub fn ready(&mut self, now: Instant) {
        self.notices
            .push(Severity::Info, "CAN Dashboard Ready!", READY_NOTICE, now);
    }

    /// Dispatches one relayed event by kind. Returns true if state changed.
    pub fn apply_event(&mut self, event: RelayEvent, now: Instant) -> bool {
        match event {
            RelayEvent::Animation(trigger) => {
                let Some(set) = self.scheduler.on_trigger(&trigger, now) else {
                    return false;
                };
                let (names, reverse) = (set.names.clone(), set.reverse);
                self.generation += 1;
                self.playback = Some(Arc::new(plan_playback(
                    &names,
                    reverse,
                    self.registry.as_ref(),
                    self.generation,
                    now,
                )));
                true
            }
            RelayEvent::Alert(alert) => self.alerts.on_alert(&alert, &mut self.notices, now).is_some(),
            RelayEvent::Unknown { event } => {
                debug!(event = %event, "Ignoring unknown event");
                false
            }
        }
    }

    /// Runs a press through the engine gate.
    pub fn press(&mut self, button: Button, now: Instant) -> PressOutcome {
        match self.gate.check(&button) {
            GateDecision::Rejected => {
                warn!(command = button.command, "Command rejected, engine is off");
                self.notices.push(
                    Severity::Warning,
                    "Start the engine first!",
                    RESULT_NOTICE,
                    now,
                );
                PressOutcome::Rejected
            }
            GateDecision::Dispatch => {
                self.highlight = Some(Highlight {
                    command: button.command,
                    until: None,
                });
                self.notices.push(
                    Severity::Info,
                    format!("Sending \"{}\"", button.label),
                    SENDING_NOTICE,
                    now,
                );
                PressOutcome::Dispatch(button)
            }
        }
    }

    /// Records the end of a dispatch attempt and applies the gate transition.
    pub fn command_finished(&mut self, button: Button, sent: bool, now: Instant) {
        if sent {
            self.notices.push(
                Severity::Success,
                format!("\"{}\" sent!", button.label),
                RESULT_NOTICE,
                now,
            );
        } else {
            self.notices.push(
                Severity::Error,
                format!("Failed to send \"{}\"", button.label),
                RESULT_NOTICE,
                now,
            );
        }
        if let Some(highlight) = self
            .highlight
            .as_mut()
            .filter(|h| h.command == button.command)
        {
            highlight.until = Some(now + HIGHLIGHT);
        }
        self.gate.settle(button.command);
    }

    pub fn set_connection(&mut self, state: ConnectionState) -> bool {
        if self.connection == state {
            return false;
        }
        self.connection = state;
        true
    }

    /// Expires everything due at `now`. Returns true if anything went.
    pub fn tick(&mut self, now: Instant) -> bool {
        let mut changed = self.scheduler.poll_expiry(now);
        if changed {
            self.playback = None;
        }
        changed |= self.notices.expire(now) > 0;
        if self
            .highlight
            .as_ref()
            .and_then(|h| h.until)
            .is_some_and(|until| until <= now)
        {
            self.highlight = None;
            changed = true;
        }
        changed
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        [
            self.scheduler.next_deadline(),
            self.notices.next_deadline(),
            self.highlight.as_ref().and_then(|h| h.until),
        ]
        .into_iter()
        .flatten()
        .min()
    }

    pub fn view(&self) -> DashboardView {
        DashboardView {
            connection: self.connection,
            engine_on: self.gate.engine_on(),
            highlighted: self.highlight.as_ref().map(|h| h.command),
            active: self.scheduler.active().cloned(),
            playback: self.playback.clone(),
            notices: self.notices.notices().to_vec(),
        }
    }
}

/// Finds a button by command name or label, ignoring case.
pub fn resolve_button(input: &str) -> Option<Button> {
    let input = input.trim();
    DASHBOARD_BUTTONS
        .iter()
        .find(|b| b.command.eq_ignore_ascii_case(input) || b.label.eq_ignore_ascii_case(input))
        .copied()
}

struct Finished {
    button: Button,
    sent: bool,
}

pub struct Dashboard {
    state: DashboardState,
    endpoint: Arc<dyn CommandEndpoint>,
    view: watch::Sender<DashboardView>,
}

impl Dashboard {
    pub fn new(
        config: &DashboardConfig,
        registry: Arc<dyn ClipRegistry>,
        endpoint: Arc<dyn CommandEndpoint>,
    ) -> Self {
        let state = DashboardState::new(config, registry);
        let (view, _) = watch::channel(state.view());
        Self {
            state,
            endpoint,
            view,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<DashboardView> {
        self.view.subscribe()
    }

    /// Runs until both the relay feed and the press channel are closed.
    ///
    /// A closed relay feed leaves the dashboard usable for commands; its
    /// connection shows as disconnected.
    #[instrument(name = "dashboard", skip_all)]
    pub async fn run(
        mut self,
        mut inbound: mpsc::Receiver<Envelope>,
        mut presses: mpsc::Receiver<Button>,
        mut connection: watch::Receiver<ConnectionState>,
    ) {
        let (done_tx, mut done_rx) = mpsc::channel::<Finished>(16);
        let mut inbound_open = true;
        let mut presses_open = true;
        let mut connection_open = true;

        self.state.set_connection(*connection.borrow_and_update());
        self.state.ready(Instant::now());
        self.publish();
        info!("Dashboard started");

        while inbound_open || presses_open {
            let deadline = self
                .state
                .next_deadline()
                .unwrap_or_else(|| Instant::now() + Duration::from_secs(3600));

            let changed = tokio::select! {
                envelope = inbound.recv(), if inbound_open => match envelope {
                    Some(envelope) => {
                        let event = RelayEvent::classify(&envelope);
                        debug!(event = event.name(), "Relayed event");
                        self.state.apply_event(event, Instant::now())
                    }
                    None => {
                        inbound_open = false;
                        self.state.set_connection(ConnectionState::Disconnected)
                    }
                },
                press = presses.recv(), if presses_open => match press {
                    Some(button) => self.on_press(button, &done_tx),
                    None => {
                        presses_open = false;
                        false
                    }
                },
                result = connection.changed(), if connection_open => {
                    if result.is_err() {
                        connection_open = false;
                    }
                    let state = *connection.borrow_and_update();
                    self.on_connection(state)
                },
                Some(finished) = done_rx.recv() => {
                    self.state.command_finished(finished.button, finished.sent, Instant::now());
                    true
                },
                _ = sleep_until(deadline) => self.state.tick(Instant::now()),
            };

            if changed {
                self.publish();
            }
        }
        info!("Dashboard stopped");
    }

    fn on_press(&mut self, button: Button, done: &mpsc::Sender<Finished>) -> bool {
        if let PressOutcome::Dispatch(button) = self.state.press(button, Instant::now()) {
            let endpoint = Arc::clone(&self.endpoint);
            let done = done.clone();
            tokio::spawn(async move {
                let sent = match endpoint.send(button.command).await {
                    Ok(()) => true,
                    Err(e) => {
                        warn!(command = button.command, error = %e, "Command request failed");
                        false
                    }
                };
                let _ = done.send(Finished { button, sent }).await;
            });
        }
        true
    }

    fn on_connection(&mut self, state: ConnectionState) -> bool {
        match state {
            ConnectionState::Connected => {
                EventLogger::record_event("connect", &[]);
            }
            ConnectionState::Disconnected => {
                EventLogger::record_event("disconnect", &[]);
            }
            ConnectionState::Errored => {
                EventLogger::record_event(
                    "connect_error",
                    &[KeyValue::new("state", "errored")],
                );
            }
            ConnectionState::Connecting => {}
        }
        self.state.set_connection(state)
    }

    fn publish(&self) {
        self.view.send_replace(self.state.view());
    }
}
