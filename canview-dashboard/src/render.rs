//! Headless presentation: logs what a graphical dashboard would show.

use std::collections::HashSet;

use tokio::sync::watch;
use tracing::{error, info, warn};

use crate::alerts::{Notice, Severity};
use crate::dashboard::DashboardView;

/// Follows a dashboard's view channel and logs each visible change once.
#[derive(Debug, Default)]
pub struct ViewLogger {
    last_generation: u64,
    shown: HashSet<u64>,
    last: Option<DashboardView>,
}

impl ViewLogger {
    pub async fn run(mut self, mut view: watch::Receiver<DashboardView>) {
        loop {
            let snapshot = view.borrow_and_update().clone();
            self.observe(&snapshot);
            if view.changed().await.is_err() {
                break;
            }
        }
    }

    /// Logs the differences between `view` and the previous snapshot.
    pub fn observe(&mut self, view: &DashboardView) {
        let previous = self.last.take();

        if previous.as_ref().map(|p| p.connection) != Some(view.connection) {
            info!(connection = ?view.connection, "Relay connection");
        }
        if previous.as_ref().map(|p| p.engine_on) != Some(view.engine_on) {
            info!(engine_on = view.engine_on, "Engine");
        }

        match &view.playback {
            Some(plan) if plan.generation > self.last_generation => {
                self.last_generation = plan.generation;
                for clip in &plan.clips {
                    info!(
                        clip = %clip.clip.name,
                        start_ms = clip.start_position.as_millis() as u64,
                        time_scale = clip.time_scale,
                        "Playing clip"
                    );
                }
            }
            None if previous.as_ref().is_some_and(|p| p.playback.is_some()) => {
                info!("Animations cleared");
            }
            _ => {}
        }

        let visible: HashSet<u64> = view.notices.iter().map(|n| n.id).collect();
        for notice in view.notices.iter().filter(|n| !self.shown.contains(&n.id)) {
            log_notice(notice);
        }
        self.shown = visible;
        self.last = Some(view.clone());
    }
}

fn log_notice(notice: &Notice) {
    match notice.severity {
        Severity::Info | Severity::Success => info!(notice = %notice.message),
        Severity::Warning => warn!(notice = %notice.message),
        Severity::Error => error!(notice = %notice.message),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use canview_relay::ConnectionState;
    use tokio::time::Instant;
    use tracing_test::traced_test;

    fn view(notices: Vec<Notice>) -> DashboardView {
        DashboardView {
            connection: ConnectionState::Connected,
            engine_on: false,
            highlighted: None,
            active: None,
            playback: None,
            notices,
        }
    }

    fn notice(id: u64, message: &str) -> Notice {
        let now = Instant::now();
        Notice {
            id,
            severity: Severity::Error,
            message: message.into(),
            shown_at: now,
            expires_at: now,
        }
    }

    #[traced_test]
    #[test]
    fn each_notice_is_logged_once() {
        let mut logger = ViewLogger::default();
        logger.observe(&view(vec![notice(0, "Tampering Detected: CRC mismatch")]));
        logger.observe(&view(vec![
            notice(0, "Tampering Detected: CRC mismatch"),
            notice(1, "Tampering Detected: bad padding"),
        ]));

        logs_assert(|lines: &[&str]| {
            match lines.iter().filter(|l| l.contains("CRC mismatch")).count() {
                1 => Ok(()),
                n => Err(format!("expected one line, got {n}")),
            }
        });
        assert!(logs_contain("bad padding"));
    }
}
