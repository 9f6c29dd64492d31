//! ## canview-dashboard::gate
//! **Engine precondition for user commands**
//!
//! While the engine is off only `engine_on` reaches the endpoint. The gate
//! state changes after the dispatch attempt has finished, regardless of its
//! outcome.

use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, instrument};

use canview_core::command::{Button, ENGINE_OFF, ENGINE_ON};

use crate::DashboardError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    Dispatch,
    Rejected,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct CommandGate {
    engine_on: bool,
}

impl CommandGate {
    pub fn engine_on(&self) -> bool {
        self.engine_on
    }

    pub fn check(&self, button: &Button) -> GateDecision {
        if self.engine_on || button.command == ENGINE_ON {
            GateDecision::Dispatch
        } else {
            GateDecision::Rejected
        }
    }

    /// Applies the engine transition of a finished dispatch attempt.
    pub fn settle(&mut self, command: &str) {
        match command {
            ENGINE_ON => self.engine_on = true,
            ENGINE_OFF => self.engine_on = false,
            _ => return,
        }
        debug!(engine_on = self.engine_on, "Engine state changed");
    }
}

/// Where button presses are sent.
#[async_trait]
pub trait CommandEndpoint: Send + Sync {
    async fn send(&self, command: &str) -> Result<(), DashboardError>;
}

/// `GET {base}/send/{command}` against the relay's command endpoint.
///
/// Every request is bounded by `timeout`, so a hung endpoint surfaces as a
/// failed send instead of a dispatch that never finishes.
#[derive(Debug, Clone)]
pub struct HttpCommandEndpoint {
    client: reqwest::Client,
    base: reqwest::Url,
}

impl HttpCommandEndpoint {
    pub fn new(base: &str, timeout: Duration) -> Result<Self, DashboardError> {
        let base = reqwest::Url::parse(base.trim_end_matches('/'))
            .map_err(|e| DashboardError::Endpoint(format!("{base}: {e}")))?;
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client, base })
    }

    fn command_url(&self, command: &str) -> Result<reqwest::Url, DashboardError> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| DashboardError::Endpoint(self.base.to_string()))?
            .pop_if_empty()
            .extend(["send", command]);
        Ok(url)
    }
}

#[async_trait]
impl CommandEndpoint for HttpCommandEndpoint {
    #[instrument(skip(self), level = "debug")]
    async fn send(&self, command: &str) -> Result<(), DashboardError> {
        let response = self.client.get(self.command_url(command)?).send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        Err(DashboardError::Rejected {
            status: status.as_u16(),
            body: response.text().await.unwrap_or_default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use canview_core::command::find_button;
    use tokio::net::TcpListener;

    const TIMEOUT: Duration = Duration::from_secs(5);

    fn button(command: &str) -> Button {
        *find_button(command).unwrap()
    }

    #[test]
    fn engine_off_rejects_everything_but_engine_on() {
        let gate = CommandGate::default();
        assert!(!gate.engine_on());
        assert_eq!(gate.check(&button("door_open")), GateDecision::Rejected);
        assert_eq!(gate.check(&button("engine_off")), GateDecision::Rejected);
        assert_eq!(gate.check(&button("engine_on")), GateDecision::Dispatch);
    }

    #[test]
    fn engine_on_allows_everything() {
        let mut gate = CommandGate::default();
        gate.settle(ENGINE_ON);
        assert_eq!(gate.check(&button("tire_spin")), GateDecision::Dispatch);

        gate.settle(ENGINE_OFF);
        assert!(!gate.engine_on());
    }

    #[test]
    fn other_commands_leave_state_alone() {
        let mut gate = CommandGate::default();
        gate.settle(ENGINE_ON);
        gate.settle("bonnet_open");
        assert!(gate.engine_on());
    }

    #[test]
    fn command_url_appends_send_path() {
        let endpoint = HttpCommandEndpoint::new("http://localhost:5001/", TIMEOUT).unwrap();
        assert_eq!(
            endpoint.command_url("engine_on").unwrap().as_str(),
            "http://localhost:5001/send/engine_on"
        );

        let nested = HttpCommandEndpoint::new("http://gateway:8080/can", TIMEOUT).unwrap();
        assert_eq!(
            nested.command_url("door_open").unwrap().as_str(),
            "http://gateway:8080/can/send/door_open"
        );
    }

    #[tokio::test]
    async fn hung_endpoint_fails_after_timeout() {
        // Accepts the connection but never answers.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let silent = tokio::spawn(async move {
            let (_stream, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(30)).await;
        });

        let endpoint =
            HttpCommandEndpoint::new(&format!("http://{addr}"), Duration::from_millis(200)).unwrap();
        let result = tokio::time::timeout(Duration::from_secs(5), endpoint.send("engine_on"))
            .await
            .expect("request should give up on its own");

        assert!(matches!(result, Err(DashboardError::Request(e)) if e.is_timeout()));
        silent.abort();
    }
}
