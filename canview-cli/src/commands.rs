use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use canview_config::CanviewConfig;
use canview_core::events::{AnimationTrigger, Envelope, SECURITY_ALERT};
use canview_dashboard::{
    resolve_button, Dashboard, HttpCommandEndpoint, StaticClipRegistry, ViewLogger,
};
use canview_monitor::{
    AnimationMap, Blake3FrameCipher, FrameCipher, FrameMonitor, Scenario, ScenarioPlayer,
};
use canview_relay::{publish_once, ClientOptions, LoggingCommandSink, RelayClient, RelayServer};
use canview_telemetry::MetricsRecorder;

const PUBLISH_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Parser)]
#[command(name = "canview", version, about = "CAN event relay and dashboards")]
pub struct Cli {
    /// Configuration YAML; defaults to config/canview.yaml plus overlays
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Serve the relay hub and the command endpoint
    Relay,
    /// Run a headless dashboard; stdin lines are button presses
    Dashboard,
    /// Publish one event to the relay
    Publish(PublishArgs),
    /// Replay a frame scenario through the monitor into the relay
    Monitor(MonitorArgs),
}

#[derive(Args, Debug, Clone)]
pub struct PublishArgs {
    /// Relay websocket URL; defaults to the dashboard relay URL
    #[arg(long)]
    pub url: Option<String>,

    #[command(subcommand)]
    pub event: PublishEvent,
}

#[derive(Subcommand, Debug, Clone)]
pub enum PublishEvent {
    /// Trigger animations by clip name
    Animation {
        #[arg(required = true)]
        names: Vec<String>,
        #[arg(long)]
        reverse: bool,
    },
    /// Send a raw security alert payload, e.g. '{"type":"tamper_detected","error":"x"}'
    Alert { payload: String },
}

#[derive(Args, Debug, Clone)]
pub struct MonitorArgs {
    #[arg(short, long)]
    pub scenario: PathBuf,
}

pub fn load_config(path: Option<&Path>) -> anyhow::Result<CanviewConfig> {
    let config = match path {
        Some(path) => CanviewConfig::load_from_path(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => CanviewConfig::load()?,
    };
    Ok(config)
}

pub async fn run_relay(config: &CanviewConfig) -> anyhow::Result<()> {
    let server = RelayServer::new(config, Arc::new(LoggingCommandSink))?;
    let listener = server.bind().await?;
    server
        .serve(listener, async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;
    Ok(())
}

pub async fn run_dashboard(config: &CanviewConfig) -> anyhow::Result<()> {
    let settings = &config.dashboard;
    let (inbound_tx, inbound_rx) = mpsc::channel(64);
    let client = RelayClient::spawn(ClientOptions::from(settings), inbound_tx);

    let registry = StaticClipRegistry::new(&settings.clips);
    if registry.is_empty() {
        warn!("No clips configured, every animation will be skipped");
    } else {
        info!(clips = registry.len(), "Clip registry loaded");
    }
    let dashboard = Dashboard::new(
        settings,
        Arc::new(registry),
        Arc::new(HttpCommandEndpoint::new(
            &settings.command_url,
            Duration::from_millis(settings.command_timeout_ms),
        )?),
    );
    tokio::spawn(ViewLogger::default().run(dashboard.subscribe()));

    let (press_tx, press_rx) = mpsc::channel(16);
    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            if line.trim().is_empty() {
                continue;
            }
            match resolve_button(&line) {
                Some(button) => {
                    if press_tx.send(button).await.is_err() {
                        break;
                    }
                }
                None => warn!(input = %line.trim(), "No such button"),
            }
        }
    });

    tokio::select! {
        _ = dashboard.run(inbound_rx, press_rx, client.watch_state()) => {}
        _ = tokio::signal::ctrl_c() => info!("Interrupted"),
    }
    client.close().await;
    Ok(())
}

pub async fn run_publish(config: &CanviewConfig, args: PublishArgs) -> anyhow::Result<()> {
    let envelope = match args.event {
        PublishEvent::Animation { names, reverse } => {
            Envelope::animation(&AnimationTrigger::new(names, reverse))
        }
        PublishEvent::Alert { payload } => {
            let data = serde_json::from_str(&payload).context("alert payload must be JSON")?;
            Envelope::new(SECURITY_ALERT, data)
        }
    };
    let url = args.url.unwrap_or_else(|| config.dashboard.relay_url.clone());

    publish_once(&url, &envelope, PUBLISH_TIMEOUT).await?;
    info!(event = %envelope.event, url = %url, "Published");
    Ok(())
}

pub async fn run_monitor(config: &CanviewConfig, args: MonitorArgs) -> anyhow::Result<()> {
    let scenario = Scenario::load_from_file(&args.scenario)
        .with_context(|| format!("loading scenario {}", args.scenario.display()))?;

    let cipher: Arc<dyn FrameCipher> =
        Arc::new(Blake3FrameCipher::new(config.monitor.frame_key.as_bytes()));
    let monitor = FrameMonitor::new(
        &config.monitor,
        Arc::clone(&cipher),
        AnimationMap::vehicle_defaults(),
    )
    .with_metrics(Arc::new(MetricsRecorder::new()?));
    let mut player = ScenarioPlayer::new(monitor, cipher);

    let (echo_tx, mut echo_rx) = mpsc::channel::<Envelope>(64);
    tokio::spawn(async move {
        while let Some(envelope) = echo_rx.recv().await {
            debug!(event = %envelope.event, "Relay echo");
        }
    });

    let options = ClientOptions {
        url: config.monitor.relay_url.clone(),
        ..ClientOptions::from(&config.dashboard)
    };
    let client = RelayClient::spawn(options, echo_tx);
    client.wait_connected().await?;

    let summary = player.play(&scenario, &client).await?;
    client.close().await;
    info!(
        frames = summary.frames,
        published = summary.published,
        alerts = summary.alerts,
        "Monitor replay finished"
    );
    Ok(())
}
