//! # canview-dashboard
//!
//! Consumer side of the relay: turns relayed events into animation playback
//! and transient notices, and gates user commands on the engine state.
//!
//! ### Key Submodules:
//! - `scheduler`: active animation set and its clear deadline
//! - `playback`: clip registry and directional playback plans
//! - `alerts`: notice board and security alert classification
//! - `gate`: engine precondition and the command endpoint client
//! - `dashboard`: the event loop and the published view
//! - `render`: headless view logger

pub mod alerts;
pub mod dashboard;
pub mod error;
pub mod gate;
pub mod playback;
pub mod render;
pub mod scheduler;

pub use alerts::{AlertClassifier, Notice, NoticeBoard, Severity};
pub use dashboard::{resolve_button, Dashboard, DashboardState, DashboardView, PressOutcome};
pub use error::DashboardError;
pub use gate::{CommandEndpoint, CommandGate, GateDecision, HttpCommandEndpoint};
pub use playback::{plan_playback, Clip, ClipPlayback, ClipRegistry, PlaybackPlan, StaticClipRegistry};
pub use render::ViewLogger;
pub use scheduler::{ActiveAnimationSet, AnimationScheduler};
