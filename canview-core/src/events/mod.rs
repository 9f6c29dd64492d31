//! ## canview-core::events
//! **Wire envelope and typed event dispatch**
//!
//! Every relay frame is `{"event": <name>, "data": <payload>}`. The hub never
//! looks inside `data`; consumers turn an envelope into a [`RelayEvent`] and
//! dispatch on the variant.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::CoreError;

pub mod alert;
pub mod animation;

pub use alert::SecurityAlert;
pub use animation::{normalize_animation_names, AnimationRef, AnimationTrigger};

/// Event name carrying animation triggers.
pub const FRONTEND_ANIMATION: &str = "frontend_animation";
/// Event name carrying security alerts.
pub const SECURITY_ALERT: &str = "security_alert";

/// Named payload as it travels over the relay.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub event: String,
    #[serde(default)]
    pub data: Value,
}

impl Envelope {
    pub fn new(event: impl Into<String>, data: Value) -> Self {
        Self {
            event: event.into(),
            data,
        }
    }

    pub fn from_json(text: &str) -> Result<Self, CoreError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn to_json(&self) -> Result<String, CoreError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn animation(trigger: &AnimationTrigger) -> Self {
        Self::new(FRONTEND_ANIMATION, trigger.to_payload())
    }

    pub fn alert(alert: &SecurityAlert) -> Self {
        Self::new(SECURITY_ALERT, alert.to_payload())
    }
}

/// Consumer-side view of an envelope.
///
/// Unknown event names are kept as an explicit variant so that the drop
/// policy is visible at the dispatch site.
#[derive(Clone, Debug, PartialEq)]
pub enum RelayEvent {
    Animation(AnimationTrigger),
    Alert(SecurityAlert),
    Unknown { event: String },
}

impl RelayEvent {
    pub fn classify(envelope: &Envelope) -> Self {
        match envelope.event.as_str() {
            FRONTEND_ANIMATION => Self::Animation(AnimationTrigger::from_payload(&envelope.data)),
            SECURITY_ALERT => Self::Alert(SecurityAlert::from_payload(&envelope.data)),
            other => Self::Unknown {
                event: other.to_string(),
            },
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Animation(_) => FRONTEND_ANIMATION,
            Self::Alert(_) => SECURITY_ALERT,
            Self::Unknown { event } => event,
        }
    }
}

impl From<&Envelope> for RelayEvent {
    fn from(envelope: &Envelope) -> Self {
        Self::classify(envelope)
    }
}
