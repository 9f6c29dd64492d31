//! ## canview-dashboard::playback
//! **Resolving animation names to directional clip playback**
//!
//! Every resolved clip plays exactly once and clamps on its last frame.
//! Forward playback starts at position zero with time scale +1; reverse
//! playback starts at the clip's full duration with time scale -1. All clips
//! of one trigger share the same start instant.

use std::collections::HashMap;
use std::time::Duration;

use tokio::time::Instant;
use tracing::warn;

use canview_config::ClipConfig;

/// A finite animation clip exported by the vehicle model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Clip {
    pub name: String,
    pub duration: Duration,
}

/// Looks up clips by name.
pub trait ClipRegistry: Send + Sync {
    fn clip(&self, name: &str) -> Option<Clip>;
}

/// Registry backed by the configured clip list.
#[derive(Debug, Clone, Default)]
pub struct StaticClipRegistry {
    clips: HashMap<String, Duration>,
}

impl StaticClipRegistry {
    pub fn new(clips: &[ClipConfig]) -> Self {
        Self {
            clips: clips
                .iter()
                .map(|c| (c.name.clone(), Duration::from_millis(c.duration_ms)))
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.clips.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clips.is_empty()
    }
}

impl ClipRegistry for StaticClipRegistry {
    fn clip(&self, name: &str) -> Option<Clip> {
        self.clips.get(name).map(|duration| Clip {
            name: name.to_string(),
            duration: *duration,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClipPlayback {
    pub clip: Clip,
    pub start_position: Duration,
    pub time_scale: f32,
    pub repetitions: u32,
    pub clamp_when_finished: bool,
}

impl ClipPlayback {
    pub fn once(clip: Clip, reverse: bool) -> Self {
        let (start_position, time_scale) = if reverse {
            (clip.duration, -1.0)
        } else {
            (Duration::ZERO, 1.0)
        };
        Self {
            clip,
            start_position,
            time_scale,
            repetitions: 1,
            clamp_when_finished: true,
        }
    }

    pub fn is_reverse(&self) -> bool {
        self.time_scale < 0.0
    }
}

/// Everything a renderer needs to start one trigger's clips.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackPlan {
    /// Increases with every plan; a renderer interrupts clips of older plans.
    pub generation: u64,
    pub started_at: Instant,
    pub clips: Vec<ClipPlayback>,
    pub missing: Vec<String>,
}

impl PlaybackPlan {
    pub fn clip_names(&self) -> Vec<&str> {
        self.clips.iter().map(|p| p.clip.name.as_str()).collect()
    }
}

/// Resolves `names` against `registry`. Misses are warned about and
/// skipped; the remaining clips still play.
pub fn plan_playback(
    names: &[String],
    reverse: bool,
    registry: &dyn ClipRegistry,
    generation: u64,
    started_at: Instant,
) -> PlaybackPlan {
    let mut clips = Vec::with_capacity(names.len());
    let mut missing = Vec::new();

    for name in names {
        match registry.clip(name) {
            Some(clip) => clips.push(ClipPlayback::once(clip, reverse)),
            None => {
                warn!(animation = %name, "Animation not found");
                missing.push(name.clone());
            }
        }
    }

    PlaybackPlan {
        generation,
        started_at,
        clips,
        missing,
    }
}
