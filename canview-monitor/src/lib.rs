//! # canview-monitor
//!
//! Producer side: watches secured CAN traffic and publishes animation
//! triggers and security alerts to the relay.
//!
//! ### Key Submodules:
//! - `assembler`: CAN chunks to 40-byte secure frames
//! - `frame` / `cipher`: frame layout, sealing and authenticated decoding
//! - `duplicates` / `replay_guard`: repeat suppression and counter checks
//! - `mapping`: decoded frame to animation table
//! - `monitor`: the per-frame pipeline
//! - `scenario`: scripted replay into the relay

pub mod assembler;
pub mod cipher;
pub mod duplicates;
pub mod error;
pub mod frame;
pub mod mapping;
pub mod monitor;
pub mod replay_guard;
pub mod scenario;

pub use assembler::{chunk_frame, Assembly, ChunkAssembler};
pub use cipher::{Blake3FrameCipher, FrameCipher};
pub use duplicates::DuplicateFilter;
pub use error::{DecodeError, MonitorError};
pub use frame::{DecodedFrame, SecureFrame};
pub use mapping::AnimationMap;
pub use monitor::{FrameMonitor, FrameOutcome};
pub use replay_guard::{ReplayGuard, ReplayVerdict};
pub use scenario::{EventSink, ReplaySummary, Scenario, ScenarioPlayer};
