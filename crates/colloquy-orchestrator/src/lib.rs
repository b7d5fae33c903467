//! Conversation orchestration for Colloquy.
//!
//! This crate provides:
//! - [`ConversationEngine`]: seeds histories and drives the turn loop.
//! - [`TopologyStrategy`]: shared vs dual (cross-pollinated) history handling.
//! - [`RolloverScheduler`]: detects the daily boundary and archives the closed transcript.
//! - [`FollowUps`]: optional prompts injected between turns.
//! - [`ColloquyConfig`]: the full, validated TOML configuration.

pub mod clock;
pub mod config;
pub mod engine;
pub mod follow_up;
pub mod rollover;
pub mod topology;

pub use clock::{Clock, SystemClock, TimeBasis};
pub use config::ColloquyConfig;
pub use engine::{ConversationConfig, ConversationEngine, EngineState, RunSummary, SpeakerConfig};
pub use follow_up::{FollowUpPolicy, FollowUps};
pub use rollover::{RolloverConfig, RolloverDecision, RolloverPolicy, RolloverScheduler};
pub use topology::{DualTopology, SharedTopology, SpeakerId, Topology, TopologyStrategy};
