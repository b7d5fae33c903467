//! The turn loop.
//!
//! A run opens with the seed prompt spoken by speaker A, then alternates
//! replies starting with B. After every reply the engine writes the transcript
//! line, asks the [`RolloverScheduler`] whether the day has turned, and
//! optionally injects a follow-up prompt for the next speaker.

use crate::clock::Clock;
use crate::follow_up::{FollowUpPolicy, FollowUps};
use crate::rollover::{RolloverConfig, RolloverDecision, RolloverPolicy, RolloverScheduler};
use crate::topology::{SpeakerId, Topology, TopologyStrategy};
use chrono::NaiveDate;
use colloquy_agent::{ReplyKind, ResponseGenerator};
use colloquy_archive::ArchiveClient;
use colloquy_core::{ColloquyError, ColloquyResult};
use colloquy_session::{History, TranscriptLine, TranscriptStore};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

fn default_moderator_label() -> String {
    "Moderator".into()
}

/// One participant: the label used in transcripts and the model it runs on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpeakerConfig {
    /// Name written in transcript lines, e.g. `SpeakerA`.
    pub label: String,
    /// Backend model identifier.
    pub model_id: String,
}

/// Shape of one conversation: who talks, how history is shared, and pacing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationConfig {
    /// History-sharing strategy.
    pub topology: Topology,
    /// The opener.
    pub speaker_a: SpeakerConfig,
    /// The first to reply.
    pub speaker_b: SpeakerConfig,
    /// Replies to produce before concluding; unbounded when absent.
    #[serde(default)]
    pub max_turns: Option<u64>,
    /// Pause between turns.
    pub turn_delay_ms: u64,
    /// Opening line, spoken by speaker A.
    pub initial_prompt: String,
    /// Prompts injected between turns.
    #[serde(default)]
    pub follow_up: FollowUpPolicy,
    /// Transcript label for injected follow-up prompts.
    #[serde(default = "default_moderator_label")]
    pub moderator_label: String,
}

impl ConversationConfig {
    /// Config of speaker `id`.
    pub fn speaker(&self, id: SpeakerId) -> &SpeakerConfig {
        match id {
            SpeakerId::A => &self.speaker_a,
            SpeakerId::B => &self.speaker_b,
        }
    }

    /// `turn_delay_ms` as a [`Duration`].
    pub fn turn_delay(&self) -> Duration {
        Duration::from_millis(self.turn_delay_ms)
    }

    /// Rejects empty or clashing labels, empty model ids and prompts, and bad follow-ups.
    pub fn validate(&self) -> ColloquyResult<()> {
        for (name, speaker) in [("speaker_a", &self.speaker_a), ("speaker_b", &self.speaker_b)] {
            if speaker.label.trim().is_empty() {
                return Err(ColloquyError::Config(format!(
                    "conversation.{name}.label must not be empty"
                )));
            }
            if speaker.model_id.trim().is_empty() {
                return Err(ColloquyError::Config(format!(
                    "conversation.{name}.model_id must not be empty"
                )));
            }
        }
        if self.speaker_a.label == self.speaker_b.label {
            return Err(ColloquyError::Config(
                "conversation speaker labels must differ".into(),
            ));
        }
        if self.initial_prompt.trim().is_empty() {
            return Err(ColloquyError::Config(
                "conversation.initial_prompt must not be empty".into(),
            ));
        }
        if self.max_turns == Some(0) {
            return Err(ColloquyError::Config(
                "conversation.max_turns must be at least 1 when set".into(),
            ));
        }
        if self.follow_up != FollowUpPolicy::None
            && (self.moderator_label.trim().is_empty()
                || self.moderator_label == self.speaker_a.label
                || self.moderator_label == self.speaker_b.label)
        {
            return Err(ColloquyError::Config(
                "conversation.moderator_label must be non-empty and differ from speaker labels".into(),
            ));
        }
        self.follow_up.validate()
    }
}

/// Where the turn loop stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    /// Nothing has been written for the open day yet.
    Seed,
    /// The given speaker replies next.
    Turn(SpeakerId),
    /// `max_turns` replies have been produced.
    Concluded,
}

/// Totals reported when a run concludes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Replies produced.
    pub turns: u64,
    /// Day boundaries crossed.
    pub rollovers: u32,
}

/// Drives the conversation between two speakers until `max_turns` is reached.
pub struct ConversationEngine {
    config: ConversationConfig,
    rollover_policy: RolloverPolicy,
    continuation_prompt: String,
    generator: ResponseGenerator,
    transcripts: Arc<dyn TranscriptStore>,
    clock: Arc<dyn Clock>,
    scheduler: RolloverScheduler,
    topology: Box<dyn TopologyStrategy>,
    follow_ups: FollowUps,
    state: EngineState,
}

impl ConversationEngine {
    /// Wires the collaborators; the open day is taken from `clock`.
    pub fn new(
        config: ConversationConfig,
        rollover: &RolloverConfig,
        generator: ResponseGenerator,
        transcripts: Arc<dyn TranscriptStore>,
        archive: Arc<dyn ArchiveClient>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let scheduler = RolloverScheduler::new(rollover, archive, clock.now());
        Self {
            topology: config.topology.strategy(),
            follow_ups: FollowUps::new(config.follow_up.clone()),
            config,
            rollover_policy: rollover.policy,
            continuation_prompt: rollover.continuation_prompt.clone(),
            generator,
            transcripts,
            clock,
            scheduler,
            state: EngineState::Seed,
        }
    }

    /// Current position in the turn loop.
    pub fn state(&self) -> EngineState {
        self.state
    }

    /// The history named after `speaker` (its lines are `user` there).
    ///
    /// In the shared topology both ids return the same history.
    pub fn history(&self, speaker: SpeakerId) -> &History {
        self.topology.history(speaker)
    }

    /// Date of the transcript currently being written.
    pub fn transcript_day(&self) -> NaiveDate {
        self.scheduler.current_day()
    }

    /// Runs turns until `max_turns` is exhausted, or forever when unbounded.
    ///
    /// Only a transcript write failure ends the run early.
    pub async fn run(&mut self) -> ColloquyResult<RunSummary> {
        let mut summary = RunSummary::default();
        if self.state == EngineState::Seed {
            let prompt = self.config.initial_prompt.clone();
            self.seed(&prompt).await?;
        }

        info!(
            topology = ?self.config.topology,
            max_turns = ?self.config.max_turns,
            day = %self.transcript_day(),
            "Conversation started"
        );

        loop {
            let speaker = match self.state {
                EngineState::Turn(speaker) => speaker,
                EngineState::Seed => {
                    let prompt = self.config.initial_prompt.clone();
                    self.seed(&prompt).await?;
                    continue;
                }
                EngineState::Concluded => break,
            };

            self.take_turn(speaker).await?;
            summary.turns += 1;
            let next = speaker.other();
            self.state = EngineState::Turn(next);

            let now = self.clock.now();
            if let RolloverDecision::Rolled { closed, opened } = self.scheduler.check(now) {
                self.roll_over(closed, opened).await?;
                summary.rollovers += 1;
            } else if let Some(prompt) = self.follow_ups.after_turn(summary.turns) {
                self.inject_follow_up(next, &prompt).await?;
            }

            if self.config.max_turns.is_some_and(|max| summary.turns >= max) {
                self.state = EngineState::Concluded;
                break;
            }
            tokio::time::sleep(self.config.turn_delay()).await;
        }

        info!(
            turns = summary.turns,
            rollovers = summary.rollovers,
            "Conversation concluded"
        );
        Ok(summary)
    }

    async fn seed(&mut self, prompt: &str) -> ColloquyResult<()> {
        self.topology.seed(prompt);
        let label = self.config.speaker_a.label.clone();
        self.write(&label, prompt).await?;
        self.state = EngineState::Turn(SpeakerId::B);
        Ok(())
    }

    async fn take_turn(&mut self, speaker: SpeakerId) -> ColloquyResult<()> {
        let SpeakerConfig { label, model_id } = self.config.speaker(speaker).clone();
        let reply = self
            .generator
            .generate(&model_id, self.topology.visible_history(speaker).messages())
            .await;

        match reply.kind {
            ReplyKind::Genuine => debug!(speaker = %label, attempts = reply.attempts, "Reply generated"),
            kind => warn!(speaker = %label, ?kind, attempts = reply.attempts, "Placeholder reply used"),
        }

        self.topology.record_reply(speaker, &reply.text);
        self.write(&label, &reply.text).await
    }

    async fn roll_over(&mut self, closed: NaiveDate, opened: NaiveDate) -> ColloquyResult<()> {
        let path = self.transcripts.path_for(closed);
        self.scheduler.archive(&path, closed).await;

        match self.rollover_policy {
            RolloverPolicy::ResetAndReseed => {
                self.topology.reset();
                let prompt = self.continuation_prompt.clone();
                self.seed(&prompt).await?;
            }
            RolloverPolicy::ContinueSameHistory => {}
        }
        info!(%closed, %opened, policy = ?self.rollover_policy, "Rollover complete");

        self.scheduler.settle().await;
        Ok(())
    }

    async fn inject_follow_up(&mut self, listener: SpeakerId, prompt: &str) -> ColloquyResult<()> {
        debug!(listener = ?listener, "Injecting follow-up prompt");
        self.topology.inject_prompt(listener, prompt);
        let label = self.config.moderator_label.clone();
        self.write(&label, prompt).await
    }

    async fn write(&self, label: &str, content: &str) -> ColloquyResult<()> {
        let line = TranscriptLine::new(label, content);
        self.transcripts.append(self.transcript_day(), &line).await
    }
}
