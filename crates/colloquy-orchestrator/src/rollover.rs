use crate::clock::TimeBasis;
use chrono::{NaiveDate, NaiveDateTime, Timelike};
use colloquy_archive::{ArchiveClient, ArchiveOutcome};
use colloquy_core::{ColloquyError, ColloquyResult};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

/// What happens to the conversation when the day rolls over.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RolloverPolicy {
    /// Empty every history and start again from the continuation prompt.
    #[default]
    ResetAndReseed,
    /// Keep the histories; only the transcript file changes.
    ContinueSameHistory,
}

/// Daily rollover settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RolloverConfig {
    /// Earliest hour (0-23) of the new day at which the rollover may fire.
    pub upload_hour: u32,
    /// Pause after archiving, before the next turn.
    pub settle_delay_ms: u64,
    /// What happens to history at the boundary.
    pub policy: RolloverPolicy,
    /// Opening line of the new day under [`RolloverPolicy::ResetAndReseed`].
    pub continuation_prompt: String,
    /// Time zone the boundary is evaluated in.
    #[serde(default)]
    pub time_basis: TimeBasis,
}

impl RolloverConfig {
    /// `settle_delay_ms` as a [`Duration`].
    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    /// Checks the hour range and, when reseeding, the continuation prompt.
    pub fn validate(&self) -> ColloquyResult<()> {
        if self.upload_hour > 23 {
            return Err(ColloquyError::Config(format!(
                "rollover.upload_hour must be within 0..=23, got {}",
                self.upload_hour
            )));
        }
        if self.policy == RolloverPolicy::ResetAndReseed && self.continuation_prompt.trim().is_empty() {
            return Err(ColloquyError::Config(
                "rollover.continuation_prompt must not be empty".into(),
            ));
        }
        Ok(())
    }
}

/// Outcome of a boundary check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RolloverDecision {
    /// Still the same transcript day.
    None,
    /// The boundary was crossed.
    Rolled {
        /// Day whose transcript is now complete.
        closed: NaiveDate,
        /// Day now being written.
        opened: NaiveDate,
    },
}

/// Pure rollover rule: a different calendar day, at or past the upload hour.
pub fn evaluate(now: NaiveDateTime, current_day: NaiveDate, upload_hour: u32) -> RolloverDecision {
    let today = now.date();
    if today != current_day && now.hour() >= upload_hour {
        RolloverDecision::Rolled {
            closed: current_day,
            opened: today,
        }
    } else {
        RolloverDecision::None
    }
}

/// Tracks the open transcript day and archives the closed one.
pub struct RolloverScheduler {
    current_day: NaiveDate,
    upload_hour: u32,
    settle_delay: Duration,
    archive: Arc<dyn ArchiveClient>,
}

impl RolloverScheduler {
    /// Starts tracking from `now`; elapsed days before `now` are never rolled.
    pub fn new(config: &RolloverConfig, archive: Arc<dyn ArchiveClient>, now: NaiveDateTime) -> Self {
        Self {
            current_day: now.date(),
            upload_hour: config.upload_hour,
            settle_delay: config.settle_delay(),
            archive,
        }
    }

    /// Day whose transcript is open.
    pub fn current_day(&self) -> NaiveDate {
        self.current_day
    }

    /// Advances the open day when the boundary has been crossed.
    pub fn check(&mut self, now: NaiveDateTime) -> RolloverDecision {
        let decision = evaluate(now, self.current_day, self.upload_hour);
        if let RolloverDecision::Rolled { closed, opened } = decision {
            info!(%closed, %opened, "Day boundary crossed");
            self.current_day = opened;
        }
        decision
    }

    /// Commit message used when archiving `closed`.
    pub fn commit_message(closed: NaiveDate) -> String {
        format!(
            "Daily AI conversation transcript for {}",
            closed.format("%Y-%m-%d")
        )
    }

    /// Uploads the transcript of `closed`. Failures are logged, never returned.
    pub async fn archive(&self, path: &Path, closed: NaiveDate) -> Option<ArchiveOutcome> {
        let message = Self::commit_message(closed);
        match self.archive.upload(path, &message).await {
            Ok(outcome) => {
                info!(path = %path.display(), ?outcome, "Archive step finished");
                Some(outcome)
            }
            Err(e) => {
                error!(path = %path.display(), error = %e, "Archive upload failed, keeping local transcript");
                None
            }
        }
    }

    /// Waits `settle_delay_ms` after archiving.
    pub async fn settle(&self) {
        if !self.settle_delay.is_zero() {
            tokio::time::sleep(self.settle_delay).await;
        }
    }
}
