use colloquy_core::{ColloquyError, ColloquyResult};
use serde::{Deserialize, Serialize};

/// Prompts injected between turns to keep the exchange moving.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "policy", rename_all = "snake_case")]
pub enum FollowUpPolicy {
    /// Never inject.
    #[default]
    None,
    /// The same prompt after every `every` turns.
    Fixed {
        /// Prompt to inject.
        text: String,
        /// Interval in turns.
        every: u32,
    },
    /// The next prompt of the list, cycling, after every `every` turns.
    Rotating {
        /// Prompts, used in order.
        prompts: Vec<String>,
        /// Interval in turns.
        every: u32,
    },
}

impl FollowUpPolicy {
    /// Rejects a zero interval and empty prompts.
    pub fn validate(&self) -> ColloquyResult<()> {
        match self {
            FollowUpPolicy::None => Ok(()),
            FollowUpPolicy::Fixed { text, every } => {
                check_every(*every)?;
                if text.trim().is_empty() {
                    return Err(ColloquyError::Config(
                        "follow_up.text must not be empty".into(),
                    ));
                }
                Ok(())
            }
            FollowUpPolicy::Rotating { prompts, every } => {
                check_every(*every)?;
                if prompts.is_empty() || prompts.iter().any(|p| p.trim().is_empty()) {
                    return Err(ColloquyError::Config(
                        "follow_up.prompts must be a non-empty list of non-empty prompts".into(),
                    ));
                }
                Ok(())
            }
        }
    }
}

fn check_every(every: u32) -> ColloquyResult<()> {
    if every == 0 {
        return Err(ColloquyError::Config(
            "follow_up.every must be at least 1".into(),
        ));
    }
    Ok(())
}

/// Tracks position in a [`FollowUpPolicy`] across a run.
#[derive(Debug, Clone)]
pub struct FollowUps {
    policy: FollowUpPolicy,
    next: usize,
}

impl FollowUps {
    /// Starts at the first prompt of `policy`.
    pub fn new(policy: FollowUpPolicy) -> Self {
        Self { policy, next: 0 }
    }

    /// Prompt to inject once `completed_turns` replies have been produced, if any.
    pub fn after_turn(&mut self, completed_turns: u64) -> Option<String> {
        let due = |every: u32| every > 0 && completed_turns > 0 && completed_turns % u64::from(every) == 0;
        match &self.policy {
            FollowUpPolicy::None => None,
            FollowUpPolicy::Fixed { text, every } => due(*every).then(|| text.clone()),
            FollowUpPolicy::Rotating { prompts, every } => {
                if !due(*every) || prompts.is_empty() {
                    return None;
                }
                let prompt = prompts[self.next % prompts.len()].clone();
                self.next = (self.next + 1) % prompts.len();
                Some(prompt)
            }
        }
    }
}
