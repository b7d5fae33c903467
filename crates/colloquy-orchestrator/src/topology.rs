use colloquy_core::Role;
use colloquy_session::History;
use serde::{Deserialize, Serialize};

/// One of the two participants. `A` always opens the conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SpeakerId {
    /// The opener; the seed prompt is attributed to A.
    A,
    /// The first to reply.
    B,
}

impl SpeakerId {
    /// The opposite participant.
    pub fn other(self) -> Self {
        match self {
            SpeakerId::A => SpeakerId::B,
            SpeakerId::B => SpeakerId::A,
        }
    }

    fn index(self) -> usize {
        match self {
            SpeakerId::A => 0,
            SpeakerId::B => 1,
        }
    }
}

/// How the two participants share history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Topology {
    /// One history for both; A speaks as `user`, B as `assistant`.
    Shared,
    /// Two cross-pollinated histories; each speaker generates from the other's.
    Dual,
}

impl Topology {
    /// A fresh, empty strategy for this topology.
    pub fn strategy(self) -> Box<dyn TopologyStrategy> {
        match self {
            Topology::Shared => Box::new(SharedTopology::default()),
            Topology::Dual => Box::new(DualTopology::default()),
        }
    }
}

/// Where each line of the conversation lands and what each speaker sees.
pub trait TopologyStrategy: Send + Sync {
    /// Records the opening prompt, spoken by [`SpeakerId::A`].
    fn seed(&mut self, prompt: &str);

    /// History handed to the backend when `speaker` is about to reply.
    fn visible_history(&self, speaker: SpeakerId) -> &History;

    /// The history named after `id`: the one in which `id`'s lines are `user`.
    fn history(&self, id: SpeakerId) -> &History;

    /// Records a reply produced by `speaker`.
    fn record_reply(&mut self, speaker: SpeakerId, content: &str);

    /// Adds an outside prompt addressed to `listener`.
    fn inject_prompt(&mut self, listener: SpeakerId, prompt: &str);

    /// Drops all history.
    fn reset(&mut self);
}

// ---------------------------------------------------------------------------
// Shared
// ---------------------------------------------------------------------------

/// One history for both speakers.
#[derive(Debug, Default)]
pub struct SharedTopology {
    history: History,
}

impl SharedTopology {
    fn role_of(speaker: SpeakerId) -> Role {
        match speaker {
            SpeakerId::A => Role::User,
            SpeakerId::B => Role::Assistant,
        }
    }
}

impl TopologyStrategy for SharedTopology {
    fn seed(&mut self, prompt: &str) {
        self.history.push_as(Self::role_of(SpeakerId::A), prompt);
    }

    fn visible_history(&self, _speaker: SpeakerId) -> &History {
        &self.history
    }

    fn history(&self, _id: SpeakerId) -> &History {
        &self.history
    }

    fn record_reply(&mut self, speaker: SpeakerId, content: &str) {
        self.history.push_as(Self::role_of(speaker), content);
    }

    fn inject_prompt(&mut self, _listener: SpeakerId, prompt: &str) {
        self.history.push_as(Role::User, prompt);
    }

    fn reset(&mut self) {
        self.history = History::new();
    }
}

// ---------------------------------------------------------------------------
// Dual
// ---------------------------------------------------------------------------

/// Two cross-pollinated histories, named after the speaker whose lines are
/// `user` in them.
///
/// History A holds A's lines as `user` and B's as `assistant`; B generates
/// from it. History B is the mirror image, and A generates from it.
#[derive(Debug, Default)]
pub struct DualTopology {
    histories: [History; 2],
}

impl DualTopology {
    fn history_mut(&mut self, id: SpeakerId) -> &mut History {
        &mut self.histories[id.index()]
    }
}

impl TopologyStrategy for DualTopology {
    fn seed(&mut self, prompt: &str) {
        // A's opener lands in History A only; History B starts with B's first reply.
        self.history_mut(SpeakerId::A).push_as(Role::User, prompt);
    }

    fn visible_history(&self, speaker: SpeakerId) -> &History {
        self.history(speaker.other())
    }

    fn history(&self, id: SpeakerId) -> &History {
        &self.histories[id.index()]
    }

    fn record_reply(&mut self, speaker: SpeakerId, content: &str) {
        self.history_mut(speaker.other()).push_as(Role::Assistant, content);
        self.history_mut(speaker).push_as(Role::User, content);
    }

    fn inject_prompt(&mut self, listener: SpeakerId, prompt: &str) {
        self.history_mut(listener.other()).push_as(Role::User, prompt);
    }

    fn reset(&mut self) {
        self.histories = Default::default();
    }
}
