use chrono::{Local, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

/// Source of wall-clock time for rollover decisions.
pub trait Clock: Send + Sync {
    /// Current wall-clock time in the clock's basis.
    fn now(&self) -> NaiveDateTime;
}

/// Time zone the day boundary is evaluated in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeBasis {
    /// The host's local time zone.
    #[default]
    Local,
    /// Coordinated universal time.
    Utc,
}

/// Reads the system clock in the configured [`TimeBasis`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock {
    basis: TimeBasis,
}

impl SystemClock {
    /// Clock reading time in `basis`.
    pub fn new(basis: TimeBasis) -> Self {
        Self { basis }
    }
}

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        match self.basis {
            TimeBasis::Local => Local::now().naive_local(),
            TimeBasis::Utc => Utc::now().naive_utc(),
        }
    }
}
