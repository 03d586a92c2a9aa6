//! Run state definitions
//!
//! A run moves through a fixed sequence of stages. Only discovery can fail the
//! run; per-film failures are absorbed into the summary.

use crate::CensusError;
use std::fmt;

/// Stage of a census run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RunState {
    /// No run in progress
    #[default]
    Idle,

    /// Walking the listing pages to collect film URLs
    Discovering,

    /// Fetching and extracting film pages
    Fetching,

    /// Building the final summary
    Aggregating,

    /// Summary produced
    Done,

    /// The account could not be resolved
    Failed,
}

impl RunState {
    /// Returns true if the run has ended, successfully or not
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }

    /// Returns true while a run is in progress
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Discovering | Self::Fetching | Self::Aggregating)
    }

    /// Returns true if `next` is a legal successor of this state
    ///
    /// Terminal states may only go back to `Idle`, which starts a new run.
    pub fn can_transition_to(&self, next: RunState) -> bool {
        use RunState::*;
        matches!(
            (self, next),
            (Idle, Discovering)
                | (Discovering, Fetching)
                | (Discovering, Failed)
                | (Fetching, Aggregating)
                | (Aggregating, Done)
                | (Done, Idle)
                | (Failed, Idle)
        )
    }

    /// Moves to `next`, or reports the illegal transition
    pub fn transition(&mut self, next: RunState) -> Result<(), CensusError> {
        if !self.can_transition_to(next) {
            return Err(CensusError::InvalidTransition {
                from: *self,
                to: next,
            });
        }
        *self = next;
        Ok(())
    }

    /// Short lowercase name used in logs
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Discovering => "discovering",
            Self::Fetching => "fetching",
            Self::Aggregating => "aggregating",
            Self::Done => "done",
            Self::Failed => "failed",
        }
    }

    /// Returns all run states
    pub fn all_states() -> [Self; 6] {
        [
            Self::Idle,
            Self::Discovering,
            Self::Fetching,
            Self::Aggregating,
            Self::Done,
            Self::Failed,
        ]
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
