use crate::state::RunState;

/// Point-in-time view of a run, published to subscribers
///
/// `completed` counts films whose outcome was merged, successful or not, so it
/// only grows during a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Progress {
    pub state: RunState,
    pub discovered: u64,
    pub completed: u64,
    pub failed: u64,
}

impl Progress {
    /// Films not yet finished
    pub fn remaining(&self) -> u64 {
        self.discovered.saturating_sub(self.completed)
    }

    /// Completion ratio in [0, 1]; 1 when nothing was discovered
    pub fn fraction(&self) -> f64 {
        if self.discovered == 0 {
            return 1.0;
        }
        (self.completed as f64 / self.discovered as f64).min(1.0)
    }
}
