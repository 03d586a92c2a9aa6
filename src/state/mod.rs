//! Run lifecycle tracking
//!
//! - `RunState`: stage of the current run (idle, discovering, fetching, ...)
//! - `Progress`: counters published to observers while a run executes

mod progress;
mod run_state;

pub use progress::Progress;
pub use run_state::RunState;
