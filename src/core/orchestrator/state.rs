//! Orchestrator lifecycle states.

use serde::Serialize;

/// Where the orchestrator is in its lifecycle.
///
/// ```text
/// Uninitialized -> Initializing -> Ready <-> Refreshing -> Ready | Degraded
///                                  Degraded -> Refreshing
/// any -> Closed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OrchestratorState {
    Uninitialized,
    Initializing,
    Ready,
    Refreshing,
    /// The last refresh failed. Entered on any failed refresh, including
    /// one forced by an expired snapshot. Reads keep being served from the
    /// snapshot while it is within its TTL; once it has expired they fail
    /// until a refresh succeeds and the state returns to `Ready`.
    Degraded,
    Closed,
}

impl OrchestratorState {
    /// Initialized and not closed.
    pub fn is_running(self) -> bool {
        matches!(
            self,
            OrchestratorState::Ready | OrchestratorState::Refreshing | OrchestratorState::Degraded
        )
    }
}

impl std::fmt::Display for OrchestratorState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            OrchestratorState::Uninitialized => "uninitialized",
            OrchestratorState::Initializing => "initializing",
            OrchestratorState::Ready => "ready",
            OrchestratorState::Refreshing => "refreshing",
            OrchestratorState::Degraded => "degraded",
            OrchestratorState::Closed => "closed",
        };
        f.write_str(name)
    }
}
