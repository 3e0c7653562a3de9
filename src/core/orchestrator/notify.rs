//! Status notifications for the hosting layer.
//!
//! Delivered over a `tokio::sync::broadcast` channel. Each subscriber
//! receives messages on its own task, so a handler can never re-enter the
//! orchestrator synchronously from inside a refresh.

use crate::core::types::{SecretMap, Version};

use super::OrchestratorState;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    /// A refresh stored a new snapshot.
    Updated { version: Version, data: SecretMap },
    /// A refresh failed; the previous snapshot is untouched.
    RefreshFailed {
        error: String,
        consecutive_failures: u32,
    },
    StateChanged {
        from: OrchestratorState,
        to: OrchestratorState,
    },
}

impl Notification {
    /// Short name for logs; never includes secret values.
    pub fn kind(&self) -> &'static str {
        match self {
            Notification::Updated { .. } => "updated",
            Notification::RefreshFailed { .. } => "refresh-failed",
            Notification::StateChanged { .. } => "state-changed",
        }
    }
}
