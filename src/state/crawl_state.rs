//! Crawl job lifecycle states
//!
//! A job moves `Idle -> Running` once its frontier is seeded and ends in
//! exactly one of the terminal states.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Represents the current state of a crawl job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CrawlState {
    /// Job created, frontier not yet seeded
    Idle,

    /// Traversal loop is active
    Running,

    // ===== Terminal States =====
    /// Frontier exhausted
    Completed,

    /// Consecutive-failure threshold exceeded
    Failed,

    /// Stop signal or job deadline observed
    Stopped,
}

impl CrawlState {
    /// Returns true if no further transitions are possible
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Stopped)
    }

    /// Returns true if moving from `self` to `next` is a legal transition
    pub fn can_transition_to(&self, next: CrawlState) -> bool {
        matches!(
            (self, next),
            (Self::Idle, Self::Running)
                | (Self::Running, Self::Completed)
                | (Self::Running, Self::Failed)
                | (Self::Running, Self::Stopped)
        )
    }

    /// Converts the state to its storage string representation
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Stopped => "stopped",
        }
    }

    /// Parses a state from its storage string representation
    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "idle" => Some(Self::Idle),
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            "stopped" => Some(Self::Stopped),
            _ => None,
        }
    }
}

impl fmt::Display for CrawlState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [CrawlState; 5] = [
        CrawlState::Idle,
        CrawlState::Running,
        CrawlState::Completed,
        CrawlState::Failed,
        CrawlState::Stopped,
    ];

    #[test]
    fn test_is_terminal() {
        assert!(!CrawlState::Idle.is_terminal());
        assert!(!CrawlState::Running.is_terminal());
        assert!(CrawlState::Completed.is_terminal());
        assert!(CrawlState::Failed.is_terminal());
        assert!(CrawlState::Stopped.is_terminal());
    }

    #[test]
    fn test_legal_transitions() {
        assert!(CrawlState::Idle.can_transition_to(CrawlState::Running));
        assert!(CrawlState::Running.can_transition_to(CrawlState::Completed));
        assert!(CrawlState::Running.can_transition_to(CrawlState::Failed));
        assert!(CrawlState::Running.can_transition_to(CrawlState::Stopped));
    }

    #[test]
    fn test_terminal_states_are_final() {
        for from in ALL.iter().filter(|s| s.is_terminal()) {
            for to in ALL {
                assert!(!from.can_transition_to(to), "{} -> {}", from, to);
            }
        }
    }

    #[test]
    fn test_idle_cannot_skip_running() {
        assert!(!CrawlState::Idle.can_transition_to(CrawlState::Completed));
        assert!(!CrawlState::Idle.can_transition_to(CrawlState::Stopped));
    }

    #[test]
    fn test_roundtrip_db_string() {
        for state in ALL {
            assert_eq!(CrawlState::from_db_string(state.to_db_string()), Some(state));
        }
        assert_eq!(CrawlState::from_db_string("paused"), None);
    }
}
