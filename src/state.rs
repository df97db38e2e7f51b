use serde::{Deserialize, Serialize};
use std::fmt;

/// Why a group chat stopped.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum TerminationReason {
    /// The configured round cap was reached. Not an error.
    RoundLimitReached,

    /// The last appended message was a terminate signal.
    ExplicitTerminate,
}

/// Lifecycle of a group chat run.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ChatState {
    /// Turns are still being taken.
    Running,

    /// The run is over; no further turns will be taken.
    Terminated(TerminationReason),
}

impl ChatState {
    pub fn is_terminated(&self) -> bool {
        matches!(self, ChatState::Terminated(_))
    }

    pub fn reason(&self) -> Option<TerminationReason> {
        match self {
            ChatState::Running => None,
            ChatState::Terminated(reason) => Some(*reason),
        }
    }
}

impl fmt::Display for TerminationReason {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let reason = match self {
            TerminationReason::RoundLimitReached => "round limit reached",
            TerminationReason::ExplicitTerminate => "terminated by an agent",
        };
        write!(f, "{}", reason)
    }
}

impl fmt::Display for ChatState {
    /// Converts a `ChatState` into a human-readable string.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ChatState::Running => write!(f, "Running"),
            ChatState::Terminated(reason) => write!(f, "Terminated ({})", reason),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_display() {
        assert_eq!(ChatState::Running.to_string(), "Running");
        assert_eq!(
            ChatState::Terminated(TerminationReason::RoundLimitReached).to_string(),
            "Terminated (round limit reached)"
        );
    }

    #[test]
    fn test_reason() {
        assert_eq!(ChatState::Running.reason(), None);
        assert!(!ChatState::Running.is_terminated());
        let done = ChatState::Terminated(TerminationReason::ExplicitTerminate);
        assert_eq!(done.reason(), Some(TerminationReason::ExplicitTerminate));
        assert!(done.is_terminated());
    }
}
