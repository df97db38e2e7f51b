// error.rs

use crate::message::Message;
use thiserror::Error;

/// Errors raised while assembling a conversation, before any turn is taken.
#[derive(Debug, Error, PartialEq)]
pub enum SetupError {
    /// Two participants share the same name.
    #[error("duplicate participant: {0}")]
    DuplicateParticipant(String),

    /// A participant's name is empty or only whitespace.
    #[error("participant names must not be blank")]
    UnnamedParticipant,

    /// A group chat needs at least one participant.
    #[error("a group chat needs at least one participant")]
    NoParticipants,

    /// The designated admin is not one of the participants.
    #[error("admin `{0}` is not a participant of the chat")]
    UnknownAdmin(String),

    /// `max_round` must be a positive integer.
    #[error("max_round must be positive")]
    InvalidMaxRound,

    /// An agent already exposes a function with this name.
    #[error("function `{0}` is already registered")]
    DuplicateFunction(String),

    /// A seed message does not satisfy the message invariant.
    #[error("invalid seed message: {0}")]
    InvalidMessage(#[from] MessageError),
}

/// Violations of the message invariant.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum MessageError {
    #[error("message has no sender")]
    MissingSender,

    #[error("message from `{0}` has neither content nor a function call")]
    Empty(String),
}

/// A function handler could not produce a result.
///
/// Recovered inside the loop: the manager turns it into an ordinary message.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum InvocationError {
    #[error("no function named `{0}` is registered")]
    UnknownFunction(String),

    #[error("malformed arguments: {0}")]
    MalformedArguments(String),

    #[error("missing required argument `{0}`")]
    MissingArgument(String),

    #[error("argument `{name}` should be {expected}")]
    WrongArgumentType { name: String, expected: String },

    #[error("{0}")]
    Failed(String),
}

impl InvocationError {
    /// Shorthand for a handler-side failure.
    pub fn failed(reason: impl Into<String>) -> Self {
        Self::Failed(reason.into())
    }
}

/// Errors a reply strategy may return while computing a reply.
#[derive(Debug, Error)]
pub enum ReplyError {
    #[error("script exhausted after {0} replies")]
    ScriptExhausted(usize),

    #[error("model request failed: {0}")]
    Model(String),

    #[error("invalid reply: {0}")]
    InvalidReply(#[from] MessageError),

    #[error("reply sent as `{actual}` but `{expected}` was asked to speak")]
    WrongSender { expected: String, actual: String },

    #[error("{0}")]
    Failed(String),
}

impl ReplyError {
    pub fn failed(reason: impl Into<String>) -> Self {
        Self::Failed(reason.into())
    }
}

/// An agent failed to produce its reply; fatal for the conversation.
#[derive(Debug, Error)]
#[error("agent `{agent}` failed on round {round}: {source}")]
pub struct AgentReplyError {
    pub agent: String,
    pub round: u32,
    #[source]
    pub source: ReplyError,
}

/// A conversation aborted by an [`AgentReplyError`], with the history
/// accumulated up to the failure.
#[derive(Debug, Error)]
#[error("conversation aborted after {round_count} rounds: {error}")]
pub struct ChatAborted {
    #[source]
    pub error: AgentReplyError,
    pub history: Vec<Message>,
    pub round_count: u32,
}

/// Everything that can stop [`crate::driver::ChatDriver::run`].
#[derive(Debug, Error)]
pub enum ChatError {
    #[error(transparent)]
    Setup(#[from] SetupError),

    #[error(transparent)]
    Aborted(#[from] ChatAborted),
}

impl ChatError {
    /// History recorded before the failure, if the conversation had started.
    pub fn partial_history(&self) -> Option<&[Message]> {
        match self {
            ChatError::Aborted(aborted) => Some(&aborted.history),
            ChatError::Setup(_) => None,
        }
    }
}

/// Failures while reading or writing configuration and transcript files.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unknown function `{function}` listed for agent `{agent}`")]
    UnknownFunction { agent: String, function: String },

    #[error(transparent)]
    Setup(#[from] SetupError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_agent_reply_error_display() {
        let err = AgentReplyError {
            agent: "Student".to_string(),
            round: 4,
            source: ReplyError::ScriptExhausted(3),
        };
        assert_eq!(
            err.to_string(),
            "agent `Student` failed on round 4: script exhausted after 3 replies"
        );
    }

    #[test]
    fn test_partial_history_only_for_aborted_runs() {
        let setup = ChatError::from(SetupError::InvalidMaxRound);
        assert!(setup.partial_history().is_none());

        let aborted = ChatError::from(ChatAborted {
            error: AgentReplyError {
                agent: "Admin".to_string(),
                round: 1,
                source: ReplyError::failed("boom"),
            },
            history: vec![Message::text("Admin", "hello")],
            round_count: 0,
        });
        assert_eq!(aborted.partial_history().map(|h| h.len()), Some(1));
    }
}
